//! The HTTP status and worldmap surface.

use std::io::Cursor;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use feldspar_world::block;
use image::{Rgb, RgbImage};
use tracing::info;

use crate::network::Server;

/// Builds the status/worldmap router.
pub fn router(server: Arc<Server>) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/worldmap/{coords}", get(worldmap))
        .route("/save/{mode}", post(save_mode))
        .with_state(server)
}

async fn status(State(server): State<Arc<Server>>) -> Html<String> {
    let world = &server.world;
    let (clean, dirty) = world.cache_sizes().await;

    Html(format!(
        "<html><head><title>feldspar</title></head><body>\
         <h1>feldspar</h1>\
         <ul>\
         <li>seed: {}</li>\
         <li>spawn: {:?}</li>\
         <li>clean chunks: {clean}</li>\
         <li>dirty chunks: {dirty}</li>\
         <li>saving: {}</li>\
         </ul>\
         </body></html>",
        world.seed,
        world.spawn,
        world.saving().await,
    ))
}

/// A 16×16 PNG of the chunk's surface, one pixel per block column.
async fn worldmap(State(server): State<Arc<Server>>, Path(coords): Path<String>) -> Response {
    let Some((x, z)) = parse_coords(&coords) else {
        return (StatusCode::BAD_REQUEST, "expected /worldmap/<x>,<z>").into_response();
    };

    let chunk = match server.world.request_chunk(x, z).await {
        Ok(chunk) => chunk,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };

    let mut image = RgbImage::new(16, 16);
    {
        let chunk = chunk.read();
        for px in 0..16_u32 {
            for pz in 0..16_u32 {
                let y = chunk.height_at(px as usize, pz as usize);
                let color = color_at(chunk.block(px as usize, y, pz as usize), y);
                image.put_pixel(px, pz, Rgb(color));
            }
        }
    }

    let mut png = Cursor::new(Vec::new());
    if image.write_to(&mut png, image::ImageFormat::Png).is_err() {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "public, max-age=360"),
        ],
        png.into_inner(),
    )
        .into_response()
}

/// Drives the backup persistence toggle.
async fn save_mode(State(server): State<Arc<Server>>, Path(mode): Path<String>) -> Response {
    match mode.as_str() {
        "off" => {
            server.world.save_off().await;
            info!("saving disabled for backup");
            StatusCode::NO_CONTENT.into_response()
        }
        "on" => {
            server.world.save_on().await;
            info!("saving re-enabled");
            StatusCode::NO_CONTENT.into_response()
        }
        _ => (StatusCode::BAD_REQUEST, "expected /save/on or /save/off").into_response(),
    }
}

fn parse_coords(s: &str) -> Option<(i32, i32)> {
    let (x, z) = s.split_once(',')?;
    Some((x.trim().parse().ok()?, z.trim().parse().ok()?))
}

// X11 colour names, as on the classic web map.
const BLACK: [u8; 3] = [0, 0, 0];
const BLUE: [u8; 3] = [0, 0, 255];
const BROWN: [u8; 3] = [165, 42, 42];
const BURLYWOOD: [u8; 3] = [222, 184, 135];
const DARKGREEN: [u8; 3] = [0, 100, 0];
const DIMGRAY: [u8; 3] = [105, 105, 105];
const FORESTGREEN: [u8; 3] = [34, 139, 34];
const GRAY: [u8; 3] = [128, 128, 128];
const GREEN: [u8; 3] = [0, 128, 0];
const KHAKI: [u8; 3] = [240, 230, 140];
const LIGHTCYAN: [u8; 3] = [224, 255, 255];
const LIME: [u8; 3] = [0, 255, 0];
const LIMEGREEN: [u8; 3] = [50, 205, 50];
const RED: [u8; 3] = [255, 0, 0];
const ROSYBROWN: [u8; 3] = [188, 143, 143];
const SIENNA: [u8; 3] = [160, 82, 45];
const SNOW_WHITE: [u8; 3] = [255, 250, 250];

/// Grass shades cycle with the surface height.
const GRASS_BAND: [[u8; 3]; 3] = [FORESTGREEN, GREEN, DARKGREEN];

fn color_at(block_id: u8, y: usize) -> [u8; 3] {
    match block_id {
        block::CLAY => ROSYBROWN,
        block::COBBLESTONE => DIMGRAY,
        block::DIRT => BROWN,
        block::GRASS => GRASS_BAND[y / 5 % GRASS_BAND.len()],
        block::LAVA | block::LAVA_SPRING => RED,
        block::LEAVES => LIMEGREEN,
        block::LOG => SIENNA,
        block::SAND => KHAKI,
        block::SAPLING => LIME,
        block::SNOW => SNOW_WHITE,
        block::ICE => LIGHTCYAN,
        block::WATER | block::SPRING => BLUE,
        block::STONE => GRAY,
        block::WOOD => BURLYWOOD,
        _ => BLACK,
    }
}
