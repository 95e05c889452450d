//! One task per client: decode, dispatch, reply.

use std::io::Write;
use std::sync::Arc;

use anyhow::bail;
use feldspar_protocol::packets::{
    AnyPacket, Chat, ChunkData, ChunkEnable, Handshake, Login, Look, PlayerPositionLook, Position,
    SpawnPosition, TimeUpdate,
};
use feldspar_protocol::{make_error, Blob, PacketDecoder, PacketEncoder, PROTOCOL_VERSION};
use feldspar_world::{block, ChunkHandle, ChunkPos, Player, CHUNK_HEIGHT, CHUNK_SIZE};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::network::{Event, Server};

const READ_BUF_SIZE: usize = 4096;

/// Digging state the client sends when it has broken through a block.
const DIG_FINISHED: u8 = 3;

/// Drives one client connection from accept to close. On a protocol error
/// the client is told why (tag 255) before the stream is dropped.
pub async fn run(server: Arc<Server>, stream: TcpStream) -> anyhow::Result<()> {
    let events = server.subscribe();
    let mut session = Session {
        server,
        stream,
        dec: PacketDecoder::new(),
        enc: PacketEncoder::new(),
        events,
        username: None,
        player: None,
        entity_id: 0,
    };

    let result = session.serve().await;

    if let (Some(username), Some(player)) = (&session.username, &session.player) {
        if let Err(e) = session.server.world.save_player(username, player).await {
            warn!(username = %username, "failed to save player: {e}");
        }
    }

    if let Err(e) = &result {
        if let Ok(bytes) = make_error(&e.to_string()) {
            let _ = session.stream.write_all(&bytes).await;
        }
    }

    result
}

struct Session {
    server: Arc<Server>,
    stream: TcpStream,
    dec: PacketDecoder,
    enc: PacketEncoder,
    events: broadcast::Receiver<Event>,
    username: Option<String>,
    player: Option<Player>,
    entity_id: u32,
}

enum Step {
    Event(Event),
    Packet(AnyPacket),
    Closed,
}

impl Session {
    async fn serve(&mut self) -> anyhow::Result<()> {
        loop {
            let step = tokio::select! {
                event = self.events.recv() => match event {
                    Ok(event) => Step::Event(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "session fell behind on broadcasts");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => Step::Closed,
                },
                packet = next_packet(&mut self.dec, &mut self.stream) => match packet? {
                    Some(packet) => Step::Packet(packet),
                    None => Step::Closed,
                },
            };

            match step {
                Step::Event(event) => self.handle_event(event)?,
                Step::Packet(packet) => {
                    if !self.handle_packet(packet).await? {
                        return Ok(());
                    }
                }
                Step::Closed => return Ok(()),
            }

            self.flush().await?;
        }
    }

    fn handle_event(&mut self, event: Event) -> anyhow::Result<()> {
        // Nothing goes out until the client has logged in.
        if self.username.is_none() {
            return Ok(());
        }

        match event {
            Event::Chat(line) => self.send(Chat { message: line }.into()),
            Event::Time(timestamp) => self.send(TimeUpdate { timestamp }.into()),
        }
    }

    /// Returns `Ok(false)` when the client asked to disconnect.
    async fn handle_packet(&mut self, packet: AnyPacket) -> anyhow::Result<bool> {
        match packet {
            AnyPacket::Ping(_) => {}
            AnyPacket::Handshake(handshake) => {
                debug!(username = %handshake.username, "handshake");
                // Offline mode: no name verification challenge.
                self.send(Handshake { username: "-".into() }.into())?;
            }
            AnyPacket::Login(login) => self.login(login).await?,
            AnyPacket::Chat(chat) => {
                let Some(username) = &self.username else {
                    bail!("chat before login");
                };
                let line = format!("<{username}> {}", chat.message);
                info!("{line}");
                self.server.broadcast(Event::Chat(line));
            }
            AnyPacket::Flying(flying) => {
                if let Some(player) = &mut self.player {
                    player.on_ground = flying.flying;
                }
            }
            AnyPacket::PlayerPosition(p) => self.track_movement(Some(p.position), None, p.flying),
            AnyPacket::PlayerLook(p) => self.track_movement(None, Some(p.look), p.flying),
            AnyPacket::PlayerPositionLook(p) => {
                self.track_movement(Some(p.position), Some(p.look), p.flying);
            }
            AnyPacket::Digging(digging) => {
                if digging.state == DIG_FINISHED {
                    self.set_block(digging.x as i32, digging.y as i32, digging.z as i32, block::AIR)
                        .await?;
                }
            }
            AnyPacket::Build(build) => {
                // Alpha block ids fit in a byte; anything else is an item,
                // which does not place.
                if let Ok(id) = u8::try_from(build.block) {
                    let (x, y, z) =
                        offset_by_face(build.x as i32, i32::from(build.y), build.z as i32, build.face);
                    self.set_block(x, y, z, id).await?;
                }
            }
            AnyPacket::Disconnect(disconnect) => {
                info!(message = %disconnect.message, "client disconnected");
                return Ok(false);
            }
            // Inventory and entity traffic is carried but not simulated.
            other => debug!(packet = other.name(), "ignoring packet"),
        }

        Ok(true)
    }

    async fn login(&mut self, login: Login) -> anyhow::Result<()> {
        if self.username.is_some() {
            bail!("second login on one connection");
        }
        if login.protocol != PROTOCOL_VERSION {
            bail!("unsupported protocol version {}", login.protocol);
        }

        let world = Arc::clone(&self.server.world);
        let player = world.load_player(&login.username).await?;
        self.entity_id = self.server.next_entity_id();
        info!(username = %login.username, entity = self.entity_id, "login");

        // The reply mirrors the login shape, carrying the assigned entity id
        // where the client sent its protocol version.
        self.send(
            Login {
                protocol: self.entity_id,
                username: String::new(),
                unused: String::new(),
            }
            .into(),
        )?;
        self.send(
            SpawnPosition {
                x: world.spawn.0 as u32,
                y: world.spawn.1 as u32,
                z: world.spawn.2 as u32,
            }
            .into(),
        )?;

        // Ship the square of chunks around the player before releasing them
        // into the world.
        let center = ChunkPos::of_block(player.x.floor() as i32, player.z.floor() as i32);
        let radius = self.server.view_radius;
        for cx in (center.x - radius)..=(center.x + radius) {
            for cz in (center.z - radius)..=(center.z + radius) {
                let chunk = world.request_chunk(cx, cz).await?;
                self.send_chunk(cx, cz, &chunk)?;
                self.flush().await?;
            }
        }

        self.send(
            PlayerPositionLook {
                position: Position {
                    x: player.x,
                    y: player.y,
                    stance: player.stance,
                    z: player.z,
                },
                look: Look {
                    rotation: player.rotation,
                    pitch: player.pitch,
                },
                flying: player.on_ground,
            }
            .into(),
        )?;

        self.username = Some(login.username);
        self.player = Some(player);
        Ok(())
    }

    fn send_chunk(&mut self, cx: i32, cz: i32, chunk: &ChunkHandle) -> anyhow::Result<()> {
        self.send(
            ChunkEnable {
                x: cx,
                z: cz,
                enabled: true,
            }
            .into(),
        )?;

        let data = {
            let wire = chunk.read().wire_data();
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&wire)?;
            encoder.finish()?
        };

        self.send(
            ChunkData {
                x: cx * CHUNK_SIZE as i32,
                y: 0,
                z: cz * CHUNK_SIZE as i32,
                x_size: (CHUNK_SIZE - 1) as u8,
                y_size: (CHUNK_HEIGHT - 1) as u8,
                z_size: (CHUNK_SIZE - 1) as u8,
                data: Blob(data),
            }
            .into(),
        )
    }

    fn track_movement(&mut self, position: Option<Position>, look: Option<Look>, on_ground: bool) {
        let Some(player) = &mut self.player else {
            return;
        };

        if let Some(p) = position {
            player.x = p.x;
            player.y = p.y;
            player.stance = p.stance;
            player.z = p.z;
        }
        if let Some(l) = look {
            player.rotation = l.rotation;
            player.pitch = l.pitch;
        }
        player.on_ground = on_ground;
    }

    async fn set_block(&self, x: i32, y: i32, z: i32, id: u8) -> anyhow::Result<()> {
        if !(0..CHUNK_HEIGHT as i32).contains(&y) {
            return Ok(());
        }

        let pos = ChunkPos::of_block(x, z);
        let chunk = self.server.world.request_chunk(pos.x, pos.z).await?;

        let lx = x.rem_euclid(CHUNK_SIZE as i32) as usize;
        let lz = z.rem_euclid(CHUNK_SIZE as i32) as usize;
        chunk.write().set_block(lx, y as usize, lz, id);
        Ok(())
    }

    fn send(&mut self, packet: AnyPacket) -> anyhow::Result<()> {
        self.enc.append_packet(&packet)?;
        Ok(())
    }

    async fn flush(&mut self) -> anyhow::Result<()> {
        if !self.enc.is_empty() {
            let bytes = self.enc.take();
            self.stream.write_all(&bytes).await?;
        }
        Ok(())
    }
}

/// Reads until the decoder yields a packet. `Ok(None)` on a clean EOF.
async fn next_packet(
    dec: &mut PacketDecoder,
    stream: &mut TcpStream,
) -> anyhow::Result<Option<AnyPacket>> {
    loop {
        if let Some(packet) = dec.try_next_packet()? {
            return Ok(Some(packet));
        }

        dec.reserve(READ_BUF_SIZE);
        let mut buf = dec.take_capacity();
        if stream.read_buf(&mut buf).await? == 0 {
            return Ok(None);
        }

        dec.queue_bytes(buf);
    }
}

/// The block column a placement lands in, given the face it was placed
/// against.
fn offset_by_face(x: i32, y: i32, z: i32, face: u8) -> (i32, i32, i32) {
    match face {
        0 => (x, y - 1, z),
        1 => (x, y + 1, z),
        2 => (x, y, z - 1),
        3 => (x, y, z + 1),
        4 => (x - 1, y, z),
        _ => (x + 1, y, z),
    }
}
