//! The persisted player entity.

use valence_nbt::{compound, Compound, List, Value};

use crate::tag;

/// Player state the store materialises from and persists to
/// `players/<username>.dat`.
#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub username: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Eye offset the client reports alongside the position.
    pub stance: f64,
    pub rotation: f32,
    pub pitch: f32,
    pub on_ground: bool,
}

impl Player {
    pub fn to_tag(&self) -> Compound {
        compound! {
            "Pos" => List::Double(vec![self.x, self.y, self.z]),
            "Stance" => self.stance,
            "Rotation" => List::Float(vec![self.rotation, self.pitch]),
            "OnGround" => i8::from(self.on_ground),
        }
    }

    /// Applies whatever usable fields `root` carries, keeping the fresh-spawn
    /// values for the rest.
    pub fn load_from_tag(&mut self, root: &Compound) {
        if let Some(Value::List(List::Double(pos))) = root.get("Pos") {
            if let [x, y, z] = pos[..] {
                self.x = x;
                self.y = y;
                self.z = z;
            }
        }
        if let Some(stance) = tag::double(root, "Stance") {
            self.stance = stance;
        }
        if let Some(Value::List(List::Float(rot))) = root.get("Rotation") {
            if let [rotation, pitch] = rot[..] {
                self.rotation = rotation;
                self.pitch = pitch;
            }
        }
        if let Some(on_ground) = tag::byte(root, "OnGround") {
            self.on_ground = on_ground != 0;
        }
    }
}
