//! One struct per packet tag, plus the [`AnyPacket`] registry.
//!
//! The schema set is closed, so each packet's parse and build bodies are
//! written by hand against the primitive impls; the `record!` helper covers
//! the common case of a record that is nothing but fields in wire order.
//! There is no framing envelope: a packet's tag decides how many bytes it
//! occupies.

use crate::error::SchemaMismatch;
use crate::{Blob, Decode, Encode, Error, Packet, Result};

/// Generates [`Encode`] and [`Decode`] for a record whose wire form is its
/// fields in declaration order.
macro_rules! record {
    ($name:ident { $($field:ident),* $(,)? }) => {
        impl Encode for $name {
            fn encode(&self, w: &mut Vec<u8>) -> Result<()> {
                $(self.$field.encode(w)?;)*
                Ok(())
            }
        }

        impl<'a> Decode<'a> for $name {
            fn decode(r: &mut &'a [u8]) -> Result<Self> {
                Ok(Self {
                    $($field: Decode::decode(r)?,)*
                })
            }
        }
    };
}

// ── Nested records ───────────────────────────────────────────────────────────

/// Absolute player position. `stance` is the eye offset the client reports
/// between `y` and `z`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub stance: f64,
    pub z: f64,
}

record!(Position { x, y, stance, z });

/// Absolute player orientation.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Look {
    pub rotation: f32,
    pub pitch: f32,
}

record!(Look { rotation, pitch });

/// One window slot of an inventory sync. The id `0xffff` marks an empty
/// slot, in which case the count and damage fields are absent from the wire.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Slot {
    #[default]
    Empty,
    Item { id: u16, count: u8, damage: u16 },
}

const EMPTY_SLOT: u16 = 0xffff;

impl Encode for Slot {
    fn encode(&self, w: &mut Vec<u8>) -> Result<()> {
        match *self {
            Slot::Empty => EMPTY_SLOT.encode(w),
            Slot::Item { id, count, damage } => {
                if id == EMPTY_SLOT {
                    return Err(SchemaMismatch::ReservedSlotId(id).into());
                }

                id.encode(w)?;
                count.encode(w)?;
                damage.encode(w)
            }
        }
    }
}

impl Decode<'_> for Slot {
    fn decode(r: &mut &[u8]) -> Result<Self> {
        let id = u16::decode(r)?;
        if id == EMPTY_SLOT {
            return Ok(Slot::Empty);
        }

        Ok(Slot::Item {
            id,
            count: u8::decode(r)?,
            damage: u16::decode(r)?,
        })
    }
}

/// Encodes `items` behind a u16 element count.
fn encode_counted<T: Encode>(items: &[T], w: &mut Vec<u8>) -> Result<()> {
    let len = items.len();
    let Ok(count) = u16::try_from(len) else {
        return Err(SchemaMismatch::ArrayTooLong(len).into());
    };

    count.encode(w)?;
    for item in items {
        item.encode(w)?;
    }

    Ok(())
}

/// Decodes exactly `len` elements.
fn decode_n<'a, T: Decode<'a>>(r: &mut &'a [u8], len: usize) -> Result<Vec<T>> {
    let mut items = Vec::with_capacity(len);
    for _ in 0..len {
        items.push(T::decode(r)?);
    }

    Ok(items)
}

// ── Packets ──────────────────────────────────────────────────────────────────

/// Keep-alive (tag 0). No payload.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Ping;

impl Encode for Ping {
    fn encode(&self, _w: &mut Vec<u8>) -> Result<()> {
        Ok(())
    }
}

impl Decode<'_> for Ping {
    fn decode(_r: &mut &[u8]) -> Result<Self> {
        Ok(Ping)
    }
}

/// Login request/response (tag 1). The server's reply reuses the `protocol`
/// field to carry the assigned entity id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Login {
    pub protocol: u32,
    pub username: String,
    pub unused: String,
}

record!(Login { protocol, username, unused });

/// Pre-login handshake (tag 2).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Handshake {
    pub username: String,
}

record!(Handshake { username });

/// Chat message (tag 3).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Chat {
    pub message: String,
}

record!(Chat { message });

/// World time broadcast (tag 4).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TimeUpdate {
    pub timestamp: u64,
}

record!(TimeUpdate { timestamp });

/// Full window sync (tag 5). Each slot is a conditional sub-record; see
/// [`Slot`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InventorySync {
    pub window: u32,
    pub slots: Vec<Slot>,
}

impl Encode for InventorySync {
    fn encode(&self, w: &mut Vec<u8>) -> Result<()> {
        self.window.encode(w)?;
        encode_counted(&self.slots, w)
    }
}

impl Decode<'_> for InventorySync {
    fn decode(r: &mut &[u8]) -> Result<Self> {
        let window = u32::decode(r)?;
        let len = u16::decode(r)? as usize;
        Ok(Self {
            window,
            slots: decode_n(r, len)?,
        })
    }
}

/// Spawn point announcement (tag 6).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SpawnPosition {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

record!(SpawnPosition { x, y, z });

/// Ground flag on its own (tag 10).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Flying {
    pub flying: bool,
}

record!(Flying { flying });

/// Player position update (tag 11).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PlayerPosition {
    pub position: Position,
    pub flying: bool,
}

record!(PlayerPosition { position, flying });

/// Player look update (tag 12).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PlayerLook {
    pub look: Look,
    pub flying: bool,
}

record!(PlayerLook { look, flying });

/// Combined position and look update (tag 13).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PlayerPositionLook {
    pub position: Position,
    pub look: Look,
    pub flying: bool,
}

record!(PlayerPositionLook { position, look, flying });

/// Digging progress (tag 14).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Digging {
    pub state: u8,
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub face: u8,
}

record!(Digging { state, x, y, z, face });

/// Block placement (tag 15).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Build {
    pub block: u16,
    pub x: u32,
    pub y: u8,
    pub z: u32,
    pub face: u8,
}

record!(Build { block, x, y, z, face });

/// Held-item switch (tag 16).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemSwitch {
    pub a: u32,
    pub b: u16,
}

record!(ItemSwitch { a, b });

/// Single inventory slot update (tag 17).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct InventorySlot {
    pub kind: u16,
    pub quantity: u8,
    pub wear: u16,
}

record!(InventorySlot { kind, quantity, wear });

// Tags 18-24, 34, 53 and 59 are wire-level passthrough: the server decodes
// and re-emits them but never interprets a field. Names follow their
// conventional Alpha roles.

/// Arm animation (tag 18).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ArmSwing {
    pub entity: u32,
    pub animation: u8,
}

record!(ArmSwing { entity, animation });

/// Named entity spawn (tag 20).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NamedEntitySpawn {
    pub entity: u32,
    pub name: String,
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub rotation: u8,
    pub pitch: u8,
    pub item: u16,
}

record!(NamedEntitySpawn { entity, name, x, y, z, rotation, pitch, item });

/// Dropped item spawn (tag 21).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PickupSpawn {
    pub entity: u32,
    pub item: u16,
    pub count: u8,
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub rotation: u8,
    pub pitch: u8,
    pub roll: u8,
}

record!(PickupSpawn { entity, item, count, x, y, z, rotation, pitch, roll });

/// Item collection (tag 22).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectItem {
    pub item: u32,
    pub collector: u32,
}

record!(CollectItem { item, collector });

/// Non-mob object spawn (tag 23).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectSpawn {
    pub entity: u32,
    pub kind: u8,
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

record!(ObjectSpawn { entity, kind, x, y, z });

/// Mob spawn (tag 24).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MobSpawn {
    pub entity: u32,
    pub kind: u8,
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub rotation: u8,
    pub pitch: u8,
}

record!(MobSpawn { entity, kind, x, y, z, rotation, pitch });

/// Entity removal (tag 29).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DestroyEntity {
    pub entity: u32,
}

record!(DestroyEntity { entity });

/// Bare entity announcement (tag 30).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityInit {
    pub entity: u32,
}

record!(EntityInit { entity });

/// Relative entity move (tag 31).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityMove {
    pub entity: u32,
    pub dx: u8,
    pub dy: u8,
    pub dz: u8,
}

record!(EntityMove { entity, dx, dy, dz });

/// Entity look change (tag 32).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityLook {
    pub entity: u32,
    pub rotation: u8,
    pub pitch: u8,
}

record!(EntityLook { entity, rotation, pitch });

/// Combined relative move and look (tag 33).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityMoveLook {
    pub entity: u32,
    pub dx: u8,
    pub dy: u8,
    pub dz: u8,
    pub rotation: u8,
    pub pitch: u8,
}

record!(EntityMoveLook { entity, dx, dy, dz, rotation, pitch });

/// Absolute entity teleport (tag 34).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityTeleport {
    pub entity: u32,
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub rotation: u8,
    pub pitch: u8,
}

record!(EntityTeleport { entity, x, y, z, rotation, pitch });

/// Chunk enable/forget toggle (tag 50).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkEnable {
    pub x: i32,
    pub z: i32,
    pub enabled: bool,
}

record!(ChunkEnable { x, z, enabled });

/// Chunk payload (tag 51). `data` is the deflate-compressed voxel arrays for
/// the described box.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkData {
    pub x: i32,
    pub y: u16,
    pub z: i32,
    pub x_size: u8,
    pub y_size: u8,
    pub z_size: u8,
    pub data: Blob,
}

record!(ChunkData { x, y, z, x_size, y_size, z_size, data });

/// Batched block changes within one chunk (tag 52). The three arrays are
/// parallel and share a single u16 count.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultiBlockChange {
    pub x: u32,
    pub z: u32,
    pub coords: Vec<u16>,
    pub kinds: Vec<u8>,
    pub metadata: Vec<u8>,
}

impl Encode for MultiBlockChange {
    fn encode(&self, w: &mut Vec<u8>) -> Result<()> {
        self.x.encode(w)?;
        self.z.encode(w)?;

        let len = self.coords.len();
        if self.kinds.len() != len {
            return Err(SchemaMismatch::CountMismatch(len, self.kinds.len()).into());
        }
        if self.metadata.len() != len {
            return Err(SchemaMismatch::CountMismatch(len, self.metadata.len()).into());
        }
        let Ok(count) = u16::try_from(len) else {
            return Err(SchemaMismatch::ArrayTooLong(len).into());
        };

        count.encode(w)?;
        for coord in &self.coords {
            coord.encode(w)?;
        }
        w.extend_from_slice(&self.kinds);
        w.extend_from_slice(&self.metadata);
        Ok(())
    }
}

impl Decode<'_> for MultiBlockChange {
    fn decode(r: &mut &[u8]) -> Result<Self> {
        let x = u32::decode(r)?;
        let z = u32::decode(r)?;
        let len = u16::decode(r)? as usize;
        Ok(Self {
            x,
            z,
            coords: decode_n(r, len)?,
            kinds: decode_n(r, len)?,
            metadata: decode_n(r, len)?,
        })
    }
}

/// Single block change (tag 53).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockChange {
    pub x: u32,
    pub y: u8,
    pub z: u32,
    pub kind: u8,
    pub metadata: u8,
}

record!(BlockChange { x, y, z, kind, metadata });

/// Tile entity payload (tag 59).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TileUpdate {
    pub x: u32,
    pub y: u16,
    pub z: u32,
    pub payload: Vec<u8>,
}

impl Encode for TileUpdate {
    fn encode(&self, w: &mut Vec<u8>) -> Result<()> {
        self.x.encode(w)?;
        self.y.encode(w)?;
        self.z.encode(w)?;
        encode_counted(&self.payload, w)
    }
}

impl Decode<'_> for TileUpdate {
    fn decode(r: &mut &[u8]) -> Result<Self> {
        let x = u32::decode(r)?;
        let y = u16::decode(r)?;
        let z = u32::decode(r)?;
        let len = u16::decode(r)? as usize;
        Ok(Self {
            x,
            y,
            z,
            payload: decode_n(r, len)?,
        })
    }
}

/// Error notice sent before a clean close (tag 255).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Disconnect {
    pub message: String,
}

record!(Disconnect { message });

// ── Registry ─────────────────────────────────────────────────────────────────

macro_rules! packets {
    ($($tag:literal => $packet:ident),* $(,)?) => {
        $(
            impl Packet for $packet {
                const TAG: u8 = $tag;
                const NAME: &'static str = stringify!($packet);
            }

            impl From<$packet> for AnyPacket {
                fn from(p: $packet) -> Self {
                    AnyPacket::$packet(p)
                }
            }
        )*

        /// Every packet the registry knows, keyed by its wire tag.
        #[derive(Clone, Debug, PartialEq)]
        pub enum AnyPacket {
            $($packet($packet),)*
        }

        impl AnyPacket {
            /// The wire tag of this packet.
            pub fn tag(&self) -> u8 {
                match self {
                    $(AnyPacket::$packet(_) => $packet::TAG,)*
                }
            }

            /// The schema name of this packet, for diagnostics.
            pub fn name(&self) -> &'static str {
                match self {
                    $(AnyPacket::$packet(_) => $packet::NAME,)*
                }
            }

            /// Whether `tag` names a registered packet.
            pub fn is_registered(tag: u8) -> bool {
                matches!(tag, $($tag)|*)
            }

            /// Decodes the body of the packet identified by `tag`, advancing
            /// `r` past exactly the bytes the schema requires. An unknown tag
            /// is reported at offset zero; stream-level callers rewrite the
            /// offset to the absolute stream position.
            pub fn decode_body<'a>(tag: u8, r: &mut &'a [u8]) -> Result<Self> {
                match tag {
                    $($tag => Ok(AnyPacket::$packet(<$packet>::decode(r)?)),)*
                    other => Err(Error::UnknownPacket {
                        tag: other,
                        offset: 0,
                    }),
                }
            }

            /// Encodes the body without the leading tag byte.
            pub fn encode_body(&self, w: &mut Vec<u8>) -> Result<()> {
                match self {
                    $(AnyPacket::$packet(p) => p.encode(w),)*
                }
            }

            /// Encodes the tag byte followed by the body.
            pub fn encode(&self, w: &mut Vec<u8>) -> Result<()> {
                let start = w.len();
                w.push(self.tag());
                let res = self.encode_body(w);
                if res.is_err() {
                    w.truncate(start);
                }
                res
            }
        }
    };
}

packets! {
    0 => Ping,
    1 => Login,
    2 => Handshake,
    3 => Chat,
    4 => TimeUpdate,
    5 => InventorySync,
    6 => SpawnPosition,
    10 => Flying,
    11 => PlayerPosition,
    12 => PlayerLook,
    13 => PlayerPositionLook,
    14 => Digging,
    15 => Build,
    16 => ItemSwitch,
    17 => InventorySlot,
    18 => ArmSwing,
    20 => NamedEntitySpawn,
    21 => PickupSpawn,
    22 => CollectItem,
    23 => ObjectSpawn,
    24 => MobSpawn,
    29 => DestroyEntity,
    30 => EntityInit,
    31 => EntityMove,
    32 => EntityLook,
    33 => EntityMoveLook,
    34 => EntityTeleport,
    50 => ChunkEnable,
    51 => ChunkData,
    52 => MultiBlockChange,
    53 => BlockChange,
    59 => TileUpdate,
    255 => Disconnect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn round_trip(packet: AnyPacket) {
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        assert_eq!(buf[0], packet.tag());

        let mut r = &buf[1..];
        let decoded = AnyPacket::decode_body(packet.tag(), &mut r).unwrap();
        assert!(r.is_empty(), "{} left {} bytes", packet.name(), r.len());
        assert_eq!(decoded, packet);
    }

    #[test]
    fn ping_builds_to_its_bare_tag() {
        let mut buf = Vec::new();
        AnyPacket::Ping(Ping).encode(&mut buf).unwrap();
        assert_eq!(buf, [0x00]);
    }

    #[test]
    fn handshake_parses_from_literal_bytes() {
        let bytes = [0x02, 0x00, 0x05, 0x41, 0x6c, 0x69, 0x63, 0x65];
        let mut r = &bytes[1..];
        let packet = AnyPacket::decode_body(bytes[0], &mut r).unwrap();

        assert_eq!(
            packet,
            AnyPacket::Handshake(Handshake {
                username: "Alice".into()
            })
        );
        assert!(r.is_empty());
    }

    #[test]
    fn every_tag_round_trips() {
        round_trip(Ping.into());
        round_trip(
            Login {
                protocol: 2,
                username: "alice".into(),
                unused: String::new(),
            }
            .into(),
        );
        round_trip(
            Handshake {
                username: "böb".into(),
            }
            .into(),
        );
        round_trip(
            Chat {
                message: "hello, world".into(),
            }
            .into(),
        );
        round_trip(
            TimeUpdate {
                timestamp: u64::MAX,
            }
            .into(),
        );
        round_trip(
            InventorySync {
                window: 0,
                slots: vec![
                    Slot::Item {
                        id: 1,
                        count: 64,
                        damage: 0,
                    },
                    Slot::Empty,
                    Slot::Item {
                        id: 277,
                        count: 1,
                        damage: 12,
                    },
                ],
            }
            .into(),
        );
        round_trip(SpawnPosition { x: 0, y: 64, z: 0 }.into());
        round_trip(Flying { flying: true }.into());
        round_trip(
            PlayerPosition {
                position: Position {
                    x: 8.5,
                    y: 65.0,
                    stance: 66.62,
                    z: -3.0,
                },
                flying: false,
            }
            .into(),
        );
        round_trip(
            PlayerLook {
                look: Look {
                    rotation: 90.0,
                    pitch: -12.5,
                },
                flying: true,
            }
            .into(),
        );
        round_trip(
            PlayerPositionLook {
                position: Position::default(),
                look: Look::default(),
                flying: false,
            }
            .into(),
        );
        round_trip(
            Digging {
                state: 3,
                x: 10,
                y: 64,
                z: 10,
                face: 1,
            }
            .into(),
        );
        round_trip(
            Build {
                block: 4,
                x: 10,
                y: 64,
                z: 10,
                face: 1,
            }
            .into(),
        );
        round_trip(ItemSwitch { a: 0, b: 3 }.into());
        round_trip(
            InventorySlot {
                kind: 277,
                quantity: 1,
                wear: 55,
            }
            .into(),
        );
        round_trip(
            ArmSwing {
                entity: 9,
                animation: 1,
            }
            .into(),
        );
        round_trip(
            NamedEntitySpawn {
                entity: 9,
                name: "alice".into(),
                x: 256,
                y: 2080,
                z: 512,
                rotation: 0,
                pitch: 0,
                item: 0,
            }
            .into(),
        );
        round_trip(
            PickupSpawn {
                entity: 10,
                item: 4,
                count: 3,
                x: 256,
                y: 2080,
                z: 512,
                rotation: 1,
                pitch: 2,
                roll: 3,
            }
            .into(),
        );
        round_trip(
            CollectItem {
                item: 10,
                collector: 9,
            }
            .into(),
        );
        round_trip(
            ObjectSpawn {
                entity: 11,
                kind: 1,
                x: 0,
                y: 0,
                z: 0,
            }
            .into(),
        );
        round_trip(
            MobSpawn {
                entity: 12,
                kind: 90,
                x: 1,
                y: 2,
                z: 3,
                rotation: 4,
                pitch: 5,
            }
            .into(),
        );
        round_trip(DestroyEntity { entity: 12 }.into());
        round_trip(EntityInit { entity: 13 }.into());
        round_trip(
            EntityMove {
                entity: 13,
                dx: 1,
                dy: 0,
                dz: 255,
            }
            .into(),
        );
        round_trip(
            EntityLook {
                entity: 13,
                rotation: 128,
                pitch: 64,
            }
            .into(),
        );
        round_trip(
            EntityMoveLook {
                entity: 13,
                dx: 1,
                dy: 2,
                dz: 3,
                rotation: 4,
                pitch: 5,
            }
            .into(),
        );
        round_trip(
            EntityTeleport {
                entity: 13,
                x: 32,
                y: 2048,
                z: 32,
                rotation: 0,
                pitch: 0,
            }
            .into(),
        );
        round_trip(
            ChunkEnable {
                x: -1,
                z: 70,
                enabled: true,
            }
            .into(),
        );
        round_trip(
            ChunkData {
                x: -1,
                y: 0,
                z: 70,
                x_size: 15,
                y_size: 127,
                z_size: 15,
                data: Blob(vec![0xde, 0xad, 0xbe, 0xef]),
            }
            .into(),
        );
        round_trip(
            MultiBlockChange {
                x: 0,
                z: 0,
                coords: vec![0x0123, 0x4567],
                kinds: vec![1, 4],
                metadata: vec![0, 0],
            }
            .into(),
        );
        round_trip(
            BlockChange {
                x: 10,
                y: 64,
                z: 10,
                kind: 4,
                metadata: 0,
            }
            .into(),
        );
        round_trip(
            TileUpdate {
                x: 10,
                y: 64,
                z: 10,
                payload: vec![1, 2, 3],
            }
            .into(),
        );
        round_trip(
            Disconnect {
                message: "bye".into(),
            }
            .into(),
        );
    }

    #[test]
    fn counted_arrays_may_be_empty() {
        round_trip(
            InventorySync {
                window: 1,
                slots: Vec::new(),
            }
            .into(),
        );
        round_trip(MultiBlockChange::default().into());
        round_trip(TileUpdate::default().into());
    }

    #[test]
    fn conditional_slot_skips_absent_fields() {
        let sync = InventorySync {
            window: 0,
            slots: vec![Slot::Empty, Slot::Empty],
        };

        let mut buf = Vec::new();
        sync.encode(&mut buf).unwrap();
        // 4 window + 2 count + two bare sentinels, nothing else.
        assert_eq!(buf.len(), 4 + 2 + 2 * 2);
    }

    #[test]
    fn occupied_slot_rejects_the_sentinel_id() {
        let slot = Slot::Item {
            id: EMPTY_SLOT,
            count: 1,
            damage: 0,
        };

        let mut buf = Vec::new();
        assert_eq!(
            slot.encode(&mut buf),
            Err(SchemaMismatch::ReservedSlotId(EMPTY_SLOT).into())
        );
    }

    #[test]
    fn parallel_arrays_must_agree_on_length() {
        let batch = MultiBlockChange {
            x: 0,
            z: 0,
            coords: vec![1, 2],
            kinds: vec![1],
            metadata: vec![0, 0],
        };

        let mut buf = Vec::new();
        assert_eq!(
            batch.encode(&mut buf),
            Err(SchemaMismatch::CountMismatch(2, 1).into())
        );
    }

    #[test]
    fn failed_encode_leaves_no_partial_bytes() {
        let mut buf = vec![0xaa];
        let bad: AnyPacket = MultiBlockChange {
            x: 0,
            z: 0,
            coords: vec![1],
            kinds: Vec::new(),
            metadata: Vec::new(),
        }
        .into();

        assert!(bad.encode(&mut buf).is_err());
        assert_eq!(buf, [0xaa]);
    }

    #[test]
    fn unregistered_tags_are_rejected() {
        for tag in [7, 8, 9, 19, 54, 254] {
            assert!(!AnyPacket::is_registered(tag));
            let mut r: &[u8] = &[];
            assert_eq!(
                AnyPacket::decode_body(tag, &mut r),
                Err(Error::UnknownPacket { tag, offset: 0 })
            );
        }
    }
}
