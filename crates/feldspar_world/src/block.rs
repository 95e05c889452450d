//! The block ids the server itself needs to know about. Everything else is
//! opaque payload carried for the client.

pub const AIR: u8 = 0;
pub const STONE: u8 = 1;
pub const GRASS: u8 = 2;
pub const DIRT: u8 = 3;
pub const COBBLESTONE: u8 = 4;
pub const WOOD: u8 = 5;
pub const SAPLING: u8 = 6;
pub const BEDROCK: u8 = 7;
/// Flowing water.
pub const WATER: u8 = 8;
/// A still water source.
pub const SPRING: u8 = 9;
/// Flowing lava.
pub const LAVA: u8 = 10;
/// A still lava source.
pub const LAVA_SPRING: u8 = 11;
pub const SAND: u8 = 12;
pub const GRAVEL: u8 = 13;
pub const GOLD_ORE: u8 = 14;
pub const IRON_ORE: u8 = 15;
pub const COAL_ORE: u8 = 16;
pub const LOG: u8 = 17;
pub const LEAVES: u8 = 18;
pub const SNOW: u8 = 78;
pub const ICE: u8 = 79;
pub const CLAY: u8 = 82;
