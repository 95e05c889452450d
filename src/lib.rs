#![doc = include_str!("../README.md")]

pub mod config;
pub mod network;
pub mod session;
pub mod terrain;
pub mod web;

pub use feldspar_protocol as protocol;
pub use feldspar_world as world;
