//! Serde helpers for the configuration.

pub mod duration;
pub mod hash_map;
