//! Serde helpers for configuration types.

pub mod chain_map;
pub mod duration;
