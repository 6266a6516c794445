//! Domain layer: pure types shared by the sampling pipeline and the network
//! side.  Nothing in this module performs I/O or depends on a framework.

pub mod config;
pub mod keys;

pub use config::BridgeConfig;
pub use keys::{ActiveKey, KeyId, KeySample, KEY_TABLE_SIZE};
