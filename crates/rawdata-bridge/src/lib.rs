//! Raw frame observer bridge.
//!
//! This crate sits between a real-time media engine's audio/video frame
//! callbacks and an embedding application. Audio is passed through untouched;
//! externally-sourced video textures are re-rendered on a dedicated GPU worker
//! into a plain 2D texture with an identity sampling transform.

pub mod bridge;
pub mod config;
pub mod coords;
pub mod engine;
pub mod frame;
pub mod gpu;
pub mod logging;
pub mod normalizer;

pub use bridge::{MethodCall, MethodResult, RawDataBridge};
pub use config::BridgeConfig;
pub use engine::{EngineHandle, EngineProvider, MediaEngine, SingleEngine};
pub use logging::{LoggingConfig, init_logging};
pub use normalizer::{ConvertError, VideoNormalizer};
