//! Heave telemetry service: sensor sources, the broadcast loop and the
//! WebSocket server around `heave-core`.

pub mod cli;
pub mod config;
pub mod pump;
pub mod server;
pub mod sink;
pub mod source;
