//! Interview session coordination: the two WebSocket channels, the realtime
//! session behind them, and the stores they share.

pub mod audio_ws;
pub mod documents;
pub mod events;
pub mod instructions;
pub mod manager;
pub mod orchestrator;
pub mod remux;
pub mod rendezvous;
pub mod report;
pub mod status;
pub mod transcript;
pub mod video_ws;
