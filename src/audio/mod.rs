//! Audio format plumbing between the browser and the upstream realtime API.

pub mod framing;
pub mod transcode;
