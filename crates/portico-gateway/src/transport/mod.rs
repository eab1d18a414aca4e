//! Transport layer.
//!
//! Exposes the listening socket setup, the WebSocket upgrade handler and
//! session loop, and the frame classifier that feeds the envelope decoder.

pub mod codec;
pub mod socket;
pub mod ws;
