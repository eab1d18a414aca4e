//! Dispatcher module exports.
//!
//! Re-exports the dispatcher and handler trait so endpoint definitions can
//! depend on this module directly.

pub mod dispatcher;

pub use dispatcher::{handler_fn, Dispatcher, MessageHandler};
