//! Portico core: transport-agnostic protocol primitives, tokens, flags, and errors.
//!
//! This crate defines the wire-level contracts, the token signing domains, and
//! the error surface shared by the gateway and its endpoint collaborators. It
//! carries no transport or runtime dependencies so it can be reused by tools
//! that only need to mint tokens or decode envelopes.
//!
//! # Panic policy
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths surface as `GatewayError`/`Result` so a malformed frame
//! or forged token never takes the process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod auth;
pub mod error;
pub mod flags;
pub mod protocol;

/// Shared result type.
pub use error::{GatewayError, Result};
pub use flags::{RoleFlags, SkipFlags};
