//! Top-level facade crate for Portico.
//!
//! Re-exports core types and the gateway library so users can depend on a single crate.

pub mod core {
    pub use portico_core::*;
}

pub mod gateway {
    pub use portico_gateway::*;
}
