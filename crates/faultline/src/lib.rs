//! Top-level facade crate for faultline.
//!
//! Re-exports core types and the server library so users can depend on a single crate.

pub mod core {
    pub use faultline_core::*;
}

pub mod server {
    pub use faultline_server::*;
}
