//! Top-level facade crate for reqlens.
//!
//! Re-exports the lifecycle core and the axum adapter so users can depend on a single crate.

pub mod core {
    pub use reqlens_core::*;
}

pub mod http {
    pub use reqlens_http::*;
}
