//! Web upload surface
//!
//! Serves an upload form and converts posted `.sav` files to `.xlsx`.
//! Run with `sav2xlsx-server`.

pub mod handlers;
pub mod server;

pub use server::{build_router, run_server, AppState, ServerConfig};
