//! Configuration, shared state, and the HTTP server

mod config;
mod server;
mod state;

pub use config::Config;
pub use server::{build_router, Server};
pub use state::ServerState;
