//! # curalink-server
//!
//! HTTP server for the CuraLink authentication service. Loads
//! configuration, wires the auth pipeline over the chosen storage
//! backend, and serves the auth endpoints with health checks.

pub mod bootstrap;
pub mod config;
pub mod handlers;
pub mod observability;
pub mod server;

pub use server::{CuralinkServer, ServerBuilder, build_app};
