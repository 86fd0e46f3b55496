//! The `transcript` command-line front end and HTTP API.
pub mod cli;
pub mod platform;
pub mod server;
