//! # tablewire-server
//!
//! HTTP server for tablewire.
//!
//! This crate provides:
//! - HTTP/1 connection handling with async I/O
//! - Table request decoding from query strings, form bodies and JSON bodies
//! - Dispatch to a [`tablewire_store::TableService`]
//! - YAML and environment configuration

pub mod config;
pub mod error;
pub mod handler;
pub mod server;

pub use config::{Config, ConfigError, NetworkConfig, TableConfig, HEALTH_PATH};
pub use error::ServerError;
pub use handler::{ServerStats, TableHandler};
pub use server::Server;
