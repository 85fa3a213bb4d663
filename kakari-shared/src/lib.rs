//! # Kakari Shared Library
//!
//! Domain types, persistence and business services behind the Kakari API.
//!
//! ## Module Organization
//!
//! - `auth`: Password hashing, JWTs, reset tokens, authorization, middleware
//! - `db`: PostgreSQL pool and migrations
//! - `error`: Service error type
//! - `models`: Data models and their SQL
//! - `services`: User, task and project directories, mail transports
//! - `storage`: Storage trait with PostgreSQL and in-memory backends

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

/// Current version of the Kakari shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
