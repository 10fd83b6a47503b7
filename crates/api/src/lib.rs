//! Learnly API - e-learning backend library.
//!
//! The binary in `main.rs` wires this together; the modules are exposed
//! so integration tests can drive the services against a real database.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
