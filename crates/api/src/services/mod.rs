//! Business logic services.

pub mod auth;
pub mod email;
pub mod media;
pub mod payments;
pub mod session;
pub mod tokens;
