//! Domain models.
//!
//! These types represent validated domain objects separate from database
//! row types. The [`user::User`] struct doubles as the session-cache
//! snapshot, so it carries no password hash.

pub mod course;
pub mod order;
pub mod user;

pub use course::Course;
pub use order::Order;
pub use user::{Avatar, PendingUser, User};
