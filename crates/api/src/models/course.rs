//! Course domain type.
//!
//! Courses are authored elsewhere; the API only needs the fields the
//! purchase flow reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use learnly_core::{CourseId, Price};

/// A purchasable course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    /// Unique course ID.
    pub id: CourseId,
    /// Course title.
    pub name: String,
    /// Purchase price.
    pub price: Price,
    /// Number of completed purchases.
    pub purchased_count: i32,
    /// When the course was created.
    pub created_at: DateTime<Utc>,
}
