//! Order domain type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use learnly_core::{CourseId, OrderId, UserId};

/// A completed course purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// Purchasing user.
    pub user_id: UserId,
    /// Purchased course.
    pub course_id: CourseId,
    /// Payment intent id from the payment gateway, when one was used.
    pub payment_id: Option<String>,
    /// When the order was recorded.
    pub created_at: DateTime<Utc>,
}
