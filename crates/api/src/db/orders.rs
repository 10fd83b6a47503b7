//! Order repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use learnly_core::{CourseId, OrderId, UserId};

use super::{RepositoryError, map_unique_violation};
use crate::models::Order;

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    course_id: i32,
    payment_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(r: OrderRow) -> Self {
        Self {
            id: OrderId::new(r.id),
            user_id: UserId::new(r.user_id),
            course_id: CourseId::new(r.course_id),
            payment_id: r.payment_id,
            created_at: r.created_at,
        }
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a completed purchase: the order row, the ownership row,
    /// and the course purchase counter commit in one transaction, so a
    /// losing concurrent duplicate leaves nothing behind.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already owns the
    /// course, `RepositoryError::NotFound` if the course vanished, and
    /// `RepositoryError::Database` for other failures.
    pub async fn record_purchase(
        &self,
        user_id: UserId,
        course_id: CourseId,
        payment_id: &str,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(
            "INSERT INTO learnly.\"order\" (user_id, course_id, payment_id) \
             VALUES ($1, $2, $3) \
             RETURNING id, user_id, course_id, payment_id, created_at",
        )
        .bind(user_id.as_i32())
        .bind(course_id.as_i32())
        .bind(payment_id)
        .fetch_one(&mut *tx)
        .await?;

        // The (user_id, course_id) primary key is the duplicate guard.
        sqlx::query("INSERT INTO learnly.user_course (user_id, course_id) VALUES ($1, $2)")
            .bind(user_id.as_i32())
            .bind(course_id.as_i32())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(e, "purchase"))?;

        let result = sqlx::query(
            "UPDATE learnly.course SET purchased_count = purchased_count + 1 WHERE id = $1",
        )
        .bind(course_id.as_i32())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;

        Ok(row.into())
    }
}
