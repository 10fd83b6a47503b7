//! Course repository.
//!
//! Course authoring lives elsewhere; the API reads courses for the
//! purchase flow. The purchase counter is maintained inside the order
//! transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use learnly_core::{CourseId, CurrencyCode, Price};

use super::RepositoryError;
use crate::models::Course;

#[derive(sqlx::FromRow)]
struct CourseRow {
    id: i32,
    name: String,
    price_amount: Decimal,
    price_currency: String,
    purchased_count: i32,
    created_at: DateTime<Utc>,
}

impl CourseRow {
    fn into_course(self) -> Result<Course, RepositoryError> {
        let currency: CurrencyCode = self.price_currency.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid currency in database: {e}"))
        })?;

        Ok(Course {
            id: CourseId::new(self.id),
            name: self.name,
            price: Price::new(self.price_amount, currency),
            purchased_count: self.purchased_count,
            created_at: self.created_at,
        })
    }
}

/// Repository for course database operations.
pub struct CourseRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CourseRepository<'a> {
    /// Create a new course repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a course by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: CourseId) -> Result<Option<Course>, RepositoryError> {
        let row = sqlx::query_as::<_, CourseRow>(
            "SELECT id, name, price_amount, price_currency, purchased_count, created_at \
             FROM learnly.course WHERE id = $1",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(CourseRow::into_course).transpose()
    }
}
