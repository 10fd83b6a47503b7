//! Integration tests for the Learnly platform.
//!
//! These tests exercise the auth and purchase services against a real
//! `PostgreSQL` database, covering the paths unit tests cannot reach:
//! unique-constraint races, transactional rollback, and the
//! registration/activation lifecycle end to end.
//!
//! # Running Tests
//!
//! The tests are `#[ignore]`d by default because they need a live
//! database. Point `DATABASE_URL` at a disposable test database and run:
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/learnly_test \
//!     cargo test -p learnly-integration-tests -- --ignored
//! ```
//!
//! Migrations are applied automatically on first connect.
