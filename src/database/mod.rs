//! # Database Operations
//!
//! Persistence for the reconciliation engine.
//!
//! - [`repository`] - the [`Repository`] trait every store implements
//! - [`postgres`] - `sqlx`/PostgreSQL implementation used in production
//! - [`memory`] - in-process implementation with failure injection, for tests and dry runs
//! - [`connection`] / [`migrations`] - pool set-up and embedded schema migrations

pub mod connection;
pub mod memory;
pub mod migrations;
pub mod postgres;
pub mod repository;

pub use connection::DatabaseConnection;
pub use memory::{InMemoryRepository, LedgerWrite};
pub use migrations::DatabaseMigrations;
pub use postgres::PgRepository;
pub use repository::Repository;
