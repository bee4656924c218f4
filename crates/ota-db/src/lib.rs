// SPDX-License-Identifier: MIT OR Apache-2.0
//! Transactional Postgres metadata store (C3).
//!
//! Every state-changing call that touches more than one row runs inside a
//! single [`sqlx::Transaction`]. Query functions return [`ota_error::OtaError`]
//! directly so callers never have to translate a second error type.
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod applications;
pub mod devices;
pub mod uploads;
pub mod users;

pub use sqlx::{PgPool, Postgres, Transaction};

use ota_error::{ErrorCode, OtaError};

/// Embedded migrations, run via [`run_migrations`].
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Connect to Postgres and verify connectivity with a single round trip.
pub async fn connect(database_url: &str) -> Result<PgPool, OtaError> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|e| {
            OtaError::new(ErrorCode::DatabaseUnavailable, "failed to connect to postgres")
                .with_source(e)
        })
}

/// Apply every pending migration.
pub async fn run_migrations(pool: &PgPool) -> Result<(), OtaError> {
    MIGRATOR.run(pool).await.map_err(|e| {
        OtaError::new(ErrorCode::Internal, "migration failed").with_source(e)
    })
}

/// Map a [`sqlx::Error`] to the taxonomy's `DatabaseUnavailable` code. Use
/// this for any query error that is not itself a domain-meaningful
/// not-found/conflict outcome (those are constructed explicitly by the
/// calling query function).
pub(crate) fn map_sqlx_err(context: &'static str, e: sqlx::Error) -> OtaError {
    OtaError::new(ErrorCode::DatabaseUnavailable, context).with_source(e)
}
