//! Administrative back-door into the Traffic Ops database.
//!
//! Some cleanup cannot go through the API: users can never be deleted by a
//! client, and their change-log rows pin them in place. The back-door is a
//! separate, explicitly configured interface for that work so nothing in the
//! client contract reaches around the API.
//!
//! [`PgBackdoor`] talks to PostgreSQL and is behind the `postgres` feature.

use crate::config::DbConfig;
use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

const USERINFO_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, thiserror::Error)]
pub enum BackdoorError {
    #[error("No administrative back-door is configured")]
    NotConfigured,

    #[error("The administrative back-door does not support {0}")]
    Unsupported(String),

    #[error("Connecting to the Traffic Ops database failed: {0}")]
    Connect(String),

    #[error("Executing '{statement}' failed: {message}")]
    Sql { statement: String, message: String },
}

/// Direct database access for fixture cleanup.
#[async_trait]
pub trait AdminBackdoor: Send + Sync {
    /// Runs `statements` in order inside one transaction.
    async fn exec_sql(&self, statements: &[String]) -> Result<(), BackdoorError>;

    /// Removes users that cannot be deleted through the API.
    async fn force_delete_users(&self, usernames: &[String]) -> Result<(), BackdoorError> {
        if usernames.is_empty() {
            return Ok(());
        }
        self.exec_sql(&force_delete_users_sql(usernames)).await
    }
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// The statements that hard-delete `usernames`: first every change-log row
/// not written by `admin`, then the users themselves.
pub fn force_delete_users_sql(usernames: &[String]) -> Vec<String> {
    let names = usernames
        .iter()
        .map(|name| quote_literal(name))
        .collect::<Vec<_>>()
        .join(",");
    vec![
        "DELETE FROM log WHERE NOT tm_user = (SELECT id FROM tm_user WHERE username = 'admin')".to_string(),
        format!("DELETE FROM tm_user WHERE username IN ({})", names),
    ]
}

/// A `postgres://` connection URL for `db`.
pub fn connection_url(db: &DbConfig) -> String {
    let host = if db.port.is_empty() {
        db.hostname.clone()
    } else {
        format!("{}:{}", db.hostname, db.port)
    };
    format!(
        "postgres://{}:{}@{}/{}?sslmode={}",
        utf8_percent_encode(&db.user, USERINFO_ENCODE_SET),
        utf8_percent_encode(&db.password, USERINFO_ENCODE_SET),
        host,
        db.dbname,
        if db.ssl { "require" } else { "disable" }
    )
}

#[cfg(feature = "postgres")]
pub use pg::PgBackdoor;

#[cfg(feature = "postgres")]
mod pg {
    use super::{AdminBackdoor, BackdoorError, connection_url};
    use crate::config::DbConfig;
    use async_trait::async_trait;
    use log::{debug, info};
    use sqlx::PgPool;
    use sqlx::postgres::PgPoolOptions;

    /// PostgreSQL back-door over a small connection pool.
    pub struct PgBackdoor {
        pool: PgPool,
    }

    impl PgBackdoor {
        pub async fn connect(db: &DbConfig) -> Result<Self, BackdoorError> {
            let pool = PgPoolOptions::new()
                .max_connections(2)
                .connect(&connection_url(db))
                .await
                .map_err(|e| BackdoorError::Connect(e.to_string()))?;
            info!("Connected to Traffic Ops database {} on {}", db.dbname, db.hostname);
            Ok(Self { pool })
        }
    }

    #[async_trait]
    impl AdminBackdoor for PgBackdoor {
        async fn exec_sql(&self, statements: &[String]) -> Result<(), BackdoorError> {
            let sql_error = |statement: &str, e: sqlx::Error| BackdoorError::Sql {
                statement: statement.to_string(),
                message: e.to_string(),
            };

            let mut tx = self.pool.begin().await.map_err(|e| sql_error("BEGIN", e))?;
            for statement in statements {
                debug!("Back-door SQL: {}", statement);
                sqlx::query(statement.as_str())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| sql_error(statement.as_str(), e))?;
            }
            tx.commit().await.map_err(|e| sql_error("COMMIT", e))?;
            Ok(())
        }
    }
}
