//! # Database Error Types
//!
//! Error types for database operations and engine services.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          Business rule (vega_core)          │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError::{NotFound, UniqueViolation,  DbError::Domain(CoreError)       │
//! │            Conflict, ...}                 │                             │
//! │       │                                   │                             │
//! │       └──────────────┬────────────────────┘                             │
//! │                      ▼                                                  │
//! │  Caller: is_retryable()? retry whole operation : show message           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use vega_core::{CoreError, ValidationError};

/// SQLite result codes that mean "someone else holds the lock".
///
/// 5 = SQLITE_BUSY, 6 = SQLITE_LOCKED, 261 = BUSY_RECOVERY,
/// 262 = LOCKED_SHAREDCACHE, 517 = BUSY_SNAPSHOT.
const SQLITE_BUSY_CODES: &[&str] = &["5", "6", "261", "262", "517"];

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate sale or layaway number
    /// - Second open session for the same cashier (before mapping)
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (negative stock, negative credit).
    #[error("Constraint violation: {message}")]
    CheckViolation { message: String },

    /// Transient write contention: SQLite busy/locked, or a lost
    /// compare-and-swap. Retry the whole operation.
    #[error("Persistence conflict: {0} (retry the operation)")]
    Conflict(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Stored data could not be decoded (bad promotion scope JSON).
    #[error("Corrupt {entity} data: {reason}")]
    CorruptData { entity: String, reason: String },

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A business rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        DbError::Conflict(message.into())
    }

    /// True for failures where re-running the same operation can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::Conflict(_) | DbError::PoolExhausted)
    }

    /// The business-rule error, if that is what this is.
    pub fn as_domain(&self) -> Option<&CoreError> {
        match self {
            DbError::Domain(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound      → DbError::NotFound
/// sqlx::Error::Database         → busy/locked code → Conflict
///                                 else analyze message for constraint type
/// sqlx::Error::PoolTimedOut     → DbError::PoolExhausted
/// Other                         → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                let busy = db_err
                    .code()
                    .map_or(false, |code| SQLITE_BUSY_CODES.contains(&code.as_ref()));

                if busy || msg.contains("database is locked") {
                    DbError::Conflict(msg.to_string())
                } else if msg.contains("UNIQUE constraint failed") {
                    // "UNIQUE constraint failed: <table>.<column>"
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
