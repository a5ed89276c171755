use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Connection, statement, or transaction failure in the database layer.
    #[error("database error")]
    Sqlx(#[from] sqlx::Error),

    /// A stored-data invariant does not hold (e.g. a tag name mapping to
    /// more than one id).
    #[error("data consistency violation: {0}")]
    DataConsistency(String),
}
