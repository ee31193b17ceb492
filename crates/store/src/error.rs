/// Failure kinds surfaced by every [`crate::Store`] operation.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The addressed entity does not exist.
    #[error("not found")]
    NotFound,

    /// A uniqueness constraint was violated (duplicate email, node id,
    /// or (node, decoy name) pair).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Transient infrastructure failure (I/O, serialization to disk).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}
