use thiserror::Error;

/// Errors that can arise while interacting with the plot storage layer or
/// the plot entities themselves.
#[derive(Debug, Error)]
pub enum PlotError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// A plot id string that does not parse as "x;z".
    #[error("invalid plot id: {0}")]
    InvalidPlotId(String),

    /// Metadata lookup into a namespace that was never set.
    #[error("unknown metadata namespace: {0}")]
    MissingNamespace(String),

    /// A command referenced a world with no registered grid settings.
    #[error("not a plot world: {0}")]
    NotPlotWorld(String),

    /// Permission denied (capability check failed).
    #[error("permission denied: {0}")]
    PermissionDenied(String),
}
