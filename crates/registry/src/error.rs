/// Errors raised while talking to the registry or building a catalog.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("Registry request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The registry answered with a non-2xx status other than 429.
    #[error("Registry returned HTTP {0}")]
    HttpStatus(u16),

    /// The registry answered 429.
    #[error("Registry rate limit hit")]
    RateLimited,

    /// A response or record could not be interpreted.
    #[error("Malformed registry data: {0}")]
    Decode(String),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Every source tier came back empty.
    #[error("No model catalog available from any source")]
    NoCatalog,
}

/// Errors reading or writing a snapshot document.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot JSON invalid: {0}")]
    Json(#[from] serde_json::Error),
}
