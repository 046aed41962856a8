/// Error kinds surfaced by the engine.
///
/// `ParseSkip` from the design is deliberately absent here: a malformed row
/// is dropped by the parser and never reaches a caller as an error.
#[derive(Debug, thiserror::Error)]
pub enum GeocoderError {
    #[error("fetch failed: {0}")]
    FetchFailed(String),

    #[error("archive unexpected: {0}")]
    ArchiveUnexpected(String),

    #[error("io failed: {0}")]
    IoFailed(#[from] std::io::Error),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("point is not finite: ({lat}, {lon})")]
    BadPoint { lat: f64, lon: f64 },
}

pub type Result<T> = std::result::Result<T, GeocoderError>;
