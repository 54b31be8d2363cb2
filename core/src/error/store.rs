use thiserror::Error;

/// Errors from the durable fingerprint store.
///
/// Callers on the request path log and swallow these: losing a learned
/// capability fact never aborts an in-flight request.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
