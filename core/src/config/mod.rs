mod load;
mod types;

pub use load::{get_lingo_data_dir, load_default};
pub use types::{AppConfig, FingerprintConfig, LoggingConfig, RetryConfig};
