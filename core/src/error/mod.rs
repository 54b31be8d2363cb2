pub mod executor;
pub mod store;

pub use executor::ExecutorError;
pub use store::StoreError;
