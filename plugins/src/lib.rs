//! lingo-plugins: concrete implementations of the lingo-core boundary traits.
//!
//! - [`adapter`]: provider adapters, including a file-backed replay adapter
//!   for offline runs and tests
//! - [`strategies`]: retry backoff strategies for callers that re-submit
//!   retry-eligible failures
//! - [`factory`]: config-driven construction of the above

pub mod adapter;
pub mod factory;
pub mod strategies;

pub use adapter::ReplayAdapter;
pub use strategies::{ExponentialBackoff, LinearBackoff};
