pub mod error;
pub mod language;
pub mod preprocess;
pub mod prompt;
pub mod registry;
pub mod service;
pub mod state;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::TranslateError;
pub use registry::ModelRegistry;
pub use service::{ServiceOptions, TranslationService};
pub use state::{LoadState, ServiceSnapshot};
