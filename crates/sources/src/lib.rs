//! # Sources
//!
//! Measurement producers and the runtime source loader.
//!
//! Responsibilities:
//! - Provide the built-in sources (application, trace replay, synthetic)
//! - Resolve a source type by name and construct it from a resource locator
//! - Start every loaded source on its own producer thread

pub mod application;
pub mod error;
mod pacing;
pub mod registry;
pub mod synthetic;
pub mod trace;

pub use application::ApplicationSource;
pub use contracts::{IngestCallback, Source, SourceContext};
pub use error::{Result, SourceError};
pub use registry::{SourceFactory, SourceRegistry};
pub use synthetic::{SyntheticConfig, SyntheticSource};
pub use trace::{TraceConfig, TraceSource};
