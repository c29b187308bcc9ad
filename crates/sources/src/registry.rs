//! Source registry and loader
//!
//! Maps source type identifiers to factory functions. The registry is
//! populated at startup; `load` then constructs and starts a source chosen
//! at runtime by name.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use contracts::{IngestCallback, Source, SourceContext, APPLICATION_SOURCE_TYPE};
use tracing::{info, instrument, warn};
use url::Url;

use crate::error::{Result, SourceError};
use crate::synthetic::{SyntheticConfig, SyntheticSource};
use crate::trace::{TraceConfig, TraceSource};

/// Source construction contract
pub type SourceFactory =
    Arc<dyn Fn(SourceContext, IngestCallback, Option<Url>) -> Result<Arc<dyn Source>> + Send + Sync>;

#[derive(Clone)]
enum RegistryEntry {
    /// Constructible from (context, callback, locator)
    Factory(SourceFactory),
    /// Known type that is only ever constructed programmatically
    Programmatic,
}

/// Registry of source types
#[derive(Clone, Default)]
pub struct SourceRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `trace`, `synthetic` and the programmatic `application` type
    pub fn with_builtin_sources() -> Self {
        let mut registry = Self::new();
        registry.register_programmatic(APPLICATION_SOURCE_TYPE);
        registry.register("trace", trace_factory);
        registry.register("synthetic", synthetic_factory);
        registry
    }

    /// Register a factory under `source_type`, replacing any previous entry
    pub fn register<F>(&mut self, source_type: impl Into<String>, factory: F)
    where
        F: Fn(SourceContext, IngestCallback, Option<Url>) -> Result<Arc<dyn Source>>
            + Send
            + Sync
            + 'static,
    {
        self.entries
            .insert(source_type.into(), RegistryEntry::Factory(Arc::new(factory)));
    }

    /// Register a type name that has no locator-based constructor
    pub fn register_programmatic(&mut self, source_type: impl Into<String>) {
        self.entries
            .insert(source_type.into(), RegistryEntry::Programmatic);
    }

    /// Check whether `source_type` is known
    pub fn contains(&self, source_type: &str) -> bool {
        self.entries.contains_key(source_type)
    }

    /// Registered type names, sorted
    pub fn source_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve, construct and start a source
    ///
    /// A malformed `resource` is not an error: it is logged and the source
    /// is constructed without a locator.
    ///
    /// # Errors
    /// - `UnknownSourceType` if nothing is registered under `source_type`
    /// - `IncompatibleSourceType` if the type has no locator-based constructor
    /// - `SourceConstructionFailed` if the factory fails or panics
    /// - `StartFailed` if `start` fails or panics
    #[instrument(
        name = "source_registry_load",
        skip(self, context, callback),
        fields(source_type = %source_type, resource = ?resource)
    )]
    pub fn load(
        &self,
        source_type: &str,
        resource: Option<&str>,
        context: SourceContext,
        callback: IngestCallback,
    ) -> Result<Arc<dyn Source>> {
        let factory = match self.entries.get(source_type) {
            Some(RegistryEntry::Factory(factory)) => factory.clone(),
            Some(RegistryEntry::Programmatic) => {
                let err = SourceError::IncompatibleSourceType {
                    source_type: source_type.to_string(),
                };
                warn!(error = %err, "source type has no locator-based constructor");
                return Err(err);
            }
            None => {
                let err = SourceError::UnknownSourceType {
                    source_type: source_type.to_string(),
                };
                warn!(error = %err, "couldn't find source type");
                return Err(err);
            }
        };

        let locator = resource.and_then(parse_locator);

        let source = match panic::catch_unwind(AssertUnwindSafe(|| {
            factory(context, callback, locator)
        })) {
            Ok(Ok(source)) => source,
            Ok(Err(e)) => {
                let err = match e {
                    e @ SourceError::SourceConstructionFailed { .. } => e,
                    other => SourceError::construction(source_type, other.to_string()),
                };
                warn!(error = %err, "source constructor failed");
                return Err(err);
            }
            Err(payload) => {
                let err = SourceError::construction(
                    source_type,
                    format!("constructor panicked: {}", panic_message(payload.as_ref())),
                );
                warn!(error = %err, "source constructor panicked");
                return Err(err);
            }
        };

        let message = match panic::catch_unwind(AssertUnwindSafe(|| source.start())) {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(payload) => Some(format!("start panicked: {}", panic_message(payload.as_ref()))),
        };
        if let Some(message) = message {
            let err = SourceError::StartFailed {
                source_type: source_type.to_string(),
                message,
            };
            warn!(error = %err, "source could not be started");
            return Err(err);
        }

        info!(source = %source.summary(), "initialized source");
        Ok(source)
    }
}

/// Parse a resource as a URL, logging instead of failing
fn parse_locator(resource: &str) -> Option<Url> {
    match Url::parse(resource) {
        Ok(url) => Some(url),
        Err(e) => {
            let err = SourceError::MalformedResourceLocator {
                resource: resource.to_string(),
                message: e.to_string(),
            };
            warn!(error = %err, "unable to parse resource as URI, continuing without it");
            None
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn trace_factory(
    context: SourceContext,
    callback: IngestCallback,
    locator: Option<Url>,
) -> Result<Arc<dyn Source>> {
    let url = locator.ok_or_else(|| SourceError::construction("trace", "a file:// resource is required"))?;
    let path = url
        .to_file_path()
        .map_err(|_| SourceError::construction("trace", format!("'{url}' is not a file URL")))?;
    let config = TraceConfig::from_context(&context)?;

    let source = TraceSource::load(&path, config, callback)
        .map_err(|e| SourceError::construction("trace", format!("{}: {e}", path.display())))?;
    Ok(Arc::new(source))
}

fn synthetic_factory(
    context: SourceContext,
    callback: IngestCallback,
    _locator: Option<Url>,
) -> Result<Arc<dyn Source>> {
    let config = SyntheticConfig::from_context(&context)?;
    Ok(Arc::new(SyntheticSource::new(config, callback)))
}
