//! VehicleService - wires sources, router and sinks together

use std::sync::Arc;

use contracts::{
    ListenerHandle, MeasurementRecord, ServiceConfig, Source, SourceContext,
    APPLICATION_SOURCE_TYPE,
};
use pipeline::{OutboundDispatcher, PipelineRouter};
use sinks::{BroadcastEngine, SinkHandle, UploadSink};
use sources::{ApplicationSource, SourceRegistry};
use tracing::{info, instrument, warn};

use crate::error::Result;

/// Builder for [`VehicleService`]
pub struct ServiceBuilder {
    config: ServiceConfig,
    registry: SourceRegistry,
    upload: Option<UploadSink>,
}

impl ServiceBuilder {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            registry: SourceRegistry::with_builtin_sources(),
            upload: None,
        }
    }

    /// Replace the source registry (e.g. to add device-backed types)
    pub fn registry(mut self, registry: SourceRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Use an already running upload sink instead of building one from
    /// `config.upload`
    pub fn upload_sink(mut self, upload: UploadSink) -> Self {
        self.upload = Some(upload);
        self
    }

    /// Assemble the pipeline and load the default sources
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(name = "service_build", skip(self))]
    pub fn build(self) -> Result<VehicleService> {
        let router = PipelineRouter::new();

        let broadcast = Arc::new(BroadcastEngine::spawn(
            router.last_values(),
            self.config.broadcast.queue_capacity,
        )?);
        router.add_sink(broadcast.clone());

        let upload = match (self.upload, &self.config.upload) {
            (Some(upload), _) => Some(Arc::new(upload)),
            (None, Some(upload_config)) => Some(Arc::new(UploadSink::spawn_http(upload_config)?)),
            (None, None) => None,
        };
        if let Some(upload) = &upload {
            router.add_sink(upload.clone());
        }

        let aux_sinks: Vec<Arc<SinkHandle>> = sinks::build_sinks(&self.config.sinks)?
            .into_iter()
            .map(Arc::new)
            .collect();
        for sink in &aux_sinks {
            router.add_sink(sink.clone());
        }

        let application = Arc::new(ApplicationSource::new(router.ingest_callback()));

        let service = VehicleService {
            config: self.config,
            registry: self.registry,
            router,
            broadcast,
            upload,
            aux_sinks,
            outbound: OutboundDispatcher::new(),
            application,
        };
        service.initialize_default_sources();

        info!(sinks = ?service.sink_summaries(), "vehicle service ready");
        Ok(service)
    }
}

/// Query and command surface of the relay
pub struct VehicleService {
    config: ServiceConfig,
    registry: SourceRegistry,
    router: PipelineRouter,
    broadcast: Arc<BroadcastEngine>,
    upload: Option<Arc<UploadSink>>,
    aux_sinks: Vec<Arc<SinkHandle>>,
    outbound: OutboundDispatcher,
    application: Arc<ApplicationSource>,
}

impl VehicleService {
    /// Build a service with the built-in source types
    pub fn new(config: ServiceConfig) -> Result<Self> {
        ServiceBuilder::new(config).build()
    }

    pub fn builder(config: ServiceConfig) -> ServiceBuilder {
        ServiceBuilder::new(config)
    }

    /// Last known value for `key`
    pub fn get(&self, key: &str) -> Option<MeasurementRecord> {
        self.router.get(key)
    }

    /// Send a command to the first vehicle interface that accepts it
    pub fn send(&self, command: &MeasurementRecord) -> bool {
        self.outbound.send(command)
    }

    /// Inject application data into the pipeline
    pub fn receive(&self, record: MeasurementRecord) -> bool {
        self.application.handle_message(record)
    }

    pub fn register(&self, key: &str, listener: ListenerHandle) {
        self.broadcast.register(key, listener);
    }

    pub fn unregister(&self, key: &str, listener: &ListenerHandle) {
        self.broadcast.unregister(key, listener);
    }

    /// Remove every source, then reinstate the application source
    #[instrument(name = "service_clear_sources", skip(self))]
    pub fn clear_sources(&self) {
        self.router.remove_all_sources();
        self.outbound.clear();
        self.add_application_source();
    }

    /// Reset to the application source plus the configured default source
    ///
    /// A default source that fails to load is logged and skipped.
    #[instrument(name = "service_initialize_default_sources", skip(self))]
    pub fn initialize_default_sources(&self) {
        self.clear_sources();

        let source_config = &self.config.source;
        if source_config.source_type == APPLICATION_SOURCE_TYPE {
            return;
        }

        let context = SourceContext::new(source_config.params.clone());
        if let Err(e) = self.load_source(
            &source_config.source_type,
            source_config.resource.as_deref(),
            context,
        ) {
            warn!(
                source_type = %source_config.source_type,
                error = %e,
                "unable to add default source"
            );
        }
    }

    /// Replace the active sources with a single source chosen by name
    ///
    /// The application source stays in place.
    #[instrument(name = "service_set_source", skip(self))]
    pub fn set_source(&self, source_type: &str, resource: Option<&str>) -> Result<()> {
        self.clear_sources();
        if source_type == APPLICATION_SOURCE_TYPE {
            return Ok(());
        }
        self.load_source(source_type, resource, SourceContext::default())
    }

    /// Total records routed since construction
    pub fn message_count(&self) -> u64 {
        self.router.message_count()
    }

    pub fn source_summaries(&self) -> Vec<String> {
        self.router.source_summaries()
    }

    pub fn sink_summaries(&self) -> Vec<String> {
        self.router.sink_summaries()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn router(&self) -> &PipelineRouter {
        &self.router
    }

    pub fn broadcast(&self) -> &BroadcastEngine {
        &self.broadcast
    }

    pub fn upload(&self) -> Option<&UploadSink> {
        self.upload.as_deref()
    }

    pub fn outbound(&self) -> &OutboundDispatcher {
        &self.outbound
    }

    /// Stop all sources and sinks and wait for their tasks
    #[instrument(name = "service_shutdown", skip(self))]
    pub async fn shutdown(&self) {
        self.router.stop();
        self.outbound.clear();

        self.broadcast.shutdown().await;
        if let Some(upload) = &self.upload {
            upload.shutdown().await;
        }
        for sink in &self.aux_sinks {
            sink.shutdown().await;
        }

        info!(messages = self.message_count(), "vehicle service stopped");
    }

    fn add_application_source(&self) {
        let source: Arc<dyn Source> = self.application.clone();
        if let Err(e) = self.router.add_source(source) {
            warn!(error = %e, "unable to add application source");
        }
    }

    fn load_source(
        &self,
        source_type: &str,
        resource: Option<&str>,
        context: SourceContext,
    ) -> Result<()> {
        let source = self
            .registry
            .load(source_type, resource, context, self.router.ingest_callback())?;
        self.router.add_source(source.clone())?;

        if let Some(interface) = source.into_vehicle_interface() {
            self.outbound.add_interface(interface);
        }
        Ok(())
    }
}

impl Drop for VehicleService {
    fn drop(&mut self) {
        self.router.stop();
    }
}
