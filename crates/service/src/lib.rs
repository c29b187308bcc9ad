//! # Service
//!
//! The vehicle service facade: query and command surface over the pipeline
//! router, the broadcast engine, the upload sink and the outbound dispatcher.
//!
//! ```ignore
//! use service::VehicleService;
//!
//! let service = VehicleService::new(config)?;
//! service.register("vehicle_speed", ListenerHandle::new(listener));
//! service.receive(MeasurementRecord::new("vehicle_speed", 42.0));
//! service.shutdown().await;
//! ```

mod error;
mod vehicle_service;

pub use error::{Result, ServiceError};
pub use vehicle_service::{ServiceBuilder, VehicleService};
