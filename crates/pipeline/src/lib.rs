//! # Pipeline
//!
//! Measurement routing core.
//!
//! Responsibilities:
//! - Own the live set of sources and sinks
//! - Keep the last known value of every key
//! - Forward every record to every sink without blocking on any of them
//! - Route outbound commands to the first vehicle interface that accepts them
//!
//! ```ignore
//! use pipeline::PipelineRouter;
//!
//! let router = PipelineRouter::new();
//! router.add_sink(Arc::new(my_sink));
//! router.add_source(Arc::new(SyntheticSource::new(config, router.ingest_callback())))?;
//!
//! let speed = router.get("vehicle_speed");
//! ```

mod error;
mod outbound;
mod router;

pub use error::{PipelineError, Result};
pub use outbound::OutboundDispatcher;
pub use router::PipelineRouter;
