//! Worker-driven sink implementations
//!
//! Both run behind a [`SinkHandle`](crate::SinkHandle).

mod file;
mod log;

pub use self::file::{FileSink, FileSinkConfig};
pub use self::log::LogSink;
