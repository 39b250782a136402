//! Tracing/logging setup shared by the binaries.

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use self::tracing::LogFormat;

/// Initialize process-wide tracing/logging.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init(format: LogFormat) {
    tracing::init(format);
}
