//! Tracing/logging setup shared by the binaries.

/// Initialize process-wide tracing with the format named by
/// `LEDGERGATE_LOG_FORMAT`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    let format = std::env::var(tracing::LOG_FORMAT_VAR)
        .ok()
        .and_then(|v| tracing::LogFormat::parse(&v))
        .unwrap_or_default();
    tracing::init(format);
}

/// Tracing configuration (filters, layers).
pub mod tracing;
