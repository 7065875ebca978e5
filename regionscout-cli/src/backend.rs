//! Construction of the backend used by the commands.

use std::time::Duration;

use regionscout_core::backend::Backend;
use regionscout_data::{DEFAULT_BASE_URL, HttpBackend, HttpBackendConfig};

use crate::CliError;

/// Resolve backend settings from optional overrides.
pub(crate) fn backend_config(base_url: Option<String>, timeout_secs: Option<u64>) -> HttpBackendConfig {
    let config = HttpBackendConfig::new(base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()));
    match timeout_secs {
        Some(secs) if secs > 0 => config.with_timeout(Duration::from_secs(secs)),
        _ => config,
    }
}

/// Builds the backend for one command invocation.
pub(crate) trait BackendFactory {
    /// Backend produced by this factory.
    type Backend: Backend;

    fn build(&self, config: &HttpBackendConfig) -> Result<Self::Backend, CliError>;
}

/// Factory producing [`HttpBackend`]s.
pub(crate) struct HttpBackendFactory;

impl BackendFactory for HttpBackendFactory {
    type Backend = HttpBackend;

    fn build(&self, config: &HttpBackendConfig) -> Result<Self::Backend, CliError> {
        HttpBackend::with_config(config.clone()).map_err(|source| CliError::BuildBackend {
            base_url: config.base_url.clone(),
            source,
        })
    }
}

/// Current-thread runtime driving the session's futures.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)
}
