//! Shared application state injected into every handler.

use std::sync::Arc;

use tracing::{debug, info};

use crate::application::limiter::{GlobalRateLimiter, PerClientRateLimiter};
use crate::application::services::{MetricsService, UrlService};
use crate::config::Config;
use crate::domain::errors::LimiterError;

/// One complete stack: both limiters, the URL store and the settings they
/// were built from.
///
/// Cloning is cheap and shares the same components. The production server
/// owns one; every stress run builds its own.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub global_limiter: Arc<GlobalRateLimiter>,
    pub client_limiter: Arc<PerClientRateLimiter>,
    pub url_service: Arc<UrlService>,
    pub metrics: MetricsService,
    /// HTML body of 404 responses for unknown short codes.
    pub not_found_page: Arc<str>,
}

impl AppState {
    /// Builds every component and starts their background workers.
    ///
    /// # Errors
    ///
    /// Returns [`LimiterError::InvalidConfig`] if a limiter rejects its
    /// settings.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(config: Arc<Config>) -> Result<Self, LimiterError> {
        let global_limiter = Arc::new(GlobalRateLimiter::new(&config.global_limiter)?);
        let client_limiter = Arc::new(PerClientRateLimiter::new(&config.client_limiter)?);
        let url_service = Arc::new(UrlService::new(&config.url_store));

        let metrics = MetricsService::new(
            global_limiter.clone(),
            client_limiter.clone(),
            url_service.clone(),
        );

        let not_found_page = load_not_found_page(&config);

        Ok(Self {
            config,
            global_limiter,
            client_limiter,
            url_service,
            metrics,
            not_found_page,
        })
    }

    /// Stops the refill and sweep workers. Safe to call more than once.
    pub fn offline(&self) {
        self.global_limiter.offline();
        self.client_limiter.offline();
        self.url_service.offline();
        info!("All background workers stopped");
    }
}

fn load_not_found_page(config: &Config) -> Arc<str> {
    match std::fs::read_to_string(&config.not_found_page) {
        Ok(page) => Arc::from(page),
        Err(e) => {
            debug!(
                path = %config.not_found_page.display(),
                error = %e,
                "Not-found page unavailable, using inline fallback"
            );
            Arc::from(config.fallback_404_html.as_str())
        }
    }
}
