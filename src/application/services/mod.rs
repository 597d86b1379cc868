//! Business logic services for the application layer.

pub mod metrics_service;
pub mod url_service;

pub use metrics_service::{METRICS_INTERVAL, MetricsService, MetricsSnapshot};
pub use url_service::{ShortenError, UrlService};
