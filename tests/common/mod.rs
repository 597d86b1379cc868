#![allow(dead_code)]

use std::sync::Arc;

use rate_limited_shortener::config::Config;
use rate_limited_shortener::state::AppState;

pub const FALLBACK_PAGE: &str = "<h1>No such link</h1>";

/// Default settings with no front-end on disk and an ephemeral stress port.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.not_found_page = "/nonexistent/404.html".into();
    config.fallback_404_html = FALLBACK_PAGE.to_string();
    config.stress_test.listen_addr = "127.0.0.1:0".to_string();
    config
}

pub fn create_test_state() -> AppState {
    create_test_state_with(test_config())
}

pub fn create_test_state_with(config: Config) -> AppState {
    AppState::new(Arc::new(config)).unwrap()
}
