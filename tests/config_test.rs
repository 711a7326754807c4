//! Integration tests for configuration loading

use campus_nav::domain::Coordinate;
use campus_nav::infra::{Config, LocationSourceKind};
use campus_nav::presentation::BasemapStyle;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[site]
id = "test-campus"

[directions]
base_url = "http://localhost:5173/"
profile = "walking"
access_token = "pk.test"
timeout_ms = 3000

[directory]
quick_navigation = "data/quick-navigation.json"
buildings = "file:///srv/campus/buildings.json"

[location]
source = "replay"
replay_file = "data/sample-walk.jsonl"
replay_interval_ms = 250
high_accuracy = false
timeout_ms = 8000
max_sample_age_ms = 0

[navigation]
search_debounce_ms = 300

[map]
default_style = "satellite"
default_zoom = 16.5
default_center = [64.1466, -21.9426]

[http]
port = 0

[metrics]
interval_secs = 15

[announce]
command = ["espeak", "-s", "150"]
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.site_id(), "test-campus");
    assert_eq!(config.directions_base_url(), "http://localhost:5173");
    assert_eq!(config.directions_access_token(), Some("pk.test"));
    assert_eq!(config.directions_timeout(), Duration::from_millis(3000));
    assert_eq!(config.quick_navigation_source(), "data/quick-navigation.json");
    assert_eq!(config.location_source(), LocationSourceKind::Replay);
    assert_eq!(config.replay_file(), Some("data/sample-walk.jsonl"));
    assert_eq!(config.replay_interval(), Duration::from_millis(250));
    assert!(!config.high_accuracy());
    assert_eq!(config.location_timeout_ms(), 8000);
    assert_eq!(config.max_sample_age_ms(), 0);
    assert_eq!(config.search_debounce(), Duration::from_millis(300));
    assert_eq!(config.default_style(), BasemapStyle::Satellite);
    assert_eq!(config.default_zoom(), 16.5);
    assert_eq!(config.default_center(), Coordinate::new(64.1466, -21.9426));
    assert_eq!(config.http_port(), 0);
    assert_eq!(config.announce_command(), ["espeak", "-s", "150"]);
}

#[test]
fn test_partial_config_keeps_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[navigation]\nsearch_debounce_ms = 250\n").unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();
    assert_eq!(config.search_debounce(), Duration::from_millis(250));
    assert_eq!(config.location_timeout_ms(), 5000);
    assert_eq!(config.location_source(), LocationSourceKind::Gpsd);
}

#[test]
fn test_invalid_config_is_an_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[map]\ndefault_style = \"terrain\"\n").unwrap();
    temp_file.flush().unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.config_file(), "default");
    assert_eq!(config.directions_profile(), "walking");
    assert_eq!(config.default_style(), BasemapStyle::Streets);
    assert_eq!(config.http_port(), 8080);
}
