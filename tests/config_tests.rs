use std::io::Write;
use std::time::Duration;

use photo_kiosk::config::Configuration;

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
poll-interval: 15s
slide-duration: 6s
transition-duration: 1200ms
drive:
  api-key: "key"
  folder-id: "folder"
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.poll_interval, Duration::from_secs(15));
    assert_eq!(cfg.slide_duration, Duration::from_secs(6));
    assert_eq!(cfg.transition_duration, Duration::from_millis(1200));
    assert_eq!(cfg.drive.api_key.as_deref(), Some("key"));
    assert_eq!(cfg.drive.folder_id.as_deref(), Some("folder"));
}

#[test]
fn defaults_apply_to_empty_config() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    assert_eq!(cfg.poll_interval, Duration::from_secs(15));
    assert_eq!(cfg.slide_duration, Duration::from_secs(6));
    assert_eq!(cfg.transition_duration, Duration::from_millis(1200));
    assert_eq!(cfg.drive.page_size, 100);
    assert!(cfg.drive.api_key.is_none());
    assert_eq!(cfg.event.title, "Our Wedding");
    assert!(cfg.drive.api_base_url.contains("googleapis.com"));
}

#[test]
fn cadences_are_independently_configurable() {
    let yaml = r#"
poll-interval: 1m
slide-duration: 250ms
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.poll_interval, Duration::from_secs(60));
    assert_eq!(cfg.slide_duration, Duration::from_millis(250));
    // Untouched by the other two.
    assert_eq!(cfg.transition_duration, Duration::from_millis(1200));
}

#[test]
fn validation_rejects_zero_durations() {
    let cfg: Configuration = serde_yaml::from_str("slide-duration: 0s").unwrap();
    let err = cfg.validated().unwrap_err();
    assert!(err.to_string().contains("slide-duration"));
}

#[test]
fn validation_rejects_oversized_page_size() {
    let cfg: Configuration = serde_yaml::from_str("drive:\n  page-size: 500").unwrap();
    let err = cfg.validated().unwrap_err();
    assert!(err.to_string().contains("page-size"));
}

#[test]
fn loads_from_yaml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "event:\n  title: Eva & George\n  date: 2026-02-14").unwrap();

    let cfg = Configuration::from_yaml_file(file.path()).unwrap();
    assert_eq!(cfg.event.title, "Eva & George");
    assert_eq!(cfg.event.date.as_deref(), Some("2026-02-14"));
}

#[test]
fn missing_file_reports_the_path() {
    let err = Configuration::from_yaml_file(std::path::Path::new("/nonexistent/kiosk.yaml"))
        .unwrap_err();
    assert!(err.to_string().contains("/nonexistent/kiosk.yaml"));
}
