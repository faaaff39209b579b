use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

/// Top-level kiosk configuration, loaded from YAML.
///
/// The three cadence durations are independent of one another and are parsed
/// with humantime (`15s`, `1200ms`, ...).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Configuration {
    /// How often the fetcher asks the remote folder for new photos.
    #[serde(default = "Configuration::default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// How long each photo stays on screen before the next swap begins.
    #[serde(default = "Configuration::default_slide_duration", with = "humantime_serde")]
    pub slide_duration: Duration,

    /// Length of the two-phase crossfade between the current and next photo.
    #[serde(
        default = "Configuration::default_transition_duration",
        with = "humantime_serde"
    )]
    pub transition_duration: Duration,

    /// Address the web surface binds to.
    #[serde(default = "Configuration::default_bind_addr")]
    pub bind_addr: SocketAddr,

    #[serde(default)]
    pub drive: DriveConfig,

    #[serde(default)]
    pub event: EventConfig,
}

/// Remote photo-storage settings. Credentials left unset here fall back to the
/// environment; with nothing configured the kiosk runs on placeholder photos.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DriveConfig {
    pub api_key: Option<String>,
    pub folder_id: Option<String>,
    /// Pre-issued bearer token used for uploads.
    pub upload_token: Option<String>,
    /// Folder link encoded in the guest QR code.
    pub share_url: Option<String>,
    #[serde(default = "DriveConfig::default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "DriveConfig::default_upload_base_url")]
    pub upload_base_url: String,
    /// Listing cap; the Drive API allows at most 100 per page.
    #[serde(default = "DriveConfig::default_page_size")]
    pub page_size: usize,
}

/// Text shown in the page headers.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EventConfig {
    #[serde(default = "EventConfig::default_title")]
    pub title: String,
    #[serde(default)]
    pub date: Option<String>,
}

impl Configuration {
    const fn default_poll_interval() -> Duration {
        Duration::from_secs(15)
    }

    const fn default_slide_duration() -> Duration {
        Duration::from_secs(6)
    }

    const fn default_transition_duration() -> Duration {
        Duration::from_millis(1200)
    }

    fn default_bind_addr() -> SocketAddr {
        "0.0.0.0:8080".parse().expect("valid default bind address")
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration from {}", path.display()))?;
        let cfg: Configuration = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing configuration from {}", path.display()))?;
        Ok(cfg)
    }

    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.poll_interval.is_zero(),
            "poll-interval must be greater than zero"
        );
        ensure!(
            !self.slide_duration.is_zero(),
            "slide-duration must be greater than zero"
        );
        ensure!(
            !self.transition_duration.is_zero(),
            "transition-duration must be greater than zero"
        );
        ensure!(
            (1..=100).contains(&self.drive.page_size),
            "drive.page-size must be between 1 and 100"
        );
        Ok(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            poll_interval: Self::default_poll_interval(),
            slide_duration: Self::default_slide_duration(),
            transition_duration: Self::default_transition_duration(),
            bind_addr: Self::default_bind_addr(),
            drive: DriveConfig::default(),
            event: EventConfig::default(),
        }
    }
}

impl DriveConfig {
    fn default_api_base_url() -> String {
        "https://www.googleapis.com/drive/v3".to_string()
    }

    fn default_upload_base_url() -> String {
        "https://www.googleapis.com/upload/drive/v3".to_string()
    }

    const fn default_page_size() -> usize {
        100
    }

    /// Fill unset credentials from the environment, matching the variables the
    /// kiosk has historically been deployed with.
    pub fn with_env_fallback(mut self) -> Self {
        let from_env = |v: &mut Option<String>, key: &str| {
            if v.is_none() {
                *v = std::env::var(key).ok().filter(|s| !s.is_empty());
            }
        };
        from_env(&mut self.api_key, "GOOGLE_API_KEY");
        from_env(&mut self.folder_id, "GOOGLE_DRIVE_FOLDER_ID");
        from_env(&mut self.upload_token, "GOOGLE_DRIVE_UPLOAD_TOKEN");
        from_env(&mut self.share_url, "GOOGLE_DRIVE_SHARE_URL");
        self
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            folder_id: None,
            upload_token: None,
            share_url: None,
            api_base_url: Self::default_api_base_url(),
            upload_base_url: Self::default_upload_base_url(),
            page_size: Self::default_page_size(),
        }
    }
}

impl EventConfig {
    fn default_title() -> String {
        "Our Wedding".to_string()
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            title: Self::default_title(),
            date: None,
        }
    }
}
