use thiserror::Error;

/// Library error type for kiosk operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Credentials or the target folder are not configured. Degrades to
    /// placeholder data; never fatal to a running slideshow.
    #[error("photo storage is not configured: {0}")]
    ConfigurationMissing(&'static str),

    /// The remote photo storage could not be reached or returned a failure
    /// status. The slideshow keeps its last-known-good list.
    #[error("photo storage unavailable: {0}")]
    RemoteUnavailable(String),

    /// Rejected before any network call (e.g. a non-image upload).
    #[error("{0}")]
    InvalidInput(String),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Strip the URL so credentials in query strings never reach logs.
        Error::RemoteUnavailable(err.without_url().to_string())
    }
}

impl Error {
    /// Short message suitable for the on-screen warning badge.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::ConfigurationMissing(_) => "Photo storage is not configured",
            Error::RemoteUnavailable(_) => "Could not refresh photos",
            Error::InvalidInput(_) => "Only image files are allowed",
            Error::Io(_) | Error::Config(_) => "Something went wrong",
        }
    }
}
