use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("Network error for {url}: {message}")]
    Network {
        url: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ScraperError {
    fn from(err: reqwest::Error) -> Self {
        ScraperError::Network {
            url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl ScraperError {
    /// Whether another attempt at the same request could succeed.
    /// Connection failures, timeouts, 429 and 5xx are; other statuses are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ScraperError::Network { status: None, .. } => true,
            ScraperError::Network { status: Some(s), .. } => *s == 429 || *s >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;
