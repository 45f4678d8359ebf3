// 🌐 Page transport - "fetch returns raw markup or fails"
//
// The engine only needs that contract, so the transport sits behind a trait and
// can be swapped (plain HTTP today, something heavier if the site starts
// blocking simple clients).

use crate::error::FetchError;
use std::time::Duration;

/// Source of the registry page's raw markup
pub trait PageSource {
    fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;
}

/// Fixed markup (or a fixed failure); used for dry runs and tests
pub struct StaticPageSource {
    response: Result<String, String>,
}

impl StaticPageSource {
    pub fn markup(markup: impl Into<String>) -> Self {
        StaticPageSource {
            response: Ok(markup.into()),
        }
    }

    /// Always fails with a transport error carrying `message`
    pub fn failing(message: impl Into<String>) -> Self {
        StaticPageSource {
            response: Err(message.into()),
        }
    }
}

impl PageSource for StaticPageSource {
    fn fetch(&self, _url: &str, _timeout: Duration) -> Result<String, FetchError> {
        match &self.response {
            Ok(markup) => Ok(markup.clone()),
            Err(message) => Err(FetchError::Transport(message.clone())),
        }
    }
}

#[cfg(feature = "http")]
pub use http::HttpPageSource;

#[cfg(feature = "http")]
mod http {
    use super::PageSource;
    use crate::error::FetchError;
    use std::time::Duration;
    use tracing::{debug, info};

    /// Blocking HTTP GET with a bounded timeout.
    ///
    /// One attempt per run: a failure is reported as Stale and the next
    /// scheduled run tries again, so there is no retry loop here.
    pub struct HttpPageSource {
        user_agent: String,
    }

    impl HttpPageSource {
        pub fn new(user_agent: &str) -> Self {
            HttpPageSource {
                user_agent: user_agent.to_string(),
            }
        }

        fn client(&self, timeout: Duration) -> Result<reqwest::blocking::Client, FetchError> {
            reqwest::blocking::Client::builder()
                .timeout(timeout)
                .user_agent(self.user_agent.as_str())
                .build()
                .map_err(|e| FetchError::Transport(format!("could not build HTTP client: {e}")))
        }
    }

    impl PageSource for HttpPageSource {
        fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
            info!("Fetching {}", url);
            let client = self.client(timeout)?;

            let response = client.get(url).send().map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(timeout.as_secs())
                } else {
                    FetchError::Transport(e.to_string())
                }
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }

            let body = response.text().map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(timeout.as_secs())
                } else {
                    FetchError::Body(e.to_string())
                }
            })?;

            debug!("Fetched {} bytes from {}", body.len(), url);
            Ok(body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_source_returns_markup() {
        let source = StaticPageSource::markup("<html></html>");
        let body = source.fetch("https://registry.example", Duration::from_secs(1)).unwrap();

        assert_eq!(body, "<html></html>");
    }

    #[test]
    fn test_static_source_failure_is_transport_error() {
        let source = StaticPageSource::failing("connection reset");
        let err = source.fetch("https://registry.example", Duration::from_secs(1)).unwrap_err();

        assert!(matches!(err, FetchError::Transport(ref m) if m == "connection reset"));
    }
}
