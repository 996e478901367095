//! Shared HTTP client construction.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use url::Url;

/// Default user agent for outbound requests.
pub const DEFAULT_USER_AGENT: &str = "detour/0.1";

/// Error type for adapter construction failures.
#[derive(Debug, Error)]
pub enum ProviderBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// The configured base URL could not be parsed.
    #[error("invalid base URL {url:?}: {source}")]
    InvalidBaseUrl {
        /// URL as configured.
        url: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
}

/// Build a client bounded by `timeout` for both connect and the whole request.
pub(crate) fn build_client(
    user_agent: &str,
    timeout: Duration,
) -> Result<Client, ProviderBuildError> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
        .map_err(ProviderBuildError::HttpClient)
}

/// Parse `raw` and drop any trailing slash so paths can be appended.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, ProviderBuildError> {
    let trimmed = raw.trim_end_matches('/');
    Url::parse(trimmed).map_err(|source| ProviderBuildError::InvalidBaseUrl {
        url: raw.to_owned(),
        source,
    })
}

/// Append `segments` to the path of `base`.
pub(crate) fn join_path(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    let path = format!(
        "{}/{}",
        base.path().trim_end_matches('/'),
        segments.join("/")
    );
    url.set_path(&path);
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://osrm.example.com", "http://osrm.example.com/trip/v1")]
    #[case("http://osrm.example.com/", "http://osrm.example.com/trip/v1")]
    #[case("http://example.com/osrm/", "http://example.com/osrm/trip/v1")]
    fn joins_paths_without_double_slashes(#[case] base: &str, #[case] expected: &str) {
        let base = parse_base_url(base).expect("valid base");
        assert_eq!(join_path(&base, &["trip", "v1"]).as_str(), expected);
    }

    #[rstest]
    fn rejects_relative_base_url() {
        let err = parse_base_url("osrm.example.com").expect_err("relative URL");
        assert!(matches!(err, ProviderBuildError::InvalidBaseUrl { .. }));
    }
}
