//! Nominatim `/search` client.

use std::time::Duration;

use async_trait::async_trait;
use detour_core::{GeocodeError, Geocoder};
use geo::Coord;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::http::{
    DEFAULT_USER_AGENT, ProviderBuildError, build_client, join_path, parse_base_url,
};

/// Public Nominatim instance.
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration for [`NominatimGeocoder`].
#[derive(Debug, Clone)]
pub struct NominatimConfig {
    /// Base URL of the Nominatim service.
    pub base_url: String,
    /// Request timeout duration.
    pub timeout: Duration,
    /// User agent string. Public instances require one identifying the
    /// application.
    pub user_agent: String,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_NOMINATIM_URL.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl NominatimConfig {
    /// Create a configuration for the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// One entry of a Nominatim JSON answer. Coordinates arrive as strings.
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

/// Geocoder backed by Nominatim.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    search_url: Url,
    timeout: Duration,
}

impl NominatimGeocoder {
    /// Create a geocoder for `base_url` with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client fails to
    /// build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderBuildError> {
        Self::with_config(NominatimConfig::new(base_url))
    }

    /// Create a geocoder with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client fails to
    /// build.
    pub fn with_config(config: NominatimConfig) -> Result<Self, ProviderBuildError> {
        let base = parse_base_url(&config.base_url)?;
        Ok(Self {
            client: build_client(&config.user_agent, config.timeout)?,
            search_url: join_path(&base, &["search"]),
            timeout: config.timeout,
        })
    }

    fn search_url(&self, address: &str) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("q", address)
            .append_pair("format", "json")
            .append_pair("limit", "1");
        url
    }

    fn convert_reqwest_error(
        &self,
        error: &reqwest::Error,
        address: &str,
        url: &Url,
    ) -> GeocodeError {
        if error.is_timeout() {
            return GeocodeError::Timeout {
                address: address.to_owned(),
                timeout_secs: self.timeout.as_secs(),
            };
        }

        if let Some(status) = error.status() {
            return GeocodeError::HttpError {
                url: url.to_string(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }

        GeocodeError::NetworkError {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Take the first place of a Nominatim answer.
fn first_coordinate(address: &str, places: Vec<Place>) -> Result<Coord<f64>, GeocodeError> {
    let place = places
        .into_iter()
        .next()
        .ok_or_else(|| GeocodeError::NotFound {
            address: address.to_owned(),
        })?;
    let parse = |raw: &str, axis: &str| {
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| GeocodeError::ParseError {
                message: format!("invalid {axis} {raw:?} for {address:?}"),
            })
    };
    Ok(Coord {
        x: parse(&place.lon, "longitude")?,
        y: parse(&place.lat, "latitude")?,
    })
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<Coord<f64>, GeocodeError> {
        let url = self.search_url(address);
        debug!("geocoding {address:?} via {}", self.search_url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, address, &url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, address, &url))?;

        let places: Vec<Place> = response
            .json()
            .await
            .map_err(|err| GeocodeError::ParseError {
                message: err.to_string(),
            })?;

        first_coordinate(address, places)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn place(lat: &str, lon: &str) -> Place {
        Place {
            lat: lat.to_owned(),
            lon: lon.to_owned(),
        }
    }

    #[rstest]
    fn search_url_carries_query_parameters() {
        let geocoder = NominatimGeocoder::new("http://geo.example.com/").expect("geocoder builds");
        let url = geocoder.search_url("Columbus, OH");
        assert_eq!(
            url.as_str(),
            "http://geo.example.com/search?q=Columbus%2C+OH&format=json&limit=1"
        );
    }

    #[rstest]
    fn first_place_wins() {
        let coord = first_coordinate("x", vec![place("39.96", "-83.0"), place("0", "0")])
            .expect("coordinate");
        assert_eq!(coord, Coord { x: -83.0, y: 39.96 });
    }

    #[rstest]
    fn empty_answer_is_not_found() {
        let err = first_coordinate("Nowhere", Vec::new()).expect_err("no places");
        assert_eq!(
            err,
            GeocodeError::NotFound {
                address: "Nowhere".into()
            }
        );
    }

    #[rstest]
    #[case("abc", "1.0")]
    #[case("1.0", "NaN")]
    fn malformed_coordinates_are_parse_errors(#[case] lat: &str, #[case] lon: &str) {
        let err = first_coordinate("x", vec![place(lat, lon)]).expect_err("bad number");
        assert!(matches!(err, GeocodeError::ParseError { .. }));
    }

    #[rstest]
    fn config_builder_pattern() {
        let config = NominatimConfig::new("http://example.com")
            .with_timeout(Duration::from_secs(3))
            .with_user_agent("test-agent/1.0");

        assert_eq!(config.base_url, "http://example.com");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.user_agent, "test-agent/1.0");
    }
}
