//! Address geocoding through a Nominatim service.
//!
//! [`NominatimGeocoder`] implements [`detour_core::Geocoder`] against the
//! Nominatim `/search` endpoint, taking the first match.
//!
//! # Example
//!
//! ```no_run
//! use detour_core::Geocoder;
//! use detour_data::geocoding::{NominatimConfig, NominatimGeocoder};
//! use std::time::Duration;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = NominatimConfig::new("https://nominatim.openstreetmap.org")
//!     .with_timeout(Duration::from_secs(5))
//!     .with_user_agent("my-app/1.0 (me@example.com)");
//! let geocoder = NominatimGeocoder::with_config(config)?;
//! let coord = geocoder.geocode("Columbus, OH").await?;
//! println!("lat {} lon {}", coord.y, coord.x);
//! # Ok(())
//! # }
//! ```

mod nominatim;

pub use nominatim::{DEFAULT_NOMINATIM_URL, NominatimConfig, NominatimGeocoder};
