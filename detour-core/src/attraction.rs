//! Attractions: the points of interest a trip is curated from.

use std::fmt;
use std::str::FromStr;

use geo::Coord;
use thiserror::Error;

/// Category reported for attractions that carry no category of their own.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Stable attraction identifier of the form `<kind>/<numeric>`.
///
/// The kind is a lowercase ASCII word such as `node`, `way` or `relation`
/// and the numeric part is a run of ASCII digits.
///
/// # Examples
/// ```
/// use detour_core::AttractionId;
///
/// let id = AttractionId::parse("node/42")?;
/// assert_eq!(id.kind(), "node");
/// assert_eq!(id.as_str(), "node/42");
/// # Ok::<(), detour_core::AttractionIdError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttractionId(String);

/// Errors returned by [`AttractionId::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttractionIdError {
    /// The identifier has no `/` separator.
    #[error("attraction id {raw:?} must have the form <kind>/<numeric>")]
    MissingSeparator {
        /// Identifier as supplied.
        raw: String,
    },
    /// The kind before the separator is empty or not a lowercase word.
    #[error("attraction id {raw:?} has an invalid kind")]
    InvalidKind {
        /// Identifier as supplied.
        raw: String,
    },
    /// The part after the separator is empty or not all digits.
    #[error("attraction id {raw:?} has a non-numeric suffix")]
    InvalidNumber {
        /// Identifier as supplied.
        raw: String,
    },
}

impl AttractionId {
    /// Validate and construct an identifier.
    pub fn parse(raw: &str) -> Result<Self, AttractionIdError> {
        let trimmed = raw.trim();
        let Some((kind, number)) = trimmed.split_once('/') else {
            return Err(AttractionIdError::MissingSeparator {
                raw: raw.to_owned(),
            });
        };
        if kind.is_empty() || !kind.bytes().all(|b| b.is_ascii_lowercase() || b == b'_') {
            return Err(AttractionIdError::InvalidKind {
                raw: raw.to_owned(),
            });
        }
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AttractionIdError::InvalidNumber {
                raw: raw.to_owned(),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Identifier text, e.g. `"node/42"`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The kind prefix, e.g. `"node"`.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.0.split_once('/').map_or("", |(kind, _)| kind)
    }
}

impl fmt::Display for AttractionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AttractionId {
    type Err = AttractionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AttractionId {
    type Error = AttractionIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AttractionId> for String {
    fn from(id: AttractionId) -> Self {
        id.0
    }
}

/// Aggregated visitor rating, displayed read-only.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RatingAggregate {
    /// Mean rating across all reviews.
    pub average: f32,
    /// Number of reviews contributing to the mean.
    pub count: u32,
}

/// A location worth visiting along a trip.
///
/// Identity is the [`AttractionId`]; every other field is display data and
/// the most recently observed copy wins. Coordinates are WGS84 with
/// `x = longitude` and `y = latitude`.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use detour_core::{Attraction, AttractionId};
///
/// let id = AttractionId::parse("node/1")?;
/// let museum = Attraction::new(id, "Museum", Coord { x: -0.12, y: 51.5 })
///     .with_category("museum");
/// assert_eq!(museum.category_label(), "museum");
/// # Ok::<(), detour_core::AttractionIdError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Attraction {
    /// Stable identity.
    pub id: AttractionId,
    /// Display name.
    pub name: String,
    /// Geospatial position.
    pub location: Coord<f64>,
    /// Free-form category such as `museum` or `viewpoint`.
    pub category: Option<String>,
    /// Visitor rating summary.
    pub rating: RatingAggregate,
    /// Public website, if known.
    pub website_url: Option<String>,
}

impl Attraction {
    /// Construct an uncategorised attraction without rating or website.
    pub fn new(id: AttractionId, name: impl Into<String>, location: Coord<f64>) -> Self {
        Self {
            id,
            name: name.into(),
            location,
            category: None,
            rating: RatingAggregate::default(),
            website_url: None,
        }
    }

    /// Set the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the rating summary.
    #[must_use]
    pub const fn with_rating(mut self, rating: RatingAggregate) -> Self {
        self.rating = rating;
        self
    }

    /// Set the website.
    #[must_use]
    pub fn with_website(mut self, url: impl Into<String>) -> Self {
        self.website_url = Some(url.into());
        self
    }

    /// Category used for filtering and ordering; falls back to
    /// [`UNCATEGORIZED`].
    #[must_use]
    pub fn category_label(&self) -> &str {
        self.category
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(UNCATEGORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("node/1")]
    #[case("way/123456789")]
    #[case(" relation/7 ")]
    fn parses_well_formed_ids(#[case] raw: &str) {
        let id = AttractionId::parse(raw).expect("valid id");
        assert_eq!(id.as_str(), raw.trim());
    }

    #[rstest]
    #[case("node", AttractionIdError::MissingSeparator { raw: "node".into() })]
    #[case("/1", AttractionIdError::InvalidKind { raw: "/1".into() })]
    #[case("Node/1", AttractionIdError::InvalidKind { raw: "Node/1".into() })]
    #[case("node/", AttractionIdError::InvalidNumber { raw: "node/".into() })]
    #[case("node/1a", AttractionIdError::InvalidNumber { raw: "node/1a".into() })]
    fn rejects_malformed_ids(#[case] raw: &str, #[case] expected: AttractionIdError) {
        assert_eq!(AttractionId::parse(raw), Err(expected));
    }

    #[rstest]
    fn kind_is_prefix() {
        let id: AttractionId = "way/9".parse().expect("valid id");
        assert_eq!(id.kind(), "way");
    }

    #[rstest]
    #[case(None, UNCATEGORIZED)]
    #[case(Some("  "), UNCATEGORIZED)]
    #[case(Some("museum"), "museum")]
    fn category_label_falls_back(#[case] category: Option<&str>, #[case] expected: &str) {
        let id = AttractionId::parse("node/1").expect("valid id");
        let mut attraction = Attraction::new(id, "A", Coord { x: 0.0, y: 0.0 });
        attraction.category = category.map(str::to_owned);
        assert_eq!(attraction.category_label(), expected);
    }
}
