//! JSON request and response documents exchanged by the subcommands.

use camino::Utf8Path;
use detour_core::{
    Attraction, AttractionId, CorridorQuery, Endpoint, EndpointRole, OrderedStop, SearchResult,
};
use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::CliError;

/// An endpoint given either as `{"lat": .., "lon": ..}` or as free text.
///
/// Text holding a `lat,lon` pair is treated as a coordinate; anything else
/// is geocoded.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub(crate) enum EndpointInput {
    Coordinate { lat: f64, lon: f64 },
    Text(String),
}

impl EndpointInput {
    fn resolve(&self, role: EndpointRole, path: &Utf8Path) -> Result<Endpoint, CliError> {
        let endpoint = match self {
            Self::Coordinate { lat, lon } => Endpoint::from_lat_lon(*lat, *lon, role),
            Self::Text(raw) => Endpoint::parse(raw, role),
        };
        endpoint.map_err(|source| CliError::InvalidRequest {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Body of `detour search`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub(crate) struct SearchRequest {
    pub(crate) start: EndpointInput,
    pub(crate) end: EndpointInput,
    pub(crate) radius_km: f64,
    pub(crate) limit: i64,
    #[serde(default)]
    pub(crate) categories: Vec<String>,
    #[serde(default)]
    pub(crate) trashed_ids: Vec<String>,
}

impl SearchRequest {
    /// Convert into a corridor query, reporting problems against `path`.
    pub(crate) fn into_query(self, path: &Utf8Path) -> Result<CorridorQuery, CliError> {
        let start = self.start.resolve(EndpointRole::Start, path)?;
        let end = self.end.resolve(EndpointRole::End, path)?;
        let trashed = parse_ids(&self.trashed_ids, path)?;
        Ok(CorridorQuery::new(start, end, self.radius_km, self.limit)
            .with_categories(self.categories)
            .with_excluded_ids(trashed))
    }
}

/// Body of `detour optimize`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub(crate) struct OptimizeRequest {
    pub(crate) attraction_ids: Vec<String>,
    #[serde(default)]
    pub(crate) departure: Option<EndpointInput>,
    #[serde(default)]
    pub(crate) arrival: Option<EndpointInput>,
}

impl OptimizeRequest {
    pub(crate) fn ids(&self, path: &Utf8Path) -> Result<Vec<AttractionId>, CliError> {
        parse_ids(&self.attraction_ids, path)
    }

    pub(crate) fn departure(&self, path: &Utf8Path) -> Result<Option<Endpoint>, CliError> {
        self.departure
            .as_ref()
            .map(|input| input.resolve(EndpointRole::Start, path))
            .transpose()
    }

    pub(crate) fn arrival(&self, path: &Utf8Path) -> Result<Option<Endpoint>, CliError> {
        self.arrival
            .as_ref()
            .map(|input| input.resolve(EndpointRole::End, path))
            .transpose()
    }
}

fn parse_ids(raw: &[String], path: &Utf8Path) -> Result<Vec<AttractionId>, CliError> {
    raw.iter()
        .map(|id| {
            AttractionId::parse(id).map_err(|source| CliError::InvalidAttractionId {
                path: path.to_path_buf(),
                source,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub(crate) struct LatLon {
    pub(crate) lat: f64,
    pub(crate) lon: f64,
}

impl From<Coord<f64>> for LatLon {
    fn from(coord: Coord<f64>) -> Self {
        Self {
            lat: coord.y,
            lon: coord.x,
        }
    }
}

/// One attraction row of a search answer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub(crate) struct AttractionRecord {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) lat: f64,
    pub(crate) lon: f64,
    pub(crate) category: String,
    pub(crate) average_rating: f32,
    pub(crate) rating_count: u32,
    pub(crate) website_url: Option<String>,
}

impl From<&Attraction> for AttractionRecord {
    fn from(attraction: &Attraction) -> Self {
        Self {
            id: attraction.id.as_str().to_owned(),
            name: attraction.name.clone(),
            lat: attraction.location.y,
            lon: attraction.location.x,
            category: attraction.category_label().to_owned(),
            average_rating: attraction.rating.average,
            rating_count: attraction.rating.count,
            website_url: attraction.website_url.clone(),
        }
    }
}

/// Answer of `detour search`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub(crate) struct SearchResponse {
    pub(crate) rows: Vec<AttractionRecord>,
    pub(crate) start: LatLon,
    pub(crate) end: LatLon,
    pub(crate) unique_categories: Vec<String>,
}

impl From<&SearchResult> for SearchResponse {
    fn from(result: &SearchResult) -> Self {
        Self {
            rows: result.candidates.iter().map(AttractionRecord::from).collect(),
            start: result.start.into(),
            end: result.end.into(),
            unique_categories: result.unique_categories.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub(crate) struct StopRecord {
    pub(crate) lat: f64,
    pub(crate) lon: f64,
    pub(crate) name: String,
}

impl From<&OrderedStop> for StopRecord {
    fn from(stop: &OrderedStop) -> Self {
        Self {
            lat: stop.location.y,
            lon: stop.location.x,
            name: stop.name.clone(),
        }
    }
}

/// Answer of `detour optimize`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub(crate) struct OptimizeResponse {
    pub(crate) ordered_stops: Vec<StopRecord>,
    pub(crate) degraded: bool,
}
