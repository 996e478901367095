//! Read access to persisted attractions.
//!
//! The [`AttractionStore`] trait is the spatial query seam used by the
//! corridor search: a bounding-box pre-filter followed by an exact corridor
//! test in the caller. Stores also answer id lookups so that sequencing can
//! resolve a selection without a second search.

use geo::Rect;

use crate::{Attraction, AttractionId};

#[cfg(feature = "store-sqlite")]
mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use sqlite::{SqliteAttractionStore, SqliteAttractionStoreError};

/// Read-only access to persisted attractions.
///
/// Coordinates use WGS84 (`x = longitude`, `y = latitude`).
///
/// # Examples
///
/// ```rust
/// use geo::{Coord, Intersects, Rect};
/// use detour_core::{Attraction, AttractionId, AttractionStore};
///
/// struct Single(Attraction);
///
/// impl AttractionStore for Single {
///     fn attractions_in_bbox(
///         &self,
///         bbox: &Rect<f64>,
///     ) -> Box<dyn Iterator<Item = Attraction> + Send + '_> {
///         let hit = bbox.intersects(&self.0.location).then(|| self.0.clone());
///         Box::new(hit.into_iter())
///     }
///
///     fn attractions_by_id(&self, ids: &[AttractionId]) -> Vec<Attraction> {
///         ids.iter()
///             .filter(|id| **id == self.0.id)
///             .map(|_| self.0.clone())
///             .collect()
///     }
/// }
///
/// let id = AttractionId::parse("node/1")?;
/// let store = Single(Attraction::new(id, "Fountain", Coord { x: 0.0, y: 0.0 }));
/// let bbox = Rect::new(Coord { x: -1.0, y: -1.0 }, Coord { x: 1.0, y: 1.0 });
/// assert_eq!(store.attractions_in_bbox(&bbox).count(), 1);
/// # Ok::<(), detour_core::AttractionIdError>(())
/// ```
pub trait AttractionStore {
    /// Return all attractions within the bounding box, boundary inclusive.
    ///
    /// The rectangle is axis-aligned in lon/lat space. Regions crossing the
    /// antimeridian are not modelled; [`crate::Corridor`] rejects buffers that
    /// would need one.
    fn attractions_in_bbox(
        &self,
        bbox: &Rect<f64>,
    ) -> Box<dyn Iterator<Item = Attraction> + Send + '_>;

    /// Look up attractions by id. Unknown ids are skipped; the result follows
    /// the order of `ids`.
    fn attractions_by_id(&self, ids: &[AttractionId]) -> Vec<Attraction>;
}

impl<T: AttractionStore + ?Sized> AttractionStore for Box<T> {
    fn attractions_in_bbox(
        &self,
        bbox: &Rect<f64>,
    ) -> Box<dyn Iterator<Item = Attraction> + Send + '_> {
        (**self).attractions_in_bbox(bbox)
    }

    fn attractions_by_id(&self, ids: &[AttractionId]) -> Vec<Attraction> {
        (**self).attractions_by_id(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::AttractionStore;
    use crate::test_support::{MemoryStore, attraction};
    use crate::AttractionId;
    use geo::{Coord, Rect};
    use rstest::rstest;

    #[rstest]
    fn boxed_store_delegates() {
        let store: Box<dyn AttractionStore> = Box::new(MemoryStore::with_attractions([
            attraction("node/1", "Inside", 0.5, 0.5),
            attraction("node/2", "Outside", 5.0, 5.0),
        ]));
        let bbox = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 });
        let found: Vec<_> = store.attractions_in_bbox(&bbox).map(|a| a.name).collect();
        assert_eq!(found, vec!["Inside"]);
    }

    #[rstest]
    fn lookup_by_id_follows_request_order() {
        let store = MemoryStore::with_attractions([
            attraction("node/1", "First", 0.0, 0.0),
            attraction("node/2", "Second", 1.0, 1.0),
        ]);
        let ids = ["node/2", "node/9", "node/1"].map(|raw| AttractionId::parse(raw).expect("id"));
        let found: Vec<_> = store
            .attractions_by_id(&ids)
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(found, vec!["Second", "First"]);
    }
}
