//! Behavioural tests for [`CorridorSearchService`].

use std::cell::RefCell;

use detour_core::test_support::{MemoryStore, StubGeocoder, attraction};
use detour_core::{
    Attraction, CorridorQuery, CorridorSearchService, Endpoint, SearchError, SearchResult,
};
use geo::Coord;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

type ResultCell = RefCell<Option<Result<SearchResult, SearchError>>>;

#[fixture]
fn store() -> RefCell<MemoryStore> {
    RefCell::new(MemoryStore::default())
}

#[fixture]
fn geocoder() -> RefCell<StubGeocoder> {
    RefCell::new(
        StubGeocoder::default()
            .with_place("Start", Coord { x: 0.0, y: 0.0 })
            .with_place("End", Coord { x: 0.1, y: 0.0 }),
    )
}

#[fixture]
fn result() -> ResultCell {
    RefCell::new(None)
}

fn query(radius_km: f64, limit: i64) -> CorridorQuery {
    CorridorQuery::new(
        Endpoint::Address("Start".into()),
        Endpoint::Address("End".into()),
        radius_km,
        limit,
    )
}

fn run(
    store: &RefCell<MemoryStore>,
    geocoder: &RefCell<StubGeocoder>,
    query: &CorridorQuery,
) -> Result<SearchResult, SearchError> {
    let service = CorridorSearchService::new(store.borrow().clone(), geocoder.borrow().clone());
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime builds")
        .block_on(service.search(query))
}

// --- Given steps ---

#[given("twelve attractions inside the corridor")]
fn twelve_inside(#[from(store)] store: &RefCell<MemoryStore>) {
    const CATEGORIES: [&str; 3] = ["museum", "Park", "gallery"];
    let attractions = (0..12).map(|i| {
        let lon = 0.005 + f64::from(i) * 0.008;
        let category = CATEGORIES[usize::try_from(i).expect("small index") % CATEGORIES.len()];
        attraction(&format!("node/{}", 100 - i), &format!("Stop {:02}", 12 - i), 0.001, lon)
            .with_category(category)
    });
    *store.borrow_mut() = MemoryStore::with_attractions(attractions);
}

#[given("an attraction far from the corridor")]
fn far_away(#[from(store)] store: &RefCell<MemoryStore>) {
    *store.borrow_mut() =
        MemoryStore::with_attractions([attraction("node/9", "Elsewhere", 0.5, 0.05)]);
}

// --- When steps ---

#[when("I search with a limit of 10")]
fn search_limit(
    #[from(store)] store: &RefCell<MemoryStore>,
    #[from(geocoder)] geocoder: &RefCell<StubGeocoder>,
    #[from(result)] result: &ResultCell,
) {
    *result.borrow_mut() = Some(run(store, geocoder, &query(2.0, 10)));
}

#[when("I search for the category \"MUSEUM\"")]
fn search_museum(
    #[from(store)] store: &RefCell<MemoryStore>,
    #[from(geocoder)] geocoder: &RefCell<StubGeocoder>,
    #[from(result)] result: &ResultCell,
) {
    let query = query(2.0, 50).with_categories(["MUSEUM"]);
    *result.borrow_mut() = Some(run(store, geocoder, &query));
}

#[when("I search with a radius of 0")]
fn search_zero_radius(
    #[from(store)] store: &RefCell<MemoryStore>,
    #[from(geocoder)] geocoder: &RefCell<StubGeocoder>,
    #[from(result)] result: &ResultCell,
) {
    *result.borrow_mut() = Some(run(store, geocoder, &query(0.0, 10)));
}

// --- Then steps ---

fn candidates(result: &ResultCell) -> Vec<Attraction> {
    let borrowed = result.borrow();
    borrowed
        .as_ref()
        .expect("search must have run")
        .as_ref()
        .expect("expected Ok result")
        .candidates
        .clone()
}

#[then("10 attractions are returned")]
fn ten_returned(#[from(result)] result: &ResultCell) {
    assert_eq!(candidates(result).len(), 10);
}

#[then("they are ordered by category, name and id")]
fn ordered(#[from(result)] result: &ResultCell) {
    let keys: Vec<_> = candidates(result)
        .iter()
        .map(|a| {
            (
                a.category_label().to_owned(),
                a.name.clone(),
                a.id.as_str().to_owned(),
            )
        })
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[then("every returned attraction is a museum")]
fn all_museums(#[from(result)] result: &ResultCell) {
    let found = candidates(result);
    assert_eq!(found.len(), 4, "one in three attractions is a museum");
    assert!(found.iter().all(|a| a.category_label() == "museum"));
}

#[then("no attractions are returned")]
fn none_returned(#[from(result)] result: &ResultCell) {
    assert!(candidates(result).is_empty());
}

#[then("a validation error is returned")]
fn validation_error(#[from(result)] result: &ResultCell) {
    let borrowed = result.borrow();
    assert!(
        matches!(borrowed.as_ref(), Some(Err(SearchError::Validation(_)))),
        "expected validation error, got {borrowed:?}"
    );
}

#[then("the geocoder was not called")]
fn geocoder_idle(#[from(geocoder)] geocoder: &RefCell<StubGeocoder>) {
    assert_eq!(geocoder.borrow().calls(), 0);
}

// --- Scenario registrations ---

macro_rules! register_scenario {
    ($fn_name:ident, $title:literal) => {
        #[scenario(path = "tests/features/corridor_search.feature", name = $title)]
        fn $fn_name(
            store: RefCell<MemoryStore>,
            geocoder: RefCell<StubGeocoder>,
            result: ResultCell,
        ) {
            let _ = (store, geocoder, result);
        }
    };
}

register_scenario!(limiting_in_category_order, "limiting results in category order");
register_scenario!(filtering_ignores_case, "filtering by category ignores case");
register_scenario!(ignoring_outside_corridor, "attractions outside the corridor are ignored");
register_scenario!(rejecting_zero_radius, "rejecting a zero radius");
