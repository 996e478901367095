//! Behavioural tests for [`OsrmTripOptimizer`] against a local responder.

mod support;

use std::cell::RefCell;

use detour_core::{OptimizationProblem, OptimizedRoute, RouteOptimizer, RouteProviderError};
use detour_data::routing::OsrmTripOptimizer;
use geo::Coord;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use support::{OneShotServer, block_on, closed_port_url};

type ResultCell = RefCell<Option<Result<OptimizedRoute, RouteProviderError>>>;

/// Where the optimiser sends its request.
enum Service {
    Unset,
    Running(OneShotServer),
    Down(String),
}

impl Service {
    fn base_url(&self) -> String {
        match self {
            Self::Unset => panic!("service must be initialised"),
            Self::Running(server) => server.base_url.clone(),
            Self::Down(url) => url.clone(),
        }
    }
}

const TRIP_BODY: &str = r#"{
    "code": "Ok",
    "waypoints": [
        {"waypoint_index": 0, "trips_index": 0, "location": [-0.1001, 51.5001]},
        {"waypoint_index": 2, "trips_index": 0, "location": [-0.2001, 51.6001]},
        {"waypoint_index": 1, "trips_index": 0, "location": [-0.3001, 51.7001]},
        {"waypoint_index": 3, "trips_index": 0, "location": [-0.4001, 51.8001]}
    ],
    "trips": []
}"#;

#[fixture]
fn service() -> RefCell<Service> {
    RefCell::new(Service::Unset)
}

#[fixture]
fn result() -> ResultCell {
    RefCell::new(None)
}

fn problem() -> OptimizationProblem {
    OptimizationProblem {
        origin: Coord { x: -0.1, y: 51.5 },
        destination: Coord { x: -0.4, y: 51.8 },
        waypoints: vec![Coord { x: -0.2, y: 51.6 }, Coord { x: -0.3, y: 51.7 }],
    }
}

fn running(status: &str, body: &str) -> Service {
    Service::Running(OneShotServer::start(status, body).expect("loopback sockets available"))
}

// --- Given steps ---

#[given("a routing service that visits the second waypoint first")]
fn service_ok(#[from(service)] service: &RefCell<Service>) {
    *service.borrow_mut() = running("200 OK", TRIP_BODY);
}

#[given("a routing service that finds no trip")]
fn service_no_trip(#[from(service)] service: &RefCell<Service>) {
    *service.borrow_mut() = running(
        "200 OK",
        r#"{"code": "NoTrips", "message": "No trip visiting all destinations possible."}"#,
    );
}

#[given("a routing service that answers with status 503")]
fn service_unavailable(#[from(service)] service: &RefCell<Service>) {
    *service.borrow_mut() = running("503 Service Unavailable", "{}");
}

#[given("a routing service that is not running")]
fn service_down(#[from(service)] service: &RefCell<Service>) {
    *service.borrow_mut() = Service::Down(closed_port_url());
}

// --- When steps ---

#[when("I optimise a route with two waypoints")]
fn optimise(#[from(service)] service: &RefCell<Service>, #[from(result)] result: &ResultCell) {
    let optimizer =
        OsrmTripOptimizer::new(service.borrow().base_url()).expect("optimizer should build");
    *result.borrow_mut() = Some(block_on(optimizer.optimize(&problem())));
}

// --- Then steps ---

fn route(result: &ResultCell) -> OptimizedRoute {
    result
        .borrow()
        .clone()
        .expect("optimisation must have run")
        .expect("expected Ok result")
}

fn error(result: &ResultCell) -> RouteProviderError {
    result
        .borrow()
        .clone()
        .expect("optimisation must have run")
        .expect_err("expected an error")
}

#[then("the waypoint order is 1, 0")]
fn then_order(#[from(result)] result: &ResultCell) {
    assert_eq!(route(result).waypoint_order, vec![1, 0]);
}

#[then("the path follows the snapped locations")]
fn then_path(#[from(result)] result: &ResultCell) {
    let path = route(result).path;
    assert_eq!(path.len(), 4);
    assert_eq!(path[1], Coord { x: -0.3001, y: 51.7001 });
    assert_eq!(path[2], Coord { x: -0.2001, y: 51.6001 });
}

#[then("the request keeps the first and last stops fixed")]
fn then_request(#[from(service)] service: &RefCell<Service>) {
    let borrowed = service.borrow();
    let Service::Running(server) = &*borrowed else {
        panic!("expected a running service");
    };
    let line = server.request_line();
    assert!(
        line.starts_with(
            "GET /trip/v1/driving/-0.1,51.5;-0.2,51.6;-0.3,51.7;-0.4,51.8?source=first&destination=last&roundtrip=false"
        ),
        "unexpected request line {line}"
    );
}

#[then("a service error with code \"NoTrips\" is returned")]
fn then_service_error(#[from(result)] result: &ResultCell) {
    assert!(
        matches!(error(result), RouteProviderError::ServiceError { ref code, .. } if code == "NoTrips")
    );
}

#[then("an HTTP error with status 503 is returned")]
fn then_http_error(#[from(result)] result: &ResultCell) {
    assert!(matches!(
        error(result),
        RouteProviderError::HttpError { status: 503, .. }
    ));
}

#[then("a network error is returned")]
fn then_network_error(#[from(result)] result: &ResultCell) {
    let err = error(result);
    assert!(
        matches!(err, RouteProviderError::NetworkError { .. }),
        "expected NetworkError, got {err:?}"
    );
}

// --- Scenario registrations ---

macro_rules! register_scenario {
    ($fn_name:ident, $title:literal) => {
        #[scenario(path = "tests/features/osrm_trip.feature", name = $title)]
        fn $fn_name(service: RefCell<Service>, result: ResultCell) {
            let _ = (service, result);
        }
    };
}

register_scenario!(ordering_waypoints, "ordering waypoints from a trip response");
register_scenario!(surfacing_service_error, "surfacing a service error");
register_scenario!(surfacing_http_error, "surfacing an HTTP error status");
register_scenario!(surfacing_unreachable, "surfacing an unreachable service");
