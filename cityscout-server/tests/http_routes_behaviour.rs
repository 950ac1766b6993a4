//! Behavioural tests for routing `/suggestions` requests.

use std::cell::RefCell;

use cityscout_core::{
    CatalogError, CatalogFields, CatalogReader, CityRecord, FuzzyPattern, SuggestionEngine,
    test_support::{FailingCatalog, MemoryCatalog},
};
use cityscout_server::{HttpResponse, RequestHead, Router};
use geo::coord;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Value;
use url::form_urlencoded;

/// Either catalog, so one world serves every scenario.
enum AnyCatalog {
    Memory(MemoryCatalog),
    Failing(FailingCatalog),
}

impl CatalogReader for AnyCatalog {
    fn fetch(
        &self,
        pattern: &FuzzyPattern,
        fields: CatalogFields,
    ) -> Result<Vec<CityRecord>, CatalogError> {
        match self {
            Self::Memory(catalog) => catalog.fetch(pattern, fields),
            Self::Failing(catalog) => catalog.fetch(pattern, fields),
        }
    }
}

struct RoutesWorld {
    router: RefCell<Option<Router<AnyCatalog>>>,
    response: RefCell<Option<HttpResponse>>,
}

impl RoutesWorld {
    fn install(&self, catalog: AnyCatalog) {
        self.router
            .replace(Some(Router::new(SuggestionEngine::new(catalog))));
    }

    fn get(&self, target: &str) {
        let router = self.router.borrow();
        let head = RequestHead {
            method: "GET".to_owned(),
            target: target.to_owned(),
        };
        let response = router.as_ref().expect("router installed").handle(&head);
        self.response.replace(Some(response));
    }

    fn body_json(&self) -> Value {
        let response = self.response.borrow();
        let body = response.as_ref().expect("response recorded").body();
        serde_json::from_str(body).expect("json body")
    }
}

#[fixture]
fn world() -> RoutesWorld {
    RoutesWorld {
        router: RefCell::new(None),
        response: RefCell::new(None),
    }
}

#[given("a server over Montreal, Montpelier and Monticello")]
fn populated_server(world: &RoutesWorld) {
    world.install(AnyCatalog::Memory(MemoryCatalog::with_cities([
        CityRecord::new("Montreal", coord! { x: -73.58781, y: 45.50884 })
            .with_population(1_780_000),
        CityRecord::new("Montpelier", coord! { x: -72.57539, y: 44.26006 })
            .with_population(7_500),
        CityRecord::new("Monticello", coord! { x: -74.68988, y: 41.65565 })
            .with_population(1_200),
    ])));
}

#[given("a server whose catalog is down")]
fn failing_server(world: &RoutesWorld) {
    world.install(AnyCatalog::Failing(FailingCatalog::unavailable(
        "connection refused",
    )));
}

#[when("I send GET {target}")]
fn send_get(world: &RoutesWorld, target: String) {
    world.get(&target);
}

#[when("I request suggestions for {query:word}")]
fn request_suggestions(world: &RoutesWorld, query: String) {
    let payload = format!(r#"{{"name":"{}"}}"#, query.trim_matches('"'));
    let encoded: String = form_urlencoded::byte_serialize(payload.as_bytes()).collect();
    world.get(&format!("/suggestions?q={encoded}"));
}

#[then("the response status is {status}")]
fn response_status(world: &RoutesWorld, status: u16) {
    let response = world.response.borrow();
    assert_eq!(
        response.as_ref().expect("response recorded").status(),
        status
    );
}

#[then("the body explains the input format")]
fn body_is_usage(world: &RoutesWorld) {
    let response = world.response.borrow();
    let response = response.as_ref().expect("response recorded");
    assert!(response.content_type().starts_with("text/html"));
    assert!(response.body().contains("Input format"));
}

#[then("the suggestion names are Montreal, Montpelier and Monticello")]
fn suggestion_names(world: &RoutesWorld) {
    let body = world.body_json();
    let names: Vec<_> = body["suggestions"]
        .as_array()
        .expect("suggestions array")
        .iter()
        .map(|suggestion| suggestion["name"].as_str().expect("name"))
        .map(str::to_owned)
        .collect();
    assert_eq!(names, ["Montreal", "Montpelier", "Monticello"]);
    assert_eq!(body["suggestions"][0]["score"], "0.5000");
}

#[then("the body carries an error message")]
fn body_is_error(world: &RoutesWorld) {
    assert!(world.body_json()["error"].is_string());
}

#[scenario(path = "tests/features/http_routes.feature", index = 0)]
fn usage_without_query(world: RoutesWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/http_routes.feature", index = 1)]
fn sorted_suggestions(world: RoutesWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/http_routes.feature", index = 2)]
fn missing_name(world: RoutesWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/http_routes.feature", index = 3)]
fn catalog_unavailable(world: RoutesWorld) {
    let _ = world;
}
