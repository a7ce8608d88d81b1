//! Integration tests for the flats HTTP endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` over the
//! in-memory catalog, without starting a TCP server.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use flats_api::router::build_router;
use flats_api::state::AppState;
use flats_core::Services;
use flats_db::Catalog;
use serde_json::{Value, json};
use tower::ServiceExt;

fn make_app() -> Router {
    let services = Services::new(&Catalog::in_memory(), Duration::from_secs(5));
    build_router(Arc::new(AppState::new(services)))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    call(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn send_json(app: &Router, method: Method, uri: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    call(app, request).await
}

async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    call(
        app,
        Request::delete(uri).body(Body::empty()).unwrap(),
    )
    .await
}

fn flat(name: &str, price: i64, rooms: i32, balcony: Option<bool>) -> Value {
    json!({
        "name": name,
        "coordinates": { "x": 10, "y": 20 },
        "area": 60,
        "price": price,
        "balcony": balcony,
        "timeToMetroOnFoot": 7,
        "numberOfRooms": rooms,
        "livingSpace": 40,
        "furnish": "FINE",
        "view": "PARK"
    })
}

async fn create_flat(app: &Router, body: &Value) -> Value {
    let (status, json) = send_json(app, Method::POST, "/flats", body).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json
}

// ---------------------------------------------------------------------------
// Flats CRUD
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_assigns_distinct_ids() {
    let app = make_app();
    let a = create_flat(&app, &flat("A", 100, 2, None)).await;
    let b = create_flat(&app, &flat("B", 100, 2, None)).await;
    assert!(a["id"].is_i64());
    assert_ne!(a["id"], b["id"]);
    assert!(a["creationDate"].is_string());
}

#[tokio::test]
async fn create_then_read_is_equal() {
    let app = make_app();
    let created = create_flat(&app, &flat("Loft", 1234, 3, Some(true))).await;
    let id = created["id"].as_i64().unwrap();

    let (status, read) = get(&app, &format!("/flats/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read, created);
    assert_eq!(read["name"], "Loft");
    assert_eq!(read["coordinates"]["y"], 20);
    assert_eq!(read["furnish"], "FINE");
    assert_eq!(read["balcony"], true);
    assert!(read["house"].is_null());
}

#[tokio::test]
async fn update_replaces_fields() {
    let app = make_app();
    let created = create_flat(&app, &flat("Old", 100, 2, None)).await;
    let id = created["id"].as_i64().unwrap();

    let (status, updated) =
        send_json(&app, Method::PUT, &format!("/flats/{id}"), &flat("New", 900, 4, Some(false)))
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], created["id"]);
    assert_eq!(updated["name"], "New");
    assert_eq!(updated["price"], 900);
    assert_eq!(updated["creationDate"], created["creationDate"]);

    let (status, _) = send_json(&app, Method::PUT, "/flats/9999", &flat("X", 1, 1, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_existing_then_missing() {
    let app = make_app();
    let created = create_flat(&app, &flat("Gone", 100, 2, None)).await;
    let uri = format!("/flats/{}", created["id"]);

    let (status, body) = delete(&app, &uri).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, body) = delete(&app, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().contains("not found"));
    assert!(body["timestamp"].is_string());

    let (status, _) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn price_boundaries() {
    let app = make_app();
    let (status, _) = send_json(&app, Method::POST, "/flats", &flat("Max", 581_208_244, 2, None)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) =
        send_json(&app, Method::POST, "/flats", &flat("Over", 581_208_245, 2, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0], "price: price must be between 1 and 581208244");
}

#[tokio::test]
async fn room_boundaries() {
    let app = make_app();
    let (status, _) = send_json(&app, Method::POST, "/flats", &flat("Big", 100, 13, None)).await;
    assert_eq!(status, StatusCode::CREATED);

    for rooms in [0, 14] {
        let (status, _) = send_json(&app, Method::POST, "/flats", &flat("Bad", 100, rooms, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "rooms = {rooms}");
    }
}

#[tokio::test]
async fn coordinate_y_lower_bound() {
    let app = make_app();
    let mut body = flat("Low", 100, 2, None);
    body["coordinates"]["y"] = json!(-515);
    let created = create_flat(&app, &body).await;
    assert_eq!(created["coordinates"]["y"], -515);

    body["coordinates"]["y"] = json!(-516);
    let (status, body) = send_json(&app, Method::POST, "/flats", &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0], "coordinates.y: y must be at least -515");
}

#[tokio::test]
async fn blank_name_rejected() {
    let app = make_app();
    let (status, body) = send_json(&app, Method::POST, "/flats", &flat("   ", 100, 2, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0], "name: name must not be blank");
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = make_app();
    let request = Request::post("/flats")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let (status, body) = call(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn missing_field_is_bad_request() {
    let app = make_app();
    let mut body = flat("Partial", 100, 2, None);
    body.as_object_mut().unwrap().remove("furnish");
    let (status, _) = send_json(&app, Method::POST, "/flats", &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_numeric_id_is_bad_request() {
    let app = make_app();
    let (status, body) = get(&app, "/flats/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pagination_metadata() {
    let app = make_app();
    for i in 0..45 {
        create_flat(&app, &flat(&format!("Flat {i}"), 100, 2, None)).await;
    }

    let (status, first) = get(&app, "/flats?page=0&size=20").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["totalElements"], 45);
    assert_eq!(first["totalPages"], 3);
    assert_eq!(first["hasNext"], true);
    assert_eq!(first["hasPrevious"], false);
    assert_eq!(first["content"].as_array().unwrap().len(), 20);

    let (_, last) = get(&app, "/flats?page=2&size=20").await;
    assert_eq!(last["hasNext"], false);
    assert_eq!(last["hasPrevious"], true);
    assert_eq!(last["content"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn page_parameters_validated() {
    let app = make_app();
    for uri in ["/flats?page=-1", "/flats?size=0", "/flats?size=101", "/flats?page=x"] {
        let (status, _) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn filters_are_conjunctive() {
    let app = make_app();
    create_flat(&app, &flat("Match", 100, 2, None)).await;

    let (_, page) = get(&app, "/flats?minPrice=50&maxRooms=3").await;
    assert_eq!(page["totalElements"], 1);
    assert_eq!(page["content"][0]["name"], "Match");

    let (_, page) = get(&app, "/flats?minPrice=150&maxRooms=3").await;
    assert_eq!(page["totalElements"], 0);
    assert!(page["content"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn filter_by_name_and_balcony() {
    let app = make_app();
    create_flat(&app, &flat("Sunny Loft", 100, 2, Some(true))).await;
    create_flat(&app, &flat("Dark Loft", 100, 2, Some(false))).await;
    create_flat(&app, &flat("Studio", 100, 1, Some(true))).await;

    let (_, page) = get(&app, "/flats?name=LOFT&hasBalcony=true").await;
    assert_eq!(page["totalElements"], 1);
    assert_eq!(page["content"][0]["name"], "Sunny Loft");
}

#[tokio::test]
async fn sort_by_price_descending() {
    let app = make_app();
    for price in [200, 500, 100] {
        create_flat(&app, &flat("F", price, 2, None)).await;
    }

    let (_, page) = get(&app, "/flats?sort=price&direction=desc").await;
    let prices: Vec<i64> = page["content"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["price"].as_i64().unwrap())
        .collect();
    assert_eq!(prices, vec![500, 200, 100]);

    let (status, _) = get(&app, "/flats?sort=colour").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Specialised flat queries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cheapest_with_balcony() {
    let app = make_app();
    let (status, _) = get(&app, "/flats/cheapest-with-balcony").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    create_flat(&app, &flat("A", 300, 2, Some(true))).await;
    let expected = create_flat(&app, &flat("B", 200, 2, Some(true))).await;
    create_flat(&app, &flat("C", 250, 2, Some(false))).await;

    let (status, body) = get(&app, "/flats/cheapest-with-balcony").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], expected["id"]);
    assert_eq!(body["price"], 200);
}

#[tokio::test]
async fn count_by_rooms() {
    let app = make_app();
    for rooms in [1, 2, 3, 4] {
        create_flat(&app, &flat("F", 100, rooms, None)).await;
    }

    let (status, body) = get(&app, "/flats/count-by-rooms?minRooms=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (status, _) = get(&app, "/flats/count-by-rooms?minRooms=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/flats/count-by-rooms").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn find_by_name_and_living_space() {
    let app = make_app();
    create_flat(&app, &flat("Riverside", 100, 2, None)).await;
    create_flat(&app, &flat("Hillside", 100, 2, None)).await;

    let (status, body) = get(&app, "/flats/by-name?substring=RIVER").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = get(&app, "/flats/by-name?substring=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = get(&app, "/flats/by-living-space?maxSpace=41").await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    let (_, body) = get(&app, "/flats/by-living-space?maxSpace=40").await;
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = get(&app, "/flats/by-living-space?maxSpace=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sorted_by_metro_time() {
    let app = make_app();
    for minutes in [15, 3, 9] {
        let mut body = flat("F", 100, 2, None);
        body["timeToMetroOnFoot"] = json!(minutes);
        create_flat(&app, &body).await;
    }

    let (_, body) = get(&app, "/flats/sorted-by-metro-time").await;
    let minutes: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["timeToMetroOnFoot"].as_i64().unwrap())
        .collect();
    assert_eq!(minutes, vec![3, 9, 15]);
}

// ---------------------------------------------------------------------------
// Houses
// ---------------------------------------------------------------------------

#[tokio::test]
async fn house_crud_and_flat_link() {
    let app = make_app();
    let (status, house) = send_json(
        &app,
        Method::POST,
        "/houses",
        &json!({ "name": "Tower", "year": 1999, "numberOfFlatsOnFloor": 6 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let house_id = house["id"].as_i64().unwrap();

    let mut body = flat("Linked", 100, 2, None);
    body["houseId"] = json!(house_id);
    let linked = create_flat(&app, &body).await;
    assert_eq!(linked["house"]["name"], "Tower");

    let (status, updated) = send_json(
        &app,
        Method::PUT,
        &format!("/houses/{house_id}"),
        &json!({ "year": 2005, "numberOfFlatsOnFloor": 6 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(updated["name"].is_null());

    let (status, _) = delete(&app, &format!("/houses/{house_id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, flat) = get(&app, &format!("/flats/{}", linked["id"])).await;
    assert!(flat["house"].is_null());

    let (status, _) = get(&app, &format!("/houses/{house_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_house_id_leaves_flat_unlinked() {
    let app = make_app();
    let mut body = flat("Orphan", 100, 2, None);
    body["houseId"] = json!(424_242);
    let created = create_flat(&app, &body).await;
    assert!(created["house"].is_null());
}

#[tokio::test]
async fn house_validation_and_search() {
    let app = make_app();
    let (status, _) = send_json(
        &app,
        Method::POST,
        "/houses",
        &json!({ "name": "Bad", "year": 0, "numberOfFlatsOnFloor": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for name in ["North Tower", "South Tower", "Cottage"] {
        let (status, _) = send_json(
            &app,
            Method::POST,
            "/houses",
            &json!({ "name": name, "year": 1980, "numberOfFlatsOnFloor": 2 }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, found) = get(&app, "/houses/search?name=tower").await;
    assert_eq!(found.as_array().unwrap().len(), 2);

    let (_, page) = get(&app, "/houses?name=cott&size=5").await;
    assert_eq!(page["totalElements"], 1);
    assert_eq!(page["size"], 5);
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

#[tokio::test]
async fn import_applies_batch_and_records_history() {
    let app = make_app();
    let (status, latest) = get(&app, "/import/history/latest").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest, json!([]));

    let batch = json!([
        { "type": "HOUSE", "data": { "name": "Imported", "year": 1970, "numberOfFlatsOnFloor": 4 } },
        { "type": "FLAT", "data": flat("Imported flat", 100, 2, None) }
    ]);
    let (status, history) = send_json(&app, Method::POST, "/import", &batch).await;
    assert_eq!(status, StatusCode::CREATED, "{history}");
    // One house, plus one flat with its coordinates.
    assert_eq!(history["objectsCount"], 3);

    let (_, latest) = get(&app, "/import/history/latest?limit=1").await;
    assert_eq!(latest[0]["id"], history["id"]);

    let (status, entries) = get(&app, "/import/history?page=0&size=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entries["totalElements"], 1);
    assert_eq!(entries["size"], 10);
    assert_eq!(entries["content"][0]["id"], history["id"]);

    let (_, page) = get(&app, "/flats").await;
    assert_eq!(page["totalElements"], 1);
}

#[tokio::test]
async fn import_creates_and_links_nested_house() {
    let app = make_app();
    let mut data = flat("Nested flat", 100, 2, None);
    data["house"] = json!({ "name": "Nested house", "year": 1999, "numberOfFlatsOnFloor": 3 });
    let batch = json!([{ "type": "FLAT", "data": data }]);

    let (status, history) = send_json(&app, Method::POST, "/import", &batch).await;
    assert_eq!(status, StatusCode::CREATED, "{history}");
    assert_eq!(history["objectsCount"], 3);

    let (_, houses) = get(&app, "/houses").await;
    assert_eq!(houses["totalElements"], 1);
    let house_id = houses["content"][0]["id"].clone();

    let (_, flats) = get(&app, "/flats").await;
    let linked = &flats["content"][0]["house"];
    assert_eq!(linked["id"], house_id);
    assert_eq!(linked["name"], "Nested house");

    // A nested house id must resolve inside a batch.
    let mut data = flat("Dangling", 100, 2, None);
    data["house"] = json!(999);
    let (status, body) =
        send_json(&app, Method::POST, "/import", &json!([{ "type": "FLAT", "data": data }])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("house 999"));

    let mut data = flat("Existing", 100, 2, None);
    data["house"] = house_id.clone();
    let (status, history) =
        send_json(&app, Method::POST, "/import", &json!([{ "type": "FLAT", "data": data }])).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(history["objectsCount"], 2);
    let (_, houses) = get(&app, "/houses").await;
    assert_eq!(houses["totalElements"], 1);
}

#[tokio::test]
async fn invalid_import_writes_nothing() {
    let app = make_app();
    let batch = json!([
        { "type": "HOUSE", "data": { "name": "Ok", "year": 1970, "numberOfFlatsOnFloor": 4 } },
        { "type": "FLAT", "data": flat("Too many rooms", 100, 20, None) }
    ]);
    let (status, body) = send_json(&app, Method::POST, "/import", &batch).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("operation 1"));

    let (_, page) = get(&app, "/houses").await;
    assert_eq!(page["totalElements"], 0);

    let (status, _) = send_json(&app, Method::POST, "/import", &json!([])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/import/history/latest?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(&app, "/import/history?size=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Misc
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_up() {
    let app = make_app();
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "UP");
    assert_eq!(body["application"], "Flats Management System");
    assert!(body["version"].is_string());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn unknown_route_has_error_body() {
    let app = make_app();
    let (status, body) = get(&app, "/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No route for GET /nowhere");
}

#[tokio::test]
async fn cors_preflight_is_answered() {
    let app = make_app();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/flats")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "3600");
}
