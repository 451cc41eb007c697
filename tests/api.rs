mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::*;

fn id_of(value: &Value) -> String {
    value.as_str().expect("id string").to_string()
}

async fn register_via_api(
    app: &axum::Router,
    name: &str,
    role: &str,
) -> (String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({
            "name": name,
            "telephone_number": "0811111111",
            "email": format!("{}@example.com", name.to_lowercase()),
            "password": "secret123",
            "role": role,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    (
        body["data"]["token"].as_str().expect("token").to_string(),
        id_of(&body["data"]["user"]["id"]),
    )
}

/// Provider account, its provider record and one car, created over HTTP.
async fn seed_over_api(app: &axum::Router) -> (String, String, String) {
    let (owner_token, _) = register_via_api(app, "Owner", "provider").await;

    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/rentalCarProviders",
        Some(&owner_token),
        Some(json!({
            "name": "Fast Wheels",
            "address": "99 Phayathai Rd",
            "district": "Ratchathewi",
            "province": "Bangkok",
            "postal_code": "10400",
            "region": "Central",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let provider_id = id_of(&body["data"]["id"]);

    let (status, body) = send(
        app,
        Method::POST,
        &format!("/api/v1/rentalCarProviders/{}/cars", provider_id),
        Some(&owner_token),
        Some(json!({
            "brand": "Honda",
            "model": "City",
            "type": "sedan",
            "fuel_type": "gasoline",
            "seating_capacity": 5,
            "year": 2023,
            "price_per_day": 1200.0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let car_id = id_of(&body["data"]["id"]);

    (owner_token, provider_id, car_id)
}

fn booking_body(offset_days: i64) -> Value {
    let (start, end) = rental_window(offset_days, 1);
    json!({ "start_date": start, "end_date": end })
}

#[tokio::test]
async fn test_booking_quota_scenario() {
    let app = app(setup_state().await);
    let (_, _, car_id) = seed_over_api(&app).await;
    let (user_token, user_id) = register_via_api(&app, "Uma", "user").await;
    let uri = format!("/api/v1/cars/{}/bookings", car_id);

    for day in 1..=3 {
        let (status, body) = send(&app, Method::POST, &uri, Some(&user_token), Some(booking_body(day))).await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["status"], json!("pending"));
    }

    let (status, body) = send(&app, Method::POST, &uri, Some(&user_token), Some(booking_body(4))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(body["message"].as_str().unwrap().contains(&user_id));

    let (status, body) = send(&app, Method::GET, "/api/v1/bookings", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(3));
}

#[tokio::test]
async fn test_delete_booking_twice() {
    let app = app(setup_state().await);
    let (_, _, car_id) = seed_over_api(&app).await;
    let (user_token, _) = register_via_api(&app, "Uma", "user").await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/v1/bookings",
        Some(&user_token),
        Some(json!({
            "car": car_id,
            "start_date": rental_window(2, 3).0,
            "end_date": rental_window(2, 3).1,
        })),
    )
    .await;
    let booking_id = id_of(&body["data"]["id"]);
    let uri = format!("/api/v1/bookings/{}", booking_id);

    let (status, body) = send(&app, Method::DELETE, &uri, Some(&user_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({}));

    let (status, body) = send(&app, Method::DELETE, &uri, Some(&user_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["message"],
        json!(format!("No booking with the id of {}", booking_id))
    );
}

#[tokio::test]
async fn test_authentication_and_role_gate() {
    let app = app(setup_state().await);
    let (user_token, _) = register_via_api(&app, "Uma", "user").await;

    let (status, body) = send(&app, Method::GET, "/api/v1/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));

    let (status, _) = send(&app, Method::GET, "/api/v1/auth/me", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/rentalCarProviders",
        Some(&user_token),
        Some(json!({
            "name": "Sneaky",
            "address": "1 Road",
            "district": "D",
            "province": "P",
            "postal_code": "10000",
            "region": "R",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].as_str().unwrap().contains("user"));

    let (status, _) = send(&app, Method::GET, "/api/v1/auth/users", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_self_registration_is_refused() {
    let app = app(setup_state().await);
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({
            "name": "Mallory",
            "telephone_number": "0800000000",
            "email": "mallory@example.com",
            "password": "secret123",
            "role": "admin",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let app = app(setup_state().await);
    register_via_api(&app, "Cookie", "user").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": "cookie@example.com", "password": "secret123" }).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("token="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(!set_cookie.contains("Secure"));

    let cookie_pair = set_cookie.split(';').next().unwrap().to_string();
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/auth/me")
        .header(header::COOKIE, cookie_pair)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["data"]["email"], json!("cookie@example.com"));
    assert!(body["data"].get("password_hash").is_none());
    assert_eq!(body["data"]["booked_cars"], json!([]));
}

#[tokio::test]
async fn test_wrong_password_is_undifferentiated() {
    let app = app(setup_state().await);
    register_via_api(&app, "Vic", "user").await;

    let login = |email: &str, password: &str| {
        json!({ "email": email, "password": password })
    };
    let (wrong_status, wrong_body) = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(login("vic@example.com", "bad-password")),
    )
    .await;
    let (unknown_status, unknown_body) = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(login("ghost@example.com", "secret123")),
    )
    .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body["message"], unknown_body["message"]);
}

#[tokio::test]
async fn test_malformed_body_uses_envelope() {
    let app = app(setup_state().await);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_unknown_id_and_bad_path() {
    let app = app(setup_state().await);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/v1/cars/{}", uuid::Uuid::new_v4()),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().starts_with("No car with the id of"));

    let (status, body) = send(&app, Method::GET, "/api/v1/cars/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_provider_listing_pagination() {
    let app = app(setup_state().await);
    seed_over_api(&app).await;

    let (status, body) = send(&app, Method::GET, "/api/v1/cars?limit=1&page=1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(1));
    assert!(body["pagination"].get("next").is_none());
    assert!(body["pagination"].get("prev").is_none());

    let (status, body) = send(&app, Method::GET, "/api/v1/cars?bogus=1", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("bogus"));
}

#[tokio::test]
async fn test_invalid_fuel_type_is_unprocessable() {
    let app = app(setup_state().await);
    let (owner_token, provider_id, _) = seed_over_api(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/rentalCarProviders/{}/cars", provider_id),
        Some(&owner_token),
        Some(json!({
            "brand": "Tesla",
            "model": "Model 3",
            "type": "sedan",
            "fuel_type": "steam",
            "seating_capacity": 5,
            "year": 2024,
            "price_per_day": 2500.0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"].as_str().unwrap().contains("electric"));
}

#[tokio::test]
async fn test_payment_verify_completes_booking() {
    let app = app(setup_state().await);
    let (_, _, car_id) = seed_over_api(&app).await;
    let (user_token, _) = register_via_api(&app, "Uma", "user").await;

    let (_, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/cars/{}/bookings", car_id),
        Some(&user_token),
        Some(booking_body(1)),
    )
    .await;
    let booking_id = id_of(&body["data"]["id"]);
    let verify_uri = format!("/api/v1/payments/verify/{}", booking_id);

    let (stranger_token, _) = register_via_api(&app, "Sid", "user").await;
    let (status, _) = send(&app, Method::GET, &verify_uri, Some(&stranger_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::GET,
        &verify_uri,
        Some(&user_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("completed"));

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/cars/{}/comments", car_id),
        Some(&user_token),
        Some(json!({ "comment": "Would rent again", "rating": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
}

#[tokio::test]
async fn test_camel_case_field_names_are_accepted() {
    let app = app(setup_state().await);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({
            "name": "Camel",
            "telephoneNumber": "0822222222",
            "email": "camel@example.com",
            "password": "secret123",
            "role": "provider",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["user"]["telephone_number"], json!("0822222222"));
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/rentalCarProviders",
        Some(&token),
        Some(json!({
            "name": "Camel Cars",
            "address": "1 Silom Rd",
            "district": "Bang Rak",
            "province": "Bangkok",
            "postalCode": "10500",
            "region": "Central",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let provider_id = id_of(&body["data"]["id"]);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/rentalCarProviders/{}/cars", provider_id),
        Some(&token),
        Some(json!({
            "brand": "Mazda",
            "model": "2",
            "type": "hatchback",
            "fuelType": "gasoline",
            "seatingCapacity": 5,
            "year": 2021,
            "pricePerDay": 950.0,
            "carDescription": "Compact city car",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["price_per_day"], json!(950.0));
    assert_eq!(body["data"]["car_description"], json!("Compact city car"));
}

#[tokio::test]
async fn test_page_beyond_range_is_rejected() {
    let app = app(setup_state().await);
    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/cars?page=18446744073709551615",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_unknown_route_uses_envelope() {
    let app = app(setup_state().await);
    let (status, body) = send(&app, Method::GET, "/api/v1/garages", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
    assert!(body["message"].as_str().unwrap().contains("garages"));
}

#[tokio::test]
async fn test_logout_clears_session_cookie() {
    let app = app(setup_state().await);
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/auth/logout")
        .header(header::COOKIE, "token=stale")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("removal cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("token=;"));
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_user_listing_is_admin_only() {
    let state = setup_state().await;
    let admin_token = token_for(&admin(&state.db).await);
    let app = app(state);
    let (user_token, _) = register_via_api(&app, "Uma", "user").await;

    let (status, _) = send(&app, Method::GET, "/api/v1/auth/users", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::GET, "/api/v1/auth/users", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(2));
    assert!(body["data"][0].get("password_hash").is_none());
}
