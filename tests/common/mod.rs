#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, EntityTrait, Schema};
use serde_json::Value;
use tower::ServiceExt;

use car_rental_backend::{
    config::{Config, Environment},
    entities::{booked_car, booking, car, comment, promotion, rental_car_provider, user},
    entities::user::UserRole,
    policy::AuthContext,
    routes::create_router,
    services::{
        car::{self as cars, CreateCarRequest},
        identity::{self, RegisterRequest},
        provider::{self, CreateProviderRequest},
    },
    utils::jwt::create_token,
    AppState,
};

pub const JWT_SECRET: &str = "test-secret";

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration_hours: 1,
        jwt_cookie_expire_days: 1,
        environment: Environment::Development,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        admin_email: "admin@carrental.com".to_string(),
        admin_password: "admin123".to_string(),
    }
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) {
    let schema = Schema::new(DbBackend::Sqlite);
    let statement = db.get_database_backend().build(&schema.create_table_from_entity(entity));
    db.execute(statement).await.expect("create table");
}

/// In-memory SQLite database with every table, created in dependency order.
pub async fn setup_db() -> DatabaseConnection {
    // A single long-lived connection keeps the in-memory database alive
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("connect to sqlite");

    create_table(&db, user::Entity).await;
    create_table(&db, rental_car_provider::Entity).await;
    create_table(&db, car::Entity).await;
    create_table(&db, promotion::Entity).await;
    create_table(&db, booking::Entity).await;
    create_table(&db, comment::Entity).await;
    create_table(&db, booked_car::Entity).await;

    db
}

pub async fn setup_state() -> AppState {
    AppState {
        db: setup_db().await,
        config: test_config(),
    }
}

pub async fn register(db: &DatabaseConnection, name: &str, role: UserRole) -> AuthContext {
    let user = identity::register(
        db,
        RegisterRequest {
            name: name.to_string(),
            telephone_number: "0812345678".to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            password: "secret123".to_string(),
            role: Some(role),
        },
    )
    .await
    .expect("register");
    AuthContext::new(user)
}

/// Admin accounts cannot self-register, so they are inserted directly.
pub async fn admin(db: &DatabaseConnection) -> AuthContext {
    use sea_orm::{ActiveModelTrait, Set};

    let user = user::ActiveModel {
        id: Set(uuid::Uuid::new_v4()),
        name: Set("Admin".to_string()),
        telephone_number: Set("0000000000".to_string()),
        email: Set("admin@example.com".to_string()),
        password_hash: Set(car_rental_backend::utils::password::hash_password("admin123").expect("hash")),
        role: Set(UserRole::Admin),
        image: Set(None),
        my_rcp_id: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .expect("insert admin");
    AuthContext::new(user)
}

pub fn provider_request(name: &str) -> CreateProviderRequest {
    CreateProviderRequest {
        user: None,
        name: name.to_string(),
        address: "99 Phayathai Rd".to_string(),
        district: "Ratchathewi".to_string(),
        province: "Bangkok".to_string(),
        postal_code: "10400".to_string(),
        tel: Some("021234567".to_string()),
        region: "Central".to_string(),
    }
}

pub async fn create_provider(
    db: &DatabaseConnection,
    owner: &AuthContext,
) -> rental_car_provider::Model {
    provider::create(db, owner, provider_request("Fast Wheels"))
        .await
        .expect("create provider")
}

pub fn car_request(price_per_day: f64) -> CreateCarRequest {
    CreateCarRequest {
        brand: "Toyota".to_string(),
        model: "Yaris".to_string(),
        car_type: "hatchback".to_string(),
        fuel_type: "gasoline".to_string(),
        seating_capacity: 5,
        year: 2022,
        price_per_day,
        car_description: None,
        image: None,
    }
}

pub async fn create_car(
    db: &DatabaseConnection,
    owner: &AuthContext,
    provider: &rental_car_provider::Model,
) -> car::Model {
    cars::create(db, owner, provider.id, car_request(1000.0))
        .await
        .expect("create car")
}

/// Provider account with its provider record and one car.
pub async fn seeded_fleet(
    db: &DatabaseConnection,
) -> (AuthContext, rental_car_provider::Model, car::Model) {
    let owner = register(db, "Owner", UserRole::Provider).await;
    let provider = create_provider(db, &owner).await;
    let car = create_car(db, &owner, &provider).await;
    (owner, provider, car)
}

/// Start and end of a rental `offset_days` from now lasting `days`.
pub fn rental_window(offset_days: i64, days: i64) -> (chrono::DateTime<Utc>, chrono::DateTime<Utc>) {
    let start = Utc::now() + Duration::days(offset_days);
    (start, start + Duration::days(days))
}

pub fn token_for(ctx: &AuthContext) -> String {
    create_token(ctx.id(), ctx.role(), JWT_SECRET, 1).expect("token")
}

pub fn app(state: AppState) -> Router {
    create_router(state)
}

/// Sends one request through the router and decodes the JSON envelope.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
