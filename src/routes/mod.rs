use axum::{
    http::Uri,
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers::{auth, bookings, cars, comments, images, payments, promotions, providers};
use crate::middleware::auth::{auth_middleware, require_admin, require_admin_or_provider};
use crate::error::AppError;
use crate::AppState;

/// All `/api/v1` routes. Rate limiting and request logging are layered on in `main`.
pub fn create_router(state: AppState) -> Router {
    // Public routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", get(auth::logout))
        .route("/rentalCarProviders", get(providers::list_providers))
        .route("/rentalCarProviders/{id}", get(providers::get_provider))
        .route("/rentalCarProviders/{id}/cars", get(cars::list_provider_cars))
        .route(
            "/rentalCarProviders/{id}/promotions",
            get(promotions::list_provider_promotions),
        )
        .route("/cars", get(cars::list_cars))
        .route("/cars/{id}", get(cars::get_car))
        .route("/cars/{id}/comments", get(comments::list_comments))
        .route("/promotions", get(promotions::list_promotions))
        .route("/promotions/{id}", get(promotions::get_promotion));

    // Any signed-in account
    let member_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/uploadProfile", put(auth::upload_profile))
        .route("/auth/booked", put(auth::booked))
        .route(
            "/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route(
            "/bookings/{id}",
            get(bookings::get_booking)
                .put(bookings::update_booking)
                .delete(bookings::delete_booking),
        )
        .route("/cars/{id}/bookings", post(bookings::create_car_booking))
        .route(
            "/rentalCarProviders/{id}/bookings",
            get(bookings::list_provider_bookings).post(bookings::create_provider_booking),
        )
        .route("/cars/{id}/comments", post(comments::create_comment))
        .route(
            "/comments/{id}",
            put(comments::update_comment).delete(comments::delete_comment),
        )
        .route("/payments/verify/{id}", get(payments::verify_payment))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Admin or provider; ownership is checked per record
    let staff_routes = Router::new()
        .route("/rentalCarProviders", post(providers::create_provider))
        .route(
            "/rentalCarProviders/{id}",
            put(providers::update_provider).delete(providers::delete_provider),
        )
        .route("/rentalCarProviders/{id}/cars", post(cars::create_car))
        .route("/cars/{id}", put(cars::update_car).delete(cars::delete_car))
        .route("/promotions", post(promotions::create_promotion))
        .route(
            "/promotions/{id}",
            put(promotions::update_promotion).delete(promotions::delete_promotion),
        )
        .route_layer(middleware::from_fn(require_admin_or_provider))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Admin only
    let admin_routes = Router::new()
        .route("/auth/users", get(auth::list_users))
        .route("/images", delete(images::clear_images))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let api = public_routes
        .merge(member_routes)
        .merge(staff_routes)
        .merge(admin_routes);

    Router::new()
        .nest("/api/v1", api)
        .fallback(route_not_found)
        .with_state(state)
}

async fn route_not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("Route {} not found", uri.path()))
}
