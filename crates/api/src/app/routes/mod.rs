use axum::{
    routing::{get, put},
    Router,
};

pub mod auth;
pub mod customers;
pub mod products;
pub mod purchases;
pub mod reports;
pub mod sales;
pub mod suppliers;
pub mod system;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/me/password", put(auth::change_password))
        .nest("/customers", customers::router())
        .nest("/suppliers", suppliers::router())
        .nest("/products", products::router())
        .nest("/purchases", purchases::router())
        .nest("/sales", sales::router())
        .nest("/users", users::router())
        .nest("/reports", reports::router())
}

/// Endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .route("/uploads/*key", get(system::upload))
        .nest("/auth", auth::router())
}
