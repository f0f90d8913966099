pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
pub mod utils;

use std::time::Duration;

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bistro API",
        version = "1.0.0",
        description = "Restaurant directory with one review per user per restaurant"
    ),
    tags(
        (name = "Auth", description = "Registration, login and the current user"),
        (name = "Restaurants", description = "Restaurant listings, search and ownership"),
        (name = "Reviews", description = "Reviews and rating aggregation"),
        (name = "Images", description = "Content-addressed restaurant images"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(config.max_age))
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", routes::api_routes(&state.config))
        .split_for_parts();

    let cors = cors_layer(&state.config.server.cors);

    router
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
        .layer(cors)
}
