use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers::{auth, image, restaurant, review};
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/restaurants", restaurant_routes(config))
        .nest("/reviews", review_routes())
        .nest("/images", image_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(auth::register))
        .routes(routes!(auth::login))
        .routes(routes!(auth::me))
}

fn restaurant_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let crud = OpenApiRouter::new()
        .routes(routes!(
            restaurant::list_restaurants,
            restaurant::create_restaurant
        ))
        .routes(routes!(restaurant::list_my_restaurants))
        .routes(routes!(
            restaurant::get_restaurant,
            restaurant::update_restaurant,
            restaurant::delete_restaurant
        ))
        .routes(routes!(review::list_restaurant_reviews))
        .routes(routes!(
            review::get_my_restaurant_review,
            review::delete_my_restaurant_review
        ));

    let upload = OpenApiRouter::new()
        .routes(routes!(restaurant::upload_restaurant_image))
        .layer(restaurant::image_upload_body_limit(
            config.storage.max_image_size,
        ));

    crud.merge(upload)
}

fn review_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(review::submit_review))
        .routes(routes!(review::list_my_reviews))
        .routes(routes!(review::search_reviews))
        .routes(routes!(review::delete_review))
}

fn image_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(image::get_image))
}
