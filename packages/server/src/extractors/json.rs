use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// A `Json<T>` wrapper whose rejections become `AppError::Validation`, so a
/// malformed body gets the same `{code, message}` shape as every other error.
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_to_error)?;
        Ok(AppJson(value))
    }
}

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    let message = match &rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "Expected request with `Content-Type: application/json`".to_string()
        }
        JsonRejection::JsonSyntaxError(_) => format!("Malformed JSON: {}", rejection.body_text()),
        JsonRejection::JsonDataError(_) => {
            format!("Invalid request body: {}", rejection.body_text())
        }
        _ => rejection.body_text(),
    };
    AppError::Validation(message)
}
