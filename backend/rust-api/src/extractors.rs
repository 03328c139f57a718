use axum::{
    extract::{FromRequest, Request},
    Json,
};

use crate::handlers::ApiError;

/// `Json<T>` whose rejection is an [`ApiError::BadRequest`].
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            tracing::warn!("Rejected JSON body: {}", rejection.body_text());
            ApiError::bad_request(format!("Failed to parse JSON request body: {}", rejection))
        })?;
        Ok(AppJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, response::IntoResponse};
    use http_body_util::BodyExt;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Question {
        #[allow(dead_code)]
        question: String,
    }

    #[tokio::test]
    async fn test_rejection_uses_api_error_shape() {
        let req = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"lab_context": "no question"}"#))
            .unwrap();

        let Err(err) = AppJson::<Question>::from_request(req, &()).await else {
            panic!("body without a question must be rejected");
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], 400);
        assert!(json["detail"]
            .as_str()
            .unwrap()
            .starts_with("Failed to parse JSON request body"));
    }
}
