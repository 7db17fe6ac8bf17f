//! Form fields from urlencoded or multipart bodies.
//!
//! Browsers encode `FormData` as `multipart/form-data`, plain HTML forms as
//! `application/x-www-form-urlencoded`. Both decode into the same struct.

use axum::extract::{Form, FromRequest, Multipart, Request};
use axum::http::header;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::response::{ApiError, Format};
use crate::Error;

/// Decoded form fields. Rejections become [`ApiError`] like any handler failure.
#[derive(Debug)]
pub struct Fields<T>(pub T);

impl<S, T> FromRequest<S> for Fields<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let format = Format::from_headers(req.headers());

        let fields = if is_multipart(&req) {
            match Multipart::from_request(req, state).await {
                Ok(multipart) => from_multipart(multipart).await,
                Err(rejection) => Err(invalid_form(rejection.body_text())),
            }
        } else {
            Form::<T>::from_request(req, state)
                .await
                .map(|Form(value)| value)
                .map_err(|rejection| invalid_form(rejection.body_text()))
        };

        fields.map(Fields).map_err(|e| ApiError::new(e, format))
    }
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| {
            v.trim_start()
                .to_ascii_lowercase()
                .starts_with("multipart/form-data")
        })
}

/// Text parts become string fields; a repeated name keeps its last value.
async fn from_multipart<T: DeserializeOwned>(mut multipart: Multipart) -> crate::Result<T> {
    let mut fields = Map::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| invalid_form(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let text = field.text().await.map_err(|e| invalid_form(e.body_text()))?;
        fields.insert(name, Value::String(text));
    }

    serde_json::from_value(Value::Object(fields)).map_err(|e| invalid_form(e.to_string()))
}

pub(super) fn invalid_form(detail: String) -> Error {
    Error::InvalidArgument(format!("invalid form: {}", detail))
}
