use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap};
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::extract::{invalid_form, Fields};
use super::pages::{self, escape_html};
use super::response::{ApiError, Format, WithFormat};
use super::AppState;
use crate::auth::{authenticate, LoginOutcome};
use crate::metrics;
use crate::Error;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct QuestionForm {
    #[serde(default)]
    pub index_name: String,
    #[serde(default)]
    pub question: String,
}

impl QuestionForm {
    fn question(&self) -> crate::Result<&str> {
        let question = self.question.trim();
        if question.is_empty() {
            return Err(Error::InvalidArgument("question must not be empty".into()));
        }
        Ok(question)
    }
}

pub async fn index() -> Html<String> {
    Html(pages::login_page(None))
}

pub async fn admin(State(state): State<AppState>) -> Html<String> {
    Html(pages::admin_page(&list_or_empty(&state).await))
}

pub async fn chatbot(State(state): State<AppState>) -> Html<String> {
    Html(pages::chatbot_page(&list_or_empty(&state).await))
}

async fn list_or_empty(state: &AppState) -> Vec<String> {
    state.store.list().await.unwrap_or_else(|e| {
        warn!("Failed to list indexes: {}", e);
        Vec::new()
    })
}

pub async fn app_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        pages::APP_JS,
    )
}

pub async fn style_css() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        pages::STYLE_CSS,
    )
}

/// Role-based redirect; failed logins re-render the form with a message.
pub async fn login(
    State(state): State<AppState>,
    Fields(form): Fields<LoginForm>,
) -> Result<Response, ApiError> {
    let outcome = authenticate(state.users.as_ref(), &form.id, &form.password)
        .await
        .in_format(Format::Html)?;

    Ok(match outcome {
        LoginOutcome::Redirect(to) => Redirect::to(to).into_response(),
        LoginOutcome::Rejected(message) => Html(pages::login_page(Some(&message))).into_response(),
    })
}

pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let format = Format::from_headers(&headers);
    let mut multipart = multipart
        .map_err(|rejection| invalid_form(rejection.body_text()))
        .in_format(format)?;
    let (file_name, bytes) = read_file_field(&mut multipart).await.in_format(format)?;
    info!(file = %file_name, bytes = bytes.len(), "Upload received");

    let report = state
        .ingestor
        .ingest_upload(&file_name, &bytes)
        .await
        .in_format(format)?;

    Ok(format.ok(
        json!({
            "message": "Index created successfully",
            "index_path": report.index_name,
        }),
        format!(
            "<p class=\"success\">Index created successfully: {}</p>",
            escape_html(&report.index_name)
        ),
    ))
}

async fn read_file_field(multipart: &mut Multipart) -> crate::Result<(String, Bytes)> {
    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| Error::InvalidArgument("uploaded file has no name".into()))?;
        let bytes = field.bytes().await.map_err(bad_multipart)?;
        return Ok((file_name, bytes));
    }
    Err(Error::InvalidArgument("missing multipart field 'file'".into()))
}

fn bad_multipart(err: MultipartError) -> Error {
    Error::InvalidArgument(format!("invalid upload: {}", err))
}

/// Retrieval answer from one index, without classification.
pub async fn query(
    State(state): State<AppState>,
    headers: HeaderMap,
    Fields(form): Fields<QuestionForm>,
) -> Result<Response, ApiError> {
    let format = Format::from_headers(&headers);
    let question = form.question().in_format(format)?;

    let answer = state
        .agent
        .knowledge()
        .answer(&form.index_name, question)
        .await
        .in_format(format)?;

    Ok(format.ok(
        json!({
            "query": question,
            "answer": answer,
            "index_used": form.index_name,
        }),
        format!("<p><strong>Answer:</strong> {}</p>", escape_html(&answer)),
    ))
}

/// Classified answer: small talk or retrieval.
pub async fn agent(
    State(state): State<AppState>,
    headers: HeaderMap,
    Fields(form): Fields<QuestionForm>,
) -> Result<Response, ApiError> {
    let format = Format::from_headers(&headers);
    let question = form.question().in_format(format)?;

    let reply = state
        .agent
        .run(&form.index_name, question)
        .await
        .in_format(format)?;
    metrics::record_classification(reply.classification.as_str());

    Ok(format.ok(
        json!({
            "query": question,
            "classification": reply.classification,
            "answer": reply.answer,
            "index_used": form.index_name,
        }),
        format!(
            "<p><strong>[{}]</strong> {}</p>",
            reply.classification,
            escape_html(&reply.answer)
        ),
    ))
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let ollama = match &state.ollama {
        Some(client) if client.is_running().await => "up",
        Some(_) => "down",
        None => "unknown",
    };
    Json(json!({ "status": "ok", "ollama": ollama }))
}

pub async fn indexes(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let names = state.store.list().await.in_format(Format::Json)?;
    Ok(Json(json!({ "indexes": names })))
}
