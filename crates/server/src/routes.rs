use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::Json;
use kakeibo_core::{Category, Ledger, LedgerEntry};
use kakeibo_ocr::{ExtractedFields, SubmissionError};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::state::AppState;

/// Field names an uploaded image may arrive under.
const UPLOAD_FIELDS: [&str; 2] = ["image", "file"];

#[derive(Debug, Deserialize)]
pub struct OcrRequest {
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    #[serde(rename = "type")]
    pub category: Option<String>,
    #[serde(default)]
    pub item: String,
    #[serde(default)]
    pub amount: String,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ocr: &'static str,
    pub backend: String,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let ocr = if state.pipeline.is_ocr_available() { "available" } else { "unavailable" };
    Json(HealthResponse {
        status: "ok",
        ocr,
        backend: state.pipeline.backend_name().to_string(),
    })
}

/// POST /ocr with `{"image": "data:image/png;base64,..."}`
#[instrument(name = "ocr", skip_all)]
pub async fn ocr(
    State(state): State<AppState>,
    body: Result<Json<OcrRequest>, JsonRejection>,
) -> Result<Json<ExtractedFields>, ApiError> {
    recognize_json(&state, body)
        .await
        .map_err(|e| e.logged("ocr"))
}

/// POST /upload: multipart with the file under `image` or `file`, or the
/// same JSON body `/ocr` takes.
#[instrument(name = "upload", skip_all)]
pub async fn upload(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<ExtractedFields>, ApiError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    let result = if is_multipart {
        recognize_multipart(&state, request).await
    } else {
        let body = Json::<OcrRequest>::from_request(request, &state).await;
        recognize_json(&state, body).await
    };
    result.map_err(|e| e.logged("upload"))
}

/// POST /save with `{"type": "支出", "item": "...", "amount": "..."}`
#[instrument(name = "save", skip_all)]
pub async fn save(
    State(state): State<AppState>,
    body: Result<Json<SaveRequest>, JsonRejection>,
) -> Result<Json<SaveResponse>, ApiError> {
    append_entry(&state, body)
        .await
        .map_err(|e| e.logged("save"))
}

/// GET /data
#[instrument(name = "data", skip_all)]
pub async fn data(State(state): State<AppState>) -> Result<Json<Ledger>, ApiError> {
    state
        .store
        .load()
        .await
        .map(Json)
        .map_err(|e| ApiError::from(e).logged("data"))
}

async fn recognize_json(
    state: &AppState,
    body: Result<Json<OcrRequest>, JsonRejection>,
) -> Result<Json<ExtractedFields>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
    let payload = request.image.ok_or(SubmissionError::Missing)?;
    let result = state.pipeline.process_data_url(&payload).await?;
    Ok(Json(result.fields))
}

async fn recognize_multipart(
    state: &AppState,
    request: Request,
) -> Result<Json<ExtractedFields>, ApiError> {
    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| ApiError::InvalidInput(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(e.body_text()))?
    {
        if !field.name().is_some_and(|name| UPLOAD_FIELDS.contains(&name)) {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidInput(e.body_text()))?;
        let result = state.pipeline.process_bytes(bytes.to_vec()).await?;
        return Ok(Json(result.fields));
    }

    Err(SubmissionError::Missing.into())
}

async fn append_entry(
    state: &AppState,
    body: Result<Json<SaveRequest>, JsonRejection>,
) -> Result<Json<SaveResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
    let category: Category = request
        .category
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|e: kakeibo_core::CategoryError| ApiError::InvalidInput(e.to_string()))?;

    let ledger = state
        .store
        .append(category.clone(), LedgerEntry::new(request.item, request.amount))
        .await?;

    info!(
        category = %category,
        created = !category.is_known() && ledger.entries(&category).len() == 1,
        total = ledger.len(),
        "Entry appended"
    );
    Ok(Json(SaveResponse { status: "ok" }))
}
