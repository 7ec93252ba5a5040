//! API handlers for the AcroForm server
//!
//! Provides REST endpoints for:
//! - Uploading a PDF and listing its fields
//! - Filling the fields and downloading the result
//! - Designing new text fields on a PDF without a form

use std::sync::Arc;

use acroform_core::{
    apply_values, build_fillable, describe_all, mark_unchecked_boxes, output_file_name,
    scan_widgets, FieldDescriptor, FieldValues, FormDocument, OutputKind, Template,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ApiError;
use crate::session::Session;
use crate::AppState;

/// A finished PDF sent back as a download
type PdfAttachment = (StatusCode, [(String, String); 2], Vec<u8>);

fn attachment(file_name: String, bytes: Vec<u8>) -> PdfAttachment {
    (
        StatusCode::OK,
        [
            ("Content-Type".to_string(), "application/pdf".to_string()),
            (
                "Content-Disposition".to_string(),
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "acroform-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
pub struct UploadRequest {
    pub file_name: String,
    pub pdf_base64: String,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub id: Uuid,
    pub file_name: String,
    pub page_count: usize,
    /// False when the PDF has no form; the client should open the designer
    pub has_form: bool,
    pub fields: Vec<FieldDescriptor>,
}

/// Handler: POST /api/documents
pub async fn handle_upload(
    State(state): State<AppState>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, ApiError> {
    let bytes = BASE64
        .decode(req.pdf_base64.trim())
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid PDF base64: {}", e)))?;
    if bytes.is_empty() {
        return Err(ApiError::InvalidRequest("No PDF supplied".to_string()));
    }

    let source = Arc::new(bytes);
    let scanned = Arc::clone(&source);
    let (page_count, has_form, fields) = tokio::task::spawn_blocking(move || {
        let doc = FormDocument::from_bytes(&scanned)?;
        let fields = describe_all(&scan_widgets(&doc));
        Ok::<_, ApiError>((doc.page_count(), doc.has_form(), fields))
    })
    .await??;

    let id = state
        .sessions
        .insert(Session {
            file_name: req.file_name.clone(),
            source,
            fields: fields.clone(),
            template: None,
        })
        .await;

    info!(
        "Session {} opened for '{}' ({} pages, {} fields, {} sessions open)",
        id,
        req.file_name,
        page_count,
        fields.len(),
        state.sessions.len().await
    );

    Ok(Json(UploadResponse {
        success: true,
        id,
        file_name: req.file_name,
        page_count,
        has_form,
        fields,
    }))
}

#[derive(Serialize)]
pub struct FieldsResponse {
    pub success: bool,
    pub fields: Vec<FieldDescriptor>,
}

/// Handler: GET /api/documents/:id/fields
pub async fn handle_fields(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FieldsResponse>, ApiError> {
    let session = state.sessions.get(id).await?;
    Ok(Json(FieldsResponse {
        success: true,
        fields: session.fields,
    }))
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// Handler: DELETE /api/documents/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.sessions.remove(id).await?;
    info!("Session {} closed ({} sessions open)", id, state.sessions.len().await);
    Ok(Json(DeleteResponse { success: true }))
}

#[derive(Deserialize)]
pub struct FillRequest {
    #[serde(default)]
    pub values: FieldValues,
}

/// Handler: POST /api/documents/:id/fill
pub async fn handle_fill(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<FillRequest>,
) -> Result<PdfAttachment, ApiError> {
    let session = state.sessions.get(id).await?;

    let mut values = req.values;
    mark_unchecked_boxes(&session.fields, &mut values);

    let source = Arc::clone(&session.source);
    let filled = tokio::task::spawn_blocking(move || {
        let mut doc = FormDocument::from_bytes(&source)?;
        let summary = apply_values(&mut doc, &values)?;
        if !summary.ignored.is_empty() {
            debug!("Ignored submitted names: {:?}", summary.ignored);
        }
        Ok::<_, ApiError>(doc.save()?)
    })
    .await??;

    let file_name = output_file_name(&session.file_name, OutputKind::Filled);
    info!("Session {} filled, {} bytes as '{}'", id, filled.len(), file_name);
    Ok(attachment(file_name, filled))
}

/// Handler: GET /api/documents/:id/template
///
/// Returns the saved template, or an empty one seeded with the page sizes.
pub async fn handle_get_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Template>, ApiError> {
    let session = state.sessions.get(id).await?;
    if let Some(template) = session.template {
        return Ok(Json(template));
    }

    let source = Arc::clone(&session.source);
    let template = tokio::task::spawn_blocking(move || {
        let doc = FormDocument::from_bytes(&source)?;
        Ok::<_, ApiError>(Template::for_document(&doc)?)
    })
    .await??;
    Ok(Json(template))
}

#[derive(Serialize)]
pub struct SaveTemplateResponse {
    pub success: bool,
    pub field_count: usize,
}

/// Handler: PUT /api/documents/:id/template
pub async fn handle_put_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(template): Json<Template>,
) -> Result<Json<SaveTemplateResponse>, ApiError> {
    let field_count = template.fields.len();
    state.sessions.set_template(id, template).await?;
    debug!("Session {} template saved with {} fields", id, field_count);
    Ok(Json(SaveTemplateResponse {
        success: true,
        field_count,
    }))
}

/// Handler: POST /api/documents/:id/build
///
/// Turns the saved template into text fields. The template is discarded
/// after a successful build; a rejected template stays for correction.
pub async fn handle_build(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<PdfAttachment, ApiError> {
    let session = state.sessions.get(id).await?;
    let template = session.template.unwrap_or_default();

    let source = Arc::clone(&session.source);
    let zoom = state.render_zoom;
    let fillable =
        tokio::task::spawn_blocking(move || build_fillable(&source, &template, zoom)).await??;

    state.sessions.take_template(id).await?;

    let file_name = output_file_name(&session.file_name, OutputKind::Fillable);
    info!("Session {} built fillable PDF '{}'", id, file_name);
    Ok(attachment(file_name, fillable))
}
