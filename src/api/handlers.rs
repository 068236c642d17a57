//! API request handlers

use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tempfile::TempDir;
use tracing::{info, warn};
use uuid::Uuid;

use super::server::AppState;
use crate::cli::commands::{batch_output_path, is_sav_file};
use crate::config::ConvertConfig;
use crate::core::convert_file;
use crate::error::{ConvertError, ConvertResult};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Response header carrying the number of conversion warnings
pub const WARNINGS_HEADER: &str = "x-conversion-warnings";

/// Multipart field holding the uploaded file
pub const UPLOAD_FIELD: &str = "file";

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::err(message))).into_response()
}

const UPLOAD_FORM: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>SAV to Excel Converter</title>
  <style>
    body { font-family: sans-serif; max-width: 40rem; margin: 3rem auto; }
    button { margin-top: 1rem; }
  </style>
</head>
<body>
  <h1>SAV to Excel Converter</h1>
  <p>Upload a .sav file to convert it to an Excel workbook. Column headers use
     the variable labels and coded values are replaced by their value labels.</p>
  <form action="/api/v1/convert" method="post" enctype="multipart/form-data">
    <input type="file" name="file" accept=".sav" required>
    <br>
    <button type="submit">Convert</button>
  </form>
</body>
</html>
"#;

/// GET / - Upload form
pub async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// GET /health - Health check
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
    }))
}

/// An uploaded file, fully buffered
struct Upload {
    file_name: String,
    data: Vec<u8>,
}

/// A finished conversion, ready to stream back
struct Converted {
    file_name: String,
    data: Vec<u8>,
    warnings: usize,
}

/// POST /api/v1/convert - Convert an uploaded .sav file to .xlsx
pub async fn convert(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let upload = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(response) => return response,
    };

    if !is_sav_file(Path::new(&upload.file_name)) {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("'{}' is not a .sav file", upload.file_name),
        );
    }

    let config = state.convert.clone();
    let joined = tokio::task::spawn_blocking(move || convert_upload(upload, &config)).await;

    match joined {
        Ok(Ok(converted)) => xlsx_response(converted),
        Ok(Err(e)) => {
            warn!("upload conversion failed: {}", e);
            error_response(status_for(&e), e.to_string())
        }
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Conversion task failed: {}", e),
        ),
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, Response> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(error_response(e.status(), e.body_text())),
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        // Only the final path component of the client-supplied name is kept
        let file_name = field
            .file_name()
            .and_then(|name| Path::new(name).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let data = field
            .bytes()
            .await
            .map_err(|e| error_response(e.status(), e.body_text()))?;

        return Ok(Upload {
            file_name,
            data: data.to_vec(),
        });
    }

    Err(error_response(
        StatusCode::BAD_REQUEST,
        format!("No '{}' field in upload", UPLOAD_FIELD),
    ))
}

/// Runs one conversion in its own scratch directory
fn convert_upload(upload: Upload, config: &ConvertConfig) -> ConvertResult<Converted> {
    let scratch = TempDir::new()?;
    let input = scratch.path().join(&upload.file_name);
    fs::write(&input, &upload.data)?;

    let output = batch_output_path(&input, scratch.path());
    let report = convert_file(&input, &output, config)?;
    let data = fs::read(&output).map_err(|e| ConvertError::output_write(&output, e))?;

    let file_name = output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    info!(
        file = %upload.file_name,
        rows = report.rows,
        warnings = report.warnings.len(),
        "converted upload"
    );

    Ok(Converted {
        file_name,
        data,
        warnings: report.warnings.len(),
    })
}

fn status_for(error: &ConvertError) -> StatusCode {
    match error {
        ConvertError::SourceRead { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ConvertError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn xlsx_response(converted: Converted) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        header_safe_name(&converted.file_name)
    );
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(XLSX_CONTENT_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
            (
                HeaderName::from_static(WARNINGS_HEADER),
                HeaderValue::from(converted.warnings),
            ),
        ],
        converted.data,
    )
        .into_response()
}

/// Replace characters that cannot appear in a quoted header filename
fn header_safe_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
