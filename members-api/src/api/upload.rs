//! Batch upload form and endpoint
//!
//! The uploaded file is parsed on the request task and submitted as one
//! batch job. The response only confirms that the batch was queued.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::Html,
    routing::get,
    Router,
};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::queue::Job;
use crate::services::ingest::parse_upload;
use crate::AppState;

/// Multipart field carrying the file
pub const UPLOAD_FIELD: &str = "myfile";

/// Largest accepted request body
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

const UPLOAD_FORM: &str = r#"<!DOCTYPE html>
<html>
<head><title>Upload subscribers</title></head>
<body>
  <h1>Upload subscribers</h1>
  <p>One row per member: first_name, last_name, phone_number, client_member_id, account_id.
     Fields containing commas are quoted with <code>|</code>.</p>
  <form method="post" enctype="multipart/form-data">
    <input type="file" name="myfile">
    <button type="submit">Upload</button>
  </form>
</body>
</html>"#;

/// GET /api/generate_sub_batch/
pub async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}

/// POST /api/generate_sub_batch/
pub async fn upload_batch(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Html<String>> {
    let mut contents = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid upload: {}", e)))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Invalid upload: {}", e)))?;
            contents = Some(bytes);
            break;
        }
    }

    let Some(contents) = contents else {
        return Err(ApiError::BadRequest(format!(
            "Missing upload field '{}'",
            UPLOAD_FIELD
        )));
    };

    let rows = parse_upload(&contents).map_err(|e| {
        warn!(error = %e, "Rejecting upload");
        ApiError::BadRequest(e.to_string())
    })?;

    let row_count = rows.len();
    let job_id = state
        .queue
        .submit(Job::Batch(rows))
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!(job_id = %job_id, rows = row_count, "Upload queued");

    Ok(Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Upload received</title></head>
<body>
  <h1>Upload received</h1>
  <p>{} rows queued for processing (job {}).</p>
  <p><a href="/api/generate_sub_batch/">Upload another file</a></p>
</body>
</html>"#,
        row_count, job_id
    )))
}

/// Build upload routes
pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/generate_sub_batch/",
            get(upload_form).post(upload_batch),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
