//! Request handlers for the v2 job surface.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use tracing::{info, warn};

use oshorts_models::{
    CaptionSettings, CaptionStyle, HexColor, Job, JobParams, JobResultResponse, JobStatusResponse,
    SourceRef, SubmitResponse,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Query parameters for URL submissions.
#[derive(Debug, Deserialize)]
pub struct ProcessQuery {
    pub url: String,
    pub include_captions: Option<bool>,
    pub caption_style: Option<String>,
    pub caption_color: Option<String>,
    pub caption_outline_color: Option<String>,
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `POST /api/v2/process` — submit a video by URL.
pub async fn process_video(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ProcessQuery>,
) -> ApiResult<Json<SubmitResponse>> {
    state.store.ping().await.map_err(|e| {
        ApiError::ServiceUnavailable(format!(
            "Job store unreachable; check REDIS_URL: {}",
            e
        ))
    })?;

    let request_key = header_key(&headers);
    if request_key.is_none() && !state.vault.has_default() {
        return Err(ApiError::validation(
            "Missing Gemini API key. Provide X-Gemini-Key header or set GEMINI_API_KEY env var.",
        ));
    }

    let caption_settings = parse_caption_settings(
        query.include_captions.unwrap_or(true),
        query.caption_style.as_deref(),
        query.caption_color.as_deref(),
        query.caption_outline_color.as_deref(),
    )?;

    let job = Job::new(JobParams {
        source: SourceRef::Url(query.url),
        caption_settings,
    });
    submit(&state, job, request_key).await
}

/// `POST /api/v2/upload` — submit an uploaded video file.
///
/// Multipart form with a `file` part plus optional caption fields. The file
/// is spooled to the upload directory in chunks; exceeding the size cap
/// aborts with 413 before a job exists.
pub async fn upload_video(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Json<SubmitResponse>> {
    state.store.ping().await.map_err(|e| {
        ApiError::ServiceUnavailable(format!(
            "Job store unreachable; check REDIS_URL: {}",
            e
        ))
    })?;

    let request_key = header_key(&headers);
    if request_key.is_none() && !state.vault.has_default() {
        return Err(ApiError::validation(
            "Missing Gemini API key. Provide X-Gemini-Key header or set GEMINI_API_KEY env var.",
        ));
    }

    let mut spooled: Option<std::path::PathBuf> = None;
    let mut include_captions = true;
    let mut caption_style: Option<String> = None;
    let mut caption_color: Option<String> = None;
    let mut caption_outline_color: Option<String> = None;

    let result: ApiResult<()> = async {
        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::validation(format!("Malformed multipart body: {}", e)))?
        {
            match field.name().unwrap_or_default() {
                "file" => {
                    let filename = field
                        .file_name()
                        .map(sanitize_filename)
                        .filter(|n| !n.is_empty())
                        .unwrap_or_else(|| "upload.mp4".to_string());
                    let path = spool_upload(&state, &filename, &mut field).await?;
                    spooled = Some(path);
                }
                "include_captions" => {
                    let text = field_text(field).await?;
                    include_captions = text.parse().unwrap_or(true);
                }
                "caption_style" => caption_style = Some(field_text(field).await?),
                "caption_color" => caption_color = Some(field_text(field).await?),
                "caption_outline_color" => {
                    caption_outline_color = Some(field_text(field).await?)
                }
                other => {
                    warn!(field = other, "Ignoring unknown multipart field");
                }
            }
        }
        Ok(())
    }
    .await;

    let settings = result.and_then(|_| {
        parse_caption_settings(
            include_captions,
            caption_style.as_deref(),
            caption_color.as_deref(),
            caption_outline_color.as_deref(),
        )
    });

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            // A rejected submission leaves no spooled file behind.
            if let Some(path) = &spooled {
                let _ = tokio::fs::remove_file(path).await;
            }
            return Err(e);
        }
    };

    let Some(path) = spooled else {
        return Err(ApiError::validation("Must provide a file"));
    };

    let job = Job::new(JobParams {
        source: SourceRef::Upload(path.to_string_lossy().into_owned()),
        caption_settings: settings,
    });
    submit(&state, job, request_key).await
}

/// `GET /api/v2/jobs/{id}` — status projection.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let id = oshorts_models::JobId::from_string(job_id);
    let job = state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Job {} not found", id)))?;
    Ok(Json(JobStatusResponse::from(&job)))
}

/// `GET /api/v2/jobs/{id}/result` — result projection. A non-completed job
/// answers with its current status and a null result, not an error.
pub async fn get_job_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobResultResponse>> {
    let id = oshorts_models::JobId::from_string(job_id);
    let job = state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Job {} not found", id)))?;
    Ok(Json(JobResultResponse::from(&job)))
}

/// Persist the job, remember the per-request key, and enqueue.
async fn submit(
    state: &AppState,
    job: Job,
    request_key: Option<String>,
) -> ApiResult<Json<SubmitResponse>> {
    let id = job.job_id.clone();
    state.store.create(&job).await?;

    // Per-request keys never touch the store.
    if let Some(key) = request_key {
        state.vault.store_key(&id, key);
    }

    if state.queue.send(id.clone()).is_err() {
        state.vault.forget(&id);
        return Err(ApiError::ServiceUnavailable(
            "Job queue is not accepting submissions".into(),
        ));
    }

    info!(job_id = %id, "Job submitted");
    Ok(Json(SubmitResponse {
        job_id: id.to_string(),
        status: "queued".to_string(),
    }))
}

fn header_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-gemini-key")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Validate caption fields at the boundary; nothing downstream sees an
/// unknown style tag or a malformed color.
fn parse_caption_settings(
    include_captions: bool,
    style: Option<&str>,
    color: Option<&str>,
    outline_color: Option<&str>,
) -> ApiResult<CaptionSettings> {
    let style = match style {
        Some(tag) => tag
            .parse::<CaptionStyle>()
            .map_err(|e| ApiError::validation(e.to_string()))?,
        None => CaptionStyle::default(),
    };

    let color = color
        .map(|c| HexColor::parse(c).map_err(|e| ApiError::validation(e.to_string())))
        .transpose()?;
    let outline_color = outline_color
        .map(|c| HexColor::parse(c).map_err(|e| ApiError::validation(e.to_string())))
        .transpose()?;

    Ok(CaptionSettings {
        include_captions,
        style,
        color,
        outline_color,
    })
}

/// Stream one multipart file field to disk, enforcing the size cap.
async fn spool_upload(
    state: &AppState,
    filename: &str,
    field: &mut axum::extract::multipart::Field<'_>,
) -> ApiResult<std::path::PathBuf> {
    use tokio::io::AsyncWriteExt;

    tokio::fs::create_dir_all(&state.config.upload_dir)
        .await
        .map_err(|e| ApiError::internal(format!("Cannot create upload dir: {}", e)))?;

    // Prefixing with a fresh UUID keeps concurrent uploads of the same
    // filename apart.
    let path = state
        .config
        .upload_dir
        .join(format!("{}_{}", oshorts_models::JobId::new(), filename));

    let mut file = tokio::fs::File::create(&path)
        .await
        .map_err(|e| ApiError::internal(format!("Cannot spool upload: {}", e)))?;

    let limit = state.config.max_upload_bytes();
    let mut written: u64 = 0;

    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                let _ = tokio::fs::remove_file(&path).await;
                return Err(ApiError::validation(format!("Upload aborted: {}", e)));
            }
        };

        written += chunk.len() as u64;
        if written > limit {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(ApiError::PayloadTooLarge(format!(
                "File too large. Max size {}MB",
                state.config.max_upload_mb
            )));
        }

        if let Err(e) = file.write_all(&chunk).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(ApiError::internal(format!("Cannot spool upload: {}", e)));
        }
    }

    file.flush()
        .await
        .map_err(|e| ApiError::internal(format!("Cannot spool upload: {}", e)))?;

    Ok(path)
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed multipart field: {}", e)))
}

/// Keep only the final path component and drop characters that could
/// escape the upload directory.
fn sanitize_filename(name: &str) -> String {
    name.rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_caption_settings_defaults() {
        let settings = parse_caption_settings(true, None, None, None).unwrap();
        assert_eq!(settings.style, CaptionStyle::None);
        assert!(settings.color.is_none());
    }

    #[test]
    fn test_parse_caption_settings_rejects_unknown_style() {
        let err = parse_caption_settings(true, Some("sparkle"), None, None).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_parse_caption_settings_rejects_bad_color() {
        let err = parse_caption_settings(true, Some("classic"), Some("#ZZZZZZ"), None).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("my video!.mp4"), "myvideo.mp4");
        assert_eq!(sanitize_filename("clip_1-final.mp4"), "clip_1-final.mp4");
    }
}
