use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::routes::auth::AdminUser;
use crate::state::AppState;

pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024; // 5MB
const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    pub size: usize,
    pub mime_type: String,
}

fn validate_image_magic_bytes(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // GIF: 47 49 46 38
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        // WebP: 52 49 46 46 ... 57 45 42 50
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

fn get_extension_from_mime(mime: &str) -> &str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    }
}

/// POST /api/uploads
/// Store one book image and return the URL to attach to a book.
pub async fn upload_image(
    _admin: AdminUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    let upload_path = state.config.upload_dir.clone();
    tokio::fs::create_dir_all(&upload_path).await.map_err(|e| {
        tracing::error!("Failed to create upload directory: {}", e);
        AppError::internal("Failed to initialize upload directory")
    })?;

    let field = multipart
        .next_field()
        .await
        .map_err(|e| {
            tracing::error!("Multipart error: {}", e);
            AppError::bad_request("Invalid multipart data")
        })?
        .ok_or_else(|| AppError::bad_request("No file provided"))?;

    let original_name = field.file_name().unwrap_or("unknown").to_string();
    let original_ext = original_name
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&original_ext.as_str()) {
        return Err(AppError::bad_request(
            "Unsupported file type. Allowed: JPEG, PNG, WebP, GIF.",
        ));
    }

    let bytes = field.bytes().await.map_err(|e| {
        tracing::error!("Failed to read upload bytes: {}", e);
        AppError::bad_request("Failed to read file data")
    })?;

    if bytes.len() > MAX_FILE_SIZE {
        return Err(AppError::bad_request("File too large. Maximum size is 5MB."));
    }
    if bytes.is_empty() {
        return Err(AppError::bad_request("Empty file"));
    }

    let mime_type = validate_image_magic_bytes(&bytes).ok_or_else(|| {
        AppError::bad_request("File content does not match an allowed image type.")
    })?;

    let filename = format!("{}.{}", Uuid::new_v4(), get_extension_from_mime(mime_type));
    let file_path = upload_path.join(&filename);
    tokio::fs::write(&file_path, &bytes).await.map_err(|e| {
        tracing::error!("Failed to write upload file: {}", e);
        AppError::internal("Failed to save file")
    })?;

    let url = format!("{}/uploads/{}", state.config.public_base_url, filename);
    tracing::info!("Image uploaded: {} ({} bytes)", filename, bytes.len());

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            url,
            filename,
            size: bytes.len(),
            mime_type: mime_type.to_string(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::create_app;
    use crate::test_support::{admin_token, fixture_store, test_config, user_token};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    const PNG_HEADER: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn multipart_request(token: &str, filename: &str, content: &[u8]) -> Request<Body> {
        let boundary = "bookstore-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\n\
                 Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::post("/api/uploads")
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap()
    }

    async fn upload_state() -> (AppState, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("bookstore-uploads-{}", Uuid::new_v4()));
        let config = AppConfig {
            upload_dir: dir.clone(),
            ..test_config()
        };
        (AppState::with_backend(config, fixture_store().await, None), dir)
    }

    #[test]
    fn test_magic_bytes_detection() {
        assert_eq!(validate_image_magic_bytes(PNG_HEADER), Some("image/png"));
        assert_eq!(validate_image_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(validate_image_magic_bytes(b"GIF89a"), Some("image/gif"));
        assert_eq!(validate_image_magic_bytes(b"plain text"), None);
        assert_eq!(validate_image_magic_bytes(&[0x89]), None);
    }

    #[tokio::test]
    async fn test_upload_stores_file_and_returns_absolute_url() {
        let (state, dir) = upload_state().await;
        let token = admin_token(&state).await;
        let res = create_app(state)
            .oneshot(multipart_request(&token, "capa.png", PNG_HEADER))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: UploadResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.mime_type, "image/png");
        assert!(body.url.starts_with("http://127.0.0.1:3001/uploads/"));
        assert!(body.filename.ends_with(".png"));
        assert!(dir.join(&body.filename).exists());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_upload_rejects_mismatched_content() {
        let (state, dir) = upload_state().await;
        let token = admin_token(&state).await;
        let res = create_app(state)
            .oneshot(multipart_request(&token, "capa.png", b"not really an image"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_upload_requires_admin() {
        let (state, dir) = upload_state().await;
        let (_, token) = user_token(&state, "leitor").await;
        let res = create_app(state)
            .oneshot(multipart_request(&token, "capa.png", PNG_HEADER))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let _ = std::fs::remove_dir_all(dir);
    }
}
