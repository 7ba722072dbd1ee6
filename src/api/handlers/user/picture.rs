//! Profile picture upload.

use anyhow::Context;
use axum::{
    extract::{Extension, Multipart, Path},
    response::IntoResponse,
    Json,
};
use std::ffi::OsStr;
use std::sync::Arc;
use tokio::fs;
use tracing::info;
use ulid::Ulid;
use uuid::Uuid;

use crate::api::handlers::auth::error::AuthError;
use crate::api::handlers::auth::state::AuthState;
use crate::api::handlers::auth::types::{MessageResponse, ProfilePicResponse};
use crate::api::storage::UserStore;

const UPLOAD_FIELD: &str = "profilePic";

/// Store an uploaded picture and point the user record at it.
///
/// The file lands under the configured upload directory with a fresh
/// ULID name; only the `/uploads/...` pointer is persisted.
#[utoipa::path(
    post,
    path = "/api/user/upload-profile-pic/{id}",
    params(
        ("id" = String, Path, description = "User id")
    ),
    request_body(content = Vec<u8>, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Picture stored", body = ProfilePicResponse),
        (status = 400, description = "No file part in the form", body = MessageResponse),
        (status = 404, description = "Unknown user", body = MessageResponse),
        (status = 500, description = "Unreadable multipart body or storage failure", body = MessageResponse)
    ),
    tag = "user"
)]
pub async fn upload_profile_pic(
    Path(id): Path<String>,
    auth_state: Extension<Arc<AuthState>>,
    store: Extension<Arc<dyn UserStore>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AuthError> {
    let Ok(user_id) = Uuid::parse_str(&id) else {
        return Err(AuthError::UserNotFound);
    };

    let mut upload: Option<(Option<String>, axum::body::Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| anyhow::Error::new(err).context("failed to read multipart body"))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            let extension = field
                .file_name()
                .and_then(|name| std::path::Path::new(name).extension())
                .and_then(OsStr::to_str)
                .map(ToString::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|err| anyhow::Error::new(err).context("failed to read upload data"))?;
            upload = Some((extension, data));
            break;
        }
    }

    let Some((extension, data)) = upload else {
        return Err(AuthError::NoFileUploaded);
    };

    let file_name = match extension {
        Some(ext) => format!("{}.{ext}", Ulid::new()),
        None => Ulid::new().to_string(),
    };

    let upload_dir = auth_state.config().upload_dir();
    fs::create_dir_all(upload_dir)
        .await
        .context("failed to create upload directory")?;
    let path = upload_dir.join(&file_name);
    fs::write(&path, &data)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;

    let reference = format!("/uploads/{file_name}");
    let Some(stored) = store.update_profile_pic(user_id, &reference).await? else {
        return Err(AuthError::UserNotFound);
    };

    info!("Profile picture updated");
    Ok(Json(ProfilePicResponse {
        message: "Profile picture updated".to_string(),
        profile_pic: stored,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::state::AuthConfig;
    use crate::api::handlers::auth::tests::{test_signer, MemoryUserStore, NullMailer};
    use crate::oauth::OAuthClient;
    use anyhow::{anyhow, Context, Result};
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
    use std::path::PathBuf;

    fn auth_state(upload_dir: PathBuf) -> Arc<AuthState> {
        Arc::new(AuthState::new(
            AuthConfig::new("http://localhost:5173".to_string()).with_upload_dir(upload_dir),
            test_signer(),
            Arc::new(NullMailer),
            OAuthClient::new("http://localhost:8080".to_string(), None, None)
                .expect("oauth client"),
        ))
    }

    fn temp_upload_dir() -> PathBuf {
        std::env::temp_dir().join(format!("atesti-upload-{}", Ulid::new()))
    }

    async fn multipart_with(field: &str, file_name: &str, bytes: &[u8]) -> Result<Multipart> {
        let boundary = "testboundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; \
                 name=\"{field}\"; filename=\"{file_name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))?;
        Multipart::from_request(request, &())
            .await
            .map_err(|rejection| anyhow!("failed to build multipart: {rejection:?}"))
    }

    #[tokio::test]
    async fn upload_stores_file_and_updates_reference() -> Result<()> {
        let upload_dir = temp_upload_dir();
        let state = auth_state(upload_dir.clone());
        let store = Arc::new(MemoryUserStore::default());
        let user = store.seed("Ann", "ann@x.com", "hash");

        let multipart = multipart_with(UPLOAD_FIELD, "me.png", b"fake image bytes").await?;
        let response = upload_profile_pic(
            Path(user.id.to_string()),
            Extension(state),
            Extension(store.clone() as Arc<dyn UserStore>),
            multipart,
        )
        .await
        .map_err(|error| anyhow!("upload failed: {error}"))?
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body: ProfilePicResponse = serde_json::from_slice(&bytes)?;
        assert_eq!(body.message, "Profile picture updated");
        assert!(body.profile_pic.starts_with("/uploads/"));
        assert!(body.profile_pic.ends_with(".png"));

        let stored_name = body
            .profile_pic
            .strip_prefix("/uploads/")
            .context("unexpected reference shape")?;
        let written = fs::read(upload_dir.join(stored_name)).await?;
        assert_eq!(written, b"fake image bytes");

        let record = store
            .find_by_id(user.id)
            .await?
            .context("seeded user missing")?;
        assert_eq!(record.profile_pic.as_deref(), Some(body.profile_pic.as_str()));

        let _ = fs::remove_dir_all(&upload_dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn upload_for_unknown_user_is_not_found() -> Result<()> {
        let upload_dir = temp_upload_dir();
        let state = auth_state(upload_dir.clone());
        let store = Arc::new(MemoryUserStore::default());

        let multipart = multipart_with(UPLOAD_FIELD, "me.png", b"bytes").await?;
        let result = upload_profile_pic(
            Path(Uuid::new_v4().to_string()),
            Extension(state),
            Extension(store as Arc<dyn UserStore>),
            multipart,
        )
        .await;
        assert!(matches!(result, Err(AuthError::UserNotFound)));

        let _ = fs::remove_dir_all(&upload_dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn upload_with_malformed_id_is_not_found() -> Result<()> {
        let state = auth_state(temp_upload_dir());
        let store = Arc::new(MemoryUserStore::default());

        let multipart = multipart_with(UPLOAD_FIELD, "me.png", b"bytes").await?;
        let result = upload_profile_pic(
            Path("not-a-uuid".to_string()),
            Extension(state),
            Extension(store as Arc<dyn UserStore>),
            multipart,
        )
        .await;
        assert!(matches!(result, Err(AuthError::UserNotFound)));
        Ok(())
    }

    #[tokio::test]
    async fn upload_without_expected_field_is_rejected() -> Result<()> {
        let state = auth_state(temp_upload_dir());
        let store = Arc::new(MemoryUserStore::default());
        let user = store.seed("Ann", "ann@x.com", "hash");

        let multipart = multipart_with("avatar", "me.png", b"bytes").await?;
        let result = upload_profile_pic(
            Path(user.id.to_string()),
            Extension(state),
            Extension(store as Arc<dyn UserStore>),
            multipart,
        )
        .await;
        assert!(matches!(result, Err(AuthError::NoFileUploaded)));
        Ok(())
    }

    #[tokio::test]
    async fn upload_without_extension_still_stores() -> Result<()> {
        let upload_dir = temp_upload_dir();
        let state = auth_state(upload_dir.clone());
        let store = Arc::new(MemoryUserStore::default());
        let user = store.seed("Ann", "ann@x.com", "hash");

        let multipart = multipart_with(UPLOAD_FIELD, "picture", b"bytes").await?;
        let response = upload_profile_pic(
            Path(user.id.to_string()),
            Extension(state),
            Extension(store as Arc<dyn UserStore>),
            multipart,
        )
        .await
        .map_err(|error| anyhow!("upload failed: {error}"))?
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let _ = fs::remove_dir_all(&upload_dir).await;
        Ok(())
    }
}
