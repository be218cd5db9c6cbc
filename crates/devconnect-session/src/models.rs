//! Wire models for the DevConnect API.

use crate::{SessionError, SessionResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest image the server accepts.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Image content types the server accepts.
pub const ALLOWED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

/// A user as returned by the API. Replaced wholesale on every fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(rename = "profile_picture", default)]
    pub profile_picture_url: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub following_count: u64,
    #[serde(rename = "is_followed", default)]
    pub is_followed_by_viewer: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    /// Author's username.
    pub author: String,
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub likes_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub parent_comment: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowStatus {
    Followed,
    Unfollowed,
}

/// Result of toggling a follow.
///
/// `followers_count` belongs to the target user, `following_count` to the viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowResult {
    pub status: FollowStatus,
    pub followers_count: u64,
    pub following_count: u64,
    pub is_followed: bool,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

/// A list endpoint response, either a bare array or a paginated envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Plain(Vec<T>),
    Paginated {
        results: Vec<T>,
        #[serde(default)]
        count: Option<u64>,
    },
}

impl<T> Listing<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Plain(items) => items,
            Listing::Paginated { results, .. } => results,
        }
    }
}

/// An image to upload as a multipart file part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read an image from disk, taking the content type from the extension.
    pub async fn from_path(path: &Path) -> SessionResult<Self> {
        let mime = mime_from_extension(path).ok_or_else(unsupported_format)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            SessionError::Validation(format!("Could not read {}: {}", path.display(), e))
        })?;

        let upload = Self::new(file_name, mime, bytes);
        upload.validate()?;
        Ok(upload)
    }

    /// Check type and size against the server's limits.
    pub fn validate(&self) -> SessionResult<()> {
        if !ALLOWED_IMAGE_TYPES.contains(&self.mime.as_str()) {
            return Err(unsupported_format());
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(SessionError::Validation(
                "Image file too large (max 5 MB)".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn to_part(&self) -> SessionResult<reqwest::multipart::Part> {
        let part = reqwest::multipart::Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(&self.mime)?;
        Ok(part)
    }
}

fn unsupported_format() -> SessionError {
    SessionError::Validation("Unsupported image format. Use JPEG, PNG, or GIF.".to_string())
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// Partial profile edit. Fields left as `None` are not sent.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub bio: Option<String>,
    pub image: Option<ImageUpload>,
}

impl ProfileUpdate {
    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = Some(bio.into());
        self
    }

    pub fn with_image(mut self, image: ImageUpload) -> Self {
        self.image = Some(image);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bio.is_none() && self.image.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_profile_from_server_shape() {
        let user: UserProfile = serde_json::from_value(json!({
            "id": 7,
            "username": "alice",
            "email": "alice@example.com",
            "bio": null,
            "profile_picture": "http://localhost:8000/media/profile_pics/a.png",
            "location": "Lisbon",
            "birth_date": "1990-04-01",
            "followers_count": 3,
            "following_count": 5,
            "is_followed": true
        }))
        .unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(user.bio, None);
        assert_eq!(
            user.profile_picture_url.as_deref(),
            Some("http://localhost:8000/media/profile_pics/a.png")
        );
        assert_eq!(user.birth_date, NaiveDate::from_ymd_opt(1990, 4, 1));
        assert_eq!(user.followers_count, 3);
        assert!(user.is_followed_by_viewer);
    }

    #[test]
    fn test_user_profile_defaults_missing_fields() {
        let user: UserProfile =
            serde_json::from_value(json!({ "id": 1, "username": "bob" })).unwrap();
        assert_eq!(user.email, "");
        assert_eq!(user.following_count, 0);
        assert!(!user.is_followed_by_viewer);
    }

    #[test]
    fn test_post_without_likes_count() {
        let post: Post = serde_json::from_value(json!({
            "id": 1,
            "author": "alice",
            "content": "hello",
            "image": null,
            "created_at": "2024-05-01T10:00:00.123456Z",
            "updated_at": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(post.likes_count, 0);
        assert_eq!(post.author, "alice");
    }

    #[test]
    fn test_listing_accepts_both_shapes() {
        let plain: Listing<u64> = serde_json::from_value(json!([1, 2])).unwrap();
        assert_eq!(plain.into_vec(), vec![1, 2]);

        let empty: Listing<u64> = serde_json::from_value(json!([])).unwrap();
        assert!(empty.into_vec().is_empty());

        let paginated: Listing<u64> = serde_json::from_value(json!({
            "count": 2, "next": null, "previous": null, "results": [3, 4]
        }))
        .unwrap();
        assert_eq!(paginated.into_vec(), vec![3, 4]);
    }

    #[test]
    fn test_follow_result() {
        let result: FollowResult = serde_json::from_value(json!({
            "status": "Unfollowed",
            "followers_count": 0,
            "following_count": 4,
            "is_followed": false,
            "user": { "id": 2, "username": "bob" }
        }))
        .unwrap();
        assert_eq!(result.status, FollowStatus::Unfollowed);
        assert_eq!(result.user.map(|u| u.id), Some(2));
    }

    #[test]
    fn test_image_validation() {
        let ok = ImageUpload::new("a.png", "image/png", vec![0; 16]);
        assert!(ok.validate().is_ok());

        let webp = ImageUpload::new("a.webp", "image/webp", vec![0; 16]);
        assert!(matches!(webp.validate(), Err(SessionError::Validation(_))));

        let large = ImageUpload::new("a.jpg", "image/jpeg", vec![0; MAX_IMAGE_BYTES + 1]);
        assert!(matches!(large.validate(), Err(SessionError::Validation(_))));

        let limit = ImageUpload::new("a.gif", "image/gif", vec![0; MAX_IMAGE_BYTES]);
        assert!(limit.validate().is_ok());
    }

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_from_extension(Path::new("x/a.JPG")), Some("image/jpeg"));
        assert_eq!(mime_from_extension(Path::new("a.jpeg")), Some("image/jpeg"));
        assert_eq!(mime_from_extension(Path::new("a.gif")), Some("image/gif"));
        assert_eq!(mime_from_extension(Path::new("a.bmp")), None);
        assert_eq!(mime_from_extension(Path::new("noext")), None);
    }

    #[tokio::test]
    async fn test_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("avatar.png");
        std::fs::write(&path, b"\x89PNG....").unwrap();

        let upload = ImageUpload::from_path(&path).await.unwrap();
        assert_eq!(upload.file_name, "avatar.png");
        assert_eq!(upload.mime, "image/png");
        assert_eq!(upload.bytes.len(), 8);

        let missing = ImageUpload::from_path(&dir.path().join("missing.png")).await;
        assert!(matches!(missing, Err(SessionError::Validation(_))));
    }

    #[test]
    fn test_profile_update_builder() {
        assert!(ProfileUpdate::default().is_empty());
        let update = ProfileUpdate::default().with_bio("Rustacean");
        assert_eq!(update.bio.as_deref(), Some("Rustacean"));
        assert!(!update.is_empty());
    }
}
