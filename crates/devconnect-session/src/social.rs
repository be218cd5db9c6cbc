//! Typed wrappers for the social endpoints.
//!
//! Every call goes through the client's refresh-and-retry path.

use crate::request::{ApiRequest, MultipartBody};
use crate::{
    Comment, FollowResult, ImageUpload, Listing, Post, SessionClient, SessionError,
    SessionResult, UserProfile,
};
use serde_json::json;
use tracing::{debug, info};

/// Social API bound to a session client.
pub struct SocialApi<'a> {
    client: &'a SessionClient,
}

impl SessionClient {
    pub fn social(&self) -> SocialApi<'_> {
        SocialApi { client: self }
    }
}

impl<'a> SocialApi<'a> {
    /// All users except the viewer.
    pub async fn list_users(&self) -> SessionResult<Vec<UserProfile>> {
        let users = self
            .client
            .execute_json::<Listing<UserProfile>>(ApiRequest::get("users/"))
            .await?
            .into_vec();

        let viewer_id = self.client.current_user().map(|u| u.id);
        Ok(users
            .into_iter()
            .filter(|u| Some(u.id) != viewer_id)
            .collect())
    }

    pub async fn get_profile(&self, username: &str) -> SessionResult<UserProfile> {
        let username = validate_username(username)?;
        self.client
            .execute_json(ApiRequest::get(format!("users/{}/", username)))
            .await
    }

    /// Users the viewer follows.
    pub async fn following(&self) -> SessionResult<Vec<UserProfile>> {
        let listing: Listing<UserProfile> = self
            .client
            .execute_json(ApiRequest::get("users/me/following/"))
            .await?;
        Ok(listing.into_vec())
    }

    /// Follow or unfollow a user, whichever applies, and patch the viewer's
    /// following count from the response.
    pub async fn toggle_follow(&self, user_id: u64) -> SessionResult<FollowResult> {
        let result: FollowResult = self
            .client
            .execute_json(ApiRequest::post(format!("users/{}/follow/", user_id)))
            .await?;

        self.client.patch_counts(None, Some(result.following_count));
        info!(
            user_id,
            status = ?result.status,
            following_count = result.following_count,
            "Follow toggled"
        );
        Ok(result)
    }

    /// Home feed, newest first.
    pub async fn feed(&self) -> SessionResult<Vec<Post>> {
        let listing: Listing<Post> = self.client.execute_json(ApiRequest::get("posts/")).await?;
        Ok(listing.into_vec())
    }

    pub async fn create_post(
        &self,
        content: &str,
        image: Option<ImageUpload>,
    ) -> SessionResult<Post> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SessionError::Validation(
                "Post content cannot be empty".to_string(),
            ));
        }

        let mut body = MultipartBody::default().text("content", content);
        if let Some(image) = image {
            image.validate()?;
            body = body.file("image", image);
        }

        let post: Post = self
            .client
            .execute_json(ApiRequest::post("posts/").multipart(body))
            .await?;
        info!(post_id = post.id, "Post created");
        Ok(post)
    }

    pub async fn like_post(&self, post_id: u64) -> SessionResult<()> {
        self.client
            .execute(ApiRequest::post(format!("posts/{}/like/", post_id)))
            .await?;
        debug!(post_id, "Post liked");
        Ok(())
    }

    pub async fn unlike_post(&self, post_id: u64) -> SessionResult<()> {
        self.client
            .execute(ApiRequest::post(format!("posts/{}/unlike/", post_id)))
            .await?;
        debug!(post_id, "Post unliked");
        Ok(())
    }

    /// Comment on a post. The post id is sent in the body as well as the
    /// path, since the server reads it from the body.
    pub async fn comment_on_post(&self, post_id: u64, content: &str) -> SessionResult<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SessionError::Validation(
                "Comment cannot be empty".to_string(),
            ));
        }

        self.client
            .execute_json(
                ApiRequest::post(format!("posts/{}/comments/", post_id))
                    .json(json!({ "content": content, "post": post_id })),
            )
            .await
    }

    pub async fn search_posts(&self, query: &str) -> SessionResult<Vec<Post>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SessionError::Validation(
                "Search query cannot be empty".to_string(),
            ));
        }

        let listing: Listing<Post> = self
            .client
            .execute_json(ApiRequest::get("posts/search/").query("q", query))
            .await?;
        Ok(listing.into_vec())
    }
}

/// Usernames go into the URL path, so only the characters the server allows
/// in a username are accepted.
fn validate_username(username: &str) -> SessionResult<&str> {
    let username = username.trim();
    let valid = !username.is_empty()
        && !username.chars().all(|c| c == '.')
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '.' | '@' | '+' | '-' | '_'));

    if valid {
        Ok(username)
    } else {
        Err(SessionError::Validation(format!(
            "Invalid username: {:?}",
            username
        )))
    }
}
