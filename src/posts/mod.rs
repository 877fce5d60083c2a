use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

use crate::{auth::AuthUser, permissions::Owned};

pub mod handler;

/// A post joined with its author's username.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub author: String,
    pub text: String,
    pub pub_date: chrono::DateTime<chrono::Utc>,
    pub image: Option<String>,
    pub group_id: Option<i64>,
}

impl Owned for Post {
    fn owner_id(&self) -> i64 {
        self.author_id
    }
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: i64,
    pub text: String,
    pub image: Option<String>,
    pub group_id: Option<i64>,
}

/// Fields left as `None` are not touched. The inner `Option` of `image` and
/// `group_id` is the new (possibly null) value.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub text: Option<String>,
    pub image: Option<Option<String>>,
    pub group_id: Option<Option<i64>>,
}

/// Body of `POST` and `PUT`. Anything besides these fields (author, pub_date,
/// id) is dropped during deserialization.
#[derive(Debug, Deserialize, Validate)]
pub struct PostPayload {
    #[validate(custom(function = "not_blank"))]
    pub text: String,
    #[serde(default, deserialize_with = "nullable")]
    pub image: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub group: Option<Option<i64>>,
}

impl PostPayload {
    /// Stamps the acting user as author. Runs only after validation.
    pub fn into_new_post(self, author: &AuthUser) -> NewPost {
        NewPost {
            author_id: author.id,
            text: self.text,
            image: self.image.flatten(),
            group_id: self.group.flatten(),
        }
    }

    pub fn group_ref(&self) -> Option<i64> {
        self.group.flatten()
    }
}

impl From<PostPayload> for PostChanges {
    fn from(payload: PostPayload) -> Self {
        PostChanges {
            text: Some(payload.text),
            image: payload.image,
            group_id: payload.group,
        }
    }
}

/// Body of `PATCH`.
#[derive(Debug, Deserialize, Validate)]
pub struct PostPatch {
    #[validate(custom(function = "not_blank"))]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub image: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub group: Option<Option<i64>>,
}

impl PostPatch {
    pub fn group_ref(&self) -> Option<i64> {
        self.group.flatten()
    }
}

impl From<PostPatch> for PostChanges {
    fn from(patch: PostPatch) -> Self {
        PostChanges {
            text: patch.text,
            image: patch.image,
            group_id: patch.group,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: i64,
    pub author: String,
    pub text: String,
    pub pub_date: chrono::DateTime<chrono::Utc>,
    pub image: Option<String>,
    pub group: Option<i64>,
}

impl From<Post> for PostResponse {
    fn from(p: Post) -> Self {
        PostResponse {
            id: p.id,
            author: p.author,
            text: p.text,
            pub_date: p.pub_date,
            image: p.image,
            group: p.group_id,
        }
    }
}

pub(crate) fn not_blank(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("This field may not be blank.".into());
        return Err(err);
    }
    Ok(())
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn author() -> AuthUser {
        AuthUser {
            id: 7,
            username: "leo".to_string(),
        }
    }

    #[test]
    fn client_author_is_ignored_and_actor_stamped() {
        let payload: PostPayload = serde_json::from_value(json!({
            "text": "hello",
            "author": "mallory",
            "pub_date": "2001-01-01T00:00:00Z",
            "group": 3
        }))
        .unwrap();
        assert!(payload.validate().is_ok());

        let new_post = payload.into_new_post(&author());
        assert_eq!(new_post.author_id, 7);
        assert_eq!(new_post.group_id, Some(3));
        assert_eq!(new_post.image, None);
    }

    #[test]
    fn blank_text_fails_validation() {
        let payload: PostPayload = serde_json::from_value(json!({ "text": "   " })).unwrap();
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("text"));
    }

    #[test]
    fn patch_tells_null_from_absent() {
        let patch: PostPatch = serde_json::from_value(json!({ "group": null })).unwrap();
        let changes = PostChanges::from(patch);
        assert_eq!(changes.text, None);
        assert_eq!(changes.group_id, Some(None));
        assert_eq!(changes.image, None);
    }

    #[test]
    fn missing_text_is_rejected_on_full_payload() {
        let result = serde_json::from_value::<PostPayload>(json!({ "image": "a.png" }));
        assert!(result.is_err());
    }
}
