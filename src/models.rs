use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_NAME_CHARS: usize = 2;
pub const MIN_CONTENT_CHARS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub sub_title: String,
    /// Rich-text body as delivered by the server. Sanitized before it reaches view state.
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [&self.title, &self.sub_title, &self.category]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Name must be at least 2 characters long")]
    NameTooShort,
    #[error("Comment must be at least 10 characters long")]
    ContentTooShort,
}

/// Comment input held by the view until a submission succeeds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentDraft {
    pub name: String,
    pub content: String,
}

impl CommentDraft {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Name is checked before content; the first failure wins.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().chars().count() < MIN_NAME_CHARS {
            return Err(ValidationError::NameTooShort);
        }
        if self.content.trim().chars().count() < MIN_CONTENT_CHARS {
            return Err(ValidationError::ContentTooShort);
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.name.clear();
        self.content.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.content.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_are_rejected_after_trimming() {
        for name in ["", " ", "A", "  B  ", "\tx\n"] {
            let draft = CommentDraft::new(name, "This is a long enough comment");
            assert_eq!(draft.validate(), Err(ValidationError::NameTooShort), "{name:?}");
        }
    }

    #[test]
    fn short_content_is_rejected_when_name_is_valid() {
        let draft = CommentDraft::new("Al", "   too short   ");
        assert_eq!(draft.validate(), Err(ValidationError::ContentTooShort));
    }

    #[test]
    fn name_is_checked_first() {
        let draft = CommentDraft::new("A", "x");
        assert_eq!(draft.validate(), Err(ValidationError::NameTooShort));
    }

    #[test]
    fn boundary_lengths_pass() {
        assert!(CommentDraft::new("Al", "Great arti").validate().is_ok());
        assert!(CommentDraft::new("Al", "Great article!").validate().is_ok());
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        assert!(CommentDraft::new("Zoë", "ééééééééé").validate().is_err());
        assert!(CommentDraft::new("Zoë", "éééééééééé").validate().is_ok());
    }

    #[test]
    fn post_decodes_mongo_style_payload() {
        let raw = r#"{
            "_id": "42",
            "title": "Hello",
            "subTitle": "World",
            "description": "<p>Body</p>",
            "image": "https://cdn.example/a.png",
            "category": "Technology",
            "createdAt": "2025-01-02T03:04:05.000Z",
            "isPublished": true
        }"#;
        let post: Post = serde_json::from_str(raw).unwrap();
        assert_eq!(post.id, "42");
        assert_eq!(post.sub_title, "World");
        assert_eq!(post.category, "Technology");
        assert!(post.created_at.is_some());
    }

    #[test]
    fn filter_matches_title_subtitle_and_category() {
        let post = Post {
            id: "1".into(),
            title: "Rust ownership".into(),
            sub_title: "Borrowing explained".into(),
            description: String::new(),
            image: String::new(),
            category: "Technology".into(),
            created_at: None,
        };
        assert!(post.matches(""));
        assert!(post.matches("OWNERSHIP"));
        assert!(post.matches("borrow"));
        assert!(post.matches("tech"));
        assert!(!post.matches("finance"));
    }
}
