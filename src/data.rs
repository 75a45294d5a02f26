use std::sync::Arc;

use crate::api::{self, ApiError};
use crate::models::{Comment, Post};

pub trait PostService: Send + Sync {
    fn list_posts(&self) -> Result<Vec<Post>, ApiError>;
    fn load_post(&self, id: &str) -> Result<Post, ApiError>;
    fn load_related(&self, category: &str, exclude_id: &str) -> Result<Vec<Post>, ApiError>;
}

pub trait CommentService: Send + Sync {
    fn load_comments(&self, post_id: &str) -> Result<Vec<Comment>, ApiError>;
    fn add_comment(&self, post_id: &str, name: &str, content: &str) -> Result<(), ApiError>;
}

pub struct ApiPostService {
    client: Arc<api::Client>,
}

impl ApiPostService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl PostService for ApiPostService {
    fn list_posts(&self) -> Result<Vec<Post>, ApiError> {
        self.client.all_posts()
    }

    fn load_post(&self, id: &str) -> Result<Post, ApiError> {
        self.client.post(id)
    }

    fn load_related(&self, category: &str, exclude_id: &str) -> Result<Vec<Post>, ApiError> {
        self.client.related(category, exclude_id)
    }
}

pub struct ApiCommentService {
    client: Arc<api::Client>,
}

impl ApiCommentService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl CommentService for ApiCommentService {
    fn load_comments(&self, post_id: &str) -> Result<Vec<Comment>, ApiError> {
        self.client.comments(post_id)
    }

    fn add_comment(&self, post_id: &str, name: &str, content: &str) -> Result<(), ApiError> {
        self.client.add_comment(post_id, name, content)
    }
}
