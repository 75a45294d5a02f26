use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::api::ApiError;
use crate::data::{CommentService, PostService};
use crate::html;
use crate::models::{Comment, CommentDraft, Post, ValidationError};
use crate::share;
use crate::state::{Event, Notification, StateStore, ViewState};

pub const RELATED_LIMIT: usize = 3;
pub const DEFAULT_MAX_COMMENTS: usize = 200;
pub const DEFAULT_SHARE_TITLE: &str = "Check out this blog post!";

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a comment request is already in progress")]
    Busy,
    #[error("no post is open")]
    NoPost,
}

pub struct Options {
    pub post_service: Arc<dyn PostService>,
    pub comment_service: Arc<dyn CommentService>,
    pub max_comments: usize,
}

struct PendingRequest {
    request_id: u64,
    post_id: String,
    cancel_flag: Arc<AtomicBool>,
}

impl PendingRequest {
    fn accepts(&self, request_id: u64) -> bool {
        !self.cancel_flag.load(Ordering::SeqCst) && self.request_id == request_id
    }

    fn cancel(self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }
}

enum AsyncResponse {
    Posts {
        request_id: u64,
        result: Result<Vec<Post>, ApiError>,
    },
    Post {
        request_id: u64,
        result: Result<Post, ApiError>,
    },
    Related {
        request_id: u64,
        result: Result<Vec<Post>, ApiError>,
    },
    Comments {
        request_id: u64,
        result: Result<Vec<Comment>, ApiError>,
    },
    Submitted {
        request_id: u64,
        result: Result<(), ApiError>,
    },
}

/// Owns the post page state. Network calls run on worker threads; their
/// results are applied on the owning thread by [`BlogView::poll`] or
/// [`BlogView::wait_idle`], and only while the issuing request is still current.
pub struct BlogView {
    post_service: Arc<dyn PostService>,
    comment_service: Arc<dyn CommentService>,
    max_comments: usize,
    store: StateStore,
    post_id: Option<String>,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
    next_request_id: u64,
    pending_posts: Option<PendingRequest>,
    pending_post: Option<PendingRequest>,
    pending_related: Option<PendingRequest>,
    pending_comments: Option<PendingRequest>,
    pending_submit: Option<PendingRequest>,
}

impl BlogView {
    pub fn new(options: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        Self {
            post_service: options.post_service,
            comment_service: options.comment_service,
            max_comments: options.max_comments.max(1),
            store: StateStore::new(),
            post_id: None,
            response_tx,
            response_rx,
            next_request_id: 1,
            pending_posts: None,
            pending_post: None,
            pending_related: None,
            pending_comments: None,
            pending_submit: None,
        }
    }

    pub fn state(&self) -> &ViewState {
        self.store.state()
    }

    pub fn subscribe(&mut self) -> Receiver<Event> {
        self.store.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.pending_posts.is_some()
            || self.pending_post.is_some()
            || self.pending_related.is_some()
            || self.pending_comments.is_some()
            || self.pending_submit.is_some()
    }

    /// Navigates to a post: loads it (and then its related posts) and its comments.
    pub fn open(&mut self, id: &str) {
        self.focus(id);
        self.load_post(id);
        self.load_comments(id);
    }

    /// Makes `id` the current post without fetching anything.
    pub fn focus(&mut self, id: &str) {
        self.leave();
        self.post_id = Some(id.to_string());
    }

    /// Drops the current post page. Responses still in flight are discarded.
    pub fn leave(&mut self) {
        for slot in [
            self.pending_post.take(),
            self.pending_related.take(),
            self.pending_comments.take(),
            self.pending_submit.take(),
        ]
        .into_iter()
        .flatten()
        {
            slot.cancel();
        }
        self.post_id = None;
        self.store.update(|state| {
            state.post = None;
            state.not_found = false;
            state.related.clear();
            state.comments.clear();
            state.comments_hidden = 0;
            state.draft.clear();
            state.is_loading = false;
            state.is_comment_loading = false;
        });
    }

    pub fn load_posts(&mut self) {
        if let Some(pending) = self.pending_posts.take() {
            pending.cancel();
        }
        let pending = self.next_request("");
        let (request_id, cancel_flag) = (pending.request_id, pending.cancel_flag.clone());
        self.pending_posts = Some(pending);
        self.store.update(|state| state.is_posts_loading = true);

        let tx = self.response_tx.clone();
        let service = self.post_service.clone();
        thread::spawn(move || {
            let result = service.list_posts();
            if cancel_flag.load(Ordering::SeqCst) {
                return;
            }
            let _ = tx.send(AsyncResponse::Posts { request_id, result });
        });
    }

    pub fn set_filter(&mut self, input: &str) {
        let input = input.to_string();
        self.store.update(|state| state.filter = input);
    }

    pub fn load_post(&mut self, id: &str) {
        for slot in [self.pending_post.take(), self.pending_related.take()]
            .into_iter()
            .flatten()
        {
            slot.cancel();
        }
        let pending = self.next_request(id);
        let (request_id, cancel_flag) = (pending.request_id, pending.cancel_flag.clone());
        self.pending_post = Some(pending);
        self.store.update(|state| {
            state.is_loading = true;
            state.not_found = false;
        });

        let tx = self.response_tx.clone();
        let service = self.post_service.clone();
        let id = id.to_string();
        thread::spawn(move || {
            let result = service.load_post(&id);
            if cancel_flag.load(Ordering::SeqCst) {
                return;
            }
            let _ = tx.send(AsyncResponse::Post { request_id, result });
        });
    }

    pub fn load_related(&mut self, category: &str, exclude_id: &str) {
        if let Some(pending) = self.pending_related.take() {
            pending.cancel();
        }
        let pending = self.next_request(exclude_id);
        let (request_id, cancel_flag) = (pending.request_id, pending.cancel_flag.clone());
        self.pending_related = Some(pending);

        let tx = self.response_tx.clone();
        let service = self.post_service.clone();
        let category = category.to_string();
        let exclude_id = exclude_id.to_string();
        thread::spawn(move || {
            let result = service.load_related(&category, &exclude_id);
            if cancel_flag.load(Ordering::SeqCst) {
                return;
            }
            let _ = tx.send(AsyncResponse::Related { request_id, result });
        });
    }

    pub fn load_comments(&mut self, post_id: &str) {
        if let Some(pending) = self.pending_comments.take() {
            pending.cancel();
        }
        let pending = self.next_request(post_id);
        let (request_id, cancel_flag) = (pending.request_id, pending.cancel_flag.clone());
        self.pending_comments = Some(pending);
        self.sync_comment_loading();

        let tx = self.response_tx.clone();
        let service = self.comment_service.clone();
        let post_id = post_id.to_string();
        thread::spawn(move || {
            let result = service.load_comments(&post_id);
            if cancel_flag.load(Ordering::SeqCst) {
                return;
            }
            let _ = tx.send(AsyncResponse::Comments { request_id, result });
        });
    }

    pub fn draft(&self) -> &CommentDraft {
        &self.store.state().draft
    }

    pub fn set_draft_name(&mut self, name: &str) {
        let name = name.to_string();
        self.store.update(|state| state.draft.name = name);
    }

    pub fn set_draft_content(&mut self, content: &str) {
        let content = content.to_string();
        self.store.update(|state| state.draft.content = content);
    }

    /// Validates the draft and submits it for the current post.
    ///
    /// Validation failures emit a notification and never reach the network.
    /// On success the draft is cleared and comments are refetched; on failure
    /// the draft is kept so the user can retry.
    pub fn submit_comment(&mut self) -> Result<(), SubmitError> {
        let post_id = self.post_id.clone().ok_or(SubmitError::NoPost)?;
        if !self.store.state().can_submit() {
            return Err(SubmitError::Busy);
        }
        let draft = self.store.state().draft.clone();
        if let Err(err) = draft.validate() {
            self.store.notify(Notification::error(err.to_string()));
            return Err(err.into());
        }

        let pending = self.next_request(&post_id);
        let (request_id, cancel_flag) = (pending.request_id, pending.cancel_flag.clone());
        self.pending_submit = Some(pending);
        self.sync_comment_loading();

        let tx = self.response_tx.clone();
        let service = self.comment_service.clone();
        thread::spawn(move || {
            let result = service.add_comment(&post_id, &draft.name, &draft.content);
            if cancel_flag.load(Ordering::SeqCst) {
                return;
            }
            let _ = tx.send(AsyncResponse::Submitted { request_id, result });
        });
        Ok(())
    }

    /// Share link for the current post, `None` for unsupported platforms.
    pub fn share_url(&self, platform: &str, page_url: &str) -> Option<String> {
        let title = self
            .store
            .state()
            .post
            .as_ref()
            .map(|post| post.title.as_str())
            .filter(|title| !title.trim().is_empty())
            .unwrap_or(DEFAULT_SHARE_TITLE);
        share::build_share_url(platform, page_url, title)
    }

    /// Opens the share link in the default browser and returns it.
    /// Unsupported platforms do nothing and yield `None`.
    pub fn share(&self, platform: &str, page_url: &str) -> std::io::Result<Option<String>> {
        let Some(url) = self.share_url(platform, page_url) else {
            tracing::debug!(platform, "ignoring share to unsupported platform");
            return Ok(None);
        };
        webbrowser::open(&url)?;
        Ok(Some(url))
    }

    /// Applies every response that has already arrived. Returns whether any did.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message);
            changed = true;
        }
        changed
    }

    /// Blocks until no request is pending or `timeout` elapses. Returns `true` when idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_busy() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.response_rx.recv_timeout(remaining) {
                Ok(message) => self.handle_async_response(message),
                Err(_) => return false,
            }
        }
        true
    }

    fn next_request(&mut self, post_id: &str) -> PendingRequest {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        PendingRequest {
            request_id,
            post_id: post_id.to_string(),
            cancel_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    fn sync_comment_loading(&mut self) {
        let loading = self.pending_comments.is_some() || self.pending_submit.is_some();
        self.store.update(|state| state.is_comment_loading = loading);
    }

    fn handle_async_response(&mut self, message: AsyncResponse) {
        match message {
            AsyncResponse::Posts { request_id, result } => {
                let Some(pending) = &self.pending_posts else {
                    return;
                };
                if !pending.accepts(request_id) {
                    return;
                }
                self.pending_posts = None;

                match result {
                    Ok(posts) => {
                        let posts = posts.into_iter().map(html::sanitize_post).collect();
                        self.store.update(|state| {
                            state.posts = posts;
                            state.is_posts_loading = false;
                        });
                    }
                    Err(err) => {
                        let message = err.user_message("Failed to load blog posts");
                        self.store.notify(Notification::error(message));
                        self.store.update(|state| state.is_posts_loading = false);
                    }
                }
            }
            AsyncResponse::Post { request_id, result } => {
                let Some(pending) = &self.pending_post else {
                    return;
                };
                if !pending.accepts(request_id) {
                    return;
                }
                let post_id = pending.post_id.clone();
                self.pending_post = None;

                match result {
                    Ok(post) => {
                        let post = html::sanitize_post(post);
                        let category = post.category.clone();
                        self.store.update(|state| {
                            state.post = Some(post);
                            state.not_found = false;
                            state.is_loading = false;
                        });
                        self.load_related(&category, &post_id);
                    }
                    Err(err) => {
                        let message = match err {
                            ApiError::NotFound => "Blog post not found".to_string(),
                            ref other => other.user_message("Failed to load blog post"),
                        };
                        self.store.notify(Notification::error(message));
                        self.store.update(|state| {
                            state.post = None;
                            state.not_found = true;
                            state.is_loading = false;
                        });
                    }
                }
            }
            AsyncResponse::Related { request_id, result } => {
                let Some(pending) = &self.pending_related else {
                    return;
                };
                if !pending.accepts(request_id) {
                    return;
                }
                let post_id = pending.post_id.clone();
                self.pending_related = None;

                match result {
                    Ok(mut posts) => {
                        posts.truncate(RELATED_LIMIT);
                        let related = posts.into_iter().map(html::sanitize_post).collect();
                        self.store.update(|state| state.related = related);
                    }
                    Err(err) => {
                        tracing::warn!(post_id = %post_id, error = %err, "failed to load related posts");
                        self.store.update(|state| state.related.clear());
                    }
                }
            }
            AsyncResponse::Comments { request_id, result } => {
                let Some(pending) = &self.pending_comments else {
                    return;
                };
                if !pending.accepts(request_id) {
                    return;
                }
                self.pending_comments = None;

                match result {
                    Ok(mut comments) => {
                        let hidden = comments.len().saturating_sub(self.max_comments);
                        comments.truncate(self.max_comments);
                        let comments = comments.into_iter().map(html::sanitize_comment).collect();
                        self.store.update(|state| {
                            state.comments = comments;
                            state.comments_hidden = hidden;
                        });
                    }
                    Err(err) => {
                        let message = err.user_message("Failed to load comments");
                        self.store.notify(Notification::error(message));
                    }
                }
                self.sync_comment_loading();
            }
            AsyncResponse::Submitted { request_id, result } => {
                let Some(pending) = &self.pending_submit else {
                    return;
                };
                if !pending.accepts(request_id) {
                    return;
                }
                let post_id = pending.post_id.clone();
                self.pending_submit = None;

                match result {
                    Ok(()) => {
                        self.store
                            .notify(Notification::success("Comment added successfully"));
                        self.store.update(|state| state.draft.clear());
                        self.load_comments(&post_id);
                    }
                    Err(err) => {
                        let message = err.user_message("Failed to add comment");
                        self.store.notify(Notification::error(message));
                    }
                }
                self.sync_comment_loading();
            }
        }
    }
}
