use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::models::{Comment, CommentDraft, Post};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

/// One-shot user-visible message, the terminal equivalent of a toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub posts: Vec<Post>,
    pub filter: String,
    pub post: Option<Post>,
    /// Set once a post fetch has finished without producing a post.
    pub not_found: bool,
    pub related: Vec<Post>,
    pub comments: Vec<Comment>,
    pub comments_hidden: usize,
    pub draft: CommentDraft,
    pub is_loading: bool,
    pub is_posts_loading: bool,
    pub is_comment_loading: bool,
}

impl ViewState {
    pub fn filtered_posts(&self) -> Vec<&Post> {
        self.posts
            .iter()
            .filter(|post| post.matches(&self.filter))
            .collect()
    }

    /// Submitting is disabled while comments load or a submission is in flight.
    pub fn can_submit(&self) -> bool {
        !self.is_comment_loading
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    Changed(Arc<ViewState>),
    Notify(Notification),
}

#[derive(Default)]
pub struct StateStore {
    state: ViewState,
    /// Last snapshot handed to subscribers.
    published: Arc<ViewState>,
    subscribers: Vec<Sender<Event>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn subscribe(&mut self) -> Receiver<Event> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Applies `f` and publishes a snapshot if anything changed.
    pub fn update<F>(&mut self, f: F)
    where
        F: FnOnce(&mut ViewState),
    {
        f(&mut self.state);
        if self.state != *self.published {
            self.published = Arc::new(self.state.clone());
            self.publish(Event::Changed(self.published.clone()));
        }
    }

    pub fn notify(&mut self, notification: Notification) {
        tracing::debug!(level = ?notification.level, text = %notification.message, "notify");
        self.publish(Event::Notify(notification));
    }

    fn publish(&mut self, event: Event) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}
