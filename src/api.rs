use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CACHE_CONTROL, EXPIRES, PRAGMA, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::{Comment, Post};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Well-formed response with `success: false`.
    #[error("api: request rejected: {message}")]
    Rejected { message: String },
    #[error("api: post not found")]
    NotFound,
    #[error("api: http {status}")]
    Status {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("api: request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("api: decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("api: invalid endpoint: {0}")]
    Url(String),
}

impl ApiError {
    /// Text shown to the user. Server-provided messages win over `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        let server = match self {
            ApiError::Rejected { message } => Some(message.as_str()),
            ApiError::Status {
                message: Some(message),
                ..
            } => Some(message.as_str()),
            _ => None,
        };
        match server.map(str::trim) {
            Some(message) if !message.is_empty() => message.to_string(),
            _ => fallback.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub base_url: Option<String>,
    pub user_agent: String,
    /// Raw value for the `Authorization` header, read from storage at startup.
    pub token: Option<String>,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    token: Option<HeaderValue>,
    base_url: Url,
}

impl Client {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        if config.user_agent.trim().is_empty() {
            anyhow::bail!("blog api client user agent required");
        }
        let base = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&base)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("blog api base url {base} cannot carry paths");
        }
        let http = match config.http_client {
            Some(client) => client,
            None => {
                let mut builder = HttpClient::builder();
                if let Some(timeout) = config.timeout {
                    builder = builder.timeout(timeout);
                }
                builder.build()?
            }
        };
        let token = match config.token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => Some(HeaderValue::from_str(token)?),
            _ => None,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            token,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn all_posts(&self) -> Result<Vec<Post>, ApiError> {
        let payload: PostsPayload = self.get(&["blog", "all"], &[])?;
        Ok(payload.blogs)
    }

    pub fn post(&self, id: &str) -> Result<Post, ApiError> {
        let payload: PostPayload = self.get(&["blog", id], &[])?;
        payload.blog.ok_or(ApiError::NotFound)
    }

    pub fn related(&self, category: &str, exclude: &str) -> Result<Vec<Post>, ApiError> {
        let payload: RelatedPayload = self.get(
            &["blog", "related"],
            &[("category", category), ("exclude", exclude)],
        )?;
        Ok(payload.posts)
    }

    pub fn comments(&self, post_id: &str) -> Result<Vec<Comment>, ApiError> {
        let payload: CommentsPayload =
            self.post_json(&["blog", "comments"], &CommentsRequest { blog_id: post_id })?;
        Ok(payload.comments)
    }

    pub fn add_comment(&self, post_id: &str, name: &str, content: &str) -> Result<(), ApiError> {
        let _: Empty = self.post_json(
            &["blog", "add-comment"],
            &AddCommentRequest {
                blog: post_id,
                name,
                content,
            },
        )?;
        Ok(())
    }

    fn get<T>(&self, segments: &[&str], params: &[(&str, &str)]) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let mut url = self.endpoint(segments)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
            pairs.append_pair("timestamp", &timestamp_millis().to_string());
        }
        self.send(self.request(Method::GET, url))
    }

    fn post_json<B, T>(&self, segments: &[&str], body: &B) -> Result<T, ApiError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        self.send(self.request(Method::POST, url).json(body))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Url(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!(method = method.as_str(), url = url.as_str(), "blog api request");
        let mut req = self
            .http
            .request(method, url)
            .headers(no_cache_headers())
            .header(USER_AGENT, self.user_agent.clone());
        if let Some(token) = &self.token {
            req = req.header(AUTHORIZATION, token.clone());
        }
        req
    }

    fn send<T>(&self, req: RequestBuilder) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let resp = req.send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            let message = serde_json::from_str::<Envelope<Empty>>(&body)
                .ok()
                .and_then(|env| env.message);
            return Err(ApiError::Status { status, message });
        }
        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        if envelope.success {
            Ok(envelope.payload)
        } else {
            Err(ApiError::Rejected {
                message: envelope.message.unwrap_or_default(),
            })
        }
    }
}

fn no_cache_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(EXPIRES, HeaderValue::from_static("0"));
    headers
}

fn timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis()
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(flatten)]
    payload: T,
}

#[derive(Debug, Default, Deserialize)]
struct Empty {}

#[derive(Debug, Deserialize)]
struct PostsPayload {
    #[serde(default)]
    blogs: Vec<Post>,
}

#[derive(Debug, Deserialize)]
struct PostPayload {
    #[serde(default)]
    blog: Option<Post>,
}

#[derive(Debug, Deserialize)]
struct RelatedPayload {
    #[serde(default)]
    posts: Vec<Post>,
}

#[derive(Debug, Deserialize)]
struct CommentsPayload {
    #[serde(default)]
    comments: Vec<Comment>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CommentsRequest<'a> {
    blog_id: &'a str,
}

#[derive(Debug, Serialize)]
struct AddCommentRequest<'a> {
    blog: &'a str,
    name: &'a str,
    content: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> Client {
        Client::new(ClientConfig {
            base_url: Some(base.to_string()),
            user_agent: "blogview-test".into(),
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn endpoint_appends_segments_to_base_path() {
        let api = client("http://localhost:3000/api");
        let url = api.endpoint(&["blog", "all"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/blog/all");

        let api = client("http://localhost:3000/api/");
        let url = api.endpoint(&["blog", "related"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/blog/related");
    }

    #[test]
    fn endpoint_escapes_post_ids() {
        let api = client("http://localhost:3000/api");
        let url = api.endpoint(&["blog", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/blog/a%2Fb%20c");
    }

    #[test]
    fn rejects_blank_user_agent() {
        let result = Client::new(ClientConfig {
            user_agent: "  ".into(),
            ..ClientConfig::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn blank_token_is_ignored() {
        let api = Client::new(ClientConfig {
            user_agent: "ua".into(),
            token: Some("   ".into()),
            ..ClientConfig::default()
        })
        .unwrap();
        assert!(!api.has_token());
    }

    #[test]
    fn user_message_prefers_server_text() {
        let rejected = ApiError::Rejected {
            message: "Blog not found".into(),
        };
        assert_eq!(rejected.user_message("fallback"), "Blog not found");

        let status = ApiError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: Some("database offline".into()),
        };
        assert_eq!(status.user_message("fallback"), "database offline");

        let bare = ApiError::Status {
            status: StatusCode::BAD_GATEWAY,
            message: None,
        };
        assert_eq!(bare.user_message("Failed to load comments"), "Failed to load comments");

        let empty = ApiError::Rejected { message: "  ".into() };
        assert_eq!(empty.user_message("fallback"), "fallback");
    }

    #[test]
    fn envelope_keeps_payload_alongside_flags() {
        let env: Envelope<CommentsPayload> = serde_json::from_str(
            r#"{"success":true,"comments":[{"name":"Al","content":"Hello there!"}]}"#,
        )
        .unwrap();
        assert!(env.success);
        assert_eq!(env.payload.comments.len(), 1);

        let env: Envelope<PostPayload> =
            serde_json::from_str(r#"{"success":false,"message":"nope"}"#).unwrap();
        assert!(!env.success);
        assert!(env.payload.blog.is_none());
        assert_eq!(env.message.as_deref(), Some("nope"));
    }
}
