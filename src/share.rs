use std::fmt;
use std::str::FromStr;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left alone by JavaScript's `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Facebook,
    Twitter,
    Linkedin,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported share platform {0:?}")]
pub struct UnknownPlatform(pub String);

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Facebook, Platform::Twitter, Platform::Linkedin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Facebook => "facebook",
            Platform::Twitter => "twitter",
            Platform::Linkedin => "linkedin",
        }
    }

    pub fn share_url(&self, page_url: &str, title: &str) -> String {
        let url = encode(page_url);
        let title = encode(title);
        match self {
            Platform::Facebook => {
                format!("https://www.facebook.com/sharer/sharer.php?u={url}")
            }
            Platform::Twitter => {
                format!("https://twitter.com/intent/tweet?url={url}&text={title}")
            }
            Platform::Linkedin => format!(
                "https://www.linkedin.com/shareArticle?mini=true&url={url}&title={title}"
            ),
        }
    }
}

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "facebook" => Ok(Platform::Facebook),
            "twitter" => Ok(Platform::Twitter),
            "linkedin" => Ok(Platform::Linkedin),
            _ => Err(UnknownPlatform(s.to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound share link, or `None` when the platform is not supported.
pub fn build_share_url(platform: &str, page_url: &str, title: &str) -> Option<String> {
    platform
        .parse::<Platform>()
        .ok()
        .map(|platform| platform.share_url(page_url, title))
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}
