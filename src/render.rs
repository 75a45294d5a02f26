use std::fmt::Write as _;

use chrono::{DateTime, Datelike, Utc};

use crate::html;
use crate::models::{Comment, Post};
use crate::state::{Level, Notification, ViewState};

pub const DEFAULT_WIDTH: usize = 80;

/// "October 17th 2026".
pub fn published_date(date: DateTime<Utc>) -> String {
    let day = date.day();
    format!(
        "{} {}{} {}",
        date.format("%B"),
        day,
        ordinal_suffix(day),
        date.year()
    )
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Coarse relative age, e.g. "a few seconds ago", "3 hours ago", "a year ago".
pub fn from_now(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(then);
    let future = elapsed.num_seconds() < 0;
    let secs = elapsed.num_seconds().unsigned_abs() as f64;
    let minutes = secs / 60.0;
    let hours = minutes / 60.0;
    let days = hours / 24.0;

    let phrase = if secs < 45.0 {
        "a few seconds".to_string()
    } else if secs < 90.0 {
        "a minute".to_string()
    } else if minutes < 45.0 {
        format!("{} minutes", minutes.round() as i64)
    } else if minutes < 90.0 {
        "an hour".to_string()
    } else if hours < 22.0 {
        format!("{} hours", hours.round() as i64)
    } else if hours < 36.0 {
        "a day".to_string()
    } else if days < 26.0 {
        format!("{} days", days.round() as i64)
    } else if days < 45.0 {
        "a month".to_string()
    } else if days < 320.0 {
        format!("{} months", ((days / 30.4).round() as i64).max(2))
    } else if days < 548.0 {
        "a year".to_string()
    } else {
        format!("{} years", ((days / 365.0).round() as i64).max(2))
    };

    if future {
        format!("in {phrase}")
    } else {
        format!("{phrase} ago")
    }
}

pub fn notification_line(notification: &Notification) -> String {
    match notification.level {
        Level::Success => format!("[ok] {}", notification.message),
        Level::Error => format!("[error] {}", notification.message),
    }
}

pub fn post_list(posts: &[&Post], width: usize) -> String {
    if posts.is_empty() {
        return "No posts found.\n".to_string();
    }
    let mut out = String::new();
    for post in posts {
        let _ = writeln!(out, "[{}] {}", post.category.to_uppercase(), post.title);
        let _ = writeln!(out, "  id: {}", post.id);
        let excerpt = html::to_text(&post.description);
        if let Some(first) = excerpt.split("\n\n").next().filter(|p| !p.is_empty()) {
            let options = textwrap::Options::new(width.max(20))
                .initial_indent("  ")
                .subsequent_indent("  ");
            let _ = writeln!(out, "{}", textwrap::fill(first, options));
        }
        out.push('\n');
    }
    out
}

pub fn post_page(state: &ViewState, width: usize, now: DateTime<Utc>) -> String {
    if state.is_loading {
        return "Loading...\n".to_string();
    }
    let Some(post) = &state.post else {
        return "Blog post not found\n".to_string();
    };

    let width = width.max(20);
    let mut out = String::new();
    if let Some(created) = post.created_at {
        let _ = writeln!(out, "Published on {}", published_date(created));
    }
    let _ = writeln!(out, "{}", post.title);
    if !post.sub_title.trim().is_empty() {
        let _ = writeln!(out, "{}", textwrap::fill(&post.sub_title, width));
    }
    let _ = writeln!(out, "{}", "=".repeat(width.min(post.title.chars().count().max(3))));
    out.push('\n');
    let body = html::to_text(&post.description);
    if !body.is_empty() {
        let _ = writeln!(out, "{}", textwrap::fill(&body, width));
        out.push('\n');
    }

    out.push_str(&comment_section(state, width, now));

    if !state.related.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "You Might Also Like");
        for related in &state.related {
            let _ = writeln!(out, "  - {} ({})", related.title, related.id);
            if !related.sub_title.trim().is_empty() {
                let _ = writeln!(out, "    {}", related.sub_title);
            }
        }
    }
    out
}

pub fn comment_section(state: &ViewState, width: usize, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let total = state.comments.len() + state.comments_hidden;
    let _ = writeln!(out, "Comments ({total})");
    if state.is_comment_loading {
        let _ = writeln!(out, "  Loading comments...");
        return out;
    }
    if state.comments.is_empty() {
        let _ = writeln!(
            out,
            "  No comments yet. Be the first to share your thoughts!"
        );
        return out;
    }
    for comment in &state.comments {
        out.push_str(&comment_entry(comment, width, now));
    }
    if state.comments_hidden > 0 {
        let _ = writeln!(out, "  ... {} more comments not shown", state.comments_hidden);
    }
    out
}

fn comment_entry(comment: &Comment, width: usize, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    match comment.created_at {
        Some(created) => {
            let _ = writeln!(out, "  {} · {}", comment.name, from_now(created, now));
        }
        None => {
            let _ = writeln!(out, "  {}", comment.name);
        }
    }
    let options = textwrap::Options::new(width)
        .initial_indent("    ")
        .subsequent_indent("    ");
    let _ = writeln!(out, "{}", textwrap::fill(&html::to_text(&comment.content), options));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn published_date_uses_ordinals() {
        assert_eq!(published_date(at(2026, 10, 17)), "October 17th 2026");
        assert_eq!(published_date(at(2025, 1, 1)), "January 1st 2025");
        assert_eq!(published_date(at(2025, 3, 22)), "March 22nd 2025");
        assert_eq!(published_date(at(2025, 5, 23)), "May 23rd 2025");
        assert_eq!(published_date(at(2025, 6, 12)), "June 12th 2025");
    }

    #[test]
    fn from_now_buckets() {
        let now = at(2026, 10, 17);
        let cases = [
            (Duration::seconds(10), "a few seconds ago"),
            (Duration::seconds(60), "a minute ago"),
            (Duration::minutes(5), "5 minutes ago"),
            (Duration::minutes(60), "an hour ago"),
            (Duration::hours(3), "3 hours ago"),
            (Duration::hours(30), "a day ago"),
            (Duration::days(4), "4 days ago"),
            (Duration::days(30), "a month ago"),
            (Duration::days(95), "3 months ago"),
            (Duration::days(400), "a year ago"),
            (Duration::days(1100), "3 years ago"),
        ];
        for (ago, expected) in cases {
            assert_eq!(from_now(now - ago, now), expected, "{ago:?}");
        }
        assert_eq!(from_now(now + Duration::hours(2), now), "in 2 hours");
    }

    #[test]
    fn missing_post_renders_not_found() {
        let state = ViewState::default();
        assert_eq!(post_page(&state, 80, Utc::now()), "Blog post not found\n");
    }

    #[test]
    fn post_page_lists_comments_and_related() {
        let now = at(2026, 10, 17);
        let state = ViewState {
            post: Some(Post {
                id: "42".into(),
                title: "Hello".into(),
                sub_title: "A greeting".into(),
                description: "<p>First paragraph</p><p>Second</p>".into(),
                image: String::new(),
                category: "Life".into(),
                created_at: Some(at(2026, 10, 1)),
            }),
            comments: vec![Comment {
                name: "Al".into(),
                content: "Great article!".into(),
                created_at: Some(now - Duration::hours(2)),
            }],
            comments_hidden: 2,
            related: vec![Post {
                id: "7".into(),
                title: "Another".into(),
                sub_title: String::new(),
                description: String::new(),
                image: String::new(),
                category: "Life".into(),
                created_at: None,
            }],
            ..ViewState::default()
        };

        let page = post_page(&state, 80, now);
        assert!(page.starts_with("Published on October 1st 2026\nHello\n"));
        assert!(page.contains("First paragraph\n\nSecond"));
        assert!(page.contains("Comments (3)"));
        assert!(page.contains("Al · 2 hours ago"));
        assert!(page.contains("    Great article!"));
        assert!(page.contains("2 more comments not shown"));
        assert!(page.contains("You Might Also Like\n  - Another (7)"));
    }

    #[test]
    fn empty_comment_section_invites_first_comment() {
        let section = comment_section(&ViewState::default(), 80, Utc::now());
        assert!(section.contains("Be the first to share your thoughts!"));
    }
}
