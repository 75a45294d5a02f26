use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use crossbeam_channel::Receiver;

use crate::api;
use crate::config;
use crate::data::{ApiCommentService, ApiPostService, CommentService, PostService};
use crate::render;
use crate::share::Platform;
use crate::state::{Event, Level};
use crate::storage;
use crate::view::{self, BlogView};

/// Overrides the config file location.
pub const CONFIG_ENV: &str = "BLOGVIEW_CONFIG";

/// Upper bound on how long a command waits for its requests to settle.
const WAIT_LIMIT: Duration = Duration::from_secs(120);

pub const USAGE: &str = "\
blogview - Read, share and comment on blog posts from the terminal.

Usage:
  blogview list [FILTER]                     List posts, optionally filtered
  blogview show <ID>                         Show a post with comments and related posts
  blogview comment <ID> <NAME> <CONTENT>     Add a comment to a post
  blogview share <PLATFORM> <ID> [--open]    Print a facebook/twitter/linkedin share link
  blogview token <VALUE>                     Store the API token
  blogview token --clear                     Forget the stored API token

  --version, -V        Show version and exit
  --help,    -h        Show this help message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List { filter: Option<String> },
    Show { id: String },
    Comment { id: String, name: String, content: String },
    Share { platform: String, id: String, open: bool },
    SetToken(String),
    ClearToken,
}

impl Command {
    pub fn parse<I>(args: I) -> Result<Command>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let name = args.next().ok_or_else(|| anyhow!("missing command\n\n{USAGE}"))?;
        let rest: Vec<String> = args.collect();

        let command = match (name.as_str(), rest.as_slice()) {
            ("list", []) => Command::List { filter: None },
            ("list", [filter]) => Command::List {
                filter: Some(filter.clone()),
            },
            ("show", [id]) => Command::Show { id: id.clone() },
            ("comment", [id, name, content]) => Command::Comment {
                id: id.clone(),
                name: name.clone(),
                content: content.clone(),
            },
            ("share", [platform, id]) => Command::Share {
                platform: platform.clone(),
                id: id.clone(),
                open: false,
            },
            ("share", [platform, id, flag]) if flag == "--open" => Command::Share {
                platform: platform.clone(),
                id: id.clone(),
                open: true,
            },
            ("token", [flag]) if flag == "--clear" => Command::ClearToken,
            ("token", [value]) => Command::SetToken(value.clone()),
            ("list" | "show" | "comment" | "share" | "token", _) => {
                bail!("wrong arguments for `{name}`\n\n{USAGE}")
            }
            _ => bail!("unknown command `{name}`\n\n{USAGE}"),
        };
        Ok(command)
    }
}

pub fn run(command: Command) -> Result<()> {
    let cfg = config::load(config::LoadOptions {
        config_file: std::env::var_os(CONFIG_ENV).map(PathBuf::from),
        env_prefix: None,
    })
    .context("load config")?;

    let store = storage::Store::open(storage::Options {
        path: cfg.storage.path.clone(),
    })
    .context("open storage")?;

    match command {
        Command::SetToken(value) => {
            store.set_token(&value).context("save token")?;
            println!("Token saved.");
        }
        Command::ClearToken => {
            if store.clear_token().context("clear token")? {
                println!("Token cleared.");
            } else {
                println!("No token stored.");
            }
        }
        Command::List { filter } => {
            let mut session = Session::start(&cfg, &store)?;
            session.view.load_posts();
            if let Some(filter) = filter {
                session.view.set_filter(&filter);
            }
            session.settle()?;
            if session.report() {
                bail!("could not load blog posts");
            }
            print!(
                "{}",
                render::post_list(
                    &session.view.state().filtered_posts(),
                    render::DEFAULT_WIDTH
                )
            );
        }
        Command::Show { id } => {
            let mut session = Session::start(&cfg, &store)?;
            session.view.open(&id);
            session.settle()?;
            session.report();
            if session.view.state().not_found {
                bail!("could not load blog post {id}");
            }
            print!(
                "{}",
                render::post_page(session.view.state(), render::DEFAULT_WIDTH, Utc::now())
            );
        }
        Command::Comment { id, name, content } => {
            let mut session = Session::start(&cfg, &store)?;
            session.view.focus(&id);
            session.view.set_draft_name(&name);
            session.view.set_draft_content(&content);
            if let Err(err) = session.view.submit_comment() {
                session.report();
                return Err(err).context("comment rejected");
            }
            session.settle()?;
            if session.report() {
                bail!("comment was not added");
            }
            print!(
                "{}",
                render::comment_section(session.view.state(), render::DEFAULT_WIDTH, Utc::now())
            );
        }
        Command::Share { platform, id, open } => {
            if platform.parse::<Platform>().is_err() {
                println!("Sharing to {platform:?} is not supported; nothing to do.");
                return store.close();
            }
            let mut session = Session::start(&cfg, &store)?;
            session.view.focus(&id);
            session.view.load_post(&id);
            session.settle()?;
            session.report();
            let page_url = cfg.share.page_url(&id);
            let url = if open {
                session.view.share(&platform, &page_url).context("open browser")?
            } else {
                session.view.share_url(&platform, &page_url)
            }
            .ok_or_else(|| anyhow!("unsupported share platform {platform:?}"))?;
            println!("{url}");
        }
    }

    store.close()
}

/// A view wired to the blog API, plus the event feed the command reports from.
struct Session {
    view: BlogView,
    events: Receiver<Event>,
}

impl Session {
    fn start(cfg: &config::Config, store: &storage::Store) -> Result<Self> {
        let token = store.token().context("read token")?;
        let client = api::Client::new(api::ClientConfig {
            base_url: Some(cfg.api.base_url.clone()),
            user_agent: cfg.api.user_agent.clone(),
            token,
            timeout: cfg.api.timeout,
            http_client: None,
        })
        .context("create blog api client")?;
        tracing::info!(
            base_url = %client.base_url(),
            authorized = client.has_token(),
            "api client ready"
        );
        let client = Arc::new(client);

        let post_service: Arc<dyn PostService> = Arc::new(ApiPostService::new(client.clone()));
        let comment_service: Arc<dyn CommentService> =
            Arc::new(ApiCommentService::new(client));
        let mut view = BlogView::new(view::Options {
            post_service,
            comment_service,
            max_comments: cfg.comments.max_display,
        });
        let events = view.subscribe();
        Ok(Self { view, events })
    }

    fn settle(&mut self) -> Result<()> {
        if !self.view.wait_idle(WAIT_LIMIT) {
            bail!(
                "timed out after {} waiting for the blog api",
                humantime::format_duration(WAIT_LIMIT)
            );
        }
        Ok(())
    }

    /// Prints queued notifications; errors go to stderr. Returns whether any error was seen.
    fn report(&self) -> bool {
        let mut failed = false;
        for event in self.events.try_iter() {
            if let Event::Notify(notification) = event {
                let line = render::notification_line(&notification);
                match notification.level {
                    Level::Success => println!("{line}"),
                    Level::Error => {
                        failed = true;
                        eprintln!("{line}");
                    }
                }
            }
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command> {
        Command::parse(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn parses_every_command() {
        assert_eq!(parse(&["list"]).unwrap(), Command::List { filter: None });
        assert_eq!(
            parse(&["list", "rust"]).unwrap(),
            Command::List {
                filter: Some("rust".into())
            }
        );
        assert_eq!(
            parse(&["show", "42"]).unwrap(),
            Command::Show { id: "42".into() }
        );
        assert_eq!(
            parse(&["comment", "42", "Al", "Great article!"]).unwrap(),
            Command::Comment {
                id: "42".into(),
                name: "Al".into(),
                content: "Great article!".into(),
            }
        );
        assert_eq!(
            parse(&["share", "twitter", "42", "--open"]).unwrap(),
            Command::Share {
                platform: "twitter".into(),
                id: "42".into(),
                open: true,
            }
        );
        assert_eq!(
            parse(&["token", "abc"]).unwrap(),
            Command::SetToken("abc".into())
        );
        assert_eq!(parse(&["token", "--clear"]).unwrap(), Command::ClearToken);
    }

    #[test]
    fn rejects_bad_invocations() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["frobnicate"]).is_err());
        assert!(parse(&["show"]).is_err());
        assert!(parse(&["comment", "42", "Al"]).is_err());
        assert!(parse(&["share", "twitter", "42", "--now"]).is_err());
    }
}
