#![allow(clippy::uninlined_format_args)]

pub mod api;
pub mod app;
pub mod config;
pub mod data;
pub mod html;
pub mod models;
pub mod render;
pub mod share;
pub mod state;
pub mod storage;
pub mod view;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::{run, Command};
