pub mod api;
pub mod commands;
pub mod config;
pub mod display;
pub mod downloader;
pub mod errors;
pub mod library;
pub mod metadata;
pub mod search;
pub mod security;
pub mod utils;
pub mod web;

pub use errors::{AppError, Result};
