use std::path::{Component, Path};

use url::Url;

use crate::errors::{AppError, Result};

const MAX_QUERY_LEN: usize = 500;

/// Checks user input before it reaches the catalog, the video site or the filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputValidator;

impl InputValidator {
    pub fn new() -> Self {
        Self
    }

    /// Queries only travel as url-encoded parameters, so any non-blank text is accepted.
    pub fn validate_search_query(&self, query: &str) -> Result<()> {
        if query.trim().is_empty() {
            return Err(AppError::Validation("Search query cannot be empty".to_string()));
        }

        if query.chars().count() > MAX_QUERY_LEN {
            return Err(AppError::Validation(format!(
                "Search query too long (max {} characters)",
                MAX_QUERY_LEN
            )));
        }

        Ok(())
    }

    /// Video links must be absolute http(s) urls with a host.
    pub fn validate_url(&self, url: &str) -> Result<()> {
        if url.is_empty() {
            return Err(AppError::Validation("URL cannot be empty".to_string()));
        }

        let parsed = Url::parse(url).map_err(|e| AppError::Validation(format!("Invalid URL: {}", e)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::Validation(format!("Unsupported URL scheme: {}", parsed.scheme())));
        }

        match parsed.host_str() {
            Some(host) if !host.is_empty() => Ok(()),
            _ => Err(AppError::Validation("URL must have a host".to_string())),
        }
    }

    pub fn validate_file_path(&self, path: &str) -> Result<()> {
        if path.is_empty() {
            return Err(AppError::Validation("File path cannot be empty".to_string()));
        }

        if path.contains('\0') {
            return Err(AppError::Validation("Null bytes not allowed in file path".to_string()));
        }

        if Path::new(path).components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(AppError::Validation("Path traversal detected".to_string()));
        }

        Ok(())
    }
}
