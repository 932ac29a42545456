use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::errors::Result;

const ILLEGAL_CHARACTERS: &[char] = &['\\', '"', '/', '*', '?', '<', '>', '|', '\'', ':'];

/// Strips characters that are unsafe in file names.
pub fn remove_illegal_characters(filename: &str) -> String {
    filename.chars().filter(|c| !ILLEGAL_CHARACTERS.contains(c)).collect()
}

/// Finds a free variant of `path` by inserting `dup_key` before the
/// extension, once per taken name. Gives up when `count` reaches `limit`.
pub fn fname_duper(path: &Path, limit: u32, count: u32, dup_key: &str) -> Option<PathBuf> {
    if count >= limit {
        log::error!(
            "❌ [FILES] Max retry limit {} reached for fname {:?}. Please try changing some filenames and try again later.",
            limit, path
        );
        return None;
    }

    if !path.exists() {
        return Some(path.to_path_buf());
    }

    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, dup_key, ext.to_string_lossy()),
        None => format!("{}{}", stem, dup_key),
    };
    fname_duper(&path.with_file_name(name), limit, count + 1, dup_key)
}

fn component_regex(component: &str) -> Option<Regex> {
    let mut pattern = String::from("^");
    for c in component.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            c => pattern.push_str(&regex::escape(&c.to_string())),
        }
    }
    pattern.push('$');
    Regex::new(&pattern).ok()
}

/// Glob lookup under `root`. `*` and `?` match within one path component;
/// each `/` in `pattern` is one directory level.
pub fn find_file(root: &Path, pattern: &str) -> Vec<PathBuf> {
    let components: Vec<Regex> = match pattern
        .split('/')
        .filter(|c| !c.is_empty())
        .map(component_regex)
        .collect::<Option<Vec<_>>>()
    {
        Some(components) if !components.is_empty() => components,
        _ => return Vec::new(),
    };

    let depth = components.len();
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(depth)
        .max_depth(depth)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let relative = match entry.path().strip_prefix(root) {
                Ok(relative) => relative,
                Err(_) => return false,
            };
            relative
                .components()
                .zip(components.iter())
                .all(|(part, re)| re.is_match(&part.as_os_str().to_string_lossy()))
        })
        .map(|entry| entry.into_path())
        .collect();

    found.sort();
    found
}

pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        log::info!("📁 [FILES] Creating directory {:?}", path);
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
