use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub fn default_credentials_path(home_dir: &Path) -> PathBuf {
    home_dir.join(".aws/credentials")
}

/// Explicit override wins, then `AWS_SHARED_CREDENTIALS_FILE`, then the
/// conventional location under the home directory.
pub fn credentials_path(home_dir: &Path, override_path: Option<&Path>) -> PathBuf {
    if let Some(path) = override_path {
        return path.to_path_buf();
    }
    if let Some(path) = std::env::var_os("AWS_SHARED_CREDENTIALS_FILE") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    default_credentials_path(home_dir)
}

/// Profile names from the shared credentials file, in file order. Filtering
/// (the skip list) is the audit driver's job, not the parser's.
pub fn list_profiles(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read credentials file: {}", path.display()))?;
    Ok(parse_profile_names(&contents))
}

fn parse_profile_names(contents: &str) -> Vec<String> {
    let mut profiles: Vec<String> = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if !line.starts_with('[') || !line.ends_with(']') {
            continue;
        }
        let name = line[1..line.len() - 1].trim();
        if !name.is_empty() && !profiles.iter().any(|p| p == name) {
            profiles.push(name.to_string());
        }
    }
    profiles
}
