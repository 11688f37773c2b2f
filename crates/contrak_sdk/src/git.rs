use std::path::Path;

use git2::Repository;
use tracing::debug;

const DEFAULT_REMOTE: &str = "origin";

/// Commit link and author name for the repository a deployment was made from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitMetadata {
    pub commit_link: Option<String>,
    pub username: Option<String>,
}

impl GitMetadata {
    /// Collect metadata for the repository containing `dir`. Never fails:
    /// anything that cannot be resolved is left as `None`.
    pub fn collect(dir: &Path) -> Self {
        let metadata = Self {
            commit_link: commit_link(dir),
            username: git_username(dir),
        };
        debug!(
            commit_link = ?metadata.commit_link,
            username = ?metadata.username,
            "collected git metadata"
        );
        metadata
    }
}

/// Web link to the HEAD commit, built from the `origin` remote.
pub fn commit_link(dir: &Path) -> Option<String> {
    let repo = Repository::discover(dir).ok()?;
    let remote = repo.find_remote(DEFAULT_REMOTE).ok()?;
    let base = normalize_remote_url(remote.url()?)?;
    let head = repo.head().ok()?.peel_to_commit().ok()?;
    Some(format!("{base}/commit/{}", head.id()))
}

/// `user.name` from the repository config, falling back to the global config.
pub fn git_username(dir: &Path) -> Option<String> {
    let config = match Repository::discover(dir) {
        Ok(repo) => repo.config().ok()?,
        Err(_) => git2::Config::open_default().ok()?,
    };
    config
        .get_string("user.name")
        .ok()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Turn a clone URL (`https://`, `ssh://`, `git://` or scp-like
/// `git@host:owner/repo.git`) into `https://host/owner/repo`.
pub fn normalize_remote_url(remote: &str) -> Option<String> {
    let remote = remote.trim();

    let (host, path) = if remote.contains("://") {
        let parsed = url::Url::parse(remote).ok()?;
        if !matches!(parsed.scheme(), "http" | "https" | "ssh" | "git" | "git+ssh") {
            return None;
        }
        (parsed.host_str()?.to_string(), parsed.path().to_string())
    } else {
        let (left, path) = remote.split_once(':')?;
        if left.is_empty() || left.contains('/') {
            return None;
        }
        let host = left.rsplit_once('@').map_or(left, |(_, host)| host);
        (host.to_string(), path.to_string())
    };

    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    if host.is_empty() || path.is_empty() {
        return None;
    }
    Some(format!("https://{host}/{path}"))
}
