use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Owner/name pair identifying a hosted repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
}

impl RepositoryRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let owner = owner.into();
        let name = name.into();
        if owner.trim().is_empty() || name.trim().is_empty() {
            return Err(Error::Validation(
                "Repository owner and name cannot be empty".to_string(),
            ));
        }
        let owner_ok = owner.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        let name_ok = name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            && name != "."
            && name != "..";
        if !owner_ok || !name_ok {
            return Err(Error::Validation("Invalid GitHub URL".to_string()));
        }
        Ok(Self { owner, name })
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Parse a GitHub repository URL
/// Accepts formats:
/// - https://github.com/owner/repo
/// - https://github.com/owner/repo/
/// - https://github.com/owner/repo.git
/// - https://github.com/owner/repo/tree/main/src
/// - github.com/owner/repo
/// - owner/repo
pub fn parse_repository_url(url: &str) -> Result<RepositoryRef> {
    let url = url.trim();
    let lower = url.to_ascii_lowercase();

    let path = if lower.starts_with("https://") || lower.starts_with("http://") {
        // Absolute URLs must point at GitHub; query and fragment are ignored
        let parsed = Url::parse(url)
            .map_err(|_| Error::Validation("Invalid GitHub URL".to_string()))?;
        match parsed.host_str() {
            Some("github.com") | Some("www.github.com") => {}
            _ => return Err(Error::Validation("Invalid GitHub URL".to_string())),
        }
        parsed.path().trim_matches('/').to_string()
    } else {
        let rest = url.trim_end_matches('/');
        let rest = rest.strip_prefix("www.").unwrap_or(rest);
        rest.strip_prefix("github.com/").unwrap_or(rest).to_string()
    };

    // Now we should have owner/repo or owner/repo/something
    let parts: Vec<&str> = path.split('/').collect();

    if parts.len() < 2 {
        return Err(Error::Validation(
            "Invalid GitHub repository URL format. Expected: owner/repo".to_string(),
        ));
    }

    let owner = parts[0].trim();
    let repo = parts[1].trim();
    let repo = repo.strip_suffix(".git").unwrap_or(repo);

    RepositoryRef::new(owner, repo)
}
