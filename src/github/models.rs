use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// GitHub repository information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositorySummary {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    pub language: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Kind of an entry returned by the contents endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(other)]
    Other,
}

/// Shallow directory entry from the contents endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// File content from GitHub API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileContent {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub content: Option<String>,
    pub encoding: Option<String>,
}

impl FileContent {
    /// Decode the file body into text.
    ///
    /// GitHub wraps base64 payloads at 60 columns, so whitespace is stripped
    /// before decoding. Returns `None` when the response carried no content.
    pub fn decode(&self) -> Result<Option<String>> {
        let Some(content) = &self.content else {
            return Ok(None);
        };

        match self.encoding.as_deref() {
            Some("base64") => {
                let compact: String = content.split_whitespace().collect();
                let bytes = STANDARD.decode(compact.as_bytes()).map_err(|e| {
                    Error::Validation(format!("Invalid base64 content in {}: {e}", self.path))
                })?;
                let text = String::from_utf8(bytes).map_err(|_| {
                    Error::Validation(format!("{} is not a UTF-8 text file", self.path))
                })?;
                Ok(Some(text))
            }
            // "none" is returned for files over 1MB; there is nothing to decode
            Some("none") => Ok(None),
            _ => Ok(Some(content.clone())),
        }
    }
}

/// Body of the contents endpoint: a listing for directories, a blob for files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Contents {
    Directory(Vec<ContentEntry>),
    File(FileContent),
}

/// Repository search response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    pub items: Vec<RepositorySummary>,
}

/// Error body GitHub sends with non-2xx responses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_wrapped_base64() {
        let file = FileContent {
            name: "README.md".to_string(),
            path: "README.md".to_string(),
            size: 12,
            kind: ContentKind::File,
            content: Some("SGVsbG8s\nIHdvcmxk\n".to_string()),
            encoding: Some("base64".to_string()),
        };
        assert_eq!(file.decode().unwrap().as_deref(), Some("Hello, world"));
    }

    #[test]
    fn test_decode_missing_content() {
        let file = FileContent {
            name: "big.bin".to_string(),
            path: "big.bin".to_string(),
            size: 5_000_000,
            kind: ContentKind::File,
            content: Some(String::new()),
            encoding: Some("none".to_string()),
        };
        assert_eq!(file.decode().unwrap(), None);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let file = FileContent {
            name: "x".to_string(),
            path: "x".to_string(),
            size: 1,
            kind: ContentKind::File,
            content: Some("!!!not base64!!!".to_string()),
            encoding: Some("base64".to_string()),
        };
        assert!(file.decode().is_err());
    }

    #[test]
    fn test_contents_untagged_directory_and_file() {
        let dir: Contents = serde_json::from_str(
            r#"[{"name":"src","path":"src","type":"dir","size":0},
                {"name":"a.ts","path":"a.ts","type":"file","size":10}]"#,
        )
        .unwrap();
        match dir {
            Contents::Directory(entries) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].kind, ContentKind::Dir);
            }
            Contents::File(_) => panic!("expected directory listing"),
        }

        let file: Contents = serde_json::from_str(
            r#"{"name":"a.ts","path":"a.ts","type":"file","size":3,
                "content":"YWJj","encoding":"base64"}"#,
        )
        .unwrap();
        assert!(matches!(file, Contents::File(_)));
    }

    #[test]
    fn test_unknown_kind_maps_to_other() {
        let entry: ContentEntry =
            serde_json::from_str(r#"{"name":"x","path":"x","type":"weird"}"#).unwrap();
        assert_eq!(entry.kind, ContentKind::Other);
        assert_eq!(entry.size, 0);
    }
}
