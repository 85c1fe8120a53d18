pub mod client;
pub mod config;
pub mod models;
pub mod parser;
pub mod rate_limiter;

pub use client::GitHubClient;
pub use config::GitHubConfig;
pub use models::{ContentEntry, ContentKind, Contents, FileContent, RepositorySummary};
pub use parser::{parse_repository_url, RepositoryRef};
pub use rate_limiter::{RateLimitStatus, RateLimiter};
