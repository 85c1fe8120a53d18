pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "code-insights")]
#[command(about = "Code Insights - AI-assisted GitHub repository explorer", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long, env = "HOST")]
        host: Option<String>,
    },

    /// List a user's public repositories
    Repos {
        /// GitHub username
        username: String,
    },

    /// Print a repository's file tree
    Tree {
        /// Repository URL, e.g. https://github.com/owner/repo
        repo: String,

        /// Include aggregated sizes
        #[arg(long)]
        sizes: bool,
    },

    /// Summarize a repository's architecture
    Analyze {
        /// Repository URL
        repo: String,
    },

    /// Generate documentation for one file
    Docs {
        /// Repository URL
        repo: String,

        /// File path inside the repository
        path: String,
    },

    /// Ask a question about a repository
    Ask {
        /// Repository URL
        repo: String,

        /// The question
        question: String,
    },

    /// Suggest similar repositories
    Suggest {
        /// Repository URL
        repo: String,
    },

    /// Search GitHub repositories by keyword
    Search {
        /// Search query
        query: String,
    },
}
