use crate::github::RepositorySummary;
use crate::insights::Insights;
use crate::tree::{flatten, TreeBuild, TreeOptions};
use crate::Result;

/// List a user's repositories
pub async fn repos(insights: &Insights, username: &str) -> Result<()> {
    let repos = insights.user_repos(username).await?;
    print_repositories(&repos);
    Ok(())
}

/// Print the file tree of a repository
pub async fn tree(insights: &Insights, repo_url: &str, sizes: bool) -> Result<()> {
    let options = if sizes {
        TreeOptions::sized()
    } else {
        TreeOptions::default()
    };

    let (repository, tree) = insights.tree(repo_url, "", options).await?;
    println!("{repository}");
    print_tree(&tree);
    Ok(())
}

pub async fn analyze(insights: &Insights, repo_url: &str) -> Result<()> {
    let analysis = insights.analyze(repo_url).await?;

    println!("\n# {}\n", analysis.repository);
    println!("{}\n", analysis.summary);
    print_tree(&analysis.tree);
    Ok(())
}

pub async fn docs(insights: &Insights, repo_url: &str, path: &str) -> Result<()> {
    let doc = insights.document_file(repo_url, path).await?;

    println!("\n# {}\n", doc.path);
    println!("{}", doc.documentation);
    Ok(())
}

pub async fn ask(insights: &Insights, repo_url: &str, question: &str) -> Result<()> {
    let answer = insights.answer(repo_url, question).await?;
    println!("{answer}");
    Ok(())
}

pub async fn suggest(insights: &Insights, repo_url: &str) -> Result<()> {
    let outcome = insights.suggest(repo_url).await?;

    if !outcome.keywords.is_empty() {
        println!("Keywords: {}", outcome.keywords.join(", "));
    }

    if outcome.suggestions.is_empty() {
        println!("No similar repositories found");
        return Ok(());
    }

    println!("\n{:<40} {:>8}  {}", "Repository", "Stars", "Reason");
    println!("{}", "-".repeat(90));

    for suggestion in &outcome.suggestions {
        println!(
            "{:<40} {:>8}  {}",
            truncate(&suggestion.details.full_name, 38),
            suggestion.details.stargazers_count,
            truncate(&suggestion.reason, 60)
        );
    }

    if outcome.dropped > 0 {
        println!("\n({} suggestions could not be found on GitHub)", outcome.dropped);
    }
    Ok(())
}

pub async fn search(insights: &Insights, query: &str) -> Result<()> {
    let repos = insights.search(query).await?;
    print_repositories(&repos);
    Ok(())
}

fn print_repositories(repos: &[RepositorySummary]) {
    if repos.is_empty() {
        println!("No repositories found");
        return;
    }

    println!("\nFound {} repositories:\n", repos.len());
    println!("{:<40} {:>8} {:<12} {}", "Repository", "Stars", "Language", "Description");
    println!("{}", "-".repeat(100));

    for repo in repos {
        println!(
            "{:<40} {:>8} {:<12} {}",
            truncate(&repo.full_name, 38),
            repo.stargazers_count,
            truncate(repo.language.as_deref().unwrap_or("-"), 12),
            truncate(repo.description.as_deref().unwrap_or(""), 40)
        );
    }
}

fn print_tree(tree: &TreeBuild) {
    for (depth, node) in flatten(&tree.nodes) {
        let marker = if node.is_dir() { "/" } else { "" };
        match node.size {
            Some(size) => println!("{}{}{}  ({size})", "  ".repeat(depth), node.name, marker),
            None => println!("{}{}{}", "  ".repeat(depth), node.name, marker),
        }
    }

    if let Some(root_error) = &tree.diagnostics.root_error {
        eprintln!("\nCould not read the repository: {root_error}");
    } else if !tree.diagnostics.failed_paths.is_empty() {
        eprintln!(
            "\n{} folders could not be read: {}",
            tree.diagnostics.failed_subtrees,
            tree.diagnostics.failed_paths.join(", ")
        );
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
