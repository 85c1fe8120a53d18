use clap::Parser;
use code_insights::{
    api::{handlers::AppState, routes},
    cli::{commands, Cli, Commands},
    config::Settings,
    session::SessionStore,
    Error, Insights, Result,
};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Silently ignore a missing .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,code_insights=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let settings = Settings::from_env()?;
    settings.validate()?;

    match cli.command {
        Commands::Serve { port, host } => serve(settings, port, host).await,
        command => run_command(Insights::new(&settings)?, command).await,
    }
}

async fn run_command(insights: Insights, command: Commands) -> Result<()> {
    match command {
        Commands::Serve { .. } => Ok(()),
        Commands::Repos { username } => commands::repos(&insights, &username).await,
        Commands::Tree { repo, sizes } => commands::tree(&insights, &repo, sizes).await,
        Commands::Analyze { repo } => commands::analyze(&insights, &repo).await,
        Commands::Docs { repo, path } => commands::docs(&insights, &repo, &path).await,
        Commands::Ask { repo, question } => commands::ask(&insights, &repo, &question).await,
        Commands::Suggest { repo } => commands::suggest(&insights, &repo).await,
        Commands::Search { query } => commands::search(&insights, &query).await,
    }
}

async fn serve(mut settings: Settings, port: Option<u16>, host: Option<String>) -> Result<()> {
    if let Some(port) = port {
        settings.server.port = port;
    }
    if let Some(host) = host {
        settings.server.host = host;
    }

    info!("Starting Code Insights server");
    info!("Server: {}:{}", settings.server.host, settings.server.port);
    info!("GitHub API: {}", settings.github.api_base_url());

    let insights = Insights::new(&settings)?;

    let state = AppState {
        insights,
        sessions: SessionStore::default(),
        settings: settings.clone(),
    };

    let app = routes::create_router(state, &settings);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    println!("\n========================================");
    println!("Code Insights");
    println!("========================================");
    println!("Address: http://{addr}");
    println!(
        "GitHub: {}",
        if settings.github.is_authenticated() {
            "authenticated"
        } else {
            "anonymous (60 requests/hour)"
        }
    );
    println!(
        "AI: {}",
        if settings.ai.is_configured() {
            settings.ai.model.as_str()
        } else {
            "not configured"
        }
    );
    println!("\nPress Ctrl+C to stop");
    println!("========================================\n");

    info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| Error::Internal(format!("Server error: {e}")))?;

    info!("Shutting down...");
    Ok(())
}
