use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;
use whisperwall_backend_api::{build_router, AppState};
use whisperwall_config::load as load_config;
use whisperwall_database::{Message, MessageRepository};
use whisperwall_runtime::{telemetry, BackendServices};

#[derive(Parser)]
#[command(name = "whisperwall-backend")]
#[command(about = "Whisperwall anonymous feedback backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,
    /// Seed the database with a verified demo account and a few messages
    SeedData,
    /// Dump accounts and their message counts
    DumpData,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server().await,
        Commands::SeedData => seed_data().await,
        Commands::DumpData => dump_data().await,
    }
}

async fn run_server() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!("starting Whisperwall backend");

    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let state = AppState::new(services.db_pool.clone(), services.authenticator.clone());
    let app = build_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(whisperwall_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    info!("backend shut down");
    Ok(())
}

async fn seed_data() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    let config = load_config().context("failed to load configuration")?;
    let services = BackendServices::initialise(&config).await?;

    let registered = services
        .authenticator
        .register("demo", "demo@example.com", "demo-password")
        .await
        .context("failed to register demo account")?;
    services
        .authenticator
        .verify_account("demo", &registered.verify_code)
        .await
        .context("failed to verify demo account")?;

    let messages = MessageRepository::new(services.db_pool.clone());
    for content in [
        "loved your last post",
        "have you considered writing a book?",
        "your profile picture is great",
    ] {
        messages.append(registered.id, &Message::new(content)).await?;
    }

    info!(
        username = "demo",
        password = "demo-password",
        "seeded demo account with 3 messages"
    );
    Ok(())
}

async fn dump_data() -> anyhow::Result<()> {
    use sqlx::Row;

    let config = load_config().context("failed to load configuration")?;
    let services = BackendServices::initialise(&config).await?;

    let rows = sqlx::query(
        "SELECT username, email, is_verified, is_accepting_messages, json_array_length(messages) AS message_count FROM accounts ORDER BY id",
    )
    .fetch_all(&services.db_pool)
    .await?;

    println!("accounts: {}", rows.len());
    for row in rows {
        let username: String = row.get("username");
        let email: String = row.get("email");
        let is_verified: bool = row.get("is_verified");
        let is_accepting: bool = row.get("is_accepting_messages");
        let message_count: i64 = row.get("message_count");
        println!(
            "  {username} <{email}> verified={is_verified} accepting={is_accepting} messages={message_count}"
        );
    }

    Ok(())
}
