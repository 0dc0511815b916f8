use std::{io, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use userhub::{
    app,
    auth::TokenService,
    config::{AppConfig, DbConfig},
    db,
    error::AppError,
    logs,
    state::AppState,
    users::{dto::UserRequest, pagination::DEFAULT_MAX_LIMIT, PgUserRepository, UserService},
};

#[derive(Parser)]
#[command(name = "userhub", version, about = "User accounts REST API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create an account directly in the database
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "USERHUB_REGISTER_PASSWORD")]
        password: String,
        #[arg(long)]
        firstname: String,
        #[arg(long)]
        lastname: String,
    },
    /// Pretty-print JSON logs read from stdin
    Logs {
        /// Also print fields outside the request summary
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Register {
            email,
            password,
            firstname,
            lastname,
        } => {
            register(UserRequest {
                email,
                password,
                lastname,
                firstname,
            })
            .await
        }
        Command::Logs { verbose } => {
            match logs::read_logs(io::stdin().lock(), io::stdout().lock(), verbose) {
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                other => other.context("format logs"),
            }
        }
    }
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "userhub=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = Arc::new(AppConfig::from_env().context("load configuration")?);
    let tokens = Arc::new(TokenService::from_config(&config.jwt).context("load signing keys")?);

    let pool = db::connect(&DbConfig::from_env()?).await?;
    db::migrate(&pool).await;

    let repo = Arc::new(PgUserRepository::new(pool));
    let state = AppState::new(config.clone(), tokens, repo);
    let router = app::build_app(state).context("build router")?;

    app::serve(router, &config.host, config.port).await
}

async fn register(req: UserRequest) -> anyhow::Result<()> {
    let pool = db::connect(&DbConfig::from_env()?).await?;
    db::migrate(&pool).await;
    let users = UserService::new(Arc::new(PgUserRepository::new(pool)), DEFAULT_MAX_LIMIT);

    match users.register(req).await {
        Ok(user) => {
            info!(user_id = %user.id, "account created");
            println!("{}", serde_json::to_string_pretty(&user)?);
            Ok(())
        }
        Err(AppError::Validation(details)) => {
            eprintln!("{}", serde_json::to_string_pretty(&details)?);
            anyhow::bail!("invalid account data")
        }
        Err(e) => Err(anyhow::Error::new(e).context("register account")),
    }
}
