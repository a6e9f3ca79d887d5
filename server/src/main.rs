mod config;
mod http;
mod rate_limit;
mod tenant;

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use migration::{Migrator, MigratorTrait};
use optitalent_api::{AppSchema, build_schema, seed::seed_demo};
use platform_db::{DbPool, connect};
use platform_genai::build_client;
use platform_obs::{ObsConfig, init_tracing, shutdown_tracing};
use tracing::{info, warn};

use crate::{config::AppConfig, http::AppState, rate_limit::RateLimiter};

#[derive(Parser, Debug)]
#[command(name = "optitalent", version, about = "OptiTalent HR server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending migrations, then serve HTTP + GraphQL.
    Serve {
        /// Overrides `BIND`.
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Run database migrations.
    Migrate {
        #[arg(long, value_enum, default_value_t = MigrateAction::Up)]
        action: MigrateAction,
    },
    /// Fill the default tenant with demo data.
    Seed {
        /// Password shared by every seeded account.
        #[arg(long, env = "SEED_PASSWORD", default_value = "optitalent-demo")]
        password: String,
    },
    /// Print the GraphQL SDL.
    PrintSchema,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum MigrateAction {
    Up,
    Down,
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(ObsConfig::from_env())?;
    let cli = Cli::parse();
    let config = AppConfig::load()?;

    let result = match cli.command {
        Command::Serve { bind } => run_server(config, bind).await,
        Command::Migrate { action } => migrate(&config, action).await,
        Command::Seed { password } => seed(&config, &password).await,
        Command::PrintSchema => print_schema(&config),
    };
    shutdown_tracing();
    result
}

async fn setup_pool(config: &AppConfig) -> Result<DbPool> {
    connect(&config.database)
        .await
        .context("failed to connect to the database")
}

fn schema(config: &AppConfig, db: Arc<DbPool>) -> Result<AppSchema> {
    if config.genai.api_key.is_none() {
        warn!("GENAI_API_KEY not set; AI features will report service errors");
    }
    let genai = build_client(&config.genai).context("failed to build the model client")?;
    Ok(build_schema(db, Arc::new(config.auth.clone()), genai))
}

async fn run_server(config: AppConfig, bind: Option<SocketAddr>) -> Result<()> {
    let pool = setup_pool(&config).await?;
    Migrator::up(&pool, None).await?;
    platform_db::ensure_tenant(
        &pool,
        &config.auth.default_tenant_slug,
        &config.default_tenant_name,
    )
    .await?;
    if config.dev_mode {
        warn!("APP_ENV=dev: session cookies are not marked Secure");
    }
    let db = Arc::new(pool);
    let AppSchema(schema) = schema(&config, db.clone())?;
    let state = AppState {
        db,
        schema,
        auth: Arc::new(config.auth.clone()),
        limiter: Arc::new(RateLimiter::new(config.rate_limit)),
        base_domain: Arc::from(config.base_domain.as_str()),
        cors_allowed_origins: config.cors_allowed_origins.clone(),
    };
    http::serve(bind.unwrap_or(config.bind), state).await
}

async fn migrate(config: &AppConfig, action: MigrateAction) -> Result<()> {
    let pool = setup_pool(config).await?;
    match action {
        MigrateAction::Up => Migrator::up(&pool, None).await?,
        MigrateAction::Down => Migrator::down(&pool, Some(1)).await?,
        MigrateAction::Reset => Migrator::reset(&pool).await?,
    }
    info!(?action, "migrations finished");
    Ok(())
}

async fn seed(config: &AppConfig, password: &str) -> Result<()> {
    let pool = setup_pool(config).await?;
    Migrator::up(&pool, None).await?;
    let seeded = seed_demo(
        &pool,
        &config.auth.default_tenant_slug,
        &config.default_tenant_name,
        password,
    )
    .await
    .context("seeding demo data failed")?;
    info!(
        tenant = %seeded.tenant.slug,
        users = seeded.users.len(),
        "demo data ready"
    );
    Ok(())
}

fn print_schema(config: &AppConfig) -> Result<()> {
    // SDL generation never touches the connection
    let db = Arc::new(DbPool::Disconnected);
    let AppSchema(schema) = schema(config, db)?;
    println!("{}", schema.sdl());
    Ok(())
}
