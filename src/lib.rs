use std::net::SocketAddr;
use std::sync::Arc;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

pub mod api;
pub mod auth;
pub mod config;
pub mod fhir;
pub mod health;
pub mod patients;
pub mod terminology;
pub mod validation;

#[derive(Parser)]
#[command(name = "caresync")]
#[command(about = "CareSync - NAMASTE to ICD-11 terminology bridge with FHIR export", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server (default)
    Start {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Path to a TOML or JSON config file
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Initialize a new configuration file
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = "caresync.toml")]
        output: String,
    },
    /// Generate a JWT token for API authentication
    Token {
        /// Username/subject for the token
        #[arg(short, long, default_value = "admin")]
        user: String,
        /// Comma-separated roles (e.g., "admin,staff")
        #[arg(short, long, default_value = "staff")]
        roles: String,
        /// Token expiry in days
        #[arg(short, long, default_value = "365")]
        expiry_days: u64,
    },
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Start { port, config }) => {
            start_server(port, config).await?;
        }
        Some(Commands::Init { output }) => {
            run_init(&output).await?;
        }
        Some(Commands::Token { user, roles, expiry_days }) => {
            generate_token(&user, &roles, expiry_days)?;
        }
        None => {
            start_server(8080, None).await?;
        }
    }

    Ok(())
}

/// Write a default config file.
async fn run_init(output: &str) -> Result<(), Box<dyn std::error::Error>> {
    let manager = config::ConfigManager::new();
    let toml_str = manager.export_toml().await?;
    tokio::fs::write(output, toml_str).await?;
    println!("Wrote default configuration to {}", output);
    Ok(())
}

/// Mint a JWT and print it for use with the API.
fn generate_token(user: &str, roles_str: &str, expiry_days: u64) -> Result<(), Box<dyn std::error::Error>> {
    let roles: Vec<String> = roles_str
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let token = auth::issue_token(user, roles, expiry_days)?;

    println!("Generated JWT Token:");
    println!("Bearer {}", token);
    println!();
    println!("Use it as: Authorization: Bearer <token>");
    Ok(())
}

async fn start_server(port: u16, config_path: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    // 1. Configuration (loaded before tracing so logging.level applies)
    let mut config_manager = config::ConfigManager::new();
    if let Some(path) = &config_path {
        config_manager.load(path).await?;
    }
    if let Err(errors) = config_manager.validate().await {
        return Err(format!("Invalid configuration: {}", errors.join("; ")).into());
    }
    let cfg = config_manager.get().await;

    // 2. Logging/Tracing at the configured level
    let level: Level = cfg.logging.level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    info!("Starting CareSync terminology bridge...");
    if let Some(path) = &config_path {
        info!("Loaded configuration from {}", path);
    }

    // 3. Code registry with the curated seed mappings
    let registry = Arc::new(terminology::CodeRegistry::with_seed_data());
    info!("Code registry initialized with {} NAMASTE mappings.", registry.count().await);

    // 4. Patient store with the demo record
    let patient_store = Arc::new(patients::PatientStore::with_seed_data().await);
    info!("Patient store initialized ({} records).", patient_store.count().await);

    // 5. Auth state
    let mailer: Arc<dyn auth::Mailer> = Arc::new(auth::LogMailer);
    let auth_state = api::auth::AuthState::new(mailer, cfg.auth.token_expiry_days)
        .with_otp_ttl(cfg.auth.otp_ttl_seconds as i64);
    info!("Auth state initialized.");

    // 6. Health monitor
    let health_monitor = Arc::new(health::HealthMonitor::new());
    health_monitor
        .register_check("code_registry", || health::ComponentHealth::healthy("code_registry"))
        .await;
    health_monitor
        .register_check("patient_store", || health::ComponentHealth::healthy("patient_store"))
        .await;

    // 7. API Server
    let app = api::router(
        registry,
        patient_store,
        auth_state,
        health_monitor,
        api::ApiOptions {
            rate_limit_per_minute: cfg.server.rate_limit_per_minute,
            request_timeout_ms: cfg.server.request_timeout_ms,
            auth_required: cfg.auth.auth_required,
        },
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("CareSync listening on {}", addr);
    info!("API Endpoints:");
    info!("  - Codes: http://{}/api/codes/search", addr);
    info!("  - Patients: http://{}/api/patients", addr);
    info!("  - Auth: http://{}/api/auth/login", addr);
    info!("  - Health: http://{}/health", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
