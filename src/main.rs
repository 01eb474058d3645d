use anyhow::Result;
use std::sync::Arc;

use listings_client::api::{Operation, PropertiesApi, PropertyQuery};
use listings_client::auth::{token_prefix, SessionManager, SqliteCookieJar};
use listings_client::config::{Command, Config};
use listings_client::http_client::ApiHttpClient;
use listings_client::mercadolibre;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let (config, command) = Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::debug!("API base URL: {}", config.api_base_url);

    match command {
        Command::Relay => run_relay(&config).await,

        Command::Login { email, password } => {
            let client = build_client(&config)?;
            let pair = client.session().login(&email, &password).await?;
            tracing::info!("✅ Logged in (token: {}...)", token_prefix(&pair.access_token));
            Ok(())
        }

        Command::Logout => {
            let client = build_client(&config)?;
            client.session().logout()?;
            println!("Logged out");
            Ok(())
        }

        Command::Get { path } => {
            let client = build_client(&config)?;
            let body: serde_json::Value = client.get_json(&path).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(())
        }

        Command::Properties {
            operation,
            property_type,
            city,
            min_price,
            max_price,
            bedrooms,
            page,
        } => {
            let query = PropertyQuery {
                operation: operation.as_deref().map(parse_operation).transpose()?,
                property_type,
                city,
                min_price,
                max_price,
                bedrooms,
                page: Some(page),
                limit: None,
            };

            let client = build_client(&config)?;
            let results = PropertiesApi::new(&client).list(&query).await?;

            println!(
                "Page {}/{} ({} listings)",
                results.page, results.total_pages, results.total
            );
            for property in results.items {
                println!(
                    "  #{:<6} {:<8} {:>12.0} {}  {}  {}",
                    property.id,
                    format!("{:?}", property.operation).to_lowercase(),
                    property.price,
                    property.currency,
                    property.city.as_deref().unwrap_or("-"),
                    property.title
                );
            }
            Ok(())
        }
    }
}

/// Client over the persistent cookie jar
fn build_client(config: &Config) -> Result<ApiHttpClient> {
    let store = Arc::new(SqliteCookieJar::open(&config.cookie_store_file)?);
    let session = SessionManager::new(config.api_base_url.clone(), store)?
        .with_login_url(config.login_url.clone());

    ApiHttpClient::new(
        Arc::new(session),
        config.http_connect_timeout,
        config.http_request_timeout,
    )
}

fn parse_operation(s: &str) -> Result<Operation> {
    match s.to_lowercase().as_str() {
        "sale" | "venta" => Ok(Operation::Sale),
        "rent" | "alquiler" => Ok(Operation::Rent),
        other => anyhow::bail!("Unknown operation '{}' (expected sale or rent)", other),
    }
}

/// Serve the MercadoLibre relay until a shutdown signal arrives
async fn run_relay(config: &Config) -> Result<()> {
    config.mercadolibre.validate()?;

    let state =
        mercadolibre::RelayState::new(config.mercadolibre.clone(), config.http_request_timeout)?;
    let app = mercadolibre::build_app(state);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    print_startup_banner(config);
    tracing::info!("🚀 Relay listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("👋 Relay shutdown complete");
    Ok(())
}

fn print_startup_banner(config: &Config) {
    println!();
    println!("  MercadoLibre relay {}", env!("CARGO_PKG_VERSION"));
    println!(
        "  Server:      http://{}:{}",
        config.server_host, config.server_port
    );
    println!("  Callback:    {}", config.mercadolibre.redirect_uri);
    println!("  Frontend:    {}", config.mercadolibre.frontend_callback_url);
    println!("  Log Level:   {}", config.log_level);
    println!();
}

/// Handle graceful shutdown signal
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown...");
        },
    }
}
