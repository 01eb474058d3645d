use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Listings API client and MercadoLibre relay
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub args: CliArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Log in and store the credential cookies
    Login {
        #[arg(short, long, env = "LISTINGS_EMAIL")]
        email: String,

        #[arg(long, env = "LISTINGS_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Delete the stored credential cookies
    Logout,

    /// GET an API path and print the JSON body
    Get {
        /// Path under the API base URL, e.g. /properties/7
        path: String,
    },

    /// Search property listings
    Properties {
        /// sale or rent
        #[arg(long)]
        operation: Option<String>,

        #[arg(long = "type")]
        property_type: Option<String>,

        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        min_price: Option<f64>,

        #[arg(long)]
        max_price: Option<f64>,

        #[arg(long)]
        bedrooms: Option<u32>,

        #[arg(long, default_value = "1")]
        page: u32,
    },

    /// Serve the MercadoLibre OAuth relay
    Relay,
}

#[derive(Args, Debug, Clone)]
pub struct CliArgs {
    /// Listings API base URL
    #[arg(long, env = "LISTINGS_API_URL", default_value = "http://localhost:3000/api")]
    pub api_url: String,

    /// Login page shown when the session expires
    #[arg(long, env = "LOGIN_URL", default_value = "http://localhost:5173/login")]
    pub login_url: String,

    /// Path to the SQLite cookie store
    #[arg(short = 's', long, env = "COOKIE_STORE_FILE")]
    pub store: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "60")]
    pub http_timeout: u64,

    /// Relay host address
    #[arg(short = 'H', long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Relay port
    #[arg(short, long, env = "SERVER_PORT", default_value = "8000")]
    pub port: u16,

    /// MercadoLibre application id
    #[arg(long, env = "MELI_CLIENT_ID")]
    pub meli_client_id: Option<String>,

    /// MercadoLibre application secret
    #[arg(long, env = "MELI_CLIENT_SECRET", hide_env_values = true)]
    pub meli_client_secret: Option<String>,

    /// Redirect URI registered with MercadoLibre
    #[arg(long, env = "MELI_REDIRECT_URI")]
    pub meli_redirect_uri: Option<String>,

    /// Frontend page that receives the MercadoLibre token
    #[arg(
        long,
        env = "FRONTEND_CALLBACK_URL",
        default_value = "http://localhost:5173/admin/mercadolibre"
    )]
    pub frontend_callback_url: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    // Listings API
    pub api_base_url: String,
    pub login_url: String,
    pub cookie_store_file: PathBuf,

    // HTTP client
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    // Relay server
    pub server_host: String,
    pub server_port: u16,
    pub mercadolibre: MercadoLibreConfig,

    // Logging
    pub log_level: String,
}

#[derive(Clone, Debug, Default)]
pub struct MercadoLibreConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub frontend_callback_url: String,
    /// Authorization host (site specific, e.g. auth.mercadolibre.com.ar)
    pub auth_url: String,
    /// REST API host
    pub api_url: String,
}

impl MercadoLibreConfig {
    /// Relay requires the application credentials
    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            anyhow::bail!("MELI_CLIENT_ID is required to run the relay");
        }
        if self.client_secret.is_empty() {
            anyhow::bail!("MELI_CLIENT_SECRET is required to run the relay");
        }
        if self.redirect_uri.is_empty() {
            anyhow::bail!("MELI_REDIRECT_URI is required to run the relay");
        }
        check_http_url("FRONTEND_CALLBACK_URL", &self.frontend_callback_url)
    }
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<(Self, Command)> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let cli = Cli::parse();
        let config = Self::from_args(&cli.args)?;
        Ok((config, cli.command))
    }

    /// Build configuration from parsed arguments, reading env-only settings
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let cookie_store_file = match args.store {
            Some(ref path) => expand_tilde(path),
            None => default_store_path().context(
                "No data directory found; set COOKIE_STORE_FILE or pass --store",
            )?,
        };

        Ok(Config {
            api_base_url: args.api_url.trim_end_matches('/').to_string(),
            login_url: args.login_url.clone(),
            cookie_store_file,

            http_connect_timeout: std::env::var("HTTP_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            http_request_timeout: args.http_timeout,

            server_host: args.host.clone(),
            server_port: args.port,
            mercadolibre: MercadoLibreConfig {
                client_id: args.meli_client_id.clone().unwrap_or_default(),
                client_secret: args.meli_client_secret.clone().unwrap_or_default(),
                redirect_uri: args.meli_redirect_uri.clone().unwrap_or_default(),
                frontend_callback_url: args.frontend_callback_url.clone(),
                auth_url: std::env::var("MELI_AUTH_URL")
                    .unwrap_or_else(|_| "https://auth.mercadolibre.com.ar".to_string()),
                api_url: std::env::var("MELI_API_URL")
                    .unwrap_or_else(|_| "https://api.mercadolibre.com".to_string()),
            },

            log_level: args.log_level.clone(),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        check_http_url("LISTINGS_API_URL", &self.api_base_url)?;
        check_http_url("LOGIN_URL", &self.login_url)
    }
}

fn check_http_url(name: &str, value: &str) -> Result<()> {
    let url = reqwest::Url::parse(value)
        .with_context(|| format!("{} is not a valid URL: {}", name, value))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!("{} must be an http(s) URL: {}", name, value);
    }
    Ok(())
}

fn default_store_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("listings-client").join("cookies.sqlite3"))
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
