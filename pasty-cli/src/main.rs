use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pasty_client::{Credentials, PastyClient};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

#[derive(Parser)]
#[command(name = "pasty-cli")]
#[command(about = "Command-line interface for Pasty", long_about = None)]
struct Cli {
    /// Path to config file (JSON)
    #[arg(short, long, env = "PASTY_CONFIG")]
    config: Option<PathBuf>,

    /// Server host (defaults to config file, otherwise localhost)
    #[arg(long, env = "PASTY_HOST")]
    host: Option<String>,

    /// Server port (defaults to config file, otherwise 4444)
    #[arg(long, env = "PASTY_PORT")]
    port: Option<u16>,

    /// Use HTTPS (true/false; overrides the config file either way)
    #[arg(long, env = "PASTY_SECURE", num_args = 0..=1, default_missing_value = "true")]
    secure: Option<bool>,

    /// API key, needed to create users
    #[arg(long, env = "PASTY_API_KEY")]
    api_key: Option<String>,

    /// Value sent in the Accept-Version header
    #[arg(long, env = "PASTY_API_VERSION")]
    api_version: Option<String>,

    /// Request timeout in seconds, fractions allowed
    #[arg(long, env = "PASTY_TIMEOUT")]
    timeout: Option<f64>,

    /// Token for authentication (takes precedence over user/password)
    #[arg(short, long, env = "PASTY_TOKEN")]
    token: Option<String>,

    /// Username for authentication
    #[arg(short, long, env = "PASTY_USER")]
    user: Option<String>,

    /// Password for authentication
    #[arg(short, long, env = "PASTY_PASSWORD")]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the server version
    Version,

    /// Check whether a username is still available
    Available {
        /// Username to check
        username: String,
    },

    /// List clipboard items
    #[clap(alias = "ls")]
    List,

    /// Get a clipboard item by ID
    #[clap(alias = "g")]
    Get {
        /// Item ID
        id: String,

        /// Output format: json or text (item content only)
        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// Add a clipboard item
    #[clap(alias = "a")]
    Add {
        /// Item content
        item: String,
    },

    /// Delete a clipboard item by ID
    #[clap(alias = "d")]
    Delete {
        /// Item ID
        id: String,
    },

    /// Request a token with user/password
    Token,

    /// Check a token and show its expiry
    CheckToken,

    /// Create a user (requires an API key)
    CreateUser {
        /// Username
        user: String,

        /// Password
        password: String,
    },

    /// Show information about the authenticated user
    Whoami,

    /// Change a user's password (authenticates with user/password)
    Passwd {
        /// User ID
        uid: String,

        /// New password
        new_password: String,
    },

    /// Delete a user (authenticates with user/password)
    DeleteUser {
        /// User ID
        uid: String,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Username and password, required by the endpoints that do not accept a token
fn user_password(user: Option<String>, password: Option<String>) -> Result<(String, String)> {
    match (user, password) {
        (Some(user), Some(password)) => Ok((user, password)),
        _ => anyhow::bail!("This command needs --user and --password"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pasty_cli=info,pasty_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Priority: CLI arg --config > PASTY_CONFIG env > default config location
    let file_config = if let Some(config_path) = &cli.config {
        config::load_config_from_path(config_path)
    } else {
        config::load_default_config()
    };

    let overrides = config::Overrides {
        host: cli.host,
        port: cli.port,
        secure: cli.secure,
        api_key: cli.api_key,
        api_version: cli.api_version,
        timeout: cli.timeout,
        token: cli.token,
        user: cli.user,
        password: cli.password,
    };
    let resolved = config::resolve(overrides, file_config)?;
    let credentials = resolved.credentials;
    let (user, password) = (resolved.user, resolved.password);

    tracing::debug!(
        server = %resolved.client.base_url(),
        auth = credentials.kind(),
        "Using server"
    );

    let client = PastyClient::new(resolved.client).context("Invalid client configuration")?;

    match cli.command {
        Commands::Version => {
            let version = client
                .server_version()
                .await
                .context("Failed to get server version")?;
            print_json(&version)?;
        }

        Commands::Available { username } => {
            let available = client
                .username_available(&username)
                .await
                .context("Failed to check username")?;
            print_json(&available)?;
        }

        Commands::List => {
            let items = client
                .list_items(&credentials)
                .await
                .context("Failed to list items")?;
            print_json(&items)?;
        }

        Commands::Get { id, format } => {
            let item = client
                .get_item(&id, &credentials)
                .await
                .context("Failed to get item")?;

            match format.as_str() {
                "text" => match &item.item {
                    serde_json::Value::String(text) => println!("{}", text),
                    other => println!("{}", other),
                },
                "json" => {
                    print_json(&item)?;
                }
                _ => {
                    anyhow::bail!("Invalid format. Use 'json' or 'text'");
                }
            }
        }

        Commands::Add { item } => {
            let id = client
                .add_item(&item, &credentials)
                .await
                .context("Failed to add item")?;
            println!("{}", id);
        }

        Commands::Delete { id } => {
            client
                .delete_item(&id, &credentials)
                .await
                .context("Failed to delete item")?;
            println!("Item {} deleted successfully", id);
        }

        Commands::Token => {
            let (user, password) = user_password(user, password)?;
            let token = client
                .request_token(&user, &password)
                .await
                .context("Failed to request token")?;
            print_json(&token)?;
        }

        Commands::CheckToken => {
            let Credentials::Token(token) = &credentials else {
                anyhow::bail!("This command needs --token");
            };
            let expires = client
                .check_token(token)
                .await
                .context("Failed to check token")?;
            print_json(&expires)?;
        }

        Commands::CreateUser { user, password } => {
            client
                .create_user(&user, &password)
                .await
                .context("Failed to create user")?;
            println!("User {} created successfully", user);
        }

        Commands::Whoami => {
            let info = client
                .user_info(&credentials)
                .await
                .context("Failed to get user info")?;
            print_json(&info)?;
        }

        Commands::Passwd { uid, new_password } => {
            let (user, password) = user_password(user, password)?;
            client
                .update_password(&user, &password, &uid, &new_password)
                .await
                .context("Failed to update password")?;
            println!("Password for {} updated successfully", uid);
        }

        Commands::DeleteUser { uid } => {
            let (user, password) = user_password(user, password)?;
            client
                .delete_user(&user, &password, &uid)
                .await
                .context("Failed to delete user")?;
            println!("User {} deleted successfully", uid);
        }
    }

    Ok(())
}
