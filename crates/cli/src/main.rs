//! SignCraft CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! sc-cli migrate
//!
//! # Create an admin user
//! sc-cli user create -e admin@example.com -p 'long-password' --user-type admin
//!
//! # Promote an existing user to admin
//! sc-cli user promote -e someone@example.com
//!
//! # Store the default pricing table
//! sc-cli seed pricing --home-country UA
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user` - Create and promote users
//! - `seed` - Seed default settings

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "sc-cli")]
#[command(author, version, about = "SignCraft CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Seed default data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Initial password
        #[arg(short, long)]
        password: String,

        /// Account kind (`consumer`, `business`, `admin`)
        #[arg(long, default_value = "admin")]
        user_type: String,
    },
    /// Make an existing user an admin
    Promote {
        /// Email address of the user
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Store the default pricing table
    Pricing {
        /// Seller country (ISO 3166-1 alpha-2)
        #[arg(long, env = "SIGNCRAFT_HOME_COUNTRY", default_value = "UA")]
        home_country: String,

        /// Replace an existing table
        #[arg(long)]
        overwrite: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                password,
                user_type,
            } => {
                commands::user::create(&email, &password, &user_type).await?;
            }
            UserAction::Promote { email } => commands::user::promote(&email).await?,
        },
        Commands::Seed { target } => match target {
            SeedTarget::Pricing {
                home_country,
                overwrite,
            } => commands::seed::pricing(&home_country, overwrite).await?,
        },
    }
    Ok(())
}
