//! Tennis Shop CLI - database migrations, demo data and user management.
//!
//! # Usage
//!
//! ```bash
//! # Apply storefront migrations
//! tennis-cli migrate
//!
//! # Insert demo brands, categories, products, blog posts and a promo code
//! tennis-cli seed
//!
//! # Give an existing account the Admin role
//! tennis-cli user promote --email admin@example.com
//! ```
//!
//! All commands read `STOREFRONT_DATABASE_URL`, falling back to `DATABASE_URL`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "tennis-cli")]
#[command(author, version, about = "Tennis Shop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database with demo data (safe to run repeatedly)
    Seed,
    /// Manage storefront users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Grant the Admin role to an existing user
    Promote {
        /// Email address of the account
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tennis_cli=info,tennis_shop_cli=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let pool = commands::connect().await?;

    match cli.command {
        Commands::Migrate => commands::migrate::run(&pool).await?,
        Commands::Seed => {
            let report = commands::seed::run(&pool).await?;
            tracing::info!(
                brands = report.brands,
                categories = report.categories,
                products = report.products,
                variants = report.variants,
                posts = report.posts,
                promo_codes = report.promo_codes,
                "Seed complete"
            );
        }
        Commands::User { action } => match action {
            UserAction::Promote { email } => commands::user::promote(&pool, &email).await?,
        },
    }
    Ok(())
}
