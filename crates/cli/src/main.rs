//! Carlot CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! carlot-cli migrate
//!
//! # Create the admin account
//! carlot-cli admin create -e admin@example.com -n "Admin Name"
//!
//! # Issue a bearer token for an existing user id
//! carlot-cli token issue --subject <user-id> --ttl-secs 600
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin create` - Create the admin account
//! - `token issue` - Sign a bearer token with the server's secret

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "carlot-cli")]
#[command(author, version, about = "Carlot CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Manage the admin account
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Issue bearer tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create the admin account (password from `CARLOT_ADMIN_PASSWORD`)
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Sign a token for a user id
    Issue {
        /// User id to place in the token
        #[arg(short, long)]
        subject: String,

        /// Lifetime in seconds (defaults to one hour)
        #[arg(long, conflicts_with = "no_expiry")]
        ttl_secs: Option<u64>,

        /// Omit the expiry claim entirely
        #[arg(long)]
        no_expiry: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create { email, name } => {
                let id = commands::admin::create_user(&email, &name).await?;
                tracing::info!("Admin account id: {id}");
            }
        },
        Commands::Token { action } => match action {
            TokenAction::Issue {
                subject,
                ttl_secs,
                no_expiry,
            } => {
                let lifetime = commands::token::Lifetime::from_args(ttl_secs, no_expiry);
                let token = commands::token::issue(&subject, lifetime)?;
                #[allow(clippy::print_stdout)]
                {
                    println!("{token}");
                }
            }
        },
    }
    Ok(())
}
