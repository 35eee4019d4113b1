//! CLI argument parsing, validation, and startup helpers.

use crate::db::{Database, UserRole};
use crate::password;
use clap::Parser;
use tracing::{error, info};

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Shelfgate",
    about = "Library management backend with JWT authentication"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "shelfgate.db")]
    pub database: String,

    /// Path to file containing the JWT signing secret. Prefer using the
    /// JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Create demo accounts (user@test.com, admin@test.com) on startup
    #[arg(long)]
    pub seed_demo_users: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load the JWT secret from the environment variable or a file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking.
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

/// Handle the --seed-demo-users flag: create the demo accounts if absent.
pub async fn handle_seed_demo_users(db: &Database) {
    seed_user(db, "user@test.com", "password123", UserRole::User).await;
    seed_user(db, "admin@test.com", "admin123", UserRole::Admin).await;

    println!();
    println!("Demo accounts:");
    println!("  user@test.com / password123 (user)");
    println!("  admin@test.com / admin123 (admin)");
    println!();
}

async fn seed_user(db: &Database, email: &str, password: &str, role: UserRole) {
    match db.users().get_by_email(email).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            let hash = match password::hash_password(password) {
                Ok(hash) => hash,
                Err(e) => {
                    error!(error = %e, "Failed to hash demo password");
                    std::process::exit(1);
                }
            };
            if let Err(e) = db.users().create(email, &hash, None, None, role).await {
                error!(email = %email, error = %e, "Failed to seed demo user");
                std::process::exit(1);
            }
            info!(email = %email, role = %role.as_str(), "Seeded demo user");
        }
        Err(e) => {
            error!(error = %e, "Failed to check for existing demo user");
            std::process::exit(1);
        }
    }
}
