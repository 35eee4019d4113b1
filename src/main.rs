use clap::Parser;
use shelfgate::ServerConfig;
use shelfgate::cli::{Args, handle_seed_demo_users, init_logging, load_jwt_secret, open_database};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if args.seed_demo_users {
        handle_seed_demo_users(&db).await;
    }

    shelfgate::init_cleanup(&db).await;

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap_or_else(|e| {
        error!(error = %e, "Failed to get local address");
        std::process::exit(1);
    });

    let config = ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
    };

    info!(address = %local_addr, "Listening");

    if let Err(e) = shelfgate::run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
