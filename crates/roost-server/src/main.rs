use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use roost_api::{AppStateInner, auth, bookings, health, listings, messages, payments};
use roost_chapa::{ChapaClient, ChapaConfig, DEFAULT_BASE_URL};
use roost_notify::{LogMailer, Mailer, Notifier, SmtpMailer, run_worker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roost=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("ROOST_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("ROOST_DB_PATH").unwrap_or_else(|_| "roost.db".into());
    let host = std::env::var("ROOST_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("ROOST_PORT")
        .unwrap_or_else(|_| "8000".into())
        .parse()?;
    let public_url = std::env::var("ROOST_PUBLIC_URL")
        .unwrap_or_else(|_| format!("http://localhost:{port}"));

    // Payment gateway — credentials injected here, nowhere else
    let chapa = ChapaClient::new(ChapaConfig {
        secret_key: std::env::var("CHAPA_SECRET_KEY").unwrap_or_default(),
        base_url: std::env::var("CHAPA_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into()),
        timeout: Duration::from_secs(30),
    })?;

    // Init database
    let db = roost_db::Database::open(&PathBuf::from(&db_path))?;

    // Notification worker: fire-and-forget email delivery off the request path
    let mailer = build_mailer()?;
    let (notifier, jobs) = Notifier::new();
    tokio::spawn(run_worker(jobs, mailer));

    let state = Arc::new(AppStateInner {
        db,
        chapa,
        notifier,
        jwt_secret,
        public_url,
    });

    // Routes. Read-only listing endpoints and the provider webhook are open;
    // every other handler checks the bearer token itself.
    let app = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/users/me", get(auth::me))
        .route("/listings", get(listings::list_listings).post(listings::create_listing))
        .route("/listings/my_listings", get(listings::my_listings))
        .route(
            "/listings/{listing_id}",
            get(listings::get_listing)
                .put(listings::update_listing)
                .patch(listings::update_listing)
                .delete(listings::delete_listing),
        )
        .route(
            "/listings/{listing_id}/reviews",
            get(listings::list_reviews).post(listings::add_review),
        )
        .route("/listings/{listing_id}/bookings", get(listings::listing_bookings))
        .route("/bookings", get(bookings::list_bookings).post(bookings::create_booking))
        .route("/bookings/my_bookings", get(bookings::my_bookings))
        .route("/bookings/hosting_bookings", get(bookings::hosting_bookings))
        .route("/bookings/{booking_id}", get(bookings::get_booking))
        .route("/bookings/{booking_id}/confirm", post(bookings::confirm_booking))
        .route("/bookings/{booking_id}/cancel", post(bookings::cancel_booking))
        .route("/payments", get(payments::list_payments))
        .route("/payments/webhook", post(payments::webhook))
        .route("/payments/status/{tx_ref}", get(payments::payment_status))
        // Same parameter name in both dynamic routes: the router treats
        // differently-named parameters at one position as conflicting.
        .route("/payments/{id}/initiate", post(payments::initiate_payment))
        .route("/payments/{id}", get(payments::get_payment))
        .route("/messages", get(messages::list_messages).post(messages::send_message))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Roost server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// SMTP when configured, otherwise log-only delivery for development.
fn build_mailer() -> anyhow::Result<Arc<dyn Mailer>> {
    match std::env::var("ROOST_SMTP_HOST") {
        Ok(smtp_host) => {
            let smtp_port: u16 = std::env::var("ROOST_SMTP_PORT")
                .unwrap_or_else(|_| "587".into())
                .parse()?;
            let username = std::env::var("ROOST_SMTP_USERNAME").unwrap_or_default();
            let password = std::env::var("ROOST_SMTP_PASSWORD").unwrap_or_default();
            let from_email = std::env::var("ROOST_SMTP_FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@roost.example".into());
            let from_name =
                std::env::var("ROOST_SMTP_FROM_NAME").unwrap_or_else(|_| "Roost".into());

            info!("SMTP delivery via {}:{}", smtp_host, smtp_port);
            Ok(Arc::new(SmtpMailer::new(
                &smtp_host, smtp_port, username, password, &from_email, &from_name,
            )?))
        }
        Err(_) => {
            info!("ROOST_SMTP_HOST not set, outbound email will be logged only");
            Ok(Arc::new(LogMailer))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
