pub mod auth;
pub mod bookings;
pub mod error;
pub mod listings;
pub mod messages;
pub mod payments;

use std::sync::Arc;

use roost_chapa::ChapaClient;
use roost_db::Database;
use roost_notify::Notifier;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub chapa: ChapaClient,
    pub notifier: Notifier,
    pub jwt_secret: String,
    /// Externally reachable base URL, used to build the gateway's
    /// callback and return URLs.
    pub public_url: String,
}

/// GET /health — liveness check (no auth).
pub async fn health() -> &'static str {
    "ok"
}
