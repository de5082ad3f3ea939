use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tuma_api::{app, state::{AppState, AuthConfig}};
use tuma_core::geo::{StaticDistanceMatrix, StaticGeocoder};
use tuma_core::mail::{NoopImageStore, NoopMailer};
use tuma_core::payment::MockPushPaymentGateway;
use tuma_order::lifecycle::OrderLifecycle;
use tuma_payments::engine::PaymentEngine;
use tuma_store::{
    DbClient, PgNotificationRepository, PgOrderRepository, PgPaymentRepository, PgUserRepository,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tuma_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = tuma_store::Config::load().expect("Failed to load config");
    tracing::info!("Starting Tuma API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url).await.expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let users = Arc::new(PgUserRepository::new(db.pool.clone()));
    let orders = Arc::new(PgOrderRepository::new(db.pool.clone()));
    let payment_repo = Arc::new(PgPaymentRepository::new(db.pool.clone()));
    let notifications = Arc::new(PgNotificationRepository::new(db.pool.clone()));

    // External collaborators ship as null adapters; real providers slot
    // in behind the same traits.
    let geocoder = Arc::new(StaticGeocoder::new());
    let routes = Arc::new(StaticDistanceMatrix::unavailable());
    let mailer = Arc::new(NoopMailer);
    let images = Arc::new(NoopImageStore);
    let gateway = Arc::new(MockPushPaymentGateway::new());

    let lifecycle = Arc::new(OrderLifecycle::new(
        orders.clone(),
        users.clone(),
        notifications.clone(),
        geocoder,
        routes,
        mailer.clone(),
        images,
    ));
    let payments = Arc::new(PaymentEngine::new(
        payment_repo,
        orders,
        users.clone(),
        notifications.clone(),
        gateway,
        mailer,
    ));

    let app_state = AppState {
        lifecycle,
        payments,
        users,
        notifications,
        auth: AuthConfig { secret: config.auth.jwt_secret.clone() },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
