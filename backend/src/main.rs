use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use leave_desk::api::router;
use leave_desk::config::Config;
use leave_desk::identity::{DisconnectedIdentity, FirebaseIdentity, IdentityProvider};
use leave_desk::services::{LeaveDesk, SessionBootstrap};
use leave_desk::state::AppState;
use leave_desk::store::{CollectionPath, DisconnectedStore, DocumentStore, FirestoreStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "leave_desk=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let configured = config.firebase.is_configured();

    let identity: Arc<dyn IdentityProvider> = match FirebaseIdentity::new(&config.firebase) {
        Ok(identity) => Arc::new(identity),
        Err(e) => {
            warn!("Identity provider disabled: {}", e);
            Arc::new(DisconnectedIdentity)
        }
    };
    let session = Arc::new(SessionBootstrap::new(identity));

    let store: Arc<dyn DocumentStore> = match FirestoreStore::new(
        &config.firebase,
        session.subscribe(),
        config.sync_interval,
    ) {
        Ok(store) if configured => Arc::new(store),
        Ok(_) => Arc::new(DisconnectedStore),
        Err(e) => {
            warn!("Document store disabled: {}", e);
            Arc::new(DisconnectedStore)
        }
    };

    let desk = Arc::new(LeaveDesk::new(
        store,
        CollectionPath::leave_requests(config.app_id.clone()),
        session.subscribe(),
        config.notification_ttl,
    ));
    desk.start();

    let bootstrap = session.clone();
    let token = config.initial_auth_token.clone();
    tokio::spawn(async move {
        bootstrap.start(configured, token.as_deref()).await;
    });

    let app = router(AppState::new(desk.clone()));

    let addr: SocketAddr = config.server_addr.parse()?;
    info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    desk.shutdown();
    session.end();
    Ok(())
}
