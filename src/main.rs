use std::sync::Arc;

use boardsync::db;
use boardsync::routes;
use boardsync::services::store::PgBoardStore;
use boardsync::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .expect("invalid PORT");

    let pool = db::init_pool(&database_url)
        .await
        .expect("database init failed");

    let state = AppState::new(Arc::new(PgBoardStore::new(pool)));

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "boardsync listening");
    axum::serve(listener, app).await.expect("server failed");
}
