pub mod appresult;
pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod index;
pub mod members;
pub mod model;
pub mod profiles;
pub mod rooms;
pub mod session;
pub mod store;

use std::sync::Arc;

use axum::{Router, extract::FromRef};
use tokio::sync::broadcast;

pub use appresult::{AppError, AppResult};

use chat::ChatService;
use config::Config;
use index::{IndexRelay, MessageIndex, SqliteMessageIndex};
use members::SqliteMemberDirectory;
use model::ChatPayload;

const BROADCAST_CAPACITY: usize = 256;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub members: SqliteMemberDirectory,
    pub tx: broadcast::Sender<ChatPayload>,
}

impl AppState {
    /// Opens both stores and starts the index relay.
    pub async fn init(config: &Config) -> anyhow::Result<AppState> {
        let primary = db::open_primary(&config.database_url).await?;
        let index_pool = db::open_index(&config.index_database_url).await?;

        let members = SqliteMemberDirectory::new(primary.clone());
        let index: Arc<dyn MessageIndex> = Arc::new(SqliteMessageIndex::new(index_pool));
        let relay = Arc::new(IndexRelay::new(primary.clone(), index, config.relay.clone()));
        relay.spawn();

        Ok(AppState {
            chat: Arc::new(ChatService::new(primary, Arc::new(members.clone()), relay)),
            members,
            tx: broadcast::channel(BROADCAST_CAPACITY).0,
        })
    }
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .nest("/r", rooms::router())
        .nest("/p", profiles::router())
        .with_state(app_state)
}
