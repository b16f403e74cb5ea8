use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    auth::repo::{PgUserStore, UserStore},
    categories::repo::{CategoryStore, PgCategoryStore},
    config::AppConfig,
    products::repo::{PgProductStore, ProductStore},
    render::{PageRenderer, ShellRenderer},
    storage::{storage_from_config, ImageStorage},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub products: Arc<dyn ProductStore>,
    pub images: Arc<dyn ImageStorage>,
    pub renderer: Arc<dyn PageRenderer>,
}

impl AppState {
    /// Postgres-backed stores and the configured image backend.
    pub async fn init(config: Arc<AppConfig>, db: PgPool) -> anyhow::Result<Self> {
        let images = storage_from_config(&config).await?;
        Ok(Self {
            users: Arc::new(PgUserStore::new(db.clone())),
            categories: Arc::new(PgCategoryStore::new(db.clone())),
            products: Arc::new(PgProductStore::new(db)),
            images,
            renderer: Arc::new(ShellRenderer),
            config,
        })
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        categories: Arc<dyn CategoryStore>,
        products: Arc<dyn ProductStore>,
        images: Arc<dyn ImageStorage>,
    ) -> Self {
        Self {
            config,
            users,
            categories,
            products,
            images,
            renderer: Arc::new(ShellRenderer),
        }
    }
}
