use std::sync::Arc;

use anyhow::{Context, Result};
use bazaar_auth::{SessionStore, TokenStore, UserService};
use bazaar_cache::Cache;
use bazaar_commerce::cart::{CartService, CouponService};
use bazaar_commerce::catalog::{CategoryService, ProductService, ReviewService};
use bazaar_commerce::notification::NotificationService;
use bazaar_commerce::order::OrderService;
use bazaar_commerce::seller::SellerService;
use bazaar_db::Db;
use tracing::info;

use crate::config::Config;

/// Shared handler state. Cloning is cheap; every service shares one
/// database and one cache.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Db,
    pub cache: Cache,
    pub users: UserService,
    pub sessions: SessionStore,
    pub tokens: TokenStore,
    pub products: ProductService,
    pub categories: CategoryService,
    pub reviews: ReviewService,
    pub sellers: SellerService,
    pub carts: CartService,
    pub coupons: CouponService,
    pub orders: OrderService,
    pub notifications: NotificationService,
}

impl AppState {
    /// Open the configured database (in memory when no data directory is
    /// set) and build every service on it.
    pub async fn new(config: Config) -> Result<Self> {
        let db = match &config.database.data_dir {
            Some(dir) => {
                info!(data_dir = %dir.display(), "Opening database");
                Db::open(dir)
                    .await
                    .with_context(|| format!("Failed to open database at {}", dir.display()))?
            }
            None => {
                info!("Using in-memory database");
                Db::in_memory()
            }
        };
        Ok(Self::with_db(config, db))
    }

    pub fn with_db(config: Config, db: Db) -> Self {
        let cache = Cache::new();
        Self {
            users: UserService::new(db.clone()),
            sessions: SessionStore::new(cache.clone(), config.auth.session_ttl()),
            tokens: TokenStore::new(cache.clone()),
            products: ProductService::new(db.clone()),
            categories: CategoryService::new(db.clone()),
            reviews: ReviewService::new(db.clone()),
            sellers: SellerService::new(db.clone()),
            carts: CartService::new(db.clone()),
            coupons: CouponService::new(db.clone()),
            orders: OrderService::new(db.clone(), config.orders.settings()),
            notifications: NotificationService::new(db.clone()),
            config: Arc::new(config),
            db,
            cache,
        }
    }
}
