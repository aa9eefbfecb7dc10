//! Marketplace domain types and logic for Bazaar.
//!
//! Every area exposes plain serde documents stored through [`bazaar_db::Db`]
//! and a cheap-to-clone service holding the database handle:
//!
//! - **Catalog**: products, categories (a tree), reviews and the rating
//!   aggregation they drive
//! - **Sellers**: seller profiles, approval and sales statistics
//! - **Cart**: per-user carts and discount coupons
//! - **Orders**: placement with stock reservation, status lifecycle,
//!   cancellation
//! - **Notifications**: per-user inbox
//! - **Query**: [`ApiFeatures`], which turns URL query pairs into a filter,
//!   sort and page
//!
//! # Example
//!
//! ```rust,ignore
//! use bazaar_commerce::prelude::*;
//!
//! let db = Db::in_memory();
//! let products = ProductService::new(db.clone());
//! let features = ApiFeatures::new(query_pairs).search().filter().paginate(2);
//! let (page, total) = products.list(&features).await?;
//! let pagination = features.pagination(total);
//! ```

pub mod error;
pub mod ids;
pub mod money;
pub mod patch;
pub mod timestamp;
pub mod validate;

pub mod cart;
pub mod catalog;
pub mod notification;
pub mod order;
pub mod query;
pub mod seller;

pub use error::{CommerceError, CommerceResult};
pub use ids::*;
pub use money::Money;
pub use query::{ApiFeatures, Pagination};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::cart::{AddToCart, Cart, CartService, Coupon, CouponService, NewCoupon};
    pub use crate::catalog::{
        Category, CategoryService, NewProduct, NewReview, Product, ProductService, Review,
        ReviewService,
    };
    pub use crate::error::{CommerceError, CommerceResult};
    pub use crate::ids::*;
    pub use crate::money::Money;
    pub use crate::notification::{Notification, NotificationKind, NotificationService};
    pub use crate::order::{Address, Order, OrderService, OrderSettings, OrderStatus, PlaceOrder};
    pub use crate::query::{ApiFeatures, Pagination};
    pub use crate::seller::{NewSeller, Seller, SellerService, SellerStats};
    pub use bazaar_db::Db;
}
