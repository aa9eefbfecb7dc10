//! Product catalog module.
//!
//! Contains products, categories and reviews.

mod category;
mod product;
mod review;

pub use category::{
    build_hierarchy, Category, CategoryNode, CategoryService, CategoryUpdate, NewCategory,
    FEATURED_LIMIT,
};
pub use product::{NewProduct, Product, ProductImage, ProductService, ProductUpdate};
pub use review::{NewReview, Review, ReviewService, ReviewUpdate};
