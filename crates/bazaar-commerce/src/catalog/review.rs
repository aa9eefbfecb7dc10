//! Product reviews and the rating aggregation they drive.

use bazaar_db::{Db, Document, Filter, FindOptions, Group};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{Product, ProductService};
use crate::error::{CommerceError, CommerceResult};
use crate::ids::{ProductId, ReviewId, UserId};
use crate::validate;

pub const MAX_COMMENT_LEN: usize = 1000;

/// One user's review of one product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: ReviewId,
    pub user: UserId,
    pub product: ProductId,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Document for Review {
    const COLLECTION: &'static str = "reviews";

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn unique_keys() -> &'static [&'static [&'static str]] {
        &[&["user", "product"]]
    }
}

fn check_rating(rating: u8) -> CommerceResult<()> {
    match rating {
        0 => Err(CommerceError::invalid("Rating must be at least 1")),
        1..=5 => Ok(()),
        _ => Err(CommerceError::invalid("Rating cannot be more than 5")),
    }
}

fn check_comment(comment: &Option<String>) -> CommerceResult<()> {
    match comment {
        Some(text) => validate::max_len(text, MAX_COMMENT_LEN, "Review"),
        None => Ok(()),
    }
}

/// Payload for writing a review.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub product: ProductId,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Partial update of a review.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReviewUpdate {
    pub rating: Option<u8>,
    pub comment: Option<String>,
    pub images: Option<Vec<String>>,
}

/// Review storage; keeps product ratings in step.
#[derive(Clone)]
pub struct ReviewService {
    db: Db,
}

impl ReviewService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Review a product. A user may review each product once.
    pub async fn create(&self, user: UserId, input: NewReview) -> CommerceResult<Review> {
        check_rating(input.rating)?;
        check_comment(&input.comment)?;
        ProductService::new(self.db.clone())
            .get(input.product.as_str())
            .await?;

        let now = crate::timestamp::now();
        let review = Review {
            id: ReviewId::generate(),
            user,
            product: input.product,
            rating: input.rating,
            comment: input.comment,
            images: input.images,
            created_at: now,
            updated_at: now,
        };
        self.db.insert(&review).await.map_err(|e| {
            if e.is_duplicate() {
                CommerceError::invalid("You have already reviewed this product")
            } else {
                e.into()
            }
        })?;

        self.refresh_product_rating(&review.product).await?;
        Ok(review)
    }

    pub async fn get(&self, id: &str) -> CommerceResult<Review> {
        self.db
            .find_by_id::<Review>(id)
            .await?
            .ok_or_else(|| CommerceError::not_found("Review", id))
    }

    /// Reviews of a product, newest first.
    pub async fn for_product(&self, product: &str) -> CommerceResult<Vec<Review>> {
        Ok(self
            .db
            .find(
                &Filter::new().eq("product", product),
                &FindOptions::new().sort_by("-createdAt,-_id"),
            )
            .await?)
    }

    pub async fn update(&self, id: &str, update: ReviewUpdate) -> CommerceResult<Review> {
        let review = self
            .db
            .update::<Review, _, CommerceError, _>(id, |review| {
                if let Some(rating) = update.rating {
                    check_rating(rating)?;
                    review.rating = rating;
                }
                if let Some(comment) = update.comment {
                    review.comment = Some(comment);
                }
                check_comment(&review.comment)?;
                if let Some(images) = update.images {
                    review.images = images;
                }
                review.updated_at = crate::timestamp::now();
                Ok(review.clone())
            })
            .await?
            .ok_or_else(|| CommerceError::not_found("Review", id))?;

        self.refresh_product_rating(&review.product).await?;
        Ok(review)
    }

    pub async fn delete(&self, id: &str) -> CommerceResult<Review> {
        let review = self.get(id).await?;
        self.db.delete_by_id::<Review>(id).await?;
        self.refresh_product_rating(&review.product).await?;
        Ok(review)
    }

    /// Recompute a product's average rating and review count from its
    /// reviews (0 and 0 when none remain).
    pub async fn refresh_product_rating(&self, product: &ProductId) -> CommerceResult<()> {
        self.db
            .update_with_aggregate::<Review, Product, _, CommerceError, _>(
                &Filter::new().eq("product", product),
                &Group::new()
                    .avg("averageRating", "rating")
                    .count("totalReviews"),
                product.as_str(),
                |doc, stats| {
                    let (average, total) = match stats {
                        Some(stats) => (
                            stats["averageRating"].as_f64().unwrap_or(0.0),
                            stats["totalReviews"].as_u64().unwrap_or(0),
                        ),
                        None => (0.0, 0),
                    };
                    doc.ratings = average;
                    doc.number_of_reviews = total;
                    debug!(product = %product, average, total, "Refreshed product rating");
                    Ok(())
                },
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NewProduct;
    use crate::ids::SellerId;
    use crate::money::Money;

    async fn setup() -> (Db, ProductId) {
        let db = Db::in_memory();
        let product = ProductService::new(db.clone())
            .create(
                SellerId::generate(),
                NewProduct {
                    name: "Kettle".into(),
                    price: Some(Money::from_decimal(1299.0)),
                    description: "1.5L steel".into(),
                    category: "Kitchen".into(),
                    stock: Some(10),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        (db, product.id)
    }

    fn review_of(product: &ProductId, rating: u8) -> NewReview {
        NewReview {
            product: product.clone(),
            rating,
            comment: Some("Boils fast".into()),
            images: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_ratings_follow_reviews() {
        let (db, product) = setup().await;
        let reviews = ReviewService::new(db.clone());
        let products = ProductService::new(db);

        reviews.create(UserId::generate(), review_of(&product, 4)).await.unwrap();
        let second = reviews
            .create(UserId::generate(), review_of(&product, 5))
            .await
            .unwrap();

        let p = products.get(product.as_str()).await.unwrap();
        assert_eq!(p.ratings, 4.5);
        assert_eq!(p.number_of_reviews, 2);

        reviews
            .update(
                second.id.as_str(),
                ReviewUpdate {
                    rating: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(products.get(product.as_str()).await.unwrap().ratings, 3.0);

        for review in reviews.for_product(product.as_str()).await.unwrap() {
            reviews.delete(review.id.as_str()).await.unwrap();
        }
        let p = products.get(product.as_str()).await.unwrap();
        assert_eq!(p.ratings, 0.0);
        assert_eq!(p.number_of_reviews, 0);
    }

    #[tokio::test]
    async fn test_one_review_per_user_and_product() {
        let (db, product) = setup().await;
        let reviews = ReviewService::new(db);
        let user = UserId::generate();

        reviews.create(user.clone(), review_of(&product, 3)).await.unwrap();
        let err = reviews.create(user, review_of(&product, 5)).await.unwrap_err();
        assert_eq!(err.to_string(), "You have already reviewed this product");
    }

    #[tokio::test]
    async fn test_rating_bounds_and_missing_product() {
        let (db, product) = setup().await;
        let reviews = ReviewService::new(db);

        assert!(reviews.create(UserId::generate(), review_of(&product, 0)).await.is_err());
        assert!(reviews.create(UserId::generate(), review_of(&product, 6)).await.is_err());

        let missing = review_of(&ProductId::generate(), 4);
        let err = reviews.create(UserId::generate(), missing).await.unwrap_err();
        assert!(matches!(err, CommerceError::NotFound { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reviews_all_counted() {
        let (db, product) = setup().await;
        let reviews = ReviewService::new(db.clone());

        let mut handles = Vec::new();
        for i in 0..16u8 {
            let reviews = reviews.clone();
            let product = product.clone();
            handles.push(tokio::spawn(async move {
                reviews
                    .create(UserId::generate(), review_of(&product, i % 5 + 1))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let p = ProductService::new(db).get(product.as_str()).await.unwrap();
        assert_eq!(p.number_of_reviews, 16);
        // 0..16 cycles ratings 1..=5 three times plus a final 1.
        assert_eq!(p.ratings, 46.0 / 16.0);
    }
}
