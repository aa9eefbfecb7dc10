//! Products listed by sellers.

use bazaar_db::{Db, Document, Filter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CommerceError, CommerceResult};
use crate::ids::{ProductId, SellerId};
use crate::money::Money;
use crate::query::ApiFeatures;
use crate::validate;

/// Longest allowed product name.
pub const MAX_NAME_LEN: usize = 100;

/// A product image reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductImage {
    pub image: String,
}

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub description: String,
    /// Average review rating, 0 when unreviewed.
    #[serde(default)]
    pub ratings: f64,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    pub category: String,
    pub seller: SellerId,
    pub stock: i64,
    #[serde(default)]
    pub number_of_reviews: u64,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Document for Product {
    const COLLECTION: &'static str = "product";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

impl Product {
    /// Trim and check every field.
    pub fn validate(&mut self) -> CommerceResult<()> {
        self.name = validate::required(&self.name, "Product Name is required!")?;
        validate::max_len(&self.name, MAX_NAME_LEN, "Product Name")?;
        if self.price.is_negative() {
            return Err(CommerceError::invalid("Product Price cannot be negative"));
        }
        self.description = validate::required(&self.description, "Product Description is required!")?;
        self.category = validate::required(&self.category, "Please enter category of these product")?;
        if self.stock < 0 {
            return Err(CommerceError::invalid("Product stock cannot be negative"));
        }
        Ok(())
    }

    pub fn in_stock(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

/// Payload for creating a product.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub price: Option<Money>,
    pub description: String,
    pub images: Vec<ProductImage>,
    pub category: String,
    pub stock: Option<i64>,
    /// Only honoured for admins creating on a seller's behalf.
    pub seller: Option<SellerId>,
}

/// Partial update of a product. Ratings, reviews and the seller are not
/// writable through it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<Money>,
    pub description: Option<String>,
    pub images: Option<Vec<ProductImage>>,
    pub category: Option<String>,
    pub stock: Option<i64>,
}

impl ProductUpdate {
    fn apply(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(images) = self.images {
            product.images = images;
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
    }
}

/// Product storage and queries.
#[derive(Clone)]
pub struct ProductService {
    db: Db,
}

impl ProductService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Create a product owned by `seller`.
    pub async fn create(&self, seller: SellerId, input: NewProduct) -> CommerceResult<Product> {
        let stock = input
            .stock
            .ok_or_else(|| CommerceError::invalid("Please enter Product stock"))?;
        let now = crate::timestamp::now();
        let mut product = Product {
            id: ProductId::generate(),
            name: input.name,
            price: input.price.unwrap_or_default(),
            description: input.description,
            ratings: 0.0,
            images: input.images,
            category: input.category,
            seller,
            stock,
            number_of_reviews: 0,
            created_at: now,
            updated_at: now,
        };
        product.validate()?;
        self.db.insert(&product).await?;

        info!(product = %product.id, seller = %product.seller, "Product created");
        Ok(product)
    }

    pub async fn get(&self, id: &str) -> CommerceResult<Product> {
        self.db
            .find_by_id::<Product>(id)
            .await?
            .ok_or_else(|| CommerceError::not_found("Product", id))
    }

    /// Apply a partial update and re-validate.
    pub async fn update(&self, id: &str, update: ProductUpdate) -> CommerceResult<Product> {
        self.db
            .update::<Product, _, CommerceError, _>(id, |product| {
                update.apply(product);
                product.validate()?;
                product.updated_at = crate::timestamp::now();
                Ok(product.clone())
            })
            .await?
            .ok_or_else(|| CommerceError::not_found("Product", id))
    }

    /// Delete a product together with its reviews.
    pub async fn delete(&self, id: &str) -> CommerceResult<()> {
        if !self.db.delete_by_id::<Product>(id).await? {
            return Err(CommerceError::not_found("Product", id));
        }
        let reviews = self
            .db
            .delete_many::<crate::catalog::Review>(&Filter::new().eq("product", id))
            .await?;
        info!(product = id, reviews, "Product deleted");
        Ok(())
    }

    /// One page of products matching the request's features, plus the
    /// total number of matches.
    pub async fn list(&self, features: &ApiFeatures) -> CommerceResult<(Vec<Product>, usize)> {
        let total = self.db.count::<Product>(features.query_filter()).await?;
        let products = self
            .db
            .find(features.query_filter(), features.find_options())
            .await?;
        Ok((products, total))
    }

    /// Like [`list`](Self::list), limited to one seller's products.
    pub async fn list_for_seller(
        &self,
        seller: &str,
        features: ApiFeatures,
    ) -> CommerceResult<(Vec<Product>, usize)> {
        self.list(&features.restrict(Filter::new().eq("seller", seller)))
            .await
    }

    /// Take `quantity` units out of stock, failing when not enough remain.
    pub async fn reserve_stock(&self, id: &str, quantity: i64) -> CommerceResult<Product> {
        self.db
            .update::<Product, _, CommerceError, _>(id, |product| {
                if !product.in_stock(quantity) {
                    return Err(CommerceError::InsufficientStock {
                        product: product.name.clone(),
                        requested: quantity,
                        available: product.stock,
                    });
                }
                product.stock -= quantity;
                product.updated_at = crate::timestamp::now();
                Ok(product.clone())
            })
            .await?
            .ok_or_else(|| CommerceError::not_found("Product", id))
    }

    /// Put `quantity` units back. Missing products are skipped.
    pub async fn restore_stock(&self, id: &str, quantity: i64) -> CommerceResult<()> {
        self.db
            .update::<Product, _, CommerceError, _>(id, |product| {
                product.stock = product.stock.saturating_add(quantity);
                product.updated_at = crate::timestamp::now();
                Ok(())
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mouse() -> NewProduct {
        NewProduct {
            name: "  Wireless Mouse ".into(),
            price: Some(Money::from_decimal(799.0)),
            description: "2.4GHz, silent clicks".into(),
            category: "Electronics".into(),
            stock: Some(5),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_trims_and_defaults() {
        let service = ProductService::new(Db::in_memory());
        let product = service.create(SellerId::generate(), mouse()).await.unwrap();
        assert_eq!(product.name, "Wireless Mouse");
        assert_eq!(product.ratings, 0.0);
        assert_eq!(product.number_of_reviews, 0);
        assert_eq!(service.get(product.id.as_str()).await.unwrap(), product);
    }

    #[tokio::test]
    async fn test_create_requires_fields() {
        let service = ProductService::new(Db::in_memory());
        let mut input = mouse();
        input.description = " ".into();
        let err = service.create(SellerId::generate(), input).await.unwrap_err();
        assert_eq!(err.to_string(), "Product Description is required!");

        let mut input = mouse();
        input.stock = None;
        assert!(service.create(SellerId::generate(), input).await.is_err());

        let mut input = mouse();
        input.name = "x".repeat(101);
        assert!(service.create(SellerId::generate(), input).await.is_err());
    }

    #[tokio::test]
    async fn test_update_revalidates() {
        let service = ProductService::new(Db::in_memory());
        let product = service.create(SellerId::generate(), mouse()).await.unwrap();

        let updated = service
            .update(
                product.id.as_str(),
                ProductUpdate {
                    price: Some(Money::from_decimal(699.0)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price, Money::from_decimal(699.0));

        let bad = ProductUpdate {
            stock: Some(-1),
            ..Default::default()
        };
        assert!(service.update(product.id.as_str(), bad).await.is_err());
        assert_eq!(service.get(product.id.as_str()).await.unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_reserve_and_restore_stock() {
        let service = ProductService::new(Db::in_memory());
        let product = service.create(SellerId::generate(), mouse()).await.unwrap();
        let id = product.id.as_str();

        assert_eq!(service.reserve_stock(id, 3).await.unwrap().stock, 2);
        let err = service.reserve_stock(id, 3).await.unwrap_err();
        assert!(matches!(err, CommerceError::InsufficientStock { available: 2, .. }));

        service.restore_stock(id, 3).await.unwrap();
        assert_eq!(service.get(id).await.unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_list_with_features() {
        let service = ProductService::new(Db::in_memory());
        let seller = SellerId::generate();
        for (name, price) in [("Mouse", 500.0), ("Mousepad", 150.0), ("Keyboard", 1500.0)] {
            let mut input = mouse();
            input.name = name.into();
            input.price = Some(Money::from_decimal(price));
            service.create(seller.clone(), input).await.unwrap();
        }

        let features = ApiFeatures::new(vec![
            ("keyword".to_string(), "mouse".to_string()),
            ("price[gte]".to_string(), "200".to_string()),
        ])
        .search()
        .filter()
        .paginate(2);
        let (products, total) = service.list(&features).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(products[0].name, "Mouse");

        let other = SellerId::generate();
        let mut rug = mouse();
        rug.name = "Mouse Rug".into();
        service.create(other, rug).await.unwrap();

        let features = ApiFeatures::new(vec![("keyword".to_string(), "mouse".to_string())]).search();
        let (products, total) = service.list_for_seller(seller.as_str(), features).await.unwrap();
        assert_eq!(total, 2);
        assert!(products.iter().all(|p| p.seller == seller));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let service = ProductService::new(Db::in_memory());
        let err = service.delete("nope").await.unwrap_err();
        assert!(matches!(err, CommerceError::NotFound { .. }));
    }
}
