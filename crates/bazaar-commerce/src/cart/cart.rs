//! Cart and cart item types.

use bazaar_db::{Db, Document, Filter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{Product, ProductService};
use crate::error::{CommerceError, CommerceResult};
use crate::ids::{CartId, ProductId, SellerId, UserId};
use crate::money::Money;

/// Maximum quantity allowed per cart item.
pub const MAX_QUANTITY_PER_ITEM: i64 = 9999;

/// A cart line: product, quantity and the price and seller at the time it
/// was added.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub product: ProductId,
    pub quantity: i64,
    pub price: Money,
    pub seller: SellerId,
}

impl CartItem {
    /// `price * quantity`.
    pub fn line_total(&self) -> CommerceResult<Money> {
        self.price
            .checked_mul(self.quantity)
            .ok_or(CommerceError::Overflow)
    }
}

/// A user's shopping cart. Each user has at most one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    #[serde(rename = "_id")]
    pub id: CartId,
    pub user: UserId,
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Document for Cart {
    const COLLECTION: &'static str = "carts";

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn unique_keys() -> &'static [&'static [&'static str]] {
        &[&["user"]]
    }
}

impl Cart {
    /// Create an empty cart for a user.
    pub fn new(user: UserId) -> Self {
        let now = crate::timestamp::now();
        Self {
            id: CartId::generate(),
            user,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add `quantity` of a product, merging with an existing line.
    ///
    /// The line's price and seller are refreshed from `product`, and the
    /// resulting quantity may not exceed its stock.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CommerceResult<()> {
        if quantity <= 0 {
            return Err(CommerceError::invalid("Quantity must be at least 1"));
        }

        let current = self
            .items
            .iter()
            .find(|i| i.product == product.id)
            .map_or(0, |i| i.quantity);
        let new_quantity = current
            .checked_add(quantity)
            .ok_or(CommerceError::Overflow)?;
        check_quantity(product, new_quantity)?;

        match self.items.iter_mut().find(|i| i.product == product.id) {
            Some(existing) => {
                existing.quantity = new_quantity;
                existing.price = product.price;
                existing.seller = product.seller.clone();
            }
            None => self.items.push(CartItem {
                product: product.id.clone(),
                quantity,
                price: product.price,
                seller: product.seller.clone(),
            }),
        }
        self.updated_at = crate::timestamp::now();
        Ok(())
    }

    /// Set a line's quantity; zero or less removes it.
    ///
    /// Returns whether the product was in the cart.
    pub fn set_quantity(&mut self, product: &Product, quantity: i64) -> CommerceResult<bool> {
        if quantity <= 0 {
            return Ok(self.remove_item(product.id.as_str()));
        }
        check_quantity(product, quantity)?;

        match self.items.iter_mut().find(|i| i.product == product.id) {
            Some(item) => {
                item.quantity = quantity;
                item.price = product.price;
                self.updated_at = crate::timestamp::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove a product's line. Returns whether it was present.
    pub fn remove_item(&mut self, product: &str) -> bool {
        let len_before = self.items.len();
        self.items.retain(|i| i.product.as_str() != product);
        let removed = self.items.len() < len_before;
        if removed {
            self.updated_at = crate::timestamp::now();
        }
        removed
    }

    /// Clear all items from the cart.
    pub fn clear(&mut self) {
        self.items.clear();
        self.updated_at = crate::timestamp::now();
    }

    /// Get total item count (sum of quantities).
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of every line total.
    pub fn subtotal(&self) -> CommerceResult<Money> {
        self.items.iter().try_fold(Money::zero(), |acc, item| {
            acc.checked_add(item.line_total()?)
                .ok_or(CommerceError::Overflow)
        })
    }
}

fn check_quantity(product: &Product, quantity: i64) -> CommerceResult<()> {
    if quantity > MAX_QUANTITY_PER_ITEM {
        return Err(CommerceError::invalid(format!(
            "Quantity {} exceeds maximum allowed ({})",
            quantity, MAX_QUANTITY_PER_ITEM
        )));
    }
    if !product.in_stock(quantity) {
        return Err(CommerceError::InsufficientStock {
            product: product.name.clone(),
            requested: quantity,
            available: product.stock,
        });
    }
    Ok(())
}

/// Payload for adding to the cart.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCart {
    pub product: ProductId,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

/// Cart storage keyed by user.
#[derive(Clone)]
pub struct CartService {
    db: Db,
}

impl CartService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// The user's cart, or an empty unsaved one.
    pub async fn get(&self, user: &UserId) -> CommerceResult<Cart> {
        let existing = self
            .db
            .find_one::<Cart>(&Filter::new().eq("user", user))
            .await?;
        Ok(existing.unwrap_or_else(|| Cart::new(user.clone())))
    }

    async fn save(&self, cart: &Cart) -> CommerceResult<()> {
        if !self.db.replace(cart).await? {
            self.db.insert(cart).await?;
        }
        debug!(cart = %cart.id, items = cart.items.len(), "Cart saved");
        Ok(())
    }

    pub async fn add_item(&self, user: &UserId, input: AddToCart) -> CommerceResult<Cart> {
        let product = ProductService::new(self.db.clone())
            .get(input.product.as_str())
            .await?;
        let mut cart = self.get(user).await?;
        cart.add_item(&product, input.quantity)?;
        self.save(&cart).await?;
        Ok(cart)
    }

    pub async fn set_quantity(
        &self,
        user: &UserId,
        product: &str,
        quantity: i64,
    ) -> CommerceResult<Cart> {
        let mut cart = self.get(user).await?;
        let found = if quantity <= 0 {
            cart.remove_item(product)
        } else {
            let product = ProductService::new(self.db.clone()).get(product).await?;
            cart.set_quantity(&product, quantity)?
        };
        if !found {
            return Err(CommerceError::not_found("Cart item", product));
        }
        self.save(&cart).await?;
        Ok(cart)
    }

    pub async fn remove_item(&self, user: &UserId, product: &str) -> CommerceResult<Cart> {
        let mut cart = self.get(user).await?;
        if !cart.remove_item(product) {
            return Err(CommerceError::not_found("Cart item", product));
        }
        self.save(&cart).await?;
        Ok(cart)
    }

    pub async fn clear(&self, user: &UserId) -> CommerceResult<Cart> {
        let mut cart = self.get(user).await?;
        cart.clear();
        self.save(&cart).await?;
        Ok(cart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NewProduct;

    async fn product(db: &Db, price: f64, stock: i64) -> Product {
        ProductService::new(db.clone())
            .create(
                SellerId::generate(),
                NewProduct {
                    name: "Notebook".into(),
                    price: Some(Money::from_decimal(price)),
                    description: "A5 ruled".into(),
                    category: "Stationery".into(),
                    stock: Some(stock),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_merges_and_checks_stock() {
        let db = Db::in_memory();
        let notebook = product(&db, 45.5, 5).await;
        let service = CartService::new(db);
        let user = UserId::generate();
        let add = |quantity| AddToCart {
            product: notebook.id.clone(),
            quantity,
        };

        service.add_item(&user, add(2)).await.unwrap();
        let cart = service.add_item(&user, add(3)).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.subtotal().unwrap(), Money::from_decimal(227.5));

        let err = service.add_item(&user, add(1)).await.unwrap_err();
        assert!(matches!(err, CommerceError::InsufficientStock { .. }));
        assert_eq!(service.get(&user).await.unwrap().item_count(), 5);
    }

    #[tokio::test]
    async fn test_set_quantity_remove_and_clear() {
        let db = Db::in_memory();
        let a = product(&db, 10.0, 10).await;
        let b = product(&db, 20.0, 10).await;
        let service = CartService::new(db);
        let user = UserId::generate();

        for p in [&a, &b] {
            service
                .add_item(
                    &user,
                    AddToCart {
                        product: p.id.clone(),
                        quantity: 1,
                    },
                )
                .await
                .unwrap();
        }

        let cart = service.set_quantity(&user, a.id.as_str(), 4).await.unwrap();
        assert_eq!(cart.subtotal().unwrap(), Money::from_decimal(60.0));

        let cart = service.set_quantity(&user, a.id.as_str(), 0).await.unwrap();
        assert_eq!(cart.items.len(), 1);

        assert!(service.remove_item(&user, a.id.as_str()).await.is_err());
        let cart = service.clear(&user).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_empty_cart_for_new_user() {
        let service = CartService::new(Db::in_memory());
        let cart = service.get(&UserId::generate()).await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal().unwrap(), Money::zero());
    }
}
