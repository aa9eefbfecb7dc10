//! Orders: placement, status lifecycle and cancellation.

use std::collections::BTreeMap;

use bazaar_db::{Db, Document, Filter, FindOptions};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cart::{CartService, CouponService};
use crate::catalog::ProductService;
use crate::error::{CommerceError, CommerceResult};
use crate::ids::{OrderId, ProductId, SellerId, UserId};
use crate::money::Money;
use crate::notification::{Notification, NotificationKind, NotificationService};
use crate::order::Address;
use crate::seller::SellerService;

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cod,
    CreditCard,
    DebitCard,
    NetBanking,
    Upi,
    Wallet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

/// Order lifecycle.
///
/// `processing -> shipped -> delivered -> returned`, with `cancelled`
/// reachable only from `processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Returned => "returned",
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Processing, OrderStatus::Shipped)
                | (OrderStatus::Processing, OrderStatus::Cancelled)
                | (OrderStatus::Shipped, OrderStatus::Delivered)
                | (OrderStatus::Delivered, OrderStatus::Returned)
        )
    }

    /// Stock and sales go back when an order ends in one of these.
    fn releases_items(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Returned)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A purchased line, priced when the order was placed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub product: ProductId,
    pub quantity: i64,
    pub price: Money,
    pub seller: SellerId,
}

impl OrderItem {
    pub fn line_total(&self) -> CommerceResult<Money> {
        self.price
            .checked_mul(self.quantity)
            .ok_or(CommerceError::Overflow)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    pub user: UserId,
    pub items: Vec<OrderItem>,
    pub shipping_address: Address,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub order_status: OrderStatus,
    pub total_amount: Money,
    #[serde(default)]
    pub tax_amount: Money,
    #[serde(default)]
    pub shipping_fee: Money,
    #[serde(default)]
    pub discount_amount: Money,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default, with = "crate::timestamp::option")]
    pub delivery_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub coupon_applied: Option<String>,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Document for Order {
    const COLLECTION: &'static str = "orders";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

impl Order {
    /// Sum of the line totals.
    pub fn items_total(&self) -> CommerceResult<Money> {
        self.items.iter().try_fold(Money::zero(), |acc, item| {
            acc.checked_add(item.line_total()?)
                .ok_or(CommerceError::Overflow)
        })
    }

    /// Recompute `totalAmount` as items + tax + shipping - discount.
    pub fn recalculate_total(&mut self) -> CommerceResult<()> {
        let total = self
            .items_total()?
            .checked_add(self.tax_amount)
            .and_then(|t| t.checked_add(self.shipping_fee))
            .and_then(|t| t.checked_sub(self.discount_amount))
            .ok_or(CommerceError::Overflow)?;
        if total.is_negative() {
            return Err(CommerceError::invalid("Total amount must be at least 0"));
        }
        self.total_amount = total;
        Ok(())
    }

    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_owned_by(&self, user: &str) -> bool {
        self.user.as_str() == user
    }

    /// Line totals grouped by seller.
    fn sales_by_seller(&self) -> CommerceResult<BTreeMap<SellerId, Money>> {
        let mut sales: BTreeMap<SellerId, Money> = BTreeMap::new();
        for item in &self.items {
            let entry = sales.entry(item.seller.clone()).or_default();
            *entry = entry
                .checked_add(item.line_total()?)
                .ok_or(CommerceError::Overflow)?;
        }
        Ok(sales)
    }
}

/// Pricing knobs applied at checkout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderSettings {
    /// Tax as a percent of the item total.
    pub tax_rate_percent: f64,
    /// Flat shipping fee per order.
    pub shipping_fee: Money,
    /// Orders whose item total reaches this ship free.
    pub free_shipping_threshold: Option<Money>,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            tax_rate_percent: 18.0,
            shipping_fee: Money::from_decimal(40.0),
            free_shipping_threshold: Some(Money::from_decimal(500.0)),
        }
    }
}

impl OrderSettings {
    fn shipping_for(&self, items_total: Money) -> Money {
        match self.free_shipping_threshold {
            Some(threshold) if items_total >= threshold => Money::zero(),
            _ => self.shipping_fee,
        }
    }
}

/// A requested line in a new order.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderLine {
    pub product: ProductId,
    pub quantity: i64,
}

/// Payload for placing an order. Without `items` the user's cart is used.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    #[serde(default)]
    pub items: Option<Vec<OrderLine>>,
    pub shipping_address: Address,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// Admin status change.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: OrderStatus,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

#[derive(Clone)]
pub struct OrderService {
    db: Db,
    settings: OrderSettings,
}

impl OrderService {
    pub fn new(db: Db, settings: OrderSettings) -> Self {
        Self { db, settings }
    }

    fn products(&self) -> ProductService {
        ProductService::new(self.db.clone())
    }

    /// Place an order for `user`.
    ///
    /// Stock is taken product by product; if any step fails before the
    /// order is stored, the stock already taken and any coupon redemption
    /// are given back.
    pub async fn place(&self, user: UserId, input: PlaceOrder) -> CommerceResult<Order> {
        let mut shipping_address = input.shipping_address;
        shipping_address.validate()?;

        let carts = CartService::new(self.db.clone());
        let from_cart = input.items.is_none();
        let lines = match input.items {
            Some(lines) => lines,
            None => carts
                .get(&user)
                .await?
                .items
                .into_iter()
                .map(|item| OrderLine {
                    product: item.product,
                    quantity: item.quantity,
                })
                .collect(),
        };
        if lines.is_empty() {
            return Err(CommerceError::invalid("No order items"));
        }
        if lines.iter().any(|l| l.quantity < 1) {
            return Err(CommerceError::invalid("Quantity must be at least 1"));
        }

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            match self.products().reserve_stock(line.product.as_str(), line.quantity).await {
                Ok(product) => items.push(OrderItem {
                    product: product.id,
                    quantity: line.quantity,
                    price: product.price,
                    seller: product.seller,
                }),
                Err(e) => {
                    self.restore_stock(&items).await;
                    return Err(e);
                }
            }
        }

        match self
            .build_and_store(&user, items.clone(), shipping_address, input.payment_method, input.coupon_code)
            .await
        {
            Ok(order) => {
                self.after_place(&order, from_cart).await;
                Ok(order)
            }
            Err(e) => {
                self.restore_stock(&items).await;
                Err(e)
            }
        }
    }

    async fn build_and_store(
        &self,
        user: &UserId,
        items: Vec<OrderItem>,
        shipping_address: Address,
        payment_method: PaymentMethod,
        coupon_code: Option<String>,
    ) -> CommerceResult<Order> {
        let now = crate::timestamp::now();
        let mut order = Order {
            id: OrderId::generate(),
            user: user.clone(),
            items,
            shipping_address,
            payment_method,
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Processing,
            total_amount: Money::zero(),
            tax_amount: Money::zero(),
            shipping_fee: Money::zero(),
            discount_amount: Money::zero(),
            tracking_number: None,
            delivery_date: None,
            coupon_applied: None,
            created_at: now,
            updated_at: now,
        };

        let items_total = order.items_total()?;
        order.tax_amount = items_total.percentage(self.settings.tax_rate_percent);
        order.shipping_fee = self.settings.shipping_for(items_total);

        let coupons = CouponService::new(self.db.clone());
        if let Some(code) = coupon_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            order.discount_amount = coupons.redeem(code, user, items_total).await?;
            order.coupon_applied = Some(code.to_uppercase());
        }

        let stored = match order.recalculate_total() {
            Ok(()) => self.db.insert(&order).await.map_err(CommerceError::from),
            Err(e) => Err(e),
        };
        if let Err(e) = stored {
            if let Some(code) = &order.coupon_applied {
                if let Err(release_err) = coupons.release(code, user).await {
                    warn!(coupon = %code, error = %release_err, "Failed to release coupon");
                }
            }
            return Err(e);
        }
        Ok(order)
    }

    /// Side effects of a stored order. Failures here are logged, not
    /// returned, since the order already exists.
    async fn after_place(&self, order: &Order, from_cart: bool) {
        let sellers = SellerService::new(self.db.clone());
        match order.sales_by_seller() {
            Ok(sales) => {
                for (seller, amount) in sales {
                    if let Err(e) = sellers.record_sale(seller.as_str(), amount).await {
                        warn!(seller = %seller, error = %e, "Failed to record seller sale");
                    }
                }
            }
            Err(e) => warn!(order = %order.id, error = %e, "Failed to total seller sales"),
        }

        if from_cart {
            if let Err(e) = CartService::new(self.db.clone()).clear(&order.user).await {
                warn!(user = %order.user, error = %e, "Failed to clear cart");
            }
        }

        self.notify(
            order,
            "Order placed",
            format!(
                "Your order of {} item(s) totalling {} has been placed.",
                order.item_count(),
                order.total_amount
            ),
        )
        .await;

        info!(
            order = %order.id,
            user = %order.user,
            total = %order.total_amount,
            items = order.items.len(),
            "Order placed"
        );
    }

    async fn notify(&self, order: &Order, title: &str, message: String) {
        let notification = Notification::new(order.user.clone(), NotificationKind::Order, title, message)
            .with_link(format!("/orders/{}", order.id));
        if let Err(e) = NotificationService::new(self.db.clone()).create(notification).await {
            warn!(order = %order.id, error = %e, "Failed to create notification");
        }
    }

    async fn restore_stock(&self, items: &[OrderItem]) {
        for item in items {
            if let Err(e) = self.products().restore_stock(item.product.as_str(), item.quantity).await {
                warn!(product = %item.product, error = %e, "Failed to restore stock");
            }
        }
    }

    /// Put stock back and take the order's amounts off seller totals.
    async fn release_items(&self, order: &Order) -> CommerceResult<()> {
        self.restore_stock(&order.items).await;
        let sellers = SellerService::new(self.db.clone());
        for (seller, amount) in order.sales_by_seller()? {
            sellers
                .record_sale(seller.as_str(), Money::from_paise(-amount.paise()))
                .await?;
        }
        Ok(())
    }

    pub async fn get(&self, id: &str) -> CommerceResult<Order> {
        self.db
            .find_by_id::<Order>(id)
            .await?
            .ok_or_else(|| CommerceError::not_found("Order", id))
    }

    /// A user's orders, newest first.
    pub async fn my_orders(&self, user: &UserId) -> CommerceResult<Vec<Order>> {
        Ok(self
            .db
            .find(
                &Filter::new().eq("user", user),
                &FindOptions::new().sort_by("-createdAt,-_id"),
            )
            .await?)
    }

    /// Every order, newest first.
    pub async fn list_all(&self) -> CommerceResult<Vec<Order>> {
        Ok(self
            .db
            .find(&Filter::new(), &FindOptions::new().sort_by("-createdAt,-_id"))
            .await?)
    }

    /// Move an order along its lifecycle.
    pub async fn update_status(&self, id: &str, update: StatusUpdate) -> CommerceResult<Order> {
        let tracking = update
            .tracking_number
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let order = self
            .db
            .update::<Order, _, CommerceError, _>(id, |order| {
                let from = order.order_status;
                let to = update.status;
                if !from.can_transition_to(to) {
                    return Err(CommerceError::InvalidTransition {
                        from: from.to_string(),
                        to: to.to_string(),
                    });
                }
                if let Some(tracking) = &tracking {
                    order.tracking_number = Some(tracking.clone());
                }
                match to {
                    OrderStatus::Shipped if order.tracking_number.is_none() => {
                        return Err(CommerceError::invalid(
                            "Tracking number is required to ship an order",
                        ));
                    }
                    OrderStatus::Delivered => {
                        order.delivery_date = Some(crate::timestamp::now());
                        if order.payment_method == PaymentMethod::Cod {
                            order.payment_status = PaymentStatus::Completed;
                        }
                    }
                    OrderStatus::Cancelled | OrderStatus::Returned => {
                        if order.payment_status == PaymentStatus::Completed {
                            order.payment_status = PaymentStatus::Refunded;
                        }
                    }
                    _ => {}
                }
                order.order_status = to;
                order.updated_at = crate::timestamp::now();
                Ok(order.clone())
            })
            .await?
            .ok_or_else(|| CommerceError::not_found("Order", id))?;

        if order.order_status.releases_items() {
            self.release_items(&order).await?;
        }
        self.notify(
            &order,
            "Order update",
            format!("Your order is now {}.", order.order_status),
        )
        .await;
        info!(order = id, status = %order.order_status, "Order status updated");
        Ok(order)
    }

    /// Cancel one of the user's own orders while it is still processing.
    pub async fn cancel(&self, user: &UserId, id: &str) -> CommerceResult<Order> {
        let order = self
            .db
            .update::<Order, _, CommerceError, _>(id, |order| {
                if &order.user != user {
                    return Err(CommerceError::Forbidden(
                        "Not authorized to cancel this order".into(),
                    ));
                }
                if order.order_status != OrderStatus::Processing {
                    return Err(CommerceError::invalid(format!(
                        "Order cannot be cancelled once {}",
                        order.order_status
                    )));
                }
                order.order_status = OrderStatus::Cancelled;
                if order.payment_status == PaymentStatus::Completed {
                    order.payment_status = PaymentStatus::Refunded;
                }
                order.updated_at = crate::timestamp::now();
                Ok(order.clone())
            })
            .await?
            .ok_or_else(|| CommerceError::not_found("Order", id))?;

        self.release_items(&order).await?;
        self.notify(&order, "Order cancelled", "Your order has been cancelled.".into())
            .await;
        info!(order = id, user = %user, "Order cancelled by customer");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{AddToCart, DiscountType, NewCoupon};
    use crate::catalog::{NewProduct, Product};
    use chrono::Duration;

    async fn product(db: &Db, seller: &SellerId, price: f64, stock: i64) -> Product {
        ProductService::new(db.clone())
            .create(
                seller.clone(),
                NewProduct {
                    name: "Desk Lamp".into(),
                    price: Some(Money::from_decimal(price)),
                    description: "LED, warm white".into(),
                    category: "Home".into(),
                    stock: Some(stock),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    fn address() -> Address {
        Address {
            name: "Ravi Kumar".into(),
            mobile: "9123456780".into(),
            address: "4 Park Street".into(),
            city: "Kolkata".into(),
            state: "West Bengal".into(),
            pincode: "700016".into(),
            ..Default::default()
        }
    }

    fn order_of(lines: Vec<OrderLine>) -> PlaceOrder {
        PlaceOrder {
            items: Some(lines),
            shipping_address: address(),
            payment_method: PaymentMethod::Cod,
            coupon_code: None,
        }
    }

    fn flat_settings() -> OrderSettings {
        OrderSettings {
            tax_rate_percent: 10.0,
            shipping_fee: Money::from_decimal(50.0),
            free_shipping_threshold: Some(Money::from_decimal(1000.0)),
        }
    }

    #[tokio::test]
    async fn test_place_prices_and_takes_stock() {
        let db = Db::in_memory();
        let seller = SellerId::generate();
        let lamp = product(&db, &seller, 200.0, 5).await;
        let service = OrderService::new(db.clone(), flat_settings());
        let user = UserId::generate();

        let order = service
            .place(
                user.clone(),
                order_of(vec![OrderLine {
                    product: lamp.id.clone(),
                    quantity: 2,
                }]),
            )
            .await
            .unwrap();

        assert_eq!(order.items[0].price, Money::from_decimal(200.0));
        assert_eq!(order.tax_amount, Money::from_decimal(40.0));
        assert_eq!(order.shipping_fee, Money::from_decimal(50.0));
        assert_eq!(order.total_amount, Money::from_decimal(490.0));
        assert_eq!(order.order_status, OrderStatus::Processing);

        let stock = ProductService::new(db.clone()).get(lamp.id.as_str()).await.unwrap().stock;
        assert_eq!(stock, 3);

        let notes = NotificationService::new(db).list_for(&user, false).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(service.my_orders(&user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_line_restores_earlier_stock() {
        let db = Db::in_memory();
        let seller = SellerId::generate();
        let plenty = product(&db, &seller, 10.0, 10).await;
        let scarce = product(&db, &seller, 10.0, 1).await;
        let service = OrderService::new(db.clone(), flat_settings());

        let err = service
            .place(
                UserId::generate(),
                order_of(vec![
                    OrderLine {
                        product: plenty.id.clone(),
                        quantity: 4,
                    },
                    OrderLine {
                        product: scarce.id.clone(),
                        quantity: 2,
                    },
                ]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::InsufficientStock { .. }));

        let products = ProductService::new(db);
        assert_eq!(products.get(plenty.id.as_str()).await.unwrap().stock, 10);
        assert_eq!(products.get(scarce.id.as_str()).await.unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_from_cart_with_coupon_and_free_shipping() {
        let db = Db::in_memory();
        let lamp = product(&db, &SellerId::generate(), 600.0, 10).await;
        let user = UserId::generate();
        let carts = CartService::new(db.clone());
        carts
            .add_item(
                &user,
                AddToCart {
                    product: lamp.id.clone(),
                    quantity: 2,
                },
            )
            .await
            .unwrap();

        let now = crate::timestamp::now();
        CouponService::new(db.clone())
            .create(
                UserId::generate(),
                NewCoupon {
                    code: "LAMP100".into(),
                    discount_type: DiscountType::Fixed,
                    discount_value: 100.0,
                    min_order_value: None,
                    max_discount: None,
                    start_date: now - Duration::days(1),
                    end_date: now + Duration::days(1),
                    usage_limit: None,
                    is_active: None,
                },
            )
            .await
            .unwrap();

        let service = OrderService::new(db.clone(), flat_settings());
        let order = service
            .place(
                user.clone(),
                PlaceOrder {
                    items: None,
                    shipping_address: address(),
                    payment_method: PaymentMethod::Upi,
                    coupon_code: Some("lamp100".into()),
                },
            )
            .await
            .unwrap();

        // 1200 items + 120 tax + 0 shipping - 100 discount
        assert_eq!(order.total_amount, Money::from_decimal(1220.0));
        assert_eq!(order.coupon_applied.as_deref(), Some("LAMP100"));
        assert!(carts.get(&user).await.unwrap().is_empty());

        let err = service
            .place(
                user,
                PlaceOrder {
                    items: None,
                    shipping_address: address(),
                    payment_method: PaymentMethod::Upi,
                    coupon_code: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No order items");
    }

    #[tokio::test]
    async fn test_status_lifecycle() {
        let db = Db::in_memory();
        let lamp = product(&db, &SellerId::generate(), 100.0, 3).await;
        let service = OrderService::new(db, flat_settings());
        let order = service
            .place(
                UserId::generate(),
                order_of(vec![OrderLine {
                    product: lamp.id.clone(),
                    quantity: 1,
                }]),
            )
            .await
            .unwrap();
        let id = order.id.as_str();

        let err = service
            .update_status(
                id,
                StatusUpdate {
                    status: OrderStatus::Shipped,
                    tracking_number: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::Validation(_)));

        let err = service
            .update_status(
                id,
                StatusUpdate {
                    status: OrderStatus::Delivered,
                    tracking_number: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::InvalidTransition { .. }));

        service
            .update_status(
                id,
                StatusUpdate {
                    status: OrderStatus::Shipped,
                    tracking_number: Some("TRK123".into()),
                },
            )
            .await
            .unwrap();
        let delivered = service
            .update_status(
                id,
                StatusUpdate {
                    status: OrderStatus::Delivered,
                    tracking_number: None,
                },
            )
            .await
            .unwrap();
        assert!(delivered.delivery_date.is_some());
        assert_eq!(delivered.payment_status, PaymentStatus::Completed);
        assert_eq!(delivered.tracking_number.as_deref(), Some("TRK123"));
    }

    #[tokio::test]
    async fn test_cancel_restores_stock_and_checks_owner() {
        let db = Db::in_memory();
        let lamp = product(&db, &SellerId::generate(), 100.0, 3).await;
        let service = OrderService::new(db.clone(), flat_settings());
        let owner = UserId::generate();
        let order = service
            .place(
                owner.clone(),
                order_of(vec![OrderLine {
                    product: lamp.id.clone(),
                    quantity: 2,
                }]),
            )
            .await
            .unwrap();

        let err = service
            .cancel(&UserId::generate(), order.id.as_str())
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::Forbidden(_)));

        let cancelled = service.cancel(&owner, order.id.as_str()).await.unwrap();
        assert_eq!(cancelled.order_status, OrderStatus::Cancelled);
        let stock = ProductService::new(db).get(lamp.id.as_str()).await.unwrap().stock;
        assert_eq!(stock, 3);

        assert!(service.cancel(&owner, order.id.as_str()).await.is_err());
    }

    #[test]
    fn test_transitions() {
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Returned.can_transition_to(OrderStatus::Processing));
    }
}
