//! Seller profiles: a user account elevated to sell products.

use bazaar_db::{Db, Document, Filter, FindOptions, Group};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::Product;
use crate::error::{CommerceError, CommerceResult};
use crate::ids::{SellerId, UserId};
use crate::money::Money;
use crate::validate;

/// Legal form of a seller's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessType {
    Individual,
    Partnership,
    PrivateLimited,
    PublicLimited,
}

/// Payout bank account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    pub account_number: String,
    #[serde(rename = "IFSCCode")]
    pub ifsc_code: String,
    pub bank_name: String,
}

impl BankDetails {
    fn validate(&mut self) -> CommerceResult<()> {
        self.account_number = validate::required(&self.account_number, "Please add account number")?;
        if !validate::is_account_number(&self.account_number) {
            return Err(CommerceError::invalid(format!(
                "{} is not a valid account number!",
                self.account_number
            )));
        }
        self.ifsc_code = validate::required(&self.ifsc_code, "Please add IFSC code")?;
        if !validate::is_ifsc(&self.ifsc_code) {
            return Err(CommerceError::invalid(format!(
                "{} is not a valid IFSC code!",
                self.ifsc_code
            )));
        }
        self.bank_name = validate::required(&self.bank_name, "Please add bank name")?;
        Ok(())
    }
}

/// A seller profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Seller {
    #[serde(rename = "_id")]
    pub id: SellerId,
    pub user_id: UserId,
    pub business_name: String,
    pub business_type: BusinessType,
    #[serde(rename = "GSTIN")]
    pub gstin: String,
    #[serde(rename = "PAN")]
    pub pan: String,
    pub bank_details: BankDetails,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub total_sales: Money,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Document for Seller {
    const COLLECTION: &'static str = "sellers";

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn unique_keys() -> &'static [&'static [&'static str]] {
        &[&["userId"], &["GSTIN"], &["PAN"]]
    }
}

impl Seller {
    fn validate(&mut self) -> CommerceResult<()> {
        self.business_name = validate::required(&self.business_name, "Please add a business name")?;
        self.gstin = validate::required(&self.gstin, "Please add GSTIN")?;
        if !validate::is_gstin(&self.gstin) {
            return Err(CommerceError::invalid(format!("{} is not a valid GSTIN!", self.gstin)));
        }
        self.pan = validate::required(&self.pan, "Please add PAN")?;
        if !validate::is_pan(&self.pan) {
            return Err(CommerceError::invalid(format!("{} is not a valid PAN!", self.pan)));
        }
        self.bank_details.validate()?;
        if !(0.0..=5.0).contains(&self.rating) {
            return Err(CommerceError::invalid("Rating must be between 0 and 5"));
        }
        if self.total_sales.is_negative() {
            return Err(CommerceError::invalid("Total sales cannot be negative"));
        }
        Ok(())
    }

    /// Whether `user` owns this profile.
    pub fn is_owned_by(&self, user: &str) -> bool {
        self.user_id.as_str() == user
    }
}

/// Payload for registering as a seller.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSeller {
    pub business_name: String,
    pub business_type: BusinessType,
    #[serde(rename = "GSTIN")]
    pub gstin: String,
    #[serde(rename = "PAN")]
    pub pan: String,
    pub bank_details: BankDetails,
}

/// Partial update of a seller profile. Ownership, approval, rating and
/// sales figures are not writable through it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SellerUpdate {
    pub business_name: Option<String>,
    pub business_type: Option<BusinessType>,
    #[serde(rename = "GSTIN")]
    pub gstin: Option<String>,
    #[serde(rename = "PAN")]
    pub pan: Option<String>,
    pub bank_details: Option<BankDetails>,
}

/// Dashboard figures for one seller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SellerStats {
    pub total_sales: Money,
    pub rating: f64,
    pub total_products: u64,
    pub total_stock: i64,
    pub average_rating: f64,
}

/// Seller storage and statistics.
#[derive(Clone)]
pub struct SellerService {
    db: Db,
}

impl SellerService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Register `user` as a seller. One profile per user.
    pub async fn create(&self, user: UserId, input: NewSeller) -> CommerceResult<Seller> {
        if self.find_by_user(user.as_str()).await?.is_some() {
            return Err(CommerceError::invalid("User already has a seller profile"));
        }

        let now = crate::timestamp::now();
        let mut seller = Seller {
            id: SellerId::generate(),
            user_id: user,
            business_name: input.business_name,
            business_type: input.business_type,
            gstin: input.gstin,
            pan: input.pan,
            bank_details: input.bank_details,
            rating: 0.0,
            total_sales: Money::zero(),
            is_approved: false,
            created_at: now,
            updated_at: now,
        };
        seller.validate()?;
        self.db.insert(&seller).await?;

        info!(seller = %seller.id, user = %seller.user_id, "Seller profile created");
        Ok(seller)
    }

    pub async fn get(&self, id: &str) -> CommerceResult<Seller> {
        self.db
            .find_by_id::<Seller>(id)
            .await?
            .ok_or_else(|| CommerceError::not_found("Seller", id))
    }

    pub async fn find_by_user(&self, user: &str) -> CommerceResult<Option<Seller>> {
        Ok(self
            .db
            .find_one::<Seller>(&Filter::new().eq("userId", user))
            .await?)
    }

    /// All sellers, newest first.
    pub async fn list(&self) -> CommerceResult<Vec<Seller>> {
        Ok(self
            .db
            .find(&Filter::new(), &FindOptions::new().sort_by("-createdAt,-_id"))
            .await?)
    }

    pub async fn update(&self, id: &str, update: SellerUpdate) -> CommerceResult<Seller> {
        self.db
            .update::<Seller, _, CommerceError, _>(id, |seller| {
                if let Some(name) = update.business_name {
                    seller.business_name = name;
                }
                if let Some(kind) = update.business_type {
                    seller.business_type = kind;
                }
                if let Some(gstin) = update.gstin {
                    seller.gstin = gstin;
                }
                if let Some(pan) = update.pan {
                    seller.pan = pan;
                }
                if let Some(bank) = update.bank_details {
                    seller.bank_details = bank;
                }
                seller.validate()?;
                seller.updated_at = crate::timestamp::now();
                Ok(seller.clone())
            })
            .await?
            .ok_or_else(|| CommerceError::not_found("Seller", id))
    }

    /// Mark a seller approved to list products.
    pub async fn approve(&self, id: &str) -> CommerceResult<Seller> {
        let seller = self
            .db
            .update::<Seller, _, CommerceError, _>(id, |seller| {
                seller.is_approved = true;
                seller.updated_at = crate::timestamp::now();
                Ok(seller.clone())
            })
            .await?
            .ok_or_else(|| CommerceError::not_found("Seller", id))?;
        info!(seller = id, "Seller approved");
        Ok(seller)
    }

    /// Add completed sales to a seller's running total.
    pub async fn record_sale(&self, id: &str, amount: Money) -> CommerceResult<()> {
        self.db
            .update::<Seller, _, CommerceError, _>(id, |seller| {
                seller.total_sales = seller
                    .total_sales
                    .checked_add(amount)
                    .ok_or(CommerceError::Overflow)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Sales totals plus an aggregation over the seller's products.
    pub async fn stats(&self, seller: &Seller) -> CommerceResult<SellerStats> {
        let group = self
            .db
            .aggregate::<Product>(
                &Filter::new().eq("seller", &seller.id),
                &Group::new()
                    .count("totalProducts")
                    .sum("totalStock", "stock")
                    .avg("averageRating", "ratings"),
            )
            .await?;

        let (total_products, total_stock, average_rating) = match group {
            Some(g) => (
                g["totalProducts"].as_u64().unwrap_or(0),
                g["totalStock"].as_i64().unwrap_or(0),
                g["averageRating"].as_f64().unwrap_or(0.0),
            ),
            None => (0, 0, 0.0),
        };

        Ok(SellerStats {
            total_sales: seller.total_sales,
            rating: seller.rating,
            total_products,
            total_stock,
            average_rating,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{NewProduct, ProductService};

    fn application() -> NewSeller {
        NewSeller {
            business_name: " Asha Handlooms ".into(),
            business_type: BusinessType::Individual,
            gstin: "27AAPFU0939F1ZV".into(),
            pan: "AAPFU0939F".into(),
            bank_details: BankDetails {
                account_number: "123456789012".into(),
                ifsc_code: "HDFC0001234".into(),
                bank_name: "HDFC Bank".into(),
            },
        }
    }

    #[tokio::test]
    async fn test_create_and_one_profile_per_user() {
        let service = SellerService::new(Db::in_memory());
        let user = UserId::generate();
        let seller = service.create(user.clone(), application()).await.unwrap();
        assert_eq!(seller.business_name, "Asha Handlooms");
        assert!(!seller.is_approved);
        assert!(seller.is_owned_by(user.as_str()));

        let err = service.create(user, application()).await.unwrap_err();
        assert_eq!(err.to_string(), "User already has a seller profile");
    }

    #[tokio::test]
    async fn test_tax_ids_are_unique_and_validated() {
        let service = SellerService::new(Db::in_memory());
        service.create(UserId::generate(), application()).await.unwrap();

        let err = service.create(UserId::generate(), application()).await.unwrap_err();
        assert!(matches!(err, CommerceError::Duplicate(_)));

        let mut bad = application();
        bad.bank_details.ifsc_code = "HDFC1001234".into();
        let err = service.create(UserId::generate(), bad).await.unwrap_err();
        assert_eq!(err.to_string(), "HDFC1001234 is not a valid IFSC code!");
    }

    #[tokio::test]
    async fn test_serialized_field_names() {
        let service = SellerService::new(Db::in_memory());
        let seller = service.create(UserId::generate(), application()).await.unwrap();
        let json = serde_json::to_value(&seller).unwrap();
        assert_eq!(json["GSTIN"], "27AAPFU0939F1ZV");
        assert_eq!(json["bankDetails"]["IFSCCode"], "HDFC0001234");
        assert_eq!(json["businessType"], "individual");
        assert_eq!(json["isApproved"], false);
    }

    #[tokio::test]
    async fn test_approve_and_stats() {
        let db = Db::in_memory();
        let service = SellerService::new(db.clone());
        let seller = service.create(UserId::generate(), application()).await.unwrap();

        let empty = service.stats(&seller).await.unwrap();
        assert_eq!(empty.total_products, 0);
        assert_eq!(empty.average_rating, 0.0);

        let products = ProductService::new(db);
        for stock in [4, 6] {
            products
                .create(
                    seller.id.clone(),
                    NewProduct {
                        name: "Saree".into(),
                        price: Some(Money::from_decimal(2500.0)),
                        description: "Cotton".into(),
                        category: "Clothing".into(),
                        stock: Some(stock),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }

        let approved = service.approve(seller.id.as_str()).await.unwrap();
        assert!(approved.is_approved);
        service
            .record_sale(seller.id.as_str(), Money::from_decimal(5000.0))
            .await
            .unwrap();

        let seller = service.get(seller.id.as_str()).await.unwrap();
        let stats = service.stats(&seller).await.unwrap();
        assert_eq!(stats.total_products, 2);
        assert_eq!(stats.total_stock, 10);
        assert_eq!(stats.total_sales, Money::from_decimal(5000.0));
    }
}
