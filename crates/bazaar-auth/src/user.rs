//! User accounts.

use std::str::FromStr;

use bazaar_commerce::ids::{SellerId, UserId};
use bazaar_commerce::order::{validate_all, Address};
use bazaar_commerce::validate;
use bazaar_db::{Db, Document, Filter, FindOptions};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AuthError, AuthResult};
use crate::password::PasswordHasher;

/// Avatar given to accounts that have not uploaded one.
pub const DEFAULT_AVATAR: &str = "https://i.ibb.co/4pDNDk1/avatar.png";

fn default_avatar() -> String {
    DEFAULT_AVATAR.to_string()
}

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular customer.
    #[default]
    User,
    /// Customer with a seller profile.
    Seller,
    /// Marketplace administrator.
    Admin,
}

impl Role {
    /// Get role as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "seller" => Ok(Role::Seller),
            "admin" => Ok(Role::Admin),
            other => Err(AuthError::Validation(format!("Invalid role: {}", other))),
        }
    }
}

/// A stored account. Never serialize this to clients; use [`UserProfile`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string; empty for accounts created through a provider.
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_avatar")]
    pub avatar: String,
    #[serde(default)]
    pub google_id: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    #[serde(default)]
    pub seller_profile: Option<SellerId>,
    #[serde(with = "bazaar_commerce::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bazaar_commerce::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Document for User {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn unique_keys() -> &'static [&'static [&'static str]] {
        &[&["email"], &["googleId"]]
    }
}

impl User {
    /// A fresh account with the default role and avatar.
    pub fn new(name: impl Into<String>, email: impl Into<String>, password_hash: String) -> Self {
        let now = bazaar_commerce::timestamp::now();
        Self {
            id: UserId::generate(),
            name: name.into(),
            email: email.into(),
            password: password_hash,
            avatar: default_avatar(),
            google_id: None,
            is_verified: false,
            role: Role::User,
            phone: None,
            addresses: Vec::new(),
            seller_profile: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail unless the user holds one of `roles`.
    pub fn require_role(&self, roles: &[Role]) -> AuthResult<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AuthError::InsufficientPermissions(self.role.to_string()))
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile::from(self)
    }
}

/// Public view of a user, without the password hash.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub role: Role,
    pub is_verified: bool,
    pub phone: Option<String>,
    pub addresses: Vec<Address>,
    pub seller_profile: Option<SellerId>,
    #[serde(with = "bazaar_commerce::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
            role: user.role,
            is_verified: user.is_verified,
            phone: user.phone.clone(),
            addresses: user.addresses.clone(),
            seller_profile: user.seller_profile.clone(),
            created_at: user.created_at,
        }
    }
}

/// Sign-up payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Self-service profile edit.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub name: String,
    pub phone: Option<String>,
    pub addresses: Option<Vec<Address>>,
}

fn normalize_email(email: &str) -> AuthResult<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AuthError::Validation("Please enter your email".into()));
    }
    if !validate::is_email(&email) {
        return Err(AuthError::Validation("Please enter a valid email".into()));
    }
    Ok(email)
}

fn required_name(name: &str) -> AuthResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::Validation("Please enter your name".into()));
    }
    Ok(name.to_string())
}

/// Account storage and credential checks.
#[derive(Clone)]
pub struct UserService {
    db: Db,
    hasher: PasswordHasher,
}

impl UserService {
    pub fn new(db: Db) -> Self {
        Self {
            db,
            hasher: PasswordHasher::default(),
        }
    }

    pub async fn register(&self, input: Registration) -> AuthResult<User> {
        let name = required_name(&input.name)?;
        let email = normalize_email(&input.email)?;
        PasswordHasher::validate_password(&input.password)?;

        if self.find_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let user = User::new(name, email, self.hasher.hash(&input.password)?);
        self.db.insert(&user).await.map_err(|e| {
            if e.is_duplicate() {
                AuthError::UserAlreadyExists
            } else {
                e.into()
            }
        })?;

        info!(user = %user.id, "User registered");
        Ok(user)
    }

    /// Check an email and password pair.
    pub async fn authenticate(&self, email: &str, password: &str) -> AuthResult<User> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "Please enter email & password".into(),
            ));
        }
        let user = self
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if user.password.is_empty() || !self.hasher.verify(password, &user.password)? {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user)
    }

    pub async fn get(&self, id: &str) -> AuthResult<User> {
        self.db
            .find_by_id::<User>(id)
            .await?
            .ok_or_else(|| AuthError::UserNotFound(id.to_string()))
    }

    pub async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        Ok(self
            .db
            .find_one::<User>(&Filter::new().eq("email", email.trim().to_lowercase()))
            .await?)
    }

    /// All users, newest first.
    pub async fn list(&self) -> AuthResult<Vec<User>> {
        Ok(self
            .db
            .find(&Filter::new(), &FindOptions::new().sort_by("-createdAt,-_id"))
            .await?)
    }

    async fn modify<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut User) -> AuthResult<R>,
    ) -> AuthResult<R> {
        self.db
            .update::<User, _, AuthError, _>(id, |user| {
                let out = f(user)?;
                user.updated_at = bazaar_commerce::timestamp::now();
                Ok(out)
            })
            .await?
            .ok_or_else(|| AuthError::UserNotFound(id.to_string()))
    }

    pub async fn update_profile(&self, id: &str, update: ProfileUpdate) -> AuthResult<User> {
        let name = required_name(&update.name)?;
        let mut addresses = update.addresses;
        if let Some(list) = addresses.as_mut() {
            validate_all(list)?;
        }
        let phone = update
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        self.modify(id, |user| {
            user.name = name;
            if phone.is_some() {
                user.phone = phone;
            }
            if let Some(addresses) = addresses {
                user.addresses = addresses;
            }
            Ok(user.clone())
        })
        .await
    }

    /// Point the avatar at `url`. Returns the user and the avatar it replaced.
    pub async fn set_avatar(&self, id: &str, url: String) -> AuthResult<(User, String)> {
        self.modify(id, |user| {
            let previous = std::mem::replace(&mut user.avatar, url);
            Ok((user.clone(), previous))
        })
        .await
    }

    /// Go back to the default avatar. Returns the user and the removed avatar.
    pub async fn reset_avatar(&self, id: &str) -> AuthResult<(User, String)> {
        self.set_avatar(id, default_avatar()).await
    }

    pub async fn set_role(&self, id: &str, role: Role) -> AuthResult<User> {
        let user = self
            .modify(id, |user| {
                user.role = role;
                Ok(user.clone())
            })
            .await?;
        info!(user = id, role = %role, "User role changed");
        Ok(user)
    }

    /// Link a seller profile. Non-admins become sellers.
    pub async fn attach_seller(&self, id: &str, seller: SellerId) -> AuthResult<User> {
        self.modify(id, |user| {
            user.seller_profile = Some(seller);
            if user.role != Role::Admin {
                user.role = Role::Seller;
            }
            Ok(user.clone())
        })
        .await
    }

    pub async fn delete(&self, id: &str) -> AuthResult<User> {
        let user = self.get(id).await?;
        self.db.delete_by_id::<User>(id).await?;
        info!(user = id, "User deleted");
        Ok(user)
    }

    /// Change a password after checking the current one.
    pub async fn change_password(&self, id: &str, old: &str, new: &str) -> AuthResult<User> {
        let user = self.get(id).await?;
        if user.password.is_empty() || !self.hasher.verify(old, &user.password)? {
            return Err(AuthError::IncorrectPassword);
        }
        self.set_password(id, new).await
    }

    /// Replace a password without checking the current one (reset flow).
    pub async fn set_password(&self, id: &str, new: &str) -> AuthResult<User> {
        PasswordHasher::validate_password(new)?;
        let hash = self.hasher.hash(new)?;
        self.modify(id, |user| {
            user.password = hash;
            Ok(user.clone())
        })
        .await
    }

    /// Create an admin account, or promote the existing account with that
    /// email.
    pub async fn ensure_admin(&self, input: Registration) -> AuthResult<User> {
        let email = normalize_email(&input.email)?;
        match self.find_by_email(&email).await? {
            Some(existing) => self.set_role(existing.id.as_str(), Role::Admin).await,
            None => {
                let user = self.register(input).await?;
                self.set_role(user.id.as_str(), Role::Admin).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(email: &str) -> Registration {
        Registration {
            name: "Kiran".into(),
            email: email.into(),
            password: "sunshine42".into(),
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let service = UserService::new(Db::in_memory());
        let user = service.register(signup("  Kiran@Example.com ")).await.unwrap();
        assert_eq!(user.email, "kiran@example.com");
        assert_eq!(user.avatar, DEFAULT_AVATAR);
        assert_eq!(user.role, Role::User);
        assert_ne!(user.password, "sunshine42");

        let logged_in = service
            .authenticate("KIRAN@example.com", "sunshine42")
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);

        assert!(matches!(
            service.authenticate("kiran@example.com", "wrong-pass1").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            service.authenticate("nobody@example.com", "sunshine42").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let service = UserService::new(Db::in_memory());
        service.register(signup("dup@example.com")).await.unwrap();
        assert!(matches!(
            service.register(signup("DUP@example.com")).await,
            Err(AuthError::UserAlreadyExists)
        ));

        assert!(service.register(signup("not-an-email")).await.is_err());

        let mut weak = signup("weak@example.com");
        weak.password = "password".into();
        assert!(matches!(
            service.register(weak).await,
            Err(AuthError::WeakPassword(_))
        ));

        let mut nameless = signup("nameless@example.com");
        nameless.name = "  ".into();
        assert!(service.register(nameless).await.is_err());
    }

    #[tokio::test]
    async fn test_profile_update_validates_addresses() {
        let service = UserService::new(Db::in_memory());
        let user = service.register(signup("addr@example.com")).await.unwrap();

        let incomplete = Address {
            name: "Kiran".into(),
            city: "Pune".into(),
            ..Default::default()
        };
        let err = service
            .update_profile(
                user.id.as_str(),
                ProfileUpdate {
                    name: "Kiran R".into(),
                    phone: None,
                    addresses: Some(vec![incomplete]),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "All address fields are required");

        let updated = service
            .update_profile(
                user.id.as_str(),
                ProfileUpdate {
                    name: "Kiran R".into(),
                    phone: Some(" 9000000001 ".into()),
                    addresses: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Kiran R");
        assert_eq!(updated.phone.as_deref(), Some("9000000001"));
    }

    #[tokio::test]
    async fn test_change_password_and_admin() {
        let service = UserService::new(Db::in_memory());
        let user = service.register(signup("pw@example.com")).await.unwrap();
        let id = user.id.as_str();

        assert!(matches!(
            service.change_password(id, "nope12345", "newpass123").await,
            Err(AuthError::IncorrectPassword)
        ));
        service
            .change_password(id, "sunshine42", "newpass123")
            .await
            .unwrap();
        assert!(service.authenticate("pw@example.com", "newpass123").await.is_ok());

        let admin = service.ensure_admin(signup("pw@example.com")).await.unwrap();
        assert_eq!(admin.id, user.id);
        assert!(admin.is_admin());
        assert!(admin.require_role(&[Role::Admin]).is_ok());
        assert_eq!(
            user.require_role(&[Role::Admin]).unwrap_err().to_string(),
            "Role (user) is not allowed to access this resource"
        );
    }

    #[tokio::test]
    async fn test_attach_seller_promotes_role() {
        let service = UserService::new(Db::in_memory());
        let user = service.register(signup("seller@example.com")).await.unwrap();
        let seller = SellerId::generate();
        let updated = service
            .attach_seller(user.id.as_str(), seller.clone())
            .await
            .unwrap();
        assert_eq!(updated.role, Role::Seller);
        assert_eq!(updated.seller_profile, Some(seller));
    }
}
