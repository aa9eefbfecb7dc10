//! Category types for product organization.
//!
//! Categories form a tree through an optional `parentCategory` link.

use std::collections::HashMap;

use bazaar_db::{Db, Document, Filter, FindOptions};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::Product;
use crate::error::{CommerceError, CommerceResult};
use crate::ids::CategoryId;
use crate::validate;

pub const MAX_NAME_LEN: usize = 50;
pub const MAX_DESCRIPTION_LEN: usize = 500;
/// Most categories returned by the featured listing.
pub const FEATURED_LIMIT: usize = 10;

/// A product category in the catalog hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: CategoryId,
    pub name: String,
    /// URL-friendly slug, derived from the name on every save.
    pub slug: String,
    /// Parent category (None for root categories).
    #[serde(default)]
    pub parent_category: Option<CategoryId>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Document for Category {
    const COLLECTION: &'static str = "categories";

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn unique_keys() -> &'static [&'static [&'static str]] {
        &[&["name"], &["slug"]]
    }
}

impl Category {
    /// Check if this is a root category.
    pub fn is_root(&self) -> bool {
        self.parent_category.is_none()
    }

    /// Validate and refresh the derived fields before a save.
    fn prepare(&mut self) -> CommerceResult<()> {
        self.name = validate::required(&self.name, "Please add a category name")?;
        validate::max_len(&self.name, MAX_NAME_LEN, "Category name")?;
        if let Some(description) = &self.description {
            validate::max_len(description, MAX_DESCRIPTION_LEN, "Description")?;
        }
        self.slug = validate::slugify(&self.name);
        self.updated_at = crate::timestamp::now();
        Ok(())
    }
}

/// A category with its nested subcategories.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub subcategories: Vec<CategoryNode>,
}

/// Build the category forest from a flat list.
///
/// Roots are categories without a parent. Input order is kept among
/// siblings. Categories whose parent chain never reaches a root are left
/// out.
pub fn build_hierarchy(categories: Vec<Category>) -> Vec<CategoryNode> {
    let mut children: HashMap<Option<CategoryId>, Vec<Category>> = HashMap::new();
    for category in categories {
        children
            .entry(category.parent_category.clone())
            .or_default()
            .push(category);
    }

    fn attach(
        parent: Option<CategoryId>,
        children: &mut HashMap<Option<CategoryId>, Vec<Category>>,
    ) -> Vec<CategoryNode> {
        let Some(level) = children.remove(&parent) else {
            return Vec::new();
        };
        level
            .into_iter()
            .map(|category| {
                let subcategories = attach(Some(category.id.clone()), children);
                CategoryNode {
                    category,
                    subcategories,
                }
            })
            .collect()
    }

    attach(None, &mut children)
}

/// Payload for creating a category.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    pub parent_category: Option<CategoryId>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_featured: bool,
}

/// Partial update of a category. `parentCategory: null` detaches it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CategoryUpdate {
    pub name: Option<String>,
    #[serde(deserialize_with = "crate::patch::double_option")]
    pub parent_category: Option<Option<CategoryId>>,
    #[serde(deserialize_with = "crate::patch::double_option")]
    pub description: Option<Option<String>>,
    #[serde(deserialize_with = "crate::patch::double_option")]
    pub image: Option<Option<String>>,
    pub is_featured: Option<bool>,
}

/// Category storage and tree operations.
#[derive(Clone)]
pub struct CategoryService {
    db: Db,
}

impl CategoryService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// All categories sorted by name.
    pub async fn list(&self) -> CommerceResult<Vec<Category>> {
        Ok(self
            .db
            .find(&Filter::new(), &FindOptions::new().sort_by("name"))
            .await?)
    }

    pub async fn get(&self, id: &str) -> CommerceResult<Category> {
        self.db
            .find_by_id::<Category>(id)
            .await?
            .ok_or_else(|| CommerceError::not_found("Category", id))
    }

    /// Create a category; a given parent must exist.
    pub async fn create(&self, input: NewCategory) -> CommerceResult<Category> {
        if let Some(parent) = &input.parent_category {
            self.require_parent(parent).await?;
        }
        self.add(input).await
    }

    /// Create a category without checking the parent link.
    pub async fn add(&self, input: NewCategory) -> CommerceResult<Category> {
        let now = crate::timestamp::now();
        let mut category = Category {
            id: CategoryId::generate(),
            name: input.name,
            slug: String::new(),
            parent_category: input.parent_category,
            description: input.description,
            image: input.image,
            is_featured: input.is_featured,
            created_at: now,
            updated_at: now,
        };
        category.prepare()?;
        self.db.insert(&category).await?;

        info!(category = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// Apply a partial update.
    ///
    /// A category cannot become its own parent or a descendant of itself,
    /// and a new parent must exist.
    pub async fn update(&self, id: &str, update: CategoryUpdate) -> CommerceResult<Category> {
        self.get(id).await?;

        if let Some(Some(parent)) = &update.parent_category {
            if parent.as_str() == id {
                return Err(CommerceError::invalid("Category cannot be its own parent"));
            }
            self.require_parent(parent).await?;
            if self.is_descendant(parent, id).await? {
                return Err(CommerceError::invalid(
                    "Category cannot be moved under one of its subcategories",
                ));
            }
        }

        self.db
            .update::<Category, _, CommerceError, _>(id, |category| {
                if let Some(name) = update.name {
                    category.name = name;
                }
                if let Some(parent) = update.parent_category {
                    category.parent_category = parent;
                }
                if let Some(description) = update.description {
                    category.description = description;
                }
                if let Some(image) = update.image {
                    category.image = image;
                }
                if let Some(featured) = update.is_featured {
                    category.is_featured = featured;
                }
                category.prepare()?;
                Ok(category.clone())
            })
            .await?
            .ok_or_else(|| CommerceError::not_found("Category", id))
    }

    /// Delete a category that has neither products nor subcategories.
    pub async fn delete(&self, id: &str) -> CommerceResult<()> {
        let category = self.get(id).await?;

        let by_id = self
            .db
            .exists::<Product>(&Filter::new().eq("category", id))
            .await?;
        let by_name = self
            .db
            .exists::<Product>(&Filter::new().eq("category", category.name.as_str()))
            .await?;
        if by_id || by_name {
            return Err(CommerceError::invalid("Cannot delete category with products"));
        }

        let has_children = self
            .db
            .exists::<Category>(&Filter::new().eq("parentCategory", id))
            .await?;
        if has_children {
            return Err(CommerceError::invalid(
                "Cannot delete category with subcategories",
            ));
        }

        self.db.delete_by_id::<Category>(id).await?;
        info!(category = id, "Category deleted");
        Ok(())
    }

    /// The full category tree, siblings sorted by name.
    pub async fn hierarchy(&self) -> CommerceResult<Vec<CategoryNode>> {
        Ok(build_hierarchy(self.list().await?))
    }

    /// Featured categories sorted by name, at most [`FEATURED_LIMIT`].
    pub async fn featured(&self) -> CommerceResult<Vec<Category>> {
        Ok(self
            .db
            .find(
                &Filter::new().eq("isFeatured", true),
                &FindOptions::new().sort_by("name").limit(FEATURED_LIMIT),
            )
            .await?)
    }

    async fn require_parent(&self, parent: &CategoryId) -> CommerceResult<()> {
        let exists = self
            .db
            .find_by_id::<Category>(parent.as_str())
            .await?
            .is_some();
        if !exists {
            return Err(CommerceError::NotFound {
                entity: "Parent category",
                id: parent.to_string(),
            });
        }
        Ok(())
    }

    /// Whether `candidate` sits somewhere below `ancestor`.
    async fn is_descendant(&self, candidate: &CategoryId, ancestor: &str) -> CommerceResult<bool> {
        let mut current = Some(candidate.clone());
        let mut hops = 0usize;
        while let Some(id) = current {
            if id.as_str() == ancestor {
                return Ok(true);
            }
            hops += 1;
            if hops > 1024 {
                break;
            }
            current = self
                .db
                .find_by_id::<Category>(id.as_str())
                .await?
                .and_then(|c| c.parent_category);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> NewCategory {
        NewCategory {
            name: name.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_slug_and_unique_name() {
        let service = CategoryService::new(Db::in_memory());
        let category = service.create(named(" Home & Kitchen ")).await.unwrap();
        assert_eq!(category.name, "Home & Kitchen");
        assert_eq!(category.slug, "home--kitchen");

        let err = service.create(named("Home & Kitchen")).await.unwrap_err();
        assert!(matches!(err, CommerceError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_create_with_missing_parent() {
        let service = CategoryService::new(Db::in_memory());
        let mut input = named("Phones");
        input.parent_category = Some(CategoryId::generate());
        let err = service.create(input.clone()).await.unwrap_err();
        assert!(matches!(err, CommerceError::NotFound { .. }));

        // `add` skips the parent check.
        assert!(service.add(input).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_rejects_self_and_cycles() {
        let service = CategoryService::new(Db::in_memory());
        let root = service.create(named("Electronics")).await.unwrap();
        let mut child = named("Phones");
        child.parent_category = Some(root.id.clone());
        let child = service.create(child).await.unwrap();

        let own = CategoryUpdate {
            parent_category: Some(Some(root.id.clone())),
            ..Default::default()
        };
        let err = service.update(root.id.as_str(), own).await.unwrap_err();
        assert_eq!(err.to_string(), "Category cannot be its own parent");

        let cycle = CategoryUpdate {
            parent_category: Some(Some(child.id.clone())),
            ..Default::default()
        };
        assert!(service.update(root.id.as_str(), cycle).await.is_err());

        let rename = CategoryUpdate {
            name: Some("Mobile Phones".into()),
            parent_category: Some(None),
            ..Default::default()
        };
        let updated = service.update(child.id.as_str(), rename).await.unwrap();
        assert_eq!(updated.slug, "mobile-phones");
        assert!(updated.is_root());
    }

    #[tokio::test]
    async fn test_delete_blocked_by_subcategories() {
        let service = CategoryService::new(Db::in_memory());
        let root = service.create(named("Books")).await.unwrap();
        let mut child = named("Fiction");
        child.parent_category = Some(root.id.clone());
        let child = service.create(child).await.unwrap();

        let err = service.delete(root.id.as_str()).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot delete category with subcategories");

        service.delete(child.id.as_str()).await.unwrap();
        service.delete(root.id.as_str()).await.unwrap();
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hierarchy_and_featured() {
        let service = CategoryService::new(Db::in_memory());
        let root = service.create(named("Electronics")).await.unwrap();
        for name in ["Tablets", "Phones"] {
            let mut child = named(name);
            child.parent_category = Some(root.id.clone());
            child.is_featured = true;
            service.create(child).await.unwrap();
        }
        service.create(named("Books")).await.unwrap();

        let tree = service.hierarchy().await.unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].category.name, "Books");
        let names: Vec<&str> = tree[1]
            .subcategories
            .iter()
            .map(|n| n.category.name.as_str())
            .collect();
        assert_eq!(names, vec!["Phones", "Tablets"]);

        let featured = service.featured().await.unwrap();
        assert_eq!(featured.len(), 2);
        assert_eq!(featured[0].name, "Phones");
    }
}
