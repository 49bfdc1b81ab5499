use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::slug::fold_key;

/// A product category. Roots have no parent; children point at a root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(rename = "parentId", default)]
    #[ts(optional)]
    pub parent_id: Option<String>,
    #[serde(
        rename = "createdAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    pub created_at: Option<String>,
}

impl Category {
    pub fn root(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id: None,
            created_at: None,
        }
    }

    pub fn child(
        id: impl Into<String>,
        name: impl Into<String>,
        parent_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id: Some(parent_id.into()),
            created_at: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Payload handed to the authoritative store on create.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NewCategory {
    pub id: String,
    pub name: String,
    #[serde(rename = "parentId", default)]
    #[ts(optional)]
    pub parent_id: Option<String>,
}

impl From<NewCategory> for Category {
    fn from(value: NewCategory) -> Self {
        Self {
            id: value.id,
            name: value.name,
            parent_id: value.parent_id,
            created_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StockCard {
    pub id: String,
    pub barcode: String,
    pub name: String,
    #[serde(default)]
    #[ts(optional)]
    pub brand: Option<String>,
    pub unit: String,
    #[serde(rename = "categoryId", default)]
    #[ts(optional)]
    pub category_id: Option<String>,
    #[serde(default)]
    #[ts(optional)]
    pub description: Option<String>,
    #[serde(rename = "supplierId", default)]
    #[ts(optional)]
    pub supplier_id: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: String,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: String,
}

pub const DEFAULT_UNIT: &str = "ADET";

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

/// Editable stock card fields as submitted by the stock-card screens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StockCardDraft {
    pub barcode: String,
    pub name: String,
    #[serde(default)]
    #[ts(optional)]
    pub brand: Option<String>,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(rename = "categoryId", default)]
    #[ts(optional)]
    pub category_id: Option<String>,
    #[serde(default)]
    #[ts(optional)]
    pub description: Option<String>,
    #[serde(rename = "supplierId", default)]
    #[ts(optional)]
    pub supplier_id: Option<String>,
}

impl StockCardDraft {
    pub fn new(barcode: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            barcode: barcode.into(),
            name: name.into(),
            brand: None,
            unit: default_unit(),
            category_id: None,
            description: None,
            supplier_id: None,
        }
    }

    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }
}

/// A root category with its direct children, for hierarchical display.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CategoryNode {
    pub category: Category,
    pub children: Vec<Category>,
}

/// Root/children split of a flat category list.
///
/// Entries whose parent is missing or is itself a child are surfaced as
/// roots so stale data never disappears from the screen.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CategoryTree {
    pub roots: Vec<CategoryNode>,
}

impl CategoryTree {
    pub fn from_categories(categories: &[Category]) -> Self {
        let by_id: HashMap<&str, &Category> =
            categories.iter().map(|c| (c.id.as_str(), c)).collect();
        let attaches = |c: &Category| -> Option<String> {
            let parent = c.parent_id.as_deref()?;
            by_id
                .get(parent)
                .filter(|p| p.is_root())
                .map(|p| p.id.clone())
        };

        let mut roots: Vec<CategoryNode> = categories
            .iter()
            .filter(|c| attaches(c).is_none())
            .map(|c| CategoryNode {
                category: c.clone(),
                children: Vec::new(),
            })
            .collect();
        roots.sort_by_cached_key(|node| fold_key(&node.category.name));

        for child in categories.iter() {
            if let Some(parent) = attaches(child) {
                if let Some(node) = roots.iter_mut().find(|n| n.category.id == parent) {
                    node.children.push(child.clone());
                }
            }
        }
        for node in &mut roots {
            node.children.sort_by_cached_key(|c| fold_key(&c.name));
        }
        Self { roots }
    }

    pub fn roots(&self) -> impl Iterator<Item = &Category> {
        self.roots.iter().map(|node| &node.category)
    }

    pub fn children_of(&self, id: &str) -> &[Category] {
        self.roots
            .iter()
            .find(|node| node.category.id == id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Categories a new sub-category may hang under: real roots only.
    pub fn parent_options(&self) -> Vec<&Category> {
        self.roots().filter(|c| c.is_root()).collect()
    }

    pub fn find(&self, id: &str) -> Option<&Category> {
        self.roots.iter().find_map(|node| {
            if node.category.id == id {
                Some(&node.category)
            } else {
                node.children.iter().find(|c| c.id == id)
            }
        })
    }

    /// Display label, `"Gıda › Süt Ürünleri"` for children.
    pub fn label(&self, id: &str) -> Option<String> {
        for node in &self.roots {
            if node.category.id == id {
                return Some(node.category.name.clone());
            }
            if let Some(child) = node.children.iter().find(|c| c.id == id) {
                return Some(format!("{} › {}", node.category.name, child.name));
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.roots.iter().map(|node| 1 + node.children.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Ids removed when `id` is deleted: the category itself plus its direct children.
pub fn cascade_ids(categories: &[Category], id: &str) -> Vec<String> {
    categories
        .iter()
        .filter(|c| c.id == id || c.parent_id.as_deref() == Some(id))
        .map(|c| c.id.clone())
        .collect()
}
