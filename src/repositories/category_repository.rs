use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::Category;
use crate::slug;
use crate::store::Store;
use crate::utils::PageParams;

#[derive(Deserialize, Debug)]
pub struct CreateCategoryData {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct UpdateCategoryData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

pub async fn create_category(store: &Store, data: CreateCategoryData) -> Result<Category, ApiError> {
    let category = Category {
        id: Uuid::new_v4(),
        slug: slug::slugify(&data.name),
        name: data.name,
        description: data.description,
        created_at: Utc::now(),
    };
    store.insert_category(category.clone())?;
    Ok(category)
}

pub async fn get_category_by_id(store: &Store, category_id: Uuid) -> Option<Category> {
    store.get_category(category_id)
}

pub async fn get_all_categories(store: &Store, pagination: &PageParams) -> Vec<Category> {
    let mut categories = store.categories();
    categories.sort_by(|a, b| a.name.cmp(&b.name));
    categories
        .into_iter()
        .skip(pagination.offset() as usize)
        .take(pagination.limit() as usize)
        .collect()
}

/// Updates name and/or description. A name change re-derives the slug.
pub async fn update_category(
    store: &Store,
    category_id: Uuid,
    data: UpdateCategoryData,
) -> Result<Option<Category>, ApiError> {
    let Some(mut category) = store.get_category(category_id) else {
        return Ok(None);
    };
    if let Some(name) = data.name {
        category.slug = slug::slugify(&name);
        category.name = name;
    }
    if let Some(description) = data.description {
        category.description = Some(description);
    }
    store.replace_category(category.clone())?;
    Ok(Some(category))
}

pub async fn delete_category(store: &Store, category_id: Uuid) -> bool {
    store.remove_category(category_id).is_some()
}
