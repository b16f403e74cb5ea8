use serde::{Deserialize, Serialize};

use crate::{
    categories::repo_types::{Category, CategoryPatch, NewCategory},
    error::AppError,
    web::ListFilter,
};

/// Category body, from a form post or JSON.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryForm {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl CategoryForm {
    fn trimmed_name(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }

    pub fn into_new(self) -> Result<NewCategory, AppError> {
        let name = self
            .trimmed_name()
            .ok_or_else(|| AppError::validation("Category name is required"))?;
        Ok(NewCategory {
            name,
            description: self.description,
        })
    }

    /// Fields left out of the body keep their stored value; a blank name is
    /// rejected.
    pub fn into_patch(self) -> Result<CategoryPatch, AppError> {
        let name = match &self.name {
            None => None,
            Some(_) => Some(
                self.trimmed_name()
                    .ok_or_else(|| AppError::validation("Category name cannot be empty"))?,
            ),
        };
        Ok(CategoryPatch {
            name,
            description: self.description,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryListView {
    pub category_list: Vec<Category>,
    pub is_admin: bool,
    pub search: String,
    pub sort_order: &'static str,
}

impl CategoryListView {
    pub fn new(category_list: Vec<Category>, is_admin: bool, filter: &ListFilter) -> Self {
        Self {
            category_list,
            is_admin,
            search: filter.search.clone().unwrap_or_default(),
            sort_order: filter.direction.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryEditView {
    pub category: Category,
}
