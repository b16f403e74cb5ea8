use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;

/// Raw list query string: `?search=&category=&sortBy=&sortOrder=`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Name,
    Price,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "name" => Some(Self::Name),
            "price" => Some(Self::Price),
            "createdAt" => Some(Self::CreatedAt),
            "updatedAt" => Some(Self::UpdatedAt),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Price => "price",
            Self::CreatedAt => "createdAt",
            Self::UpdatedAt => "updatedAt",
        }
    }

    /// SQL sort key; `qualifier` is a table alias like `"p."` or `""`.
    /// Names sort case-insensitively.
    pub fn order_expr(self, qualifier: &str) -> String {
        match self {
            Self::Name => format!("lower({qualifier}name)"),
            Self::Price => format!("{qualifier}price"),
            Self::CreatedAt => format!("{qualifier}created_at"),
            Self::UpdatedAt => format!("{qualifier}updated_at"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Validated list query handed to the stores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub search: Option<String>,
    pub category: Option<Uuid>,
    pub sort: SortField,
    pub direction: SortDirection,
}

impl ListFilter {
    /// `ILIKE` pattern for the search term with `%`, `_` and `\` escaped.
    pub fn like_pattern(&self) -> Option<String> {
        self.search.as_deref().map(|term| {
            let mut escaped = String::with_capacity(term.len() + 2);
            escaped.push('%');
            for ch in term.chars() {
                if matches!(ch, '%' | '_' | '\\') {
                    escaped.push('\\');
                }
                escaped.push(ch);
            }
            escaped.push('%');
            escaped
        })
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.search
            .as_deref()
            .map_or(true, |term| name.to_lowercase().contains(&term.to_lowercase()))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ListParams {
    pub fn product_filter(&self) -> Result<ListFilter, AppError> {
        let category = non_blank(&self.category)
            .map(|id| {
                Uuid::parse_str(id).map_err(|_| AppError::validation("Invalid category id"))
            })
            .transpose()?;
        self.filter_with(category, &[
            SortField::Name,
            SortField::Price,
            SortField::CreatedAt,
            SortField::UpdatedAt,
        ])
    }

    pub fn category_filter(&self) -> Result<ListFilter, AppError> {
        self.filter_with(None, &[SortField::Name])
    }

    fn filter_with(
        &self,
        category: Option<Uuid>,
        sortable: &[SortField],
    ) -> Result<ListFilter, AppError> {
        let sort = match non_blank(&self.sort_by) {
            None => SortField::Name,
            Some(raw) => SortField::parse(raw)
                .filter(|field| sortable.contains(field))
                .ok_or_else(|| AppError::validation(format!("Cannot sort by '{raw}'")))?,
        };
        let direction = match non_blank(&self.sort_order) {
            Some("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        };

        Ok(ListFilter {
            search: non_blank(&self.search).map(str::to_string),
            category,
            sort,
            direction,
        })
    }
}
