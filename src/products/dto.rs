use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header,
    Form, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    categories::repo_types::Category,
    error::AppError,
    images::upload::{multipart_error, read_image_field, ImageUpload, IMAGE_FIELD},
    products::repo_types::{NewProduct, Product, ProductPatch},
    web::{payload::has_json_body, ListFilter},
};

/// Price as sent by a client: a JSON number, or text from a form field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(f64),
    Text(String),
}

impl PriceInput {
    /// `Ok(None)` for blank text.
    fn parse(&self) -> Result<Option<f64>, AppError> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(t) if t.trim().is_empty() => return Ok(None),
            Self::Text(t) => t
                .trim()
                .parse::<f64>()
                .map_err(|_| AppError::validation("Price must be a number"))?,
        };
        if value.is_finite() {
            Ok(Some(value))
        } else {
            Err(AppError::validation("Price must be a number"))
        }
    }
}

/// Product fields from any of the accepted body encodings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFields {
    pub name: Option<String>,
    pub price: Option<PriceInput>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// A product write as received: fields plus at most one uploaded image.
/// The image is held in memory until the fields have been validated.
#[derive(Debug, Default)]
pub struct ProductSubmission {
    pub fields: ProductFields,
    pub image: Option<ImageUpload>,
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"))
}

#[async_trait]
impl<S> FromRequest<S> for ProductSubmission
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_multipart(&req) {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            return read_multipart(multipart).await;
        }

        let fields = if has_json_body(&req) {
            let Json(fields) = Json::<ProductFields>::from_request(req, state)
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            fields
        } else {
            let Form(fields) = Form::<ProductFields>::from_request(req, state)
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            fields
        };
        Ok(Self { fields, image: None })
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<ProductSubmission, AppError> {
    let mut out = ProductSubmission::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == IMAGE_FIELD {
            let has_file = field.file_name().is_some_and(|f| !f.is_empty());
            if has_file && out.image.is_some() {
                return Err(AppError::validation("Unexpected field"));
            }
            if let Some(upload) = read_image_field(field).await? {
                out.image = Some(upload);
            }
            continue;
        }

        let slot = match name.as_str() {
            "name" => &mut out.fields.name,
            "category" => &mut out.fields.category,
            "description" => &mut out.fields.description,
            "imageUrl" => &mut out.fields.image_url,
            "price" => {
                let text = field.text().await.map_err(multipart_error)?;
                out.fields.price = Some(PriceInput::Text(text));
                continue;
            }
            _ => continue,
        };
        *slot = Some(field.text().await.map_err(multipart_error)?);
    }

    Ok(out)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

impl ProductFields {
    fn trimmed_name(&self) -> Option<String> {
        non_blank(self.name.as_deref())
    }

    fn parsed_price(&self) -> Result<Option<f64>, AppError> {
        self.price.as_ref().map_or(Ok(None), PriceInput::parse)
    }

    /// Blank means "no category".
    fn parsed_category(&self) -> Result<Option<Uuid>, AppError> {
        non_blank(self.category.as_deref())
            .map(|id| Uuid::parse_str(&id).map_err(|_| AppError::validation("Invalid category id")))
            .transpose()
    }

    /// Admin form create: name, price and category are all required. The
    /// returned `imageUrl` is the fallback when no file was uploaded.
    pub fn into_form_new(self) -> Result<(NewProduct, Option<String>), AppError> {
        let missing = || {
            AppError::validation("Missing required fields: name, price, and category are required")
        };
        let name = self.trimmed_name().ok_or_else(missing)?;
        let price = self.parsed_price()?.ok_or_else(missing)?;
        let category = self.parsed_category()?.ok_or_else(missing)?;
        Ok((
            NewProduct {
                name,
                price,
                image: None,
                category: Some(category),
                description: self.description,
            },
            self.image_url,
        ))
    }

    /// Admin form edit: validated like a create, then written as a full
    /// replacement of the text fields. The image is left to the caller.
    pub fn into_form_patch(self) -> Result<(ProductPatch, Option<String>), AppError> {
        let (input, image_url) = self.into_form_new()?;
        Ok((
            ProductPatch {
                name: Some(input.name),
                price: Some(input.price),
                image: None,
                category: input.category,
                description: Some(input.description.unwrap_or_default()),
            },
            image_url,
        ))
    }

    /// API create: name and price are required, category is optional.
    pub fn into_api_new(self) -> Result<(NewProduct, Option<String>), AppError> {
        let missing =
            || AppError::validation("Missing required fields: name and price are required");
        let name = self.trimmed_name().ok_or_else(missing)?;
        let price = self.parsed_price()?.ok_or_else(missing)?;
        let category = self.parsed_category()?;
        Ok((
            NewProduct {
                name,
                price,
                image: None,
                category,
                description: self.description,
            },
            self.image_url,
        ))
    }

    /// API update: only the supplied fields change.
    pub fn into_patch(self) -> Result<(ProductPatch, Option<String>), AppError> {
        let name = match &self.name {
            None => None,
            Some(_) => Some(
                self.trimmed_name()
                    .ok_or_else(|| AppError::validation("Product name cannot be empty"))?,
            ),
        };
        Ok((
            ProductPatch {
                name,
                price: self.parsed_price()?,
                image: None,
                category: self.parsed_category()?,
                description: self.description,
            },
            self.image_url,
        ))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListView {
    pub product_list: Vec<Product>,
    pub category_list: Vec<Category>,
    pub is_admin: bool,
    pub search: String,
    pub sort_by: &'static str,
    pub sort_order: &'static str,
    pub selected_category: String,
    pub success: Option<String>,
}

impl ProductListView {
    pub fn new(
        product_list: Vec<Product>,
        category_list: Vec<Category>,
        is_admin: bool,
        filter: &ListFilter,
        success: Option<String>,
    ) -> Self {
        Self {
            product_list,
            category_list,
            is_admin,
            search: filter.search.clone().unwrap_or_default(),
            sort_by: filter.sort.as_str(),
            sort_order: filter.direction.as_str(),
            selected_category: filter.category.map(|c| c.to_string()).unwrap_or_default(),
            success,
        }
    }
}

/// `?success=` flash shown after a redirect.
#[derive(Debug, Default, Deserialize)]
pub struct Flash {
    pub success: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFormView {
    pub category_list: Vec<Category>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductEditView {
    pub product: Product,
    pub category_list: Vec<Category>,
}
