//! In-memory fakes and request helpers for router-level tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use bytes::Bytes;
use time::OffsetDateTime;
use tower::ServiceExt;
use tower_sessions::MemoryStore;
use uuid::Uuid;

use crate::{
    app::{build_app, SESSION_COOKIE},
    auth::{
        password::hash_password,
        repo::UserStore,
        repo_types::{Role, User},
    },
    categories::{
        repo::CategoryStore,
        repo_types::{Category, CategoryPatch, NewCategory},
    },
    config::AppConfig,
    products::{
        repo::ProductStore,
        repo_types::{NewProduct, Product, ProductPatch},
    },
    state::AppState,
    storage::{unique_file_name, ImageStorage},
    web::{ListFilter, SortDirection, SortField},
};

/// One-shot injected failure shared by the fake stores.
#[derive(Default)]
struct Failure(Mutex<Option<String>>);

impl Failure {
    fn arm(&self, msg: &str) {
        *self.0.lock().unwrap() = Some(msg.to_string());
    }

    fn check(&self) -> anyhow::Result<()> {
        match self.0.lock().unwrap().take() {
            Some(msg) => Err(anyhow::anyhow!(msg)),
            None => Ok(()),
        }
    }
}

fn directed(ord: std::cmp::Ordering, direction: SortDirection) -> std::cmp::Ordering {
    match direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub async fn seed(&self, username: &str, password: &str, role: Role) -> User {
        let hash = hash_password(password).await.unwrap();
        self.create(username, &hash, role).await.unwrap().unwrap()
    }

    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn create(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> anyhow::Result<Option<User>> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.username == username) {
            return Ok(None);
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(Some(user))
    }
}

#[derive(Default)]
pub struct MemoryCategoryStore {
    rows: Mutex<Vec<Category>>,
    failure: Failure,
}

impl MemoryCategoryStore {
    pub fn seed(&self, name: &str, description: Option<&str>) -> Category {
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.map(str::to_string),
        };
        self.rows.lock().unwrap().push(category.clone());
        category
    }

    pub fn find(&self, id: Uuid) -> Option<Category> {
        self.rows.lock().unwrap().iter().find(|c| c.id == id).cloned()
    }

    /// Deletes behind the API's back, leaving product references dangling.
    pub fn remove(&self, id: Uuid) {
        self.rows.lock().unwrap().retain(|c| c.id != id);
    }

    pub fn all(&self) -> Vec<Category> {
        self.rows.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn fail_next(&self, msg: &str) {
        self.failure.arm(msg);
    }
}

#[async_trait]
impl CategoryStore for MemoryCategoryStore {
    async fn list(&self, filter: &ListFilter) -> anyhow::Result<Vec<Category>> {
        self.failure.check()?;
        let mut out: Vec<Category> = self
            .all()
            .into_iter()
            .filter(|c| filter.matches_name(&c.name))
            .collect();
        out.sort_by(|a, b| {
            directed(a.name.to_lowercase().cmp(&b.name.to_lowercase()), filter.direction)
                .then(a.id.cmp(&b.id))
        });
        Ok(out)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Category>> {
        self.failure.check()?;
        Ok(self.find(id))
    }

    async fn create(&self, input: NewCategory) -> anyhow::Result<Category> {
        self.failure.check()?;
        Ok(self.seed(&input.name, input.description.as_deref()))
    }

    async fn update(&self, id: Uuid, patch: CategoryPatch) -> anyhow::Result<Option<Category>> {
        self.failure.check()?;
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            row.name = name;
        }
        if let Some(description) = patch.description {
            row.description = Some(description);
        }
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<Option<Category>> {
        self.failure.check()?;
        let found = self.find(id);
        self.remove(id);
        Ok(found)
    }
}

#[derive(Debug, Clone)]
struct StoredProduct {
    id: Uuid,
    name: String,
    price: f64,
    image: Option<String>,
    category: Option<Uuid>,
    description: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

/// Products whose category is populated from a shared [`MemoryCategoryStore`].
pub struct MemoryProductStore {
    rows: Mutex<Vec<StoredProduct>>,
    categories: Arc<MemoryCategoryStore>,
    failure: Failure,
}

impl MemoryProductStore {
    pub fn new(categories: Arc<MemoryCategoryStore>) -> Self {
        Self {
            rows: Mutex::default(),
            categories,
            failure: Failure::default(),
        }
    }

    fn populate(&self, row: StoredProduct) -> Product {
        Product {
            id: row.id,
            name: row.name,
            price: row.price,
            image: row.image,
            category: row.category.and_then(|id| self.categories.find(id)),
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    fn insert(&self, input: NewProduct) -> Product {
        let now = OffsetDateTime::now_utc();
        let row = StoredProduct {
            id: Uuid::new_v4(),
            name: input.name,
            price: input.price,
            image: input.image,
            category: input.category,
            description: input.description,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(row.clone());
        self.populate(row)
    }

    pub fn seed(&self, name: &str, price: f64, category: Option<Uuid>) -> Product {
        self.insert(NewProduct {
            name: name.to_string(),
            price,
            image: None,
            category,
            description: None,
        })
    }

    pub fn set_image(&self, id: Uuid, image: &str) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|p| p.id == id) {
            row.image = Some(image.to_string());
        }
    }

    /// Insertion order.
    pub fn all(&self) -> Vec<Product> {
        let rows = self.rows.lock().unwrap().clone();
        rows.into_iter().map(|r| self.populate(r)).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn fail_next(&self, msg: &str) {
        self.failure.arm(msg);
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn list(&self, filter: &ListFilter) -> anyhow::Result<Vec<Product>> {
        self.failure.check()?;
        // Filter on the stored reference, like `p.category_id = $1`: a
        // dangling reference still matches and populates as `None`.
        let rows = self.rows.lock().unwrap().clone();
        let mut out: Vec<Product> = rows
            .into_iter()
            .filter(|p| filter.matches_name(&p.name))
            .filter(|p| filter.category.map_or(true, |c| p.category == Some(c)))
            .map(|p| self.populate(p))
            .collect();
        // Mirrors `ORDER BY lower(p.name)`.
        out.sort_by(|a, b| {
            let ord = match filter.sort {
                SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
                SortField::Price => a.price.total_cmp(&b.price),
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            };
            directed(ord, filter.direction).then(a.id.cmp(&b.id))
        });
        Ok(out)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        self.failure.check()?;
        Ok(self.all().into_iter().find(|p| p.id == id))
    }

    async fn create(&self, input: NewProduct) -> anyhow::Result<Product> {
        self.failure.check()?;
        Ok(self.insert(input))
    }

    async fn update(&self, id: Uuid, patch: ProductPatch) -> anyhow::Result<Option<Product>> {
        self.failure.check()?;
        let updated = {
            let mut rows = self.rows.lock().unwrap();
            let Some(row) = rows.iter_mut().find(|p| p.id == id) else {
                return Ok(None);
            };
            if let Some(name) = patch.name {
                row.name = name;
            }
            if let Some(price) = patch.price {
                row.price = price;
            }
            if let Some(image) = patch.image {
                row.image = Some(image);
            }
            if let Some(category) = patch.category {
                row.category = Some(category);
            }
            if let Some(description) = patch.description {
                row.description = Some(description);
            }
            row.updated_at = OffsetDateTime::now_utc();
            row.clone()
        };
        Ok(Some(self.populate(updated)))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        self.failure.check()?;
        let removed = {
            let mut rows = self.rows.lock().unwrap();
            let idx = rows.iter().position(|p| p.id == id);
            idx.map(|i| rows.remove(i))
        };
        Ok(removed.map(|r| self.populate(r)))
    }
}

/// Accepts every image and remembers how many it was given.
#[derive(Default)]
pub struct RecordingImageStorage {
    references: Mutex<Vec<String>>,
}

impl RecordingImageStorage {
    pub fn stored(&self) -> usize {
        self.references.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageStorage for RecordingImageStorage {
    async fn put_image(&self, _body: Bytes, extension: &str, _content_type: &str) -> anyhow::Result<String> {
        let reference = format!("/images/{}", unique_file_name(extension));
        self.references.lock().unwrap().push(reference.clone());
        Ok(reference)
    }

    fn backend(&self) -> &'static str {
        "recording"
    }
}

/// The full router over in-memory stores and a memory session store.
pub struct TestApp {
    pub users: Arc<MemoryUserStore>,
    pub categories: Arc<MemoryCategoryStore>,
    pub products: Arc<MemoryProductStore>,
    pub images: Arc<RecordingImageStorage>,
    state: AppState,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let config = AppConfig::from_lookup(|key| {
            (key == "DATABASE_URL").then(|| "postgres://localhost/test".to_string())
        })
        .unwrap();

        let users = Arc::new(MemoryUserStore::default());
        let categories = Arc::new(MemoryCategoryStore::default());
        let products = Arc::new(MemoryProductStore::new(categories.clone()));
        let images = Arc::new(RecordingImageStorage::default());

        let state = AppState::from_parts(
            Arc::new(config),
            users.clone(),
            categories.clone(),
            products.clone(),
            images.clone(),
        );
        let router = build_app(state.clone(), MemoryStore::default());

        Self {
            users,
            categories,
            products,
            images,
            state,
            router,
        }
    }

    /// The state behind the router, for wiring it to another session store.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.unwrap()
    }

    /// Logs in over the JSON API and returns the `Cookie` header value.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let body = serde_json::json!({ "username": username, "password": password }).to_string();
        let res = self.send(post_json("/users/login", &body)).await;
        assert_eq!(res.status(), StatusCode::OK, "login as {username}");
        session_cookie(&res).expect("session cookie")
    }

    pub async fn admin_cookie(&self) -> String {
        self.users.seed("admin", "admin-pw", Role::Admin).await;
        self.login("admin", "admin-pw").await
    }
}

fn request(method: &str, path: &str, cookie: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(path);
    match cookie {
        Some(c) => builder.header(header::COOKIE, c),
        None => builder,
    }
}

pub fn get(path: &str, cookie: Option<&str>) -> Request<Body> {
    request("GET", path, cookie).body(Body::empty()).unwrap()
}

pub fn get_json(path: &str, cookie: Option<&str>) -> Request<Body> {
    request("GET", path, cookie)
        .header(header::ACCEPT, "application/json")
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(path: &str, body: &str) -> Request<Body> {
    request("POST", path, None)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn put_json(path: &str, body: &str) -> Request<Body> {
    request("PUT", path, None)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn delete(path: &str) -> Request<Body> {
    request("DELETE", path, None)
        .header(header::ACCEPT, "application/json")
        .body(Body::empty())
        .unwrap()
}

pub fn post_form(path: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    request("POST", path, cookie)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// One part of a `multipart/form-data` body.
pub struct Part {
    name: String,
    file: Option<(String, String)>,
    body: Vec<u8>,
}

impl Part {
    pub fn text(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            file: None,
            body: value.as_bytes().to_vec(),
        }
    }

    pub fn file(name: &str, file_name: &str, content_type: &str, body: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            file: Some((file_name.to_string(), content_type.to_string())),
            body: body.to_vec(),
        }
    }
}

const BOUNDARY: &str = "storefront-test-boundary";

pub fn multipart(path: &str, parts: &[Part], cookie: Option<&str>) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match &part.file {
            Some((file_name, content_type)) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n",
                    part.name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name).as_bytes(),
            ),
        }
        body.extend_from_slice(&part.body);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    request("POST", path, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_bytes(res: Response<Body>) -> Bytes {
    axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap()
}

pub async fn body_json(res: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(res).await).unwrap()
}

pub async fn body_text(res: Response<Body>) -> String {
    String::from_utf8(body_bytes(res).await.to_vec()).unwrap()
}

/// `name=value` of the session cookie set by the response, if any.
pub fn session_cookie(res: &Response<Body>) -> Option<String> {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| {
            pair.strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
                .is_some_and(|value| !value.is_empty())
        })
        .map(str::to_string)
}
