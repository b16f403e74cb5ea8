//! Page rendering for the form surface.
//!
//! Templates live outside this service; a renderer only has to turn a view
//! name plus its data into an HTML document. [`ShellRenderer`] renders
//! `templates/page.html`, a bare HTML shell carrying the page data as JSON for
//! a front-end to hydrate.

use anyhow::Context;
use askama::Template;
use axum::response::Html;
use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Page {
    pub view: &'static str,
    pub title: String,
    pub data: serde_json::Value,
}

impl Page {
    pub fn new(view: &'static str, title: impl Into<String>, data: &impl Serialize) -> anyhow::Result<Self> {
        Ok(Self {
            view,
            title: title.into(),
            data: serde_json::to_value(data).with_context(|| format!("serialize {view} page"))?,
        })
    }
}

pub trait PageRenderer: Send + Sync {
    fn render(&self, page: &Page) -> anyhow::Result<String>;
}

#[derive(Template)]
#[template(path = "page.html")]
struct ShellTemplate<'a> {
    view: &'a str,
    title: &'a str,
    data: &'a serde_json::Value,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRenderer;

impl PageRenderer for ShellRenderer {
    fn render(&self, page: &Page) -> anyhow::Result<String> {
        ShellTemplate {
            view: page.view,
            title: &page.title,
            data: &page.data,
        }
        .render()
        .with_context(|| format!("render {} page", page.view))
    }
}

/// Builds and renders a page in one step.
pub fn render_page(
    renderer: &dyn PageRenderer,
    view: &'static str,
    title: &str,
    data: &impl Serialize,
) -> Result<Html<String>, AppError> {
    let page = Page::new(view, title, data)?;
    Ok(Html(renderer.render(&page)?))
}
