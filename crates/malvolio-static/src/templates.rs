//! Template rendering for listing and item pages.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use minijinja::{path_loader, Environment, ErrorKind, UndefinedBehavior, Value};
use serde::Serialize;

use malvolio_content::ContentItem;

/// Shared layout every page is wrapped in. Receives the page body as `content`.
pub const BASE_TEMPLATE: &str = "base.html";

/// Context names set by the renderer. Extra metadata fields with these
/// names are not passed through.
const RESERVED: &[&str] = &[
    "key",
    "category",
    "href",
    "heading",
    "date",
    "summary",
    "reading_time",
    "content",
];

/// Errors that can occur while rendering a page.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Failed to render {template}: {message}")]
    TemplateRenderError { template: String, message: String },
}

/// A category and its loaded items, as passed to listing pages.
#[derive(Debug, Clone, Copy)]
pub struct CategoryListing<'a> {
    pub name: &'a str,
    pub items: &'a [ContentItem],
}

#[derive(Serialize)]
struct ListedItem<'a> {
    key: &'a str,
    category: &'a str,
    href: String,
    heading: &'a str,
    date: &'a str,
    summary: &'a str,
    reading_time: u32,
    #[serde(flatten)]
    extra: BTreeMap<&'a str, &'a serde_yaml::Value>,
}

#[derive(Serialize)]
struct ListedCategory<'a> {
    name: &'a str,
    items: Vec<ListedItem<'a>>,
}

/// Binds content to templates loaded from the templates directory.
///
/// Templates are read from disk when first used by this renderer. Create a
/// new renderer per build so template edits are picked up.
pub struct Renderer {
    env: Environment<'static>,
    items_dir: String,
}

impl Renderer {
    /// Create a renderer over `templates_dir`. Item links point into `items_dir`.
    pub fn new(templates_dir: impl Into<PathBuf>, items_dir: impl Into<String>) -> Self {
        let mut env = Environment::new();
        env.set_loader(path_loader(templates_dir.into()));
        env.set_undefined_behavior(UndefinedBehavior::Strict);

        Self {
            env,
            items_dir: items_dir.into(),
        }
    }

    /// Site-relative link to an item page.
    pub fn item_href(&self, category: &str, key: &str) -> String {
        format!("{}/{}/{}.html", self.items_dir, category, key)
    }

    /// Render a listing template over the given categories and wrap it in
    /// the base layout.
    ///
    /// Binds `categories` (each with `name` and `items`), `items` (all
    /// items in order), `category` (set when exactly one category is given)
    /// and `all_tags`.
    pub fn render_index_page(
        &self,
        template: &str,
        categories: &[CategoryListing<'_>],
    ) -> Result<String, RenderError> {
        let listed: Vec<ListedCategory<'_>> = categories
            .iter()
            .map(|c| ListedCategory {
                name: c.name,
                items: c.items.iter().map(|i| self.listed_item(i)).collect(),
            })
            .collect();

        let items: Vec<&ListedItem<'_>> = listed.iter().flat_map(|c| c.items.iter()).collect();

        let all_tags: BTreeSet<String> = categories
            .iter()
            .flat_map(|c| c.items.iter())
            .flat_map(|i| i.metadata.tags())
            .collect();

        let category = match categories {
            [only] => Value::from(only.name),
            _ => Value::from(()),
        };

        let mut ctx = BTreeMap::new();
        ctx.insert("categories".to_string(), Value::from_serialize(&listed));
        ctx.insert("items".to_string(), Value::from_serialize(&items));
        ctx.insert("all_tags".to_string(), Value::from_serialize(&all_tags));
        ctx.insert("category".to_string(), category.clone());

        let content = self.render(template, Value::from(ctx))?;

        let mut layout = BTreeMap::new();
        layout.insert("content".to_string(), Value::from_safe_string(content));
        layout.insert("category".to_string(), category);

        self.render(BASE_TEMPLATE, Value::from(layout))
    }

    /// Render an item page: the body wrapped in the base layout, with the
    /// item's metadata bound alongside it.
    pub fn render_item_page(&self, item: &ContentItem) -> Result<String, RenderError> {
        let meta = &item.metadata;
        let mut ctx = BTreeMap::new();

        for (name, value) in passthrough(&meta.extra) {
            ctx.insert(name.to_string(), Value::from_serialize(value));
        }

        ctx.insert("key".to_string(), Value::from(item.key.as_str()));
        ctx.insert("category".to_string(), Value::from(item.category.as_str()));
        ctx.insert(
            "href".to_string(),
            Value::from(self.item_href(&item.category, &item.key)),
        );
        ctx.insert("heading".to_string(), Value::from(meta.heading.as_str()));
        ctx.insert("date".to_string(), Value::from(meta.date.as_str()));
        ctx.insert("summary".to_string(), Value::from(meta.summary.as_str()));
        ctx.insert("reading_time".to_string(), Value::from(item.reading_time()));
        ctx.insert(
            "content".to_string(),
            Value::from_safe_string(item.body.clone()),
        );

        self.render(BASE_TEMPLATE, Value::from(ctx))
    }

    fn listed_item<'a>(&self, item: &'a ContentItem) -> ListedItem<'a> {
        ListedItem {
            key: &item.key,
            category: &item.category,
            href: self.item_href(&item.category, &item.key),
            heading: &item.metadata.heading,
            date: &item.metadata.date,
            summary: &item.metadata.summary,
            reading_time: item.reading_time(),
            extra: passthrough(&item.metadata.extra).collect(),
        }
    }

    fn render(&self, name: &str, ctx: Value) -> Result<String, RenderError> {
        let template = self.env.get_template(name).map_err(|e| match e.kind() {
            ErrorKind::TemplateNotFound => RenderError::TemplateNotFound(name.to_string()),
            _ => render_error(name, &e),
        })?;

        template.render(ctx).map_err(|e| render_error(name, &e))
    }
}

fn passthrough(
    extra: &BTreeMap<String, serde_yaml::Value>,
) -> impl Iterator<Item = (&str, &serde_yaml::Value)> {
    extra
        .iter()
        .map(|(k, v)| (k.as_str(), v))
        .filter(|(k, _)| !RESERVED.contains(k))
}

fn render_error(template: &str, e: &minijinja::Error) -> RenderError {
    RenderError::TemplateRenderError {
        template: template.to_string(),
        message: e.to_string(),
    }
}
