use crate::params::extract_query_params;
use crate::result::{FieldDescriptor, QueryParams};
use scraper::{ElementRef, Html, Selector};
use indexmap::IndexMap;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector"));
static FIELD_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input, textarea, select").expect("static selector"));

/// Attributes kept on a field descriptor, besides any `aria-*`.
pub const FIELD_ATTRIBUTES: [&str; 6] = ["name", "type", "title", "autocomplete", "oninput", "onchange"];

/// Everything pulled out of one fetched page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub links: Vec<String>,
    pub query_params: QueryParams,
    pub input_fields: Vec<FieldDescriptor>,
}

/// Parse a page. Malformed markup never fails; missing elements just yield empty results.
pub fn extract(html: &str, page_url: &str) -> Extraction {
    let document = Html::parse_document(html);
    let links = extract_links(&document, page_url);
    let input_fields = extract_input_fields(&document);
    debug!(
        "Extracted {} links and {} fields from {}",
        links.len(),
        input_fields.len(),
        page_url
    );
    Extraction {
        links,
        query_params: extract_query_params(page_url),
        input_fields,
    }
}

/// Every anchor `href`, resolved against the page URL, in document order.
fn extract_links(document: &Html, page_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };
    document
        .select(&LINK_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| resolve_url(&base, href))
        .collect()
}

/// Resolve `href` against `base`, dropping the fragment.
pub fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let mut resolved = base.join(href).ok()?;
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

/// Form-scoped fields first, then the rest, each group in document order.
fn extract_input_fields(document: &Html) -> Vec<FieldDescriptor> {
    let mut form_fields = Vec::new();
    let mut loose_fields = Vec::new();

    for element in document.select(&FIELD_SELECTOR) {
        let mut attrs: IndexMap<String, String> = element
            .value()
            .attrs()
            .filter(|(name, _)| is_retained_attribute(name))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        if attrs.is_empty() {
            continue;
        }

        match enclosing_form(element) {
            Some(form) => {
                let method = form.value().attr("method").unwrap_or_default();
                let action = form.value().attr("action").unwrap_or_default();
                attrs.insert("form_method".to_string(), method.to_uppercase());
                attrs.insert("form_action".to_string(), action.to_string());
                form_fields.push(FieldDescriptor::new(attrs));
            }
            None => loose_fields.push(FieldDescriptor::new(attrs)),
        }
    }

    form_fields.extend(loose_fields);
    form_fields
}

fn is_retained_attribute(name: &str) -> bool {
    FIELD_ATTRIBUTES.contains(&name) || name.starts_with("aria-")
}

/// The nearest `<form>` ancestor, if any.
fn enclosing_form(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "form")
}
