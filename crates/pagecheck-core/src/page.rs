//! Rendered page snapshots and selection over them.
//!
//! A [`PageHandle`] is immutable once rendered. Selection is synchronous and
//! deterministic over the already-retrieved markup.

use scraper::{ElementRef, Html, Selector};

use crate::errors::AssertionError;

/// Read-only snapshot of a route's final markup.
#[derive(Debug, Clone)]
pub struct PageHandle {
    route: String,
    status: u16,
    markup: String,
    document: Html,
}

impl PageHandle {
    pub fn parse(route: impl Into<String>, status: u16, markup: impl Into<String>) -> Self {
        let markup = markup.into();
        let document = Html::parse_document(&markup);
        Self {
            route: route.into(),
            status,
            markup,
            document,
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// First element matching a CSS selector, or `None` when nothing matches.
    pub fn select(&self, selector: &str) -> Result<Option<ElementHandle<'_>>, AssertionError> {
        let parsed = parse_selector(selector)?;
        Ok(self
            .document
            .select(&parsed)
            .next()
            .map(|element| ElementHandle { element }))
    }

    /// Number of elements matching a CSS selector.
    pub fn count(&self, selector: &str) -> Result<usize, AssertionError> {
        let parsed = parse_selector(selector)?;
        Ok(self.document.select(&parsed).count())
    }
}

/// An element found in a [`PageHandle`]. Borrows the page it came from.
#[derive(Debug, Clone, Copy)]
pub struct ElementHandle<'a> {
    element: ElementRef<'a>,
}

impl ElementHandle<'_> {
    /// Normalized text content: all descendant text, whitespace runs collapsed.
    pub fn text(&self) -> String {
        normalize_text(&self.element.text().collect::<String>())
    }

    pub fn id(&self) -> Option<&str> {
        self.element.value().id()
    }

    pub fn tag_name(&self) -> &str {
        self.element.value().name()
    }

    pub fn outer_html(&self) -> String {
        self.element.html()
    }
}

pub fn select<'a>(
    page: &'a PageHandle,
    selector: &str,
) -> Result<Option<ElementHandle<'a>>, AssertionError> {
    page.select(selector)
}

pub fn text(element: &ElementHandle<'_>) -> String {
    element.text()
}

pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_selector(selector: &str) -> Result<Selector, AssertionError> {
    Selector::parse(selector).map_err(|e| AssertionError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head><title>mui</title></head>
  <body>
    <div id="__next">
      <div id="client-mod">
        client:<span>default</span>
      </div>
      <p class="note">first</p>
      <p class="note">second</p>
    </div>
  </body>
</html>"#;

    #[test]
    fn selects_by_identifier() {
        let page = PageHandle::parse("/", 200, PAGE);
        let el = select(&page, "#client-mod").unwrap().expect("element");
        assert_eq!(el.id(), Some("client-mod"));
        assert_eq!(el.tag_name(), "div");
        assert_eq!(text(&el), "client:default");
    }

    #[test]
    fn first_match_wins() {
        let page = PageHandle::parse("/", 200, PAGE);
        let el = page.select("p.note").unwrap().unwrap();
        assert_eq!(el.text(), "first");
        assert_eq!(page.count("p.note").unwrap(), 2);
    }

    #[test]
    fn missing_element_is_absent_not_error() {
        let page = PageHandle::parse("/", 200, PAGE);
        assert!(page.select("#server-mod").unwrap().is_none());
    }

    #[test]
    fn invalid_selector_is_reported() {
        let page = PageHandle::parse("/", 200, PAGE);
        let err = page.select("#").unwrap_err();
        assert!(matches!(err, AssertionError::InvalidSelector { .. }));
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize_text("  a \n\t b  "), "a b");
        assert_eq!(normalize_text("\n  \n"), "");
    }

    #[test]
    fn keeps_route_status_and_markup() {
        let page = PageHandle::parse("/about", 200, "<p>x</p>");
        assert_eq!(page.route(), "/about");
        assert_eq!(page.status(), 200);
        assert_eq!(page.markup(), "<p>x</p>");
    }
}
