//! Containment assertions over rendered pages.

use crate::case::Check;
use crate::errors::AssertionError;
use crate::page::PageHandle;

/// Containment, not equality. An empty `expected` never passes.
pub fn text_contains(actual: &str, expected: &str) -> bool {
    !expected.is_empty() && actual.contains(expected)
}

/// Select `selector` on `page` and require its text to contain `expected`.
///
/// Returns the extracted text on success so callers can record it.
pub fn expect_text_contains(
    page: &PageHandle,
    selector: &str,
    expected: &str,
) -> Result<String, AssertionError> {
    let element = page
        .select(selector)?
        .ok_or_else(|| AssertionError::SelectorNotFound {
            selector: selector.to_string(),
            route: page.route().to_string(),
        })?;

    let actual = element.text();
    if text_contains(&actual, expected) {
        Ok(actual)
    } else {
        Err(AssertionError::TextMismatch {
            selector: selector.to_string(),
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Evaluate checks in order; the first failure stops evaluation.
pub fn evaluate_checks(page: &PageHandle, checks: &[Check]) -> Result<Vec<String>, AssertionError> {
    checks
        .iter()
        .map(|check| expect_text_contains(page, &check.selector, &check.contains))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> PageHandle {
        PageHandle::parse("/", 200, format!("<html><body>{body}</body></html>"))
    }

    #[test]
    fn passes_on_substring() {
        let page = page(r#"<div id="client-mod">client:default (mui)</div>"#);
        let actual = expect_text_contains(&page, "#client-mod", "client:default").unwrap();
        assert_eq!(actual, "client:default (mui)");
    }

    #[test]
    fn absent_element_is_selector_not_found() {
        let page = page("<div>nothing mounted</div>");
        let err = expect_text_contains(&page, "#client-mod", "client:default").unwrap_err();
        assert_eq!(
            err,
            AssertionError::SelectorNotFound {
                selector: "#client-mod".into(),
                route: "/".into(),
            }
        );
        assert!(err.to_string().contains("selector not found"));
    }

    #[test]
    fn empty_text_never_contains() {
        let page = page(r#"<div id="client-mod"></div>"#);
        let err = expect_text_contains(&page, "#client-mod", "client:default").unwrap_err();
        assert!(matches!(err, AssertionError::TextMismatch { ref actual, .. } if actual.is_empty()));
        assert!(!text_contains("", ""));
    }

    #[test]
    fn first_failing_check_is_reported() {
        let page = page(r#"<div id="a">one</div><div id="b">two</div>"#);
        let checks = vec![
            Check::new("#a", "one"),
            Check::new("#b", "three"),
            Check::new("#missing", "x"),
        ];
        let err = evaluate_checks(&page, &checks).unwrap_err();
        assert!(matches!(err, AssertionError::TextMismatch { ref selector, .. } if selector == "#b"));
    }
}
