//! Arrow labels
//!
//! An arrow names the macro it invokes through the text element bound to its
//! label slot. Labels are written `=name` or `=name(argument)`; the leading
//! `=` is optional.

use crate::element::{Element, ElementKind};
use crate::index::SceneIndex;

/// Text of the arrow's first bound label, `=` marker stripped
///
/// Returns an empty string when the arrow carries no resolvable label. Only
/// the first label is consulted when several are bound.
#[must_use]
pub fn arrow_label(arrow: &Element, index: &SceneIndex<'_>) -> String {
    arrow
        .bound()
        .find(|bound| bound.kind == ElementKind::Text)
        .and_then(|bound| index.get(bound.id.as_str()))
        .map(|label| {
            let text = label.text_str().trim();
            text.strip_prefix('=').unwrap_or(text).trim().to_string()
        })
        .unwrap_or_default()
}

/// A label split into macro name and optional argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCall {
    /// Macro name as written
    pub name: String,
    /// Text between the first `(` and the last `)`
    pub argument: Option<String>,
}

impl LabelCall {
    /// Split `name(argument)`
    #[must_use]
    pub fn parse(label: &str) -> Self {
        let label = label.trim();
        let label = label.strip_prefix('=').unwrap_or(label);
        match label.find('(') {
            Some(open) => {
                let rest = &label[open + 1..];
                let argument = match rest.rfind(')') {
                    Some(close) => &rest[..close],
                    None => rest,
                };
                Self {
                    name: label[..open].trim().to_string(),
                    argument: Some(argument.to_string()),
                }
            }
            None => Self {
                name: label.to_string(),
                argument: None,
            },
        }
    }

    /// Whether the label names nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{BoundElement, ElementId};

    fn labelled(label: Option<&str>) -> Vec<Element> {
        let mut arrow = Element::new("arrow", ElementKind::Arrow);
        let mut elements = Vec::new();
        if let Some(text) = label {
            arrow.bound_elements = Some(vec![
                BoundElement {
                    id: ElementId::from("label"),
                    kind: ElementKind::Text,
                },
                BoundElement {
                    id: ElementId::from("second"),
                    kind: ElementKind::Text,
                },
            ]);
            elements.push(Element::text("label", text));
            elements.push(Element::text("second", "=ignored"));
        }
        elements.insert(0, arrow);
        elements
    }

    #[test]
    fn strips_equals_marker() {
        let elements = labelled(Some("=increment"));
        let index = SceneIndex::new(&elements);
        assert_eq!(arrow_label(&elements[0], &index), "increment");
    }

    #[test]
    fn plain_label_is_kept() {
        let elements = labelled(Some("/src/main.rs"));
        let index = SceneIndex::new(&elements);
        assert_eq!(arrow_label(&elements[0], &index), "/src/main.rs");
    }

    #[test]
    fn missing_label_is_empty() {
        let elements = labelled(None);
        let index = SceneIndex::new(&elements);
        assert_eq!(arrow_label(&elements[0], &index), "");
    }

    #[test]
    fn parses_call_with_argument() {
        let call = LabelCall::parse("summarize(in three words)");
        assert_eq!(call.name, "summarize");
        assert_eq!(call.argument.as_deref(), Some("in three words"));

        let nested = LabelCall::parse("=wrap(f(x))");
        assert_eq!(nested.name, "wrap");
        assert_eq!(nested.argument.as_deref(), Some("f(x)"));

        let bare = LabelCall::parse("deno");
        assert_eq!(bare.name, "deno");
        assert!(bare.argument.is_none());
    }
}
