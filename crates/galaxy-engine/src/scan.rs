//! Selection scanning
//!
//! Turns the current selection into the map of macros that apply to it.
//! With a selection, every outgoing arrow of a selected text or rectangle
//! yields an invocation, either under its label's macro name or under a
//! name inferred from the label's shape and the output type. Declared
//! `customData.macros` add one invocation each. With no selection, anchor
//! arrows yield navigation invocations.
//!
//! Scanning runs on every selection change and never fails; malformed
//! labels and dangling bindings simply contribute nothing.

use crate::config::InferencePolicy;
use crate::registry::MacroRegistry;
use galaxy_scene::{arrow_label, Element, ElementId, ElementKind, LabelCall, SceneIndex};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// One pending macro application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationDescriptor {
    /// Lowercase macro name
    pub name: String,
    /// Element the macro reads
    pub input_from: ElementId,
    /// Element the result goes to; `None` for an arrow with an unbound end
    pub output_to: Option<ElementId>,
    /// Arrow that produced the invocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrow: Option<ElementId>,
    /// Button caption, set for anchor invocations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Argument passed to the macro
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument: Option<String>,
}

impl InvocationDescriptor {
    /// Invocation reading `input` and writing `output`
    #[must_use]
    pub fn new(name: &str, input: impl Into<ElementId>, output: impl Into<ElementId>) -> Self {
        Self {
            name: name.to_lowercase(),
            input_from: input.into(),
            output_to: Some(output.into()),
            arrow: None,
            caption: None,
            argument: None,
        }
    }

    #[must_use]
    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.argument = Some(argument.into());
        self
    }
}

/// Result of a selection scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionScan {
    /// Macro name → invocations, in scan order
    pub invocations: IndexMap<String, Vec<InvocationDescriptor>>,
    /// Names that were scanned but have no registered macro
    pub unregistered: IndexSet<String>,
}

impl SelectionScan {
    /// Invocations for one macro, case-insensitive
    #[must_use]
    pub fn get(&self, name: &str) -> &[InvocationDescriptor] {
        self.invocations
            .get(&name.to_lowercase())
            .map_or(&[], Vec::as_slice)
    }

    /// Macro names in first-seen order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.invocations.keys().map(String::as_str)
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.invocations.is_empty()
    }

    /// Total number of invocations across all names
    #[must_use]
    pub fn total(&self) -> usize {
        self.invocations.values().map(Vec::len).sum()
    }

    fn push(&mut self, registry: &MacroRegistry, descriptor: InvocationDescriptor) {
        if !registry.contains(&descriptor.name) && self.unregistered.insert(descriptor.name.clone()) {
            tracing::warn!(macro_name = %descriptor.name, "scanned macro is not registered");
        }
        self.invocations
            .entry(descriptor.name.clone())
            .or_default()
            .push(descriptor);
    }
}

/// Scans a scene snapshot against a registry and an inference policy
#[derive(Debug, Clone, Copy)]
pub struct SelectionScanner<'r> {
    registry: &'r MacroRegistry,
    policy: &'r InferencePolicy,
}

impl<'r> SelectionScanner<'r> {
    #[inline]
    #[must_use]
    pub fn new(registry: &'r MacroRegistry, policy: &'r InferencePolicy) -> Self {
        Self { registry, policy }
    }

    /// Applicable macros for `selection`, selected elements taken in scene order
    #[must_use]
    pub fn scan(&self, elements: &[Element], selection: &IndexSet<ElementId>) -> SelectionScan {
        let index = SceneIndex::new(elements);
        let mut scan = SelectionScan::default();

        if selection.is_empty() {
            self.scan_anchors(&index, &mut scan);
        } else {
            for element in elements.iter().filter(|element| selection.contains(&element.id)) {
                if matches!(element.kind, ElementKind::Text | ElementKind::Rectangle) {
                    self.scan_arrows(&index, element, &mut scan);
                }
                self.scan_declared(element, &mut scan);
            }
        }

        tracing::debug!(
            names = scan.invocations.len(),
            invocations = scan.total(),
            unregistered = scan.unregistered.len(),
            "selection scanned"
        );
        scan
    }

    fn scan_arrows(&self, index: &SceneIndex<'_>, element: &Element, scan: &mut SelectionScan) {
        let arrows = element
            .bound()
            .filter(|bound| bound.kind == ElementKind::Arrow)
            .filter_map(|bound| index.get(bound.id.as_str()))
            .filter(|arrow| arrow.is_arrow() && arrow.start_id() == Some(&element.id));

        for arrow in arrows {
            let label = arrow_label(arrow, index);
            let call = LabelCall::parse(&label);
            let output = arrow.end_id().and_then(|id| index.get(id.as_str()));

            let (name, argument) = if call.is_empty() {
                (self.policy.unlabeled.clone(), None)
            } else if self.registry.contains(&call.name) {
                (call.name, call.argument)
            } else {
                match self.policy.infer(&label, output.map(|o| &o.kind)) {
                    Some(inferred) => (inferred.to_string(), Some(label.clone())),
                    None => {
                        tracing::debug!(arrow = %arrow.id, label = %label, "label matches no macro");
                        continue;
                    }
                }
            };

            scan.push(
                self.registry,
                InvocationDescriptor {
                    name: name.to_lowercase(),
                    input_from: element.id.clone(),
                    output_to: arrow.end_id().cloned(),
                    arrow: Some(arrow.id.clone()),
                    caption: None,
                    argument,
                },
            );
        }
    }

    fn scan_declared(&self, element: &Element, scan: &mut SelectionScan) {
        let Some(data) = &element.custom_data else {
            return;
        };
        let output = data.output_to.clone().unwrap_or_else(|| element.id.clone());
        for name in &data.macros {
            scan.push(
                self.registry,
                InvocationDescriptor::new(name, element.id.clone(), output.clone()),
            );
        }
    }

    fn scan_anchors(&self, index: &SceneIndex<'_>, scan: &mut SelectionScan) {
        for anchor in index.anchor_arrows() {
            let caption = arrow_label(anchor, index);
            scan.push(
                self.registry,
                InvocationDescriptor {
                    name: self.policy.anchor.to_lowercase(),
                    input_from: anchor.id.clone(),
                    output_to: Some(anchor.end_id().unwrap_or(&anchor.id).clone()),
                    arrow: Some(anchor.id.clone()),
                    caption: Some(caption),
                    argument: None,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::macro_fn;
    use galaxy_scene::{Binding, BoundElement, CustomData, MacroOutput};

    fn registry(names: &[&str]) -> MacroRegistry {
        let registry = MacroRegistry::new();
        for name in names {
            registry.register(name, macro_fn(|_| async { Ok(MacroOutput::Unchanged) }));
        }
        registry
    }

    fn bind(element: &mut Element, arrow: &str) {
        element
            .bound_elements
            .get_or_insert_with(Vec::new)
            .push(BoundElement {
                id: arrow.into(),
                kind: ElementKind::Arrow,
            });
    }

    /// `from` → `to` arrow with an optional label
    fn connect(elements: &mut Vec<Element>, id: &str, from: &str, to: &str, label: Option<&str>) {
        let mut arrow = Element::new(id, ElementKind::Arrow);
        arrow.start_binding = Some(Binding::to(from));
        arrow.end_binding = Some(Binding::to(to));
        if let Some(text) = label {
            let label_id = format!("{id}-label");
            arrow.bound_elements = Some(vec![BoundElement {
                id: label_id.as_str().into(),
                kind: ElementKind::Text,
            }]);
            elements.push(Element::text(label_id, text));
        }
        for element in elements.iter_mut() {
            if element.id == from || element.id == to {
                bind(element, id);
            }
        }
        elements.push(arrow);
    }

    fn select(ids: &[&str]) -> IndexSet<ElementId> {
        ids.iter().map(|id| ElementId::from(*id)).collect()
    }

    #[test]
    fn registered_label_is_used_directly() {
        let registry = registry(&["increment"]);
        let policy = InferencePolicy::default();
        let mut elements = vec![Element::text("a", "5"), Element::text("b", "")];
        connect(&mut elements, "e", "a", "b", Some("=Increment"));

        let scan = SelectionScanner::new(&registry, &policy).scan(&elements, &select(&["a"]));
        let found = scan.get("increment");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].input_from, "a");
        assert_eq!(found[0].output_to.as_ref().unwrap(), "b");
        assert_eq!(found[0].arrow.as_ref().unwrap(), "e");
        assert!(scan.unregistered.is_empty());
    }

    #[test]
    fn label_argument_is_passed() {
        let registry = registry(&["fetch"]);
        let policy = InferencePolicy::default();
        let mut elements = vec![Element::text("a", "x"), Element::text("b", "")];
        connect(&mut elements, "e", "a", "b", Some("=fetch(main branch)"));

        let scan = SelectionScanner::new(&registry, &policy).scan(&elements, &select(&["a"]));
        assert_eq!(scan.get("fetch")[0].argument.as_deref(), Some("main branch"));
    }

    #[test]
    fn unregistered_labels_are_inferred() {
        let registry = registry(&["cat", "ls", "complete", "prompt"]);
        let policy = InferencePolicy::default();
        let mut elements = vec![
            Element::text("dir", "/home"),
            Element::text("file", ""),
            Element::text("listing", ""),
            Element::text("answer", ""),
            Element::text("asked", ""),
            Element::new("pic", ElementKind::Image),
            Element::new("box", ElementKind::Frame),
        ];
        connect(&mut elements, "e1", "dir", "file", Some("/notes.txt"));
        connect(&mut elements, "e2", "dir", "listing", Some("/docs"));
        connect(&mut elements, "e3", "dir", "answer", Some("summarize"));
        connect(&mut elements, "e4", "dir", "asked", None);
        connect(&mut elements, "e5", "dir", "pic", Some("a cat in space"));
        connect(&mut elements, "e6", "dir", "box", Some("nothing fits"));

        let scan = SelectionScanner::new(&registry, &policy).scan(&elements, &select(&["dir"]));
        let names: Vec<&str> = scan.names().collect();
        assert_eq!(names, vec!["cat", "ls", "complete", "prompt", "draw"]);
        assert_eq!(scan.get("cat")[0].argument.as_deref(), Some("/notes.txt"));
        assert_eq!(scan.get("complete")[0].argument.as_deref(), Some("summarize"));
        assert!(scan.get("prompt")[0].argument.is_none());
        // draw is inferred for images but nothing provides it
        assert!(scan.unregistered.contains("draw"));
        assert_eq!(scan.total(), 5);
    }

    #[test]
    fn incoming_arrows_are_ignored() {
        let registry = registry(&["x"]);
        let policy = InferencePolicy::default();
        let mut elements = vec![Element::text("a", ""), Element::text("b", "")];
        connect(&mut elements, "e", "a", "b", Some("x"));
        let scan = SelectionScanner::new(&registry, &policy).scan(&elements, &select(&["b"]));
        assert!(scan.is_empty());
    }

    #[test]
    fn declared_macros_default_to_self_output() {
        let registry = registry(&["save"]);
        let policy = InferencePolicy::default();
        let mut frame = Element::new("f", ElementKind::Frame);
        frame.custom_data = Some(CustomData {
            macros: ["save".to_string(), "publish".to_string()].into_iter().collect(),
            ..CustomData::default()
        });
        let mut redirected = Element::text("t", "");
        redirected.custom_data = Some(CustomData {
            macros: ["save".to_string()].into_iter().collect(),
            output_to: Some("elsewhere".into()),
            ..CustomData::default()
        });
        let elements = vec![frame, redirected];

        let scan = SelectionScanner::new(&registry, &policy).scan(&elements, &select(&["t", "f"]));
        let saves = scan.get("save");
        assert_eq!(saves.len(), 2);
        // scene order, not selection order
        assert_eq!(saves[0].input_from, "f");
        assert_eq!(saves[0].output_to.as_ref().unwrap(), "f");
        assert_eq!(saves[1].output_to.as_ref().unwrap(), "elsewhere");
        assert!(scan.unregistered.contains("publish"));
    }

    #[test]
    fn empty_selection_scans_anchors() {
        let registry = registry(&["jump"]);
        let policy = InferencePolicy::default();
        let mut anchor = Element::new("anchor", ElementKind::Arrow);
        anchor.bound_elements = Some(vec![BoundElement {
            id: "anchor-label".into(),
            kind: ElementKind::Text,
        }]);
        anchor.end_binding = Some(Binding::to("start"));
        let elements = vec![
            Element::text("start", "Chapter 1"),
            anchor,
            Element::text("anchor-label", "Jump To Start"),
        ];

        let scan = SelectionScanner::new(&registry, &policy).scan(&elements, &IndexSet::new());
        let jumps = scan.get("jump");
        assert_eq!(jumps.len(), 1);
        assert_eq!(jumps[0].caption.as_deref(), Some("Jump To Start"));
        assert_eq!(jumps[0].output_to.as_ref().unwrap(), "start");
    }
}
