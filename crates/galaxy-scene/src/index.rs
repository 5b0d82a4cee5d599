//! Relation tables over an element snapshot
//!
//! [`SceneIndex`] borrows a scene snapshot and precomputes the id-to-id
//! relations the resolver and scanner walk: id lookup, arrows by start and
//! end element, and `customData.parentId` back-references. All relations are
//! non-owning and dangling ids simply resolve to nothing.

use crate::element::{Element, ElementKind};
use std::collections::HashMap;

/// Read-only relation tables for one scene snapshot
#[derive(Debug)]
pub struct SceneIndex<'a> {
    elements: &'a [Element],
    positions: HashMap<&'a str, usize>,
    /// end element id -> arrow positions
    incoming: HashMap<&'a str, Vec<usize>>,
    /// start element id -> arrow positions
    outgoing: HashMap<&'a str, Vec<usize>>,
    /// element id -> declared parent id
    parents: HashMap<&'a str, &'a str>,
}

impl<'a> SceneIndex<'a> {
    /// Build relation tables for a snapshot
    #[must_use]
    pub fn new(elements: &'a [Element]) -> Self {
        let mut positions = HashMap::with_capacity(elements.len());
        let mut incoming: HashMap<&'a str, Vec<usize>> = HashMap::new();
        let mut outgoing: HashMap<&'a str, Vec<usize>> = HashMap::new();
        let mut parents = HashMap::new();

        for (position, element) in elements.iter().enumerate() {
            // first occurrence wins on duplicate ids
            positions.entry(element.id.as_str()).or_insert(position);

            if element.is_arrow() {
                if let Some(start) = element.start_id() {
                    outgoing.entry(start.as_str()).or_default().push(position);
                }
                if let Some(end) = element.end_id() {
                    incoming.entry(end.as_str()).or_default().push(position);
                }
            }

            if let Some(parent) = element
                .custom_data
                .as_ref()
                .and_then(|data| data.parent_id.as_ref())
            {
                parents.insert(element.id.as_str(), parent.as_str());
            }
        }

        Self {
            elements,
            positions,
            incoming,
            outgoing,
            parents,
        }
    }

    /// The indexed snapshot
    #[inline]
    #[must_use]
    pub fn elements(&self) -> &'a [Element] {
        self.elements
    }

    /// Element by id
    #[inline]
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&'a Element> {
        self.positions.get(id).map(|&position| &self.elements[position])
    }

    /// Scene-order position of an element
    #[inline]
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// Arrows whose end binding targets `id`, in scene order
    pub fn incoming_arrows(&self, id: &str) -> impl Iterator<Item = &'a Element> + '_ {
        self.arrows_at(self.incoming.get(id))
    }

    /// Arrows whose start binding is `id`, in scene order
    pub fn outgoing_arrows(&self, id: &str) -> impl Iterator<Item = &'a Element> + '_ {
        self.arrows_at(self.outgoing.get(id))
    }

    fn arrows_at<'s>(
        &'s self,
        positions: Option<&'s Vec<usize>>,
    ) -> impl Iterator<Item = &'a Element> + 's {
        let elements = self.elements;
        positions
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(move |&position| &elements[position])
    }

    /// First arrow running from `from` to `to`
    #[must_use]
    pub fn arrow_between(&self, from: &str, to: &str) -> Option<&'a Element> {
        self.outgoing_arrows(from)
            .find(|arrow| arrow.end_id().is_some_and(|end| end.as_str() == to))
    }

    /// Declared `customData.parentId`, if it resolves
    #[must_use]
    pub fn declared_parent(&self, id: &str) -> Option<&'a Element> {
        self.parents.get(id).and_then(|parent| self.get(parent))
    }

    /// Non-arrow elements sharing at least one group with `element`
    pub fn group_mates<'s>(&'s self, element: &'s Element) -> impl Iterator<Item = &'a Element> + 's {
        self.elements.iter().filter(move |candidate| {
            candidate.id != element.id
                && !candidate.is_arrow()
                && element.group_ids.iter().any(|group| candidate.in_group(group))
        })
    }

    /// Members of a frame, in scene order
    pub fn frame_members<'s>(&'s self, frame: &'s str) -> impl Iterator<Item = &'a Element> + 's {
        self.elements
            .iter()
            .filter(move |element| element.frame_id.as_ref().is_some_and(|id| id.as_str() == frame))
    }

    /// Anchor arrows: no start binding, carrying a bound label
    pub fn anchor_arrows(&self) -> impl Iterator<Item = &'a Element> + '_ {
        self.elements.iter().filter(|element| {
            element.is_arrow()
                && element.start_binding.is_none()
                && element.bound().any(|bound| bound.kind == ElementKind::Text)
        })
    }

    /// Displayed text of an element
    ///
    /// Text elements answer with their own text; containers (rectangles and
    /// the like) answer with the text of their first bound label.
    #[must_use]
    pub fn display_text(&self, element: &'a Element) -> &'a str {
        if element.text.is_some() {
            return element.text_str();
        }
        element
            .bound()
            .filter(|bound| bound.kind == ElementKind::Text)
            .find_map(|bound| self.get(bound.id.as_str()))
            .map_or("", Element::text_str)
    }
}
