//! Path resolution over arrow chains
//!
//! Path-like macros (`fetch`, `cat`, `ls`) read a value assembled from every
//! ancestor of the focal element. Ancestors are found, in order of
//! preference, through:
//! 1. an arrow whose end binding is the element,
//! 2. the element's `customData.parentId`,
//! 3. an earlier group-mate that is a rectangle or a `/`-prefixed text.
//!
//! Each level contributes its own text followed by the label of the arrow
//! leading to the next level down (`/` for an unlabeled arrow). Strategy 3
//! only looks backwards in scene order, so on its own it cannot loop; the
//! other two can, and a revisit fails with [`ResolveError::CycleDetected`].

use crate::element::{Element, ElementId, ElementKind};
use crate::error::ResolveError;
use crate::index::SceneIndex;
use crate::label::arrow_label;
use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/-+").expect("placeholder pattern compiles"));

/// How an ancestor was discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentLink {
    /// Real arrow bound to both elements
    Arrow,
    /// `customData.parentId`
    Declared,
    /// Group-membership heuristic
    Group,
}

/// Resolves ancestor paths against one scene snapshot
#[derive(Debug, Clone, Copy)]
pub struct TreeResolver<'i, 'a> {
    index: &'i SceneIndex<'a>,
}

impl<'i, 'a> TreeResolver<'i, 'a> {
    #[inline]
    #[must_use]
    pub fn new(index: &'i SceneIndex<'a>) -> Self {
        Self { index }
    }

    /// Ordered text fragments for `focal`, ending with the label of the
    /// arrow from `focal` to `output` when one exists
    ///
    /// An unknown focal id yields no fragments.
    pub fn resolve(&self, focal: &str, output: Option<&str>) -> Result<Vec<String>, ResolveError> {
        let Some(mut current) = self.index.get(focal) else {
            return Ok(Vec::new());
        };
        let mut below = output.and_then(|id| self.index.get(id));
        let mut visited: IndexSet<&str> = IndexSet::new();
        let mut levels: Vec<Vec<String>> = Vec::new();

        loop {
            visited.insert(current.id.as_str());
            levels.push(self.fragments_for(current, below));

            let Some((parent, _)) = self.parent_of(current) else {
                break;
            };
            if visited.contains(parent.id.as_str()) {
                let mut path: Vec<ElementId> = visited.iter().map(|&id| ElementId::from(id)).collect();
                path.push(parent.id.clone());
                return Err(ResolveError::CycleDetected { path });
            }
            below = Some(current);
            current = parent;
        }

        Ok(levels.into_iter().rev().flatten().collect())
    }

    /// Fragments joined into one path string
    pub fn full_path(&self, focal: &str, output: Option<&str>) -> Result<String, ResolveError> {
        Ok(self.resolve(focal, output)?.concat())
    }

    /// Nearest ancestor of `element` and how it was found
    #[must_use]
    pub fn parent_of(&self, element: &'a Element) -> Option<(&'a Element, ParentLink)> {
        let structural = self
            .index
            .incoming_arrows(element.id.as_str())
            .find_map(|arrow| arrow.start_id().and_then(|start| self.index.get(start.as_str())));
        if let Some(parent) = structural {
            return Some((parent, ParentLink::Arrow));
        }

        if let Some(parent) = self.index.declared_parent(element.id.as_str()) {
            return Some((parent, ParentLink::Declared));
        }

        let position = self.index.position(element.id.as_str())?;
        self.index
            .group_mates(element)
            .filter(|mate| {
                self.index
                    .position(mate.id.as_str())
                    .is_some_and(|mate_position| mate_position < position)
            })
            .find(|mate| {
                mate.kind == ElementKind::Rectangle
                    || (mate.is_text() && mate.text_str().starts_with('/'))
            })
            .map(|mate| (mate, ParentLink::Group))
    }

    fn fragments_for(&self, element: &'a Element, below: Option<&'a Element>) -> Vec<String> {
        let own = self.index.display_text(element);
        let mut fragments = vec![PLACEHOLDER_PREFIX.replace(own, "/").into_owned()];

        if let Some(arrow) =
            below.and_then(|below| self.index.arrow_between(element.id.as_str(), below.id.as_str()))
        {
            let label = arrow_label(arrow, self.index);
            fragments.push(if label.is_empty() { "/".to_string() } else { label });
        }

        fragments
    }
}
