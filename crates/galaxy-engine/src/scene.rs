//! Scene accessor
//!
//! The element list is the one shared mutable resource. Every mutation
//! replaces the whole list; readers get snapshots and must re-fetch after
//! any suspension point.

use galaxy_scene::{Element, ElementId};
use indexmap::IndexSet;
use parking_lot::RwLock;

/// Host canvas
pub trait SceneAccessor: Send + Sync {
    /// Snapshot of the full element list
    fn elements(&self) -> Vec<Element>;

    /// Ids currently selected
    fn selection(&self) -> IndexSet<ElementId>;

    /// Atomically replace the element list
    fn update_scene(&self, elements: Vec<Element>);
}

/// Scene held in memory, used by the host binary and tests
#[derive(Debug, Default)]
pub struct InMemoryScene {
    state: RwLock<SceneState>,
}

#[derive(Debug, Default)]
struct SceneState {
    elements: Vec<Element>,
    selection: IndexSet<ElementId>,
    revision: u64,
}

impl InMemoryScene {
    #[must_use]
    pub fn new(elements: Vec<Element>) -> Self {
        Self {
            state: RwLock::new(SceneState {
                elements,
                ..SceneState::default()
            }),
        }
    }

    /// Replace the selection
    pub fn select<I, T>(&self, ids: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<ElementId>,
    {
        self.state.write().selection = ids.into_iter().map(Into::into).collect();
    }

    /// Number of `update_scene` calls so far
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.state.read().revision
    }

    /// Element by id, cloned
    #[must_use]
    pub fn element(&self, id: &str) -> Option<Element> {
        self.state.read().elements.iter().find(|e| e.id == id).cloned()
    }
}

impl SceneAccessor for InMemoryScene {
    fn elements(&self) -> Vec<Element> {
        self.state.read().elements.clone()
    }

    fn selection(&self) -> IndexSet<ElementId> {
        self.state.read().selection.clone()
    }

    fn update_scene(&self, elements: Vec<Element>) {
        let mut state = self.state.write();
        state.elements = elements;
        state.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_replaces_and_counts() {
        let scene = InMemoryScene::new(vec![Element::text("a", "1")]);
        scene.select(["a"]);
        assert_eq!(scene.selection().len(), 1);

        scene.update_scene(vec![Element::text("b", "2")]);
        assert_eq!(scene.revision(), 1);
        assert!(scene.element("a").is_none());
        assert_eq!(scene.element("b").unwrap().text_str(), "2");
    }
}
