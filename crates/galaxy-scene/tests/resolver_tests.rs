use galaxy_scene::{CustomData, Element, ElementId, ResolveError, SceneIndex, TreeResolver};
use galaxy_test_utils::SceneBuilder;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// Text nodes `n0..n{count}` with declared parents and labelled arrows
fn graph(count: usize, parents: &[Option<usize>], arrows: &[(usize, usize)]) -> Vec<Element> {
    let mut builder = SceneBuilder::new();
    for node in 0..count {
        let mut element = Element::text(format!("n{node}"), format!("/{node}"));
        if let Some(Some(parent)) = parents.get(node) {
            element.custom_data = Some(CustomData {
                parent_id: Some(ElementId::from(format!("n{}", parent % count))),
                ..CustomData::default()
            });
        }
        builder = builder.element(element);
    }
    for (edge, (from, to)) in arrows.iter().enumerate() {
        let (from, to) = (format!("n{}", from % count), format!("n{}", to % count));
        builder = builder.link(&format!("e{edge}"), &from, &to, Some(&format!("/e{edge}")));
    }
    builder.build()
}

proptest! {
    #[test]
    fn prop_resolution_terminates_and_is_stable(
        count in 1..12usize,
        parents in proptest::collection::vec(proptest::option::of(0..12usize), 0..12),
        arrows in proptest::collection::vec((0..12usize, 0..12usize), 0..16),
    ) {
        let elements = graph(count, &parents, &arrows);
        let index = SceneIndex::new(&elements);
        let resolver = TreeResolver::new(&index);

        for node in 0..count {
            let id = format!("n{node}");
            let first = resolver.resolve(&id, None);
            let second = resolver.resolve(&id, None);
            prop_assert_eq!(&first, &second);

            match first {
                // every level adds its text and at most one arrow label
                Ok(fragments) => prop_assert!(fragments.len() <= 2 * count),
                Err(ResolveError::CycleDetected { path }) => {
                    prop_assert!(path.len() >= 2);
                    prop_assert!(path.len() <= count + 1);
                    let repeated = path.last().unwrap();
                    prop_assert!(path[..path.len() - 1].contains(repeated));
                }
            }
        }
    }
}

#[test]
fn arrow_cycle_is_detected() {
    let elements = SceneBuilder::new()
        .text("a", "/a")
        .text("b", "/b")
        .link("ab", "a", "b", Some("x"))
        .link("ba", "b", "a", Some("y"))
        .build();
    let index = SceneIndex::new(&elements);
    let err = TreeResolver::new(&index).resolve("a", None).unwrap_err();
    let ResolveError::CycleDetected { path } = err;
    assert_eq!(path, vec![ElementId::from("a"), ElementId::from("b"), ElementId::from("a")]);
}

#[test]
fn self_loop_is_detected() {
    let elements = SceneBuilder::new()
        .text("a", "/a")
        .link("aa", "a", "a", None)
        .build();
    let index = SceneIndex::new(&elements);
    assert!(TreeResolver::new(&index).resolve("a", None).is_err());
}

#[test]
fn url_chain_through_builder() {
    let elements = SceneBuilder::new()
        .text("host", "https://example.com")
        .text("page", "docs")
        .text("out", "")
        .link("e1", "host", "page", None)
        .link("e2", "page", "out", Some("=/index.html"))
        .build();
    let index = SceneIndex::new(&elements);
    let path = TreeResolver::new(&index).full_path("page", Some("out")).unwrap();
    assert_eq!(path, "https://example.com/docs/index.html");
}
