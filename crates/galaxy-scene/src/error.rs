//! Error types for scene resolution and splicing

use crate::element::{ElementId, ElementKind};

/// Tree resolution failures
///
/// Everything except a cycle degrades to empty fragments instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Parent chain revisits an element
    #[error("cycle detected while resolving path: {}", join_ids(.path))]
    CycleDetected {
        /// Walked ids, ending with the repeated one
        path: Vec<ElementId>,
    },
}

/// Splice failures
#[derive(Debug, thiserror::Error)]
pub enum SpliceError {
    /// Output element is not in the scene
    #[error("output element {0} is not in the scene")]
    MissingOutput(ElementId),

    /// Result shape does not fit the output element type
    #[error("{result} result cannot be applied to a {output_kind} element")]
    InvalidResultShape {
        /// Type of the output element
        output_kind: ElementKind,
        /// Shape of the macro result
        result: &'static str,
    },

    /// Frame result without the frame itself
    #[error("result for frame {0} must include the frame element")]
    MissingFrame(ElementId),

    /// Patch produced an invalid element
    #[error("element patch could not be applied: {0}")]
    Patch(#[from] serde_json::Error),
}

fn join_ids(path: &[ElementId]) -> String {
    path.iter()
        .map(ElementId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_display_lists_path() {
        let err = ResolveError::CycleDetected {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "cycle detected while resolving path: a -> b -> a");
    }

    #[test]
    fn shape_display_names_both_sides() {
        let err = SpliceError::InvalidResultShape {
            output_kind: ElementKind::Image,
            result: "element list",
        };
        assert!(err.to_string().contains("image"));
        assert!(err.to_string().contains("element list"));
    }
}
