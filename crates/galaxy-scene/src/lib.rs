//! Galaxy Scene - element graph for canvas macros
//!
//! The pure, synchronous half of the macro engine:
//! - Element model with a typed macro-trigger sidecar
//! - Relation tables over a scene snapshot
//! - Arrow label parsing
//! - Ancestor path resolution over arrow chains
//! - Splicing macro results back into the element list
//!
//! # Example
//!
//! ```rust
//! use galaxy_scene::{Element, MacroOutput, Splicer};
//!
//! let scene = vec![Element::text("in", "5"), Element::text("out", "placeholder")];
//! let next = Splicer::default()
//!     .splice(&scene, "out", MacroOutput::from("6"))
//!     .unwrap();
//! assert_eq!(next[1].text_str(), "6");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod element;
pub mod error;
pub mod index;
pub mod label;
pub mod layout;
pub mod splice;
pub mod tree;

pub use element::{Binding, BoundElement, CustomData, Element, ElementId, ElementKind, ElementPatch};
pub use error::{ResolveError, SpliceError};
pub use index::SceneIndex;
pub use label::{arrow_label, LabelCall};
pub use layout::{Bounds, MonospaceMetrics, TextLayout, TextMetrics, DEFAULT_FONT_SIZE};
pub use splice::{MacroOutput, Splicer};
pub use tree::{ParentLink, TreeResolver};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
