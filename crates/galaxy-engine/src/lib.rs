//! Galaxy Engine - canvas macro execution
//!
//! Drives macros over a shared scene:
//! - Case-insensitive macro registry with built-in macros
//! - Selection scanning with configurable name inference
//! - Sequential batch execution with per-invocation error isolation
//! - Remote execution bridge correlating replies by task id
//! - Debounced selection watcher
//!
//! # Example
//!
//! ```rust
//! use galaxy_engine::{macro_fn, EngineConfig, InMemoryScene, InvocationDescriptor, MacroEngine, MacroOutput};
//! use galaxy_scene::Element;
//! use std::sync::Arc;
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # rt.block_on(async {
//! let scene = Arc::new(InMemoryScene::new(vec![Element::text("a", "5"), Element::text("b", "")]));
//! let engine = MacroEngine::new(EngineConfig::default(), scene.clone());
//! engine.register_macro(
//!     "incrementByOne",
//!     macro_fn(|call| async move {
//!         let value: f64 = call.input.text_str().trim().parse().unwrap_or(0.0);
//!         Ok(MacroOutput::number(value + 1.0))
//!     }),
//! );
//!
//! let report = engine
//!     .invoke("incrementbyone", &[InvocationDescriptor::new("incrementByOne", "a", "b")])
//!     .await;
//! assert!(report.is_success());
//! assert_eq!(scene.element("b").unwrap().text_str(), "6");
//! # });
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod bridge;
pub mod capability;
pub mod config;
pub mod engine;
pub mod error;
pub mod invocation;
pub mod macros;
pub mod registry;
pub mod scan;
pub mod scene;
pub mod watch;

pub use bridge::{BridgeReply, BridgeRequest, BridgeTransport, ChannelTransport, Dialect, RemoteBridge, TaskId};
pub use capability::{
    Capabilities, Completion, ContentStore, DirEntry, HttpFetcher, KeyValueStore, Ledger, LedgerCall,
    LocalRuntime, Navigator, NoticeLevel, Notifier, PathSource, PreparedWrite, Prompt, PromptRequest,
    UploadReply,
};
pub use config::{EngineConfig, InferencePolicy};
pub use engine::{BatchReport, MacroEngine};
pub use error::{BindingRole, BridgeError, CollabError, CollabErrorKind, ConfigError, MacroError};
pub use invocation::{macro_fn, FnMacro, Macro, MacroCall, MacroContext};
pub use registry::MacroRegistry;
pub use scan::{InvocationDescriptor, SelectionScan, SelectionScanner};
pub use scene::{InMemoryScene, SceneAccessor};
pub use watch::SelectionWatcher;

pub use galaxy_scene::MacroOutput;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
