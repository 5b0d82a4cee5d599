//! Collaborator capabilities
//!
//! Macros never reach storage, ledgers, prompts or the network directly.
//! Each concern is a narrow trait; the host injects implementations through
//! [`Capabilities`], and a macro asks for the one it needs, failing with
//! [`CollabError::unavailable`] when the host did not provide it.

use crate::error::CollabError;
use crate::invocation::Macro;
use async_trait::async_trait;
use galaxy_scene::{ElementId, MonospaceMetrics, TextMetrics};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// On-canvas and side-panel notifications
pub trait Notifier: Send + Sync {
    /// Transient on-canvas message
    fn toast(&self, message: &str);

    /// Side-panel notification
    fn notify(&self, level: NoticeLevel, message: &str);
}

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Modal dialog content
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptRequest {
    pub title: String,
    pub description: Option<String>,
    pub label: Option<String>,
    pub placeholder: Option<String>,
}

impl PromptRequest {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }
}

/// Modal prompt; both calls suspend the macro until the user answers
///
/// A dismissed modal returns [`CollabError::cancelled`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Prompt: Send + Sync {
    /// Ask for a line of text
    async fn ask(&self, request: PromptRequest) -> Result<String, CollabError>;

    /// Ask for confirmation
    async fn confirm(&self, request: PromptRequest) -> Result<(), CollabError>;
}

/// Scene storage keyed by a user-chosen name
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn put(&self, key: &str, blob: Vec<u8>) -> Result<(), CollabError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CollabError>;
}

/// Reply of a content-addressed upload
///
/// Stores answer either with the link alone or with an `[error, link]` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UploadReply {
    Link(String),
    Pair(Option<String>, Option<String>),
}

impl UploadReply {
    /// Link on success, the store's error otherwise
    pub fn into_link(self) -> Result<String, CollabError> {
        match self {
            Self::Link(link) | Self::Pair(None, Some(link)) => Ok(link),
            Self::Pair(Some(error), _) => Err(CollabError::failed(error)),
            Self::Pair(None, None) => Err(CollabError::failed("upload returned no link")),
        }
    }
}

/// Content-addressed blob store used for cross-user sharing
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn upload(&self, payload: Value) -> Result<UploadReply, CollabError>;

    async fn download(&self, link: &str) -> Result<Value, CollabError>;
}

/// Contract method call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerCall {
    pub method: String,
    pub args: Vec<Value>,
}

impl LedgerCall {
    #[must_use]
    pub fn new(method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }
}

/// Write prepared by the ledger, awaiting user confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedWrite {
    /// Estimated gas for the transaction
    pub gas_estimate: u64,
    /// Opaque handle the ledger uses to submit the write
    pub call: LedgerCall,
}

/// Name to content-link registry
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn read(&self, call: LedgerCall) -> Result<Value, CollabError>;

    /// Estimate a write without submitting it
    async fn prepare_write(&self, call: LedgerCall) -> Result<PreparedWrite, CollabError>;

    /// Submit a prepared write; returns the transaction id
    async fn confirm_write(&self, write: PreparedWrite) -> Result<String, CollabError>;
}

/// Language model completion
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CollabError>;
}

/// Plain HTTP GET
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, CollabError>;
}

/// Directory listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

impl DirEntry {
    #[must_use]
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    #[must_use]
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// Hierarchical path backend for `cat` and `ls`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PathSource: Send + Sync {
    async fn read_file(&self, path: &str) -> Result<String, CollabError>;

    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, CollabError>;
}

/// Viewport control
pub trait Navigator: Send + Sync {
    fn scroll_to(&self, target: &ElementId);
}

/// In-process script runtime for the local definition dialect
pub trait LocalRuntime: Send + Sync {
    /// Compile a function definition into a callable macro
    fn compile(&self, source: &str) -> Result<Arc<dyn Macro>, CollabError>;
}

/// Injected collaborators
#[derive(Clone)]
pub struct Capabilities {
    notifier: Option<Arc<dyn Notifier>>,
    prompt: Option<Arc<dyn Prompt>>,
    kv: Option<Arc<dyn KeyValueStore>>,
    content: Option<Arc<dyn ContentStore>>,
    ledger: Option<Arc<dyn Ledger>>,
    completion: Option<Arc<dyn Completion>>,
    http: Option<Arc<dyn HttpFetcher>>,
    paths: Option<Arc<dyn PathSource>>,
    navigator: Option<Arc<dyn Navigator>>,
    local_runtime: Option<Arc<dyn LocalRuntime>>,
    metrics: Arc<dyn TextMetrics>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            notifier: None,
            prompt: None,
            kv: None,
            content: None,
            ledger: None,
            completion: None,
            http: None,
            paths: None,
            navigator: None,
            local_runtime: None,
            metrics: Arc::new(MonospaceMetrics::default()),
        }
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("notifier", &self.notifier.is_some())
            .field("prompt", &self.prompt.is_some())
            .field("kv", &self.kv.is_some())
            .field("content", &self.content.is_some())
            .field("ledger", &self.ledger.is_some())
            .field("completion", &self.completion.is_some())
            .field("http", &self.http.is_some())
            .field("paths", &self.paths.is_some())
            .field("navigator", &self.navigator.is_some())
            .field("local_runtime", &self.local_runtime.is_some())
            .finish_non_exhaustive()
    }
}

macro_rules! capability {
    ($field:ident, $with:ident, $trait:ident, $what:literal) => {
        #[doc = concat!("Attach the ", $what)]
        #[must_use]
        pub fn $with(mut self, value: Arc<dyn $trait>) -> Self {
            self.$field = Some(value);
            self
        }

        #[doc = concat!("The ", $what, ", if the host provided one")]
        pub fn $field(&self) -> Result<&Arc<dyn $trait>, CollabError> {
            self.$field
                .as_ref()
                .ok_or_else(|| CollabError::unavailable(concat!("no ", $what, " configured")))
        }
    };
}

impl Capabilities {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    capability!(notifier, with_notifier, Notifier, "notifier");
    capability!(prompt, with_prompt, Prompt, "prompt");
    capability!(kv, with_kv, KeyValueStore, "key/value store");
    capability!(content, with_content, ContentStore, "content store");
    capability!(ledger, with_ledger, Ledger, "ledger");
    capability!(completion, with_completion, Completion, "completion backend");
    capability!(http, with_http, HttpFetcher, "HTTP fetcher");
    capability!(paths, with_paths, PathSource, "path source");
    capability!(navigator, with_navigator, Navigator, "navigator");
    capability!(local_runtime, with_local_runtime, LocalRuntime, "local script runtime");

    /// Replace the glyph metrics used for text reflow
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn TextMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    #[inline]
    #[must_use]
    pub fn metrics(&self) -> &dyn TextMetrics {
        self.metrics.as_ref()
    }
}
