//! Testing utilities for the galaxy workspace
//!
//! Scene fixtures and recording collaborator fakes.

#![allow(missing_docs)]

use async_trait::async_trait;
use galaxy_engine::{
    BridgeReply, BridgeRequest, ChannelTransport, CollabError, Completion, DirEntry, KeyValueStore,
    Navigator, NoticeLevel, Notifier, PathSource, Prompt, PromptRequest, RemoteBridge,
};
use galaxy_scene::{Binding, BoundElement, CustomData, Element, ElementId, ElementKind};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Builds element lists the way the canvas converts skeletons: an arrow
/// with a label gets a bound text element `<arrow id>-label`, and both
/// endpoints list the arrow in their `boundElements`.
///
/// Endpoints must be added before the arrows that bind them.
#[derive(Debug, Default, Clone)]
pub struct SceneBuilder {
    elements: Vec<Element>,
}

impl SceneBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(self, id: &str, text: &str) -> Self {
        self.element(Element::text(id, text).sized(200.0, 25.0))
    }

    #[must_use]
    pub fn frame(self, id: &str) -> Self {
        self.element(Element::new(id, ElementKind::Frame).sized(400.0, 300.0))
    }

    #[must_use]
    pub fn rectangle(self, id: &str) -> Self {
        self.element(Element::new(id, ElementKind::Rectangle).sized(200.0, 100.0))
    }

    #[must_use]
    pub fn element(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    /// Place an existing element inside a frame
    #[must_use]
    pub fn in_frame(mut self, id: &str, frame: &str) -> Self {
        if let Some(element) = self.elements.iter_mut().find(|e| e.id == id) {
            element.frame_id = Some(frame.into());
        }
        self
    }

    /// Declare macros on an existing element
    #[must_use]
    pub fn with_macros(mut self, id: &str, macros: &[&str], output_to: Option<&str>) -> Self {
        if let Some(element) = self.elements.iter_mut().find(|e| e.id == id) {
            let data = element.custom_data.get_or_insert_with(CustomData::default);
            data.macros.extend(macros.iter().map(|name| (*name).to_string()));
            data.output_to = output_to.map(ElementId::from);
        }
        self
    }

    /// Arrow between optional endpoints with an optional label
    #[must_use]
    pub fn arrow(mut self, id: &str, from: Option<&str>, to: Option<&str>, label: Option<&str>) -> Self {
        let mut arrow = Element::new(id, ElementKind::Arrow);
        arrow.start_binding = from.map(Binding::to);
        arrow.end_binding = to.map(Binding::to);

        for element in &mut self.elements {
            if Some(element.id.as_str()) == from || Some(element.id.as_str()) == to {
                element
                    .bound_elements
                    .get_or_insert_with(Vec::new)
                    .push(BoundElement {
                        id: id.into(),
                        kind: ElementKind::Arrow,
                    });
            }
        }

        self.elements.push(arrow);
        if let Some(text) = label {
            let label_id = format!("{id}-label");
            if let Some(arrow) = self.elements.last_mut() {
                arrow.bound_elements = Some(vec![BoundElement {
                    id: label_id.as_str().into(),
                    kind: ElementKind::Text,
                }]);
            }
            self.elements.push(Element::text(label_id, text));
        }
        self
    }

    /// Bound arrow `from` → `to`
    #[must_use]
    pub fn link(self, id: &str, from: &str, to: &str, label: Option<&str>) -> Self {
        self.arrow(id, Some(from), Some(to), label)
    }

    /// Unbound arrow carrying a caption, optionally pointing at `to`
    #[must_use]
    pub fn anchor(self, id: &str, to: Option<&str>, caption: &str) -> Self {
        self.arrow(id, None, to, Some(caption))
    }

    #[must_use]
    pub fn build(self) -> Vec<Element> {
        self.elements
    }
}

/// Records every toast and notification
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    toasts: Mutex<Vec<String>>,
    notices: Mutex<Vec<(NoticeLevel, String)>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[must_use]
    pub fn toasts(&self) -> Vec<String> {
        self.toasts.lock().clone()
    }

    #[must_use]
    pub fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.notices.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn toast(&self, message: &str) {
        self.toasts.lock().push(message.to_string());
    }

    fn notify(&self, level: NoticeLevel, message: &str) {
        self.notices.lock().push((level, message.to_string()));
    }
}

/// Answers prompts from a queue; an exhausted queue cancels
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<Result<String, CollabError>>>,
    asked: Mutex<Vec<PromptRequest>>,
}

impl ScriptedPrompt {
    #[must_use]
    pub fn answering(answers: &[&str]) -> Arc<Self> {
        let prompt = Self::default();
        prompt
            .answers
            .lock()
            .extend(answers.iter().map(|answer| Ok((*answer).to_string())));
        Arc::new(prompt)
    }

    /// Titles of every modal shown so far
    #[must_use]
    pub fn titles(&self) -> Vec<String> {
        self.asked.lock().iter().map(|request| request.title.clone()).collect()
    }

    fn next(&self, request: PromptRequest) -> Result<String, CollabError> {
        self.asked.lock().push(request);
        self.answers
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(CollabError::cancelled("modal dismissed")))
    }
}

#[async_trait]
impl Prompt for ScriptedPrompt {
    async fn ask(&self, request: PromptRequest) -> Result<String, CollabError> {
        self.next(request)
    }

    async fn confirm(&self, request: PromptRequest) -> Result<(), CollabError> {
        self.next(request).map(|_| ())
    }
}

/// In-memory key/value store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Stored value decoded as JSON
    #[must_use]
    pub fn json(&self, key: &str) -> Option<serde_json::Value> {
        self.entries
            .lock()
            .get(key)
            .and_then(|blob| serde_json::from_slice(blob).ok())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn put(&self, key: &str, blob: Vec<u8>) -> Result<(), CollabError> {
        self.entries.lock().insert(key.to_string(), blob);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CollabError> {
        Ok(self.entries.lock().get(key).cloned())
    }
}

/// Fixed directory tree: path → file body, directory path → entries
#[derive(Debug, Default)]
pub struct StaticPaths {
    files: HashMap<String, String>,
    dirs: HashMap<String, Vec<DirEntry>>,
}

impl StaticPaths {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn file(mut self, path: &str, body: &str) -> Self {
        self.files.insert(path.to_string(), body.to_string());
        self
    }

    #[must_use]
    pub fn dir(mut self, path: &str, entries: Vec<DirEntry>) -> Self {
        self.dirs.insert(path.to_string(), entries);
        self
    }
}

#[async_trait]
impl PathSource for StaticPaths {
    async fn read_file(&self, path: &str) -> Result<String, CollabError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| CollabError::failed(format!("no such file: {path}")))
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, CollabError> {
        self.dirs
            .get(path)
            .cloned()
            .ok_or_else(|| CollabError::failed(format!("no such directory: {path}")))
    }
}

/// Completion backend answering `"<prompt>!"`
#[derive(Debug, Default)]
pub struct EchoCompletion;

#[async_trait]
impl Completion for EchoCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CollabError> {
        Ok(format!("{prompt}!"))
    }
}

/// Records viewport jumps
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    targets: Mutex<Vec<ElementId>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[must_use]
    pub fn targets(&self) -> Vec<ElementId> {
        self.targets.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn scroll_to(&self, target: &ElementId) {
        self.targets.lock().push(target.clone());
    }
}

/// Bridge whose runner is an in-process function
///
/// Must be called from within a tokio runtime.
pub fn scripted_bridge<F>(runner: F) -> Arc<RemoteBridge>
where
    F: Fn(&BridgeRequest) -> BridgeReply + Send + 'static,
{
    let (transport, mut requests) = ChannelTransport::new();
    let bridge = Arc::new(RemoteBridge::new(Arc::new(transport)));
    let replies = Arc::downgrade(&bridge);
    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            let reply = runner(&request);
            match replies.upgrade() {
                Some(bridge) => {
                    bridge.resolve(request.task_id, reply);
                }
                None => break,
            }
        }
    });
    bridge
}
