//! Macro trait and invocation context
//!
//! A macro is an async function of `(input, output)` returning a
//! [`MacroOutput`]. It receives a [`MacroContext`] carrying the scene
//! snapshot taken at dispatch, the registry (definition macros register
//! into it), the injected collaborators and the remote bridge. Macros that
//! read the scene after an await call [`MacroContext::refreshed`] first.

use crate::bridge::RemoteBridge;
use crate::capability::Capabilities;
use crate::config::EngineConfig;
use crate::error::MacroError;
use crate::registry::MacroRegistry;
use crate::scene::SceneAccessor;
use async_trait::async_trait;
use galaxy_scene::{Element, MacroOutput, SceneIndex, TreeResolver};
use std::future::Future;
use std::sync::Arc;

/// One macro application
#[derive(Debug, Clone, PartialEq)]
pub struct MacroCall {
    /// Name the macro was invoked under, lowercased
    pub name: String,
    /// Element the macro reads
    pub input: Element,
    /// Element the result is spliced into
    pub output: Element,
    /// Text inside `name(...)`, or the whole label for inferred macros
    pub argument: Option<String>,
}

impl MacroCall {
    #[must_use]
    pub fn new(name: impl Into<String>, input: Element, output: Element) -> Self {
        Self {
            name: name.into().to_lowercase(),
            input,
            output,
            argument: None,
        }
    }

    #[must_use]
    pub fn with_argument(mut self, argument: Option<String>) -> Self {
        self.argument = argument;
        self
    }
}

/// Executable macro
#[async_trait]
pub trait Macro: Send + Sync {
    /// Run against one input/output pair
    ///
    /// The result is returned as-is; there is no retry.
    async fn call(&self, cx: &MacroContext, call: MacroCall) -> Result<MacroOutput, MacroError>;
}

/// Adapter turning an async closure over [`MacroCall`] into a [`Macro`]
pub struct FnMacro<F>(F);

#[async_trait]
impl<F, Fut> Macro for FnMacro<F>
where
    F: Fn(MacroCall) -> Fut + Send + Sync,
    Fut: Future<Output = Result<MacroOutput, MacroError>> + Send,
{
    async fn call(&self, _cx: &MacroContext, call: MacroCall) -> Result<MacroOutput, MacroError> {
        (self.0)(call).await
    }
}

/// Wrap an async closure as a registrable macro
///
/// ```rust
/// use galaxy_engine::{macro_fn, MacroOutput};
///
/// let increment = macro_fn(|call| async move {
///     let value: f64 = call.input.text_str().trim().parse().unwrap_or(0.0);
///     Ok(MacroOutput::number(value + 1.0))
/// });
/// # let _ = increment;
/// ```
pub fn macro_fn<F, Fut>(f: F) -> Arc<dyn Macro>
where
    F: Fn(MacroCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<MacroOutput, MacroError>> + Send + 'static,
{
    Arc::new(FnMacro(f))
}

/// Everything a macro body may consult
#[derive(Clone)]
pub struct MacroContext {
    scene: Arc<Vec<Element>>,
    live: Option<Arc<dyn SceneAccessor>>,
    registry: Arc<MacroRegistry>,
    capabilities: Capabilities,
    bridge: Option<Arc<RemoteBridge>>,
    config: Arc<EngineConfig>,
}

impl MacroContext {
    #[must_use]
    pub fn new(
        scene: Vec<Element>,
        registry: Arc<MacroRegistry>,
        capabilities: Capabilities,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            scene: Arc::new(scene),
            live: None,
            registry,
            capabilities,
            bridge: None,
            config,
        }
    }

    #[must_use]
    pub fn with_bridge(mut self, bridge: Option<Arc<RemoteBridge>>) -> Self {
        self.bridge = bridge;
        self
    }

    /// Scene that [`refreshed`](Self::refreshed) re-reads
    #[must_use]
    pub fn with_live_scene(mut self, live: Arc<dyn SceneAccessor>) -> Self {
        self.live = Some(live);
        self
    }

    /// Context over the scene as it is now
    ///
    /// Without a live scene attached the dispatch snapshot is kept.
    #[must_use]
    pub fn refreshed(&self) -> Self {
        let mut next = self.clone();
        if let Some(live) = &self.live {
            next.scene = Arc::new(live.elements());
        }
        next
    }

    /// Snapshot taken at dispatch or at the last [`refreshed`](Self::refreshed)
    ///
    /// Anything awaited since may have changed the live scene.
    #[inline]
    #[must_use]
    pub fn scene(&self) -> &[Element] {
        &self.scene
    }

    #[inline]
    #[must_use]
    pub fn index(&self) -> SceneIndex<'_> {
        SceneIndex::new(&self.scene)
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &MacroRegistry {
        &self.registry
    }

    #[inline]
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Remote bridge, required by remote definition dialects
    pub fn bridge(&self) -> Result<&RemoteBridge, MacroError> {
        self.bridge
            .as_deref()
            .ok_or_else(|| MacroError::BridgeExecution("no remote execution bridge attached".into()))
    }

    /// Full ancestor path of the call's input, ending with its arrow label
    pub fn tree_path(&self, call: &MacroCall) -> Result<String, MacroError> {
        let index = self.index();
        let path = TreeResolver::new(&index)
            .full_path(call.input.id.as_str(), Some(call.output.id.as_str()))?;
        Ok(path)
    }

    /// Snapshot copy of `element`, or `element` itself once it is gone
    #[must_use]
    pub fn current(&self, element: &Element) -> Element {
        self.index()
            .get(element.id.as_str())
            .cloned()
            .unwrap_or_else(|| element.clone())
    }

    /// Own text, or the bound label text of a shape
    #[must_use]
    pub fn display_text(&self, element: &Element) -> String {
        let index = self.index();
        match index.get(element.id.as_str()) {
            Some(live) => index.display_text(live).to_string(),
            None => element.text_str().to_string(),
        }
    }
}

impl std::fmt::Debug for MacroContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacroContext")
            .field("elements", &self.scene.len())
            .field("live", &self.live.is_some())
            .field("registry", &self.registry)
            .field("capabilities", &self.capabilities)
            .field("bridge", &self.bridge)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(scene: Vec<Element>) -> MacroContext {
        MacroContext::new(
            scene,
            Arc::new(MacroRegistry::new()),
            Capabilities::default(),
            Arc::new(EngineConfig::default()),
        )
    }

    #[tokio::test]
    async fn closure_macro_sees_call() {
        let echo = macro_fn(|call| async move {
            Ok(MacroOutput::Text(format!("{}:{}", call.name, call.input.text_str())))
        });
        let cx = context(Vec::new());
        let call = MacroCall::new("Echo", Element::text("a", "hi"), Element::text("b", ""));
        let out = echo.call(&cx, call).await.unwrap();
        assert_eq!(out, MacroOutput::Text("echo:hi".into()));
    }

    #[test]
    fn bridge_is_required_when_asked() {
        let cx = context(Vec::new());
        assert!(matches!(cx.bridge(), Err(MacroError::BridgeExecution(_))));
    }

    #[test]
    fn refreshed_rereads_live_scene() {
        let live = Arc::new(crate::scene::InMemoryScene::new(vec![Element::text("a", "old")]));
        let cx = context(live.elements()).with_live_scene(live.clone());
        live.update_scene(vec![Element::text("a", "new"), Element::text("b", "")]);

        assert_eq!(cx.current(&Element::text("a", "")).text_str(), "old");
        let cx = cx.refreshed();
        assert_eq!(cx.scene().len(), 2);
        assert_eq!(cx.current(&Element::text("a", "")).text_str(), "new");
        assert_eq!(context(Vec::new()).refreshed().scene().len(), 0);
    }

    #[test]
    fn display_text_falls_back_to_input() {
        let cx = context(Vec::new());
        assert_eq!(cx.display_text(&Element::text("x", "detached")), "detached");
    }
}
