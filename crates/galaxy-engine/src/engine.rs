//! Macro engine
//!
//! The dispatcher and batch loop:
//! - Looks macros up by case-insensitive name and runs them
//! - Resolves invocation ids against a fresh scene snapshot
//! - Splices each result back and publishes the new scene
//! - Isolates failures per invocation
//!
//! Invocations in one batch run strictly one after another, so invocation
//! *i + 1* always sees the scene produced by invocation *i*.

use crate::bridge::RemoteBridge;
use crate::capability::{Capabilities, NoticeLevel};
use crate::config::EngineConfig;
use crate::error::MacroError;
use crate::invocation::{Macro, MacroCall, MacroContext};
use crate::registry::MacroRegistry;
use crate::scan::{InvocationDescriptor, SelectionScan, SelectionScanner};
use crate::scene::SceneAccessor;
use galaxy_scene::{Element, MacroOutput, SceneIndex, Splicer};
use std::sync::Arc;

/// Outcome of one batch
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Macro the batch ran
    pub macro_name: String,
    /// Invocations whose result was applied
    pub applied: Vec<InvocationDescriptor>,
    /// Invocations that failed, with their error
    pub failed: Vec<(InvocationDescriptor, MacroError)>,
}

impl BatchReport {
    /// Whether every invocation succeeded
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Invocations attempted
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.applied.len() + self.failed.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owns the registry and drives macros against a scene
pub struct MacroEngine {
    config: Arc<EngineConfig>,
    registry: Arc<MacroRegistry>,
    scene: Arc<dyn SceneAccessor>,
    capabilities: Capabilities,
    bridge: Option<Arc<RemoteBridge>>,
}

impl std::fmt::Debug for MacroEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacroEngine")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("capabilities", &self.capabilities)
            .field("bridge", &self.bridge)
            .finish_non_exhaustive()
    }
}

impl MacroEngine {
    /// Engine over `scene` with the built-in macros registered
    #[must_use]
    pub fn new(config: EngineConfig, scene: Arc<dyn SceneAccessor>) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(MacroRegistry::with_defaults()),
            scene,
            capabilities: Capabilities::default(),
            bridge: None,
        }
    }

    /// Replace the registry, e.g. with an empty one
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<MacroRegistry>) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Attach the remote bridge used by remote definition dialects
    #[must_use]
    pub fn with_bridge(mut self, bridge: Arc<RemoteBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<MacroRegistry> {
        &self.registry
    }

    #[inline]
    #[must_use]
    pub fn scene(&self) -> &Arc<dyn SceneAccessor> {
        &self.scene
    }

    /// Register a macro under a case-insensitive name
    pub fn register_macro(&self, name: &str, macro_impl: Arc<dyn Macro>) {
        self.registry.register(name, macro_impl);
    }

    /// Case-insensitive lookup
    #[must_use]
    pub fn get_macro(&self, name: &str) -> Option<Arc<dyn Macro>> {
        self.registry.get(name)
    }

    /// Scan the live selection
    #[must_use]
    pub fn scan_selection(&self) -> SelectionScan {
        let elements = self.scene.elements();
        let selection = self.scene.selection();
        SelectionScanner::new(&self.registry, &self.config.inference).scan(&elements, &selection)
    }

    /// Run one macro and return its result without touching the scene
    ///
    /// # Errors
    /// `MacroNotRegistered` on a lookup miss; otherwise whatever the macro
    /// returns.
    pub async fn execute_macro(
        &self,
        name: &str,
        input: Element,
        output: Element,
        argument: Option<String>,
    ) -> Result<MacroOutput, MacroError> {
        let macro_impl = self
            .registry
            .get(name)
            .ok_or_else(|| MacroError::MacroNotRegistered(name.to_lowercase()))?;
        let cx = self.context();
        let call = MacroCall::new(name, input, output).with_argument(argument);

        tracing::info!(macro_name = %call.name, input = %call.input.id, output = %call.output.id, "executing macro");
        macro_impl.call(&cx, call).await
    }

    /// Run one invocation and apply its result to the scene
    ///
    /// Ids are resolved against the scene as it is now; the result is
    /// spliced into the scene as it is after the macro returns.
    pub async fn run_invocation(
        &self,
        name: &str,
        descriptor: &InvocationDescriptor,
    ) -> Result<MacroOutput, MacroError> {
        let (input, output) = {
            let elements = self.scene.elements();
            let index = SceneIndex::new(&elements);
            let input = index
                .get(descriptor.input_from.as_str())
                .cloned()
                .ok_or_else(|| MacroError::missing_input(descriptor.input_from.clone()))?;
            let output = descriptor
                .output_to
                .as_ref()
                .and_then(|id| index.get(id.as_str()))
                .cloned()
                .ok_or_else(|| MacroError::missing_output(descriptor.output_to.clone()))?;
            (input, output)
        };

        let output_id = output.id.clone();
        let result = self
            .execute_macro(name, input, output, descriptor.argument.clone())
            .await?;
        if matches!(result, MacroOutput::Unchanged) {
            return Ok(result);
        }

        let latest = self.scene.elements();
        let next = self
            .splicer()
            .splice(&latest, output_id.as_str(), result.clone())?;
        tracing::debug!(macro_name = %name, output = %output_id, shape = result.shape(), "splicing result");
        self.scene.update_scene(next);
        Ok(result)
    }

    /// Run every invocation of `name` in order
    ///
    /// A failing invocation is reported through a toast (and optionally
    /// written into its output) and the batch moves on.
    pub async fn invoke(&self, name: &str, invocations: &[InvocationDescriptor]) -> BatchReport {
        let mut report = BatchReport {
            macro_name: name.to_lowercase(),
            ..BatchReport::default()
        };
        tracing::info!(macro_name = %report.macro_name, count = invocations.len(), "running macro batch");

        for descriptor in invocations {
            match self.run_invocation(name, descriptor).await {
                Ok(_) => report.applied.push(descriptor.clone()),
                Err(err) => {
                    tracing::error!(macro_name = %report.macro_name, input = %descriptor.input_from, error = %err, "macro invocation failed");
                    self.surface_error(descriptor, &err);
                    report.failed.push((descriptor.clone(), err));
                }
            }
        }
        report
    }

    /// Scan the live selection and run every invocation of `name`
    pub async fn invoke_selected(&self, name: &str) -> BatchReport {
        let scan = self.scan_selection();
        let invocations = scan.get(name).to_vec();
        self.invoke(name, &invocations).await
    }

    fn surface_error(&self, descriptor: &InvocationDescriptor, err: &MacroError) {
        let message = err.to_string();
        if let Ok(notifier) = self.capabilities.notifier() {
            notifier.toast(&message);
            if !err.is_user_cancellation() {
                notifier.notify(NoticeLevel::Error, &message);
            }
        }

        if !self.config.write_errors_to_output {
            return;
        }
        let Some(output_id) = &descriptor.output_to else {
            return;
        };
        let latest = self.scene.elements();
        let is_text = latest.iter().any(|e| e.id == *output_id && e.is_text());
        if !is_text {
            return;
        }
        match self
            .splicer()
            .splice(&latest, output_id.as_str(), MacroOutput::Text(message))
        {
            Ok(next) => self.scene.update_scene(next),
            Err(splice_err) => {
                tracing::warn!(output = %output_id, error = %splice_err, "could not write error to output");
            }
        }
    }

    fn splicer(&self) -> Splicer<'_> {
        Splicer::new(self.config.layout, self.capabilities.metrics())
    }

    fn context(&self) -> MacroContext {
        MacroContext::new(
            self.scene.elements(),
            Arc::clone(&self.registry),
            self.capabilities.clone(),
            Arc::clone(&self.config),
        )
        .with_live_scene(Arc::clone(&self.scene))
        .with_bridge(self.bridge.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::macro_fn;
    use crate::scene::InMemoryScene;
    use galaxy_scene::ElementKind;

    fn engine(elements: Vec<Element>) -> (MacroEngine, Arc<InMemoryScene>) {
        let scene = Arc::new(InMemoryScene::new(elements));
        let engine = MacroEngine::new(EngineConfig::default(), scene.clone())
            .with_registry(Arc::new(MacroRegistry::new()));
        (engine, scene)
    }

    #[tokio::test]
    async fn execute_unknown_is_not_registered() {
        let (engine, _) = engine(Vec::new());
        let err = engine
            .execute_macro("Nope", Element::text("a", ""), Element::text("b", ""), None)
            .await
            .unwrap_err();
        assert!(matches!(err, MacroError::MacroNotRegistered(ref name) if name == "nope"));
    }

    #[tokio::test]
    async fn missing_input_is_reported() {
        let (engine, _) = engine(vec![Element::text("out", "")]);
        engine.register_macro("x", macro_fn(|_| async { Ok(MacroOutput::from("y")) }));
        let err = engine
            .run_invocation("x", &InvocationDescriptor::new("x", "gone", "out"))
            .await
            .unwrap_err();
        assert!(matches!(err, MacroError::MissingBinding { .. }));
    }

    #[tokio::test]
    async fn unchanged_result_skips_update() {
        let (engine, scene) = engine(vec![Element::text("a", "")]);
        engine.register_macro("noop", macro_fn(|_| async { Ok(MacroOutput::Unchanged) }));
        let report = engine
            .invoke("noop", &[InvocationDescriptor::new("noop", "a", "a")])
            .await;
        assert!(report.is_success());
        assert_eq!(scene.revision(), 0);
    }

    #[tokio::test]
    async fn errors_written_to_text_output_when_enabled() {
        let scene = Arc::new(InMemoryScene::new(vec![
            Element::text("in", "x"),
            Element::text("out", "old"),
            Element::new("frame", ElementKind::Frame),
        ]));
        let engine = MacroEngine::new(EngineConfig::default().with_errors_to_output(true), scene.clone());
        let report = engine
            .invoke(
                "missing",
                &[
                    InvocationDescriptor::new("missing", "in", "out"),
                    InvocationDescriptor::new("missing", "in", "frame"),
                ],
            )
            .await;
        assert_eq!(report.failed.len(), 2);
        assert_eq!(scene.element("out").unwrap().text_str(), "macro `missing` is not registered");
        // non-text outputs are left alone
        assert!(scene.element("frame").unwrap().name.is_none());
    }
}
