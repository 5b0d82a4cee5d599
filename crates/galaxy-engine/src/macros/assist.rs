//! Language model macros

use crate::error::MacroError;
use crate::invocation::{Macro, MacroCall, MacroContext};
use async_trait::async_trait;
use galaxy_scene::MacroOutput;

/// `complete`: apply the label (or argument) as an instruction to the input text
#[derive(Debug, Clone, Copy)]
pub struct Complete;

#[async_trait]
impl Macro for Complete {
    async fn call(&self, cx: &MacroContext, call: MacroCall) -> Result<MacroOutput, MacroError> {
        let text = cx.display_text(&call.input);
        let prompt = match call.argument.as_deref().map(str::trim) {
            Some(instruction) if !instruction.is_empty() => format!("{instruction}\n\n{text}"),
            _ => text,
        };
        let answer = cx.capabilities().completion()?.complete(&prompt).await?;
        Ok(MacroOutput::Text(answer))
    }
}

/// `prompt`: send the input text as-is
#[derive(Debug, Clone, Copy)]
pub struct PromptCompletion;

#[async_trait]
impl Macro for PromptCompletion {
    async fn call(&self, cx: &MacroContext, call: MacroCall) -> Result<MacroOutput, MacroError> {
        let text = cx.display_text(&call.input);
        if text.trim().is_empty() {
            return Err(MacroError::InvalidInput("nothing to send: input has no text".into()));
        }
        let answer = cx.capabilities().completion()?.complete(&text).await?;
        Ok(MacroOutput::Text(answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Capabilities, MockCompletion};
    use crate::config::EngineConfig;
    use crate::registry::MacroRegistry;
    use galaxy_scene::Element;
    use std::sync::Arc;

    fn context(completion: MockCompletion) -> MacroContext {
        MacroContext::new(
            Vec::new(),
            Arc::new(MacroRegistry::new()),
            Capabilities::new().with_completion(Arc::new(completion)),
            Arc::new(EngineConfig::default()),
        )
    }

    #[tokio::test]
    async fn complete_prefixes_instruction() {
        let mut completion = MockCompletion::new();
        completion
            .expect_complete()
            .withf(|prompt| prompt == "translate to french\n\ngood morning")
            .returning(|_| Ok("bonjour".to_string()));
        let call = MacroCall::new("complete", Element::text("a", "good morning"), Element::text("b", ""))
            .with_argument(Some("translate to french".into()));
        let out = Complete.call(&context(completion), call).await.unwrap();
        assert_eq!(out, MacroOutput::Text("bonjour".into()));
    }

    #[tokio::test]
    async fn prompt_sends_input_alone() {
        let mut completion = MockCompletion::new();
        completion
            .expect_complete()
            .withf(|prompt| prompt == "what is 2 + 2?")
            .returning(|_| Ok("4".to_string()));
        let call = MacroCall::new("prompt", Element::text("a", "what is 2 + 2?"), Element::text("b", ""));
        assert_eq!(
            PromptCompletion.call(&context(completion), call).await.unwrap(),
            MacroOutput::Text("4".into())
        );
    }

    #[tokio::test]
    async fn prompt_rejects_empty_input() {
        let call = MacroCall::new("prompt", Element::text("a", "  "), Element::text("b", ""));
        let err = PromptCompletion
            .call(&context(MockCompletion::new()), call)
            .await
            .unwrap_err();
        assert!(matches!(err, MacroError::InvalidInput(_)));
    }
}
