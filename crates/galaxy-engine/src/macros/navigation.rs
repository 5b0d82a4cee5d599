//! Anchor navigation

use crate::error::MacroError;
use crate::invocation::{Macro, MacroCall, MacroContext};
use async_trait::async_trait;
use galaxy_scene::MacroOutput;

/// `jump`: scroll the viewport to the anchor's target; the scene is untouched
#[derive(Debug, Clone, Copy)]
pub struct Jump;

#[async_trait]
impl Macro for Jump {
    async fn call(&self, cx: &MacroContext, call: MacroCall) -> Result<MacroOutput, MacroError> {
        cx.capabilities().navigator()?.scroll_to(&call.output.id);
        tracing::debug!(element = %call.output.id, "jumped");
        Ok(MacroOutput::Unchanged)
    }
}
