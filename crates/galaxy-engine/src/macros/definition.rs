//! Definition macros
//!
//! A definition macro reads source code from a text element, extracts the
//! declared function name and registers a new macro under it. The local
//! dialect compiles through an injected [`LocalRuntime`]; the remote
//! dialects route every later invocation through the [`RemoteBridge`].
//!
//! [`LocalRuntime`]: crate::capability::LocalRuntime
//! [`RemoteBridge`]: crate::bridge::RemoteBridge

use crate::bridge::Dialect;
use crate::error::MacroError;
use crate::invocation::{Macro, MacroCall, MacroContext};
use async_trait::async_trait;
use chrono::Local;
use galaxy_scene::{ElementPatch, MacroOutput};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::sync::Arc;

static JS_FUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"function (\w+)\(").expect("function pattern compiles"));
static PY_FUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"def (\w+)\(([^)]*)\)").expect("def pattern compiles"));

/// Supported scripting dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionDialect {
    /// In-process, compiled by the host's local runtime
    Local,
    /// Sandboxed JavaScript runner
    Deno,
    /// Sandboxed Python interpreter
    Python,
}

impl DefinitionDialect {
    /// Name the definition macro is registered under
    #[must_use]
    pub fn macro_name(self) -> &'static str {
        match self {
            Self::Local => "js",
            Self::Deno => "deno",
            Self::Python => "python",
        }
    }

    /// Declared function name, with the dialect's default when it has one
    #[must_use]
    pub fn function_name(self, source: &str) -> Option<String> {
        let declared = match self {
            Self::Local | Self::Deno => JS_FUNCTION.captures(source),
            Self::Python => PY_FUNCTION.captures(source),
        }
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str().to_string());

        declared.or_else(|| match self {
            Self::Local => Some("Anonymous".to_string()),
            Self::Deno => Some("AnonymousDeno".to_string()),
            Self::Python => None,
        })
    }
}

/// Registers the function defined in the input element
#[derive(Debug, Clone, Copy)]
pub struct DefineMacro {
    dialect: DefinitionDialect,
}

impl DefineMacro {
    #[inline]
    #[must_use]
    pub fn new(dialect: DefinitionDialect) -> Self {
        Self { dialect }
    }
}

#[async_trait]
impl Macro for DefineMacro {
    async fn call(&self, cx: &MacroContext, call: MacroCall) -> Result<MacroOutput, MacroError> {
        if !call.input.is_text() {
            return Err(MacroError::InvalidInput(format!(
                "{} definitions must be text elements, got {}",
                self.dialect.macro_name(),
                call.input.kind
            )));
        }
        let source = call.input.text_str();
        let name = self.dialect.function_name(source).ok_or_else(|| {
            MacroError::InvalidInput("failed to extract function name from definition".into())
        })?;

        let body: Arc<dyn Macro> = match self.dialect {
            DefinitionDialect::Local => cx.capabilities().local_runtime()?.compile(source)?,
            DefinitionDialect::Deno => Arc::new(RemoteFunction::deno(source)),
            DefinitionDialect::Python => Arc::new(RemoteFunction::python(source, &name)),
        };
        cx.registry().register(&name, body);

        let stamp = format!("{name} registered at {}", Local::now().format("%H:%M:%S"));
        Ok(match self.dialect {
            DefinitionDialect::Python => ElementPatch::text(stamp).into(),
            DefinitionDialect::Local | DefinitionDialect::Deno => stamp.into(),
        })
    }
}

/// Macro whose body runs behind the remote bridge
#[derive(Debug, Clone)]
struct RemoteFunction {
    dialect: Dialect,
    source: String,
    /// Python function to call, and whether it takes the input text
    entry: Option<(String, bool)>,
}

impl RemoteFunction {
    fn deno(source: &str) -> Self {
        Self {
            dialect: Dialect::Deno,
            source: format!("({source})"),
            entry: None,
        }
    }

    fn python(source: &str, name: &str) -> Self {
        let takes_input = PY_FUNCTION
            .captures(source)
            .and_then(|captures| captures.get(2))
            .is_some_and(|params| !params.as_str().trim().is_empty());
        Self {
            dialect: Dialect::Python,
            source: dedent(source),
            entry: Some((name.to_string(), takes_input)),
        }
    }

    /// Script sent for one invocation
    fn code_for(&self, call: &MacroCall) -> Result<String, MacroError> {
        let Some((name, takes_input)) = &self.entry else {
            return Ok(self.source.clone());
        };
        let argument = if *takes_input {
            serde_json::to_string(call.input.text_str())
                .map_err(|err| MacroError::InvalidInput(err.to_string()))?
        } else {
            String::new()
        };
        Ok(format!("{}\n\nprint({name}({argument}))", self.source))
    }
}

#[async_trait]
impl Macro for RemoteFunction {
    async fn call(&self, cx: &MacroContext, call: MacroCall) -> Result<MacroOutput, MacroError> {
        let code = self.code_for(&call)?;
        let input = json!({
            "input": call.input,
            "output": call.output,
            "argument": call.argument,
        });
        let value = cx.bridge()?.call(self.dialect, code, input).await?;
        MacroOutput::from_json(value).map_err(|err| MacroError::InvalidResultShape(err.to_string()))
    }
}

/// Strip the indentation common to every non-blank line
fn dedent(source: &str) -> String {
    let indent = source
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    source
        .lines()
        .map(|line| line.get(indent..).unwrap_or_else(|| line.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .to_string()
}
