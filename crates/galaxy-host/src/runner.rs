//! Subprocess bridge host
//!
//! Serves the engine's remote bridge: every request runs in a fresh
//! interpreter process and resolves its pending call with the output.
//!
//! - Python code is a complete script; its trimmed stdout is the result.
//! - Deno code is a function expression. It is applied to the invocation's
//!   input element and argument, and its return value is printed as JSON.
//!
//! Anything written to stderr fails the task, as does a non-zero exit.

use galaxy_engine::{BridgeReply, BridgeRequest, Dialect, RemoteBridge};
use serde_json::Value;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Interpreters used for each dialect
#[derive(Debug, Clone)]
pub struct SubprocessRunner {
    python: String,
    deno: String,
}

impl Default for SubprocessRunner {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            deno: "deno".to_string(),
        }
    }
}

impl SubprocessRunner {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_python(mut self, program: impl Into<String>) -> Self {
        self.python = program.into();
        self
    }

    #[must_use]
    pub fn with_deno(mut self, program: impl Into<String>) -> Self {
        self.deno = program.into();
        self
    }

    /// Run one request to completion
    pub async fn run(&self, request: &BridgeRequest) -> BridgeReply {
        let result = match request.dialect {
            Dialect::Python => self.run_python(&request.code).await,
            Dialect::Deno => self.run_deno(request).await,
        };
        match result {
            Ok(data) => BridgeReply::ok(data),
            Err(error) => {
                tracing::debug!(task_id = %request.task_id, error = %error, "remote task failed");
                BridgeReply::err(error)
            }
        }
    }

    async fn run_python(&self, code: &str) -> Result<Value, String> {
        let stdout = run_process(Command::new(&self.python).arg("-c").arg(code)).await?;
        Ok(Value::String(stdout.trim().to_string()))
    }

    async fn run_deno(&self, request: &BridgeRequest) -> Result<Value, String> {
        let script = deno_script(&request.code, &request.input).map_err(|err| err.to_string())?;
        let stdout = run_process(Command::new(&self.deno).args(["eval", "--quiet"]).arg(script)).await?;
        let printed = stdout.trim();
        Ok(serde_json::from_str(printed).unwrap_or_else(|_| Value::String(printed.to_string())))
    }
}

/// Module applying the function expression `code` to `payload`
pub fn deno_script(code: &str, payload: &Value) -> Result<String, serde_json::Error> {
    let payload = serde_json::to_string(payload)?;
    Ok(format!(
        "const payload = {payload};\n\
         const macro = {code};\n\
         const result = await macro(payload.input, payload.argument);\n\
         console.log(JSON.stringify(result ?? null));\n"
    ))
}

async fn run_process(command: &mut Command) -> Result<String, String> {
    let output = command
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|err| format!("failed to start interpreter: {err}"))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return Err(stderr.to_string());
    }
    if !output.status.success() {
        return Err(format!("interpreter exited with {}", output.status));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Serve `requests` until the transport side closes
///
/// Requests run concurrently; replies are matched by task id. Must be
/// called from within a tokio runtime.
pub fn spawn_bridge_host(
    bridge: &Arc<RemoteBridge>,
    mut requests: mpsc::UnboundedReceiver<BridgeRequest>,
    runner: SubprocessRunner,
) -> JoinHandle<()> {
    let bridge = Arc::downgrade(bridge);
    let runner = Arc::new(runner);
    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            let bridge = bridge.clone();
            let runner = Arc::clone(&runner);
            tokio::spawn(async move {
                tracing::info!(task_id = %request.task_id, dialect = %request.dialect, "running remote task");
                let reply = runner.run(&request).await;
                if let Some(bridge) = bridge.upgrade() {
                    bridge.resolve(request.task_id, reply);
                }
            });
        }
    })
}
