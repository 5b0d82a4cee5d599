//! Local collaborators
//!
//! Canvas paths are absolute (`/home/docs`); [`FsPaths`] re-roots them under
//! a chosen directory so a scene can only reach that subtree.

use async_trait::async_trait;
use galaxy_engine::{
    CollabError, DirEntry, HttpFetcher, KeyValueStore, Navigator, NoticeLevel, Notifier, PathSource, Prompt,
    PromptRequest,
};
use galaxy_scene::ElementId;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

fn io_failure(action: &str, path: &Path, err: &std::io::Error) -> CollabError {
    CollabError::failed(format!("cannot {action} {}: {err}", path.display()))
}

/// Files and directories under a root
#[derive(Debug, Clone)]
pub struct FsPaths {
    root: PathBuf,
}

impl FsPaths {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Host path for a canvas path
    ///
    /// `.` segments are dropped; `..` and drive prefixes are rejected so the
    /// result always stays under the root.
    pub fn locate(&self, path: &str) -> Result<PathBuf, CollabError> {
        let mut target = self.root.clone();
        for component in Path::new(path).components() {
            match component {
                Component::Normal(segment) => target.push(segment),
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(CollabError::failed(format!("path escapes the canvas root: {path}")));
                }
            }
        }
        Ok(target)
    }
}

#[async_trait]
impl PathSource for FsPaths {
    async fn read_file(&self, path: &str) -> Result<String, CollabError> {
        let target = self.locate(path)?;
        tokio::fs::read_to_string(&target)
            .await
            .map_err(|err| io_failure("read", &target, &err))
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, CollabError> {
        let target = self.locate(path)?;
        let mut reader = tokio::fs::read_dir(&target)
            .await
            .map_err(|err| io_failure("list", &target, &err))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|err| io_failure("list", &target, &err))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type().await.is_ok_and(|kind| kind.is_dir());
            entries.push(if is_dir { DirEntry::dir(name) } else { DirEntry::file(name) });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

/// Key/value store keeping one file per key
#[derive(Debug, Clone)]
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File holding `key`; characters outside `[A-Za-z0-9._-]` become `_`
    #[must_use]
    pub fn file_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

#[async_trait]
impl KeyValueStore for DirStore {
    async fn put(&self, key: &str, blob: Vec<u8>) -> Result<(), CollabError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| io_failure("create", &self.dir, &err))?;
        let target = self.file_for(key);
        tokio::fs::write(&target, blob)
            .await
            .map_err(|err| io_failure("write", &target, &err))?;
        tracing::debug!(key, path = %target.display(), "stored");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CollabError> {
        let target = self.file_for(key);
        match tokio::fs::read(&target).await {
            Ok(blob) => Ok(Some(blob)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_failure("read", &target, &err)),
        }
    }
}

/// HTTP fetcher over a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("galaxy-host/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetcher for HttpClient {
    async fn fetch_text(&self, url: &str) -> Result<String, CollabError> {
        let failed = |err: reqwest::Error| CollabError::failed(format!("GET {url}: {err}"));
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(failed)?
            .error_for_status()
            .map_err(failed)?;
        response.text().await.map_err(failed)
    }
}

/// Prompts answered from a preset queue, then from the terminal
///
/// Without a terminal, an exhausted queue dismisses the prompt.
#[derive(Debug, Default)]
pub struct TerminalPrompt {
    preset: Mutex<VecDeque<String>>,
    interactive: bool,
}

impl TerminalPrompt {
    #[must_use]
    pub fn new(preset: impl IntoIterator<Item = String>, interactive: bool) -> Self {
        Self {
            preset: Mutex::new(preset.into_iter().collect()),
            interactive,
        }
    }

    async fn answer(&self, request: &PromptRequest) -> Result<String, CollabError> {
        let preset = self.preset.lock().pop_front();
        if let Some(answer) = preset {
            tracing::debug!(title = %request.title, "prompt answered from preset");
            return Ok(answer);
        }
        if !self.interactive {
            return Err(CollabError::cancelled(format!("no answer for \"{}\"", request.title)));
        }

        let mut banner = request.title.clone();
        if let Some(description) = &request.description {
            banner.push('\n');
            banner.push_str(description);
        }
        let cue = request
            .label
            .as_deref()
            .or(request.placeholder.as_deref())
            .unwrap_or("answer");

        let terminal = |err: std::io::Error| CollabError::failed(format!("terminal: {err}"));
        let mut stderr = tokio::io::stderr();
        stderr
            .write_all(format!("{banner}\n{cue}> ").as_bytes())
            .await
            .map_err(terminal)?;
        stderr.flush().await.map_err(terminal)?;

        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(terminal)?;
        if read == 0 {
            return Err(CollabError::cancelled("input closed"));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

#[async_trait]
impl Prompt for TerminalPrompt {
    async fn ask(&self, request: PromptRequest) -> Result<String, CollabError> {
        self.answer(&request).await
    }

    async fn confirm(&self, request: PromptRequest) -> Result<(), CollabError> {
        let answer = self.answer(&request).await?;
        if matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
            Ok(())
        } else {
            Err(CollabError::cancelled(format!("\"{}\" declined", request.title)))
        }
    }
}

/// Toasts and notices go to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn toast(&self, message: &str) {
        tracing::warn!(toast = %message);
    }

    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info => tracing::info!(notice = %message),
            NoticeLevel::Error => tracing::error!(notice = %message),
        }
    }
}

/// Viewport moves go to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn scroll_to(&self, target: &ElementId) {
        tracing::info!(element = %target, "viewport moved");
    }
}
