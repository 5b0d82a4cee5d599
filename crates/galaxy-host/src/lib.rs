//! Galaxy Host - reference embedding of the macro engine
//!
//! Everything the engine treats as an external collaborator, backed by the
//! local machine:
//! - Scene documents read from and written to JSON files
//! - Remote definitions run in `python3` / `deno` subprocesses
//! - File system paths, a directory-backed key/value store, HTTP
//! - Prompts answered from the command line or the terminal

#![allow(missing_docs)]

pub mod collaborators;
pub mod runner;
pub mod scene_file;

pub use collaborators::{DirStore, FsPaths, HttpClient, LogNavigator, LogNotifier, TerminalPrompt};
pub use runner::{deno_script, spawn_bridge_host, SubprocessRunner};
pub use scene_file::{SceneFile, SceneFileError};
