//! Scene documents on disk
//!
//! A scene file is either a bare element array or an object carrying an
//! `elements` array next to other keys (the canvas export format). The
//! other keys are written back untouched.

use galaxy_scene::Element;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SceneFileError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scene document {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} holds no element list")]
    NoElements(PathBuf),
}

/// Element list plus whatever else the document carried
#[derive(Debug, Clone, PartialEq)]
pub struct SceneFile {
    pub elements: Vec<Element>,
    rest: Option<Map<String, Value>>,
}

impl SceneFile {
    /// Bare element list
    #[must_use]
    pub fn new(elements: Vec<Element>) -> Self {
        Self { elements, rest: None }
    }

    /// Decode a document; `path` only labels errors
    pub fn parse(raw: &str, path: &Path) -> Result<Self, SceneFileError> {
        let invalid = |source| SceneFileError::Json {
            path: path.to_path_buf(),
            source,
        };
        let (list, rest) = match serde_json::from_str::<Value>(raw).map_err(invalid)? {
            Value::Array(items) => (Value::Array(items), None),
            Value::Object(mut fields) => match fields.remove("elements") {
                Some(list) => (list, Some(fields)),
                None => return Err(SceneFileError::NoElements(path.to_path_buf())),
            },
            _ => return Err(SceneFileError::NoElements(path.to_path_buf())),
        };
        let elements = serde_json::from_value(list).map_err(invalid)?;
        Ok(Self { elements, rest })
    }

    pub async fn load(path: &Path) -> Result<Self, SceneFileError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SceneFileError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&raw, path)
    }

    /// Document in the shape it was read
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        let elements = serde_json::to_value(&self.elements)?;
        Ok(match &self.rest {
            None => elements,
            Some(rest) => {
                let mut fields = rest.clone();
                fields.insert("elements".to_string(), elements);
                Value::Object(fields)
            }
        })
    }

    pub async fn save(&self, path: &Path) -> Result<(), SceneFileError> {
        let invalid = |source| SceneFileError::Json {
            path: path.to_path_buf(),
            source,
        };
        let mut pretty = serde_json::to_string_pretty(&self.to_value().map_err(invalid)?).map_err(invalid)?;
        pretty.push('\n');
        tokio::fs::write(path, pretty)
            .await
            .map_err(|source| SceneFileError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %path.display(), elements = self.elements.len(), "scene written");
        Ok(())
    }
}
