//! Scene element model
//!
//! Elements mirror the canvas document format (camelCase JSON). Fields the
//! macro engine reasons about are typed; everything else is carried through
//! untouched in [`Element::extra`] so a round trip never drops renderer state.
//!
//! Elements never own each other. Arrow bindings, `boundElements`, `frameId`
//! and the [`CustomData`] sidecar all refer to other elements by id only.

use indexmap::IndexSet;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::borrow::Borrow;
use std::fmt;
use ulid::Ulid;

/// Stable element identifier
///
/// Ids come from the canvas and are opaque strings. They survive every
/// mutation the splicer performs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Wrap an existing id
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh id for elements created by macros
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new().to_string().to_lowercase())
    }

    /// Borrow as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ElementId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ElementId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ElementId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl PartialEq<str> for ElementId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ElementId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Element type tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementKind {
    /// Free text or a bound label
    Text,
    /// Arrow, possibly bound at either end
    Arrow,
    /// Container owning members through `frameId`
    Frame,
    /// Rectangle shape
    Rectangle,
    /// Bitmap image
    Image,
    /// Embedded web content (`link`)
    Embeddable,
    /// Any other renderer type, kept verbatim
    Other(String),
}

impl ElementKind {
    /// Type tag as it appears in the document
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Arrow => "arrow",
            Self::Frame => "frame",
            Self::Rectangle => "rectangle",
            Self::Image => "image",
            Self::Embeddable => "embeddable",
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ElementKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "text" => Self::Text,
            "arrow" => Self::Arrow,
            "frame" => Self::Frame,
            "rectangle" => Self::Rectangle,
            "image" => Self::Image,
            "embeddable" => Self::Embeddable,
            _ => Self::Other(tag),
        }
    }
}

impl From<ElementKind> for String {
    fn from(kind: ElementKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Entry of an element's `boundElements` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundElement {
    /// Referenced element
    pub id: ElementId,
    /// Referenced element's type
    #[serde(rename = "type")]
    pub kind: ElementKind,
}

/// One end of an arrow binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    /// Bound element
    pub element_id: ElementId,
    /// Renderer data (focus, gap)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Binding {
    /// Binding with no renderer data
    #[inline]
    #[must_use]
    pub fn to(element_id: impl Into<ElementId>) -> Self {
        Self {
            element_id: element_id.into(),
            extra: Map::new(),
        }
    }
}

/// Declarative macro trigger attached to an element
///
/// `macros` accepts either a list of names or an object whose truthy keys
/// are the names, which is how hand-written scenes usually spell it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomData {
    /// Macro names this element activates, in declaration order
    #[serde(
        default,
        deserialize_with = "deserialize_macro_names",
        skip_serializing_if = "IndexSet::is_empty"
    )]
    pub macros: IndexSet<String>,
    /// Output override (defaults to the element itself)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_to: Option<ElementId>,
    /// Parent back-reference used by tree resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ElementId>,
    /// Unrelated user data
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn deserialize_macro_names<'de, D>(deserializer: D) -> Result<IndexSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_owned))
            .collect(),
        Some(Value::Object(entries)) => entries
            .into_iter()
            .filter(|(_, enabled)| !matches!(enabled, Value::Null | Value::Bool(false)))
            .map(|(name, _)| name)
            .collect(),
        _ => IndexSet::new(),
    })
}

/// A node of the shared scene graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// Stable id
    pub id: ElementId,
    /// Type tag
    #[serde(rename = "type")]
    pub kind: ElementKind,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    /// Incremented on every semantic change
    #[serde(default)]
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,
    /// Frame title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Embeddable target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Group membership; order carries no meaning
    #[serde(default)]
    pub group_ids: Vec<String>,
    /// Containing frame
    #[serde(default)]
    pub frame_id: Option<ElementId>,
    #[serde(default)]
    pub bound_elements: Option<Vec<BoundElement>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_binding: Option<Binding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_binding: Option<Binding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<CustomData>,
    /// Renderer fields the engine does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Element {
    /// Bare element of the given type at the origin
    #[must_use]
    pub fn new(id: impl Into<ElementId>, kind: ElementKind) -> Self {
        Self {
            id: id.into(),
            kind,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            version: 1,
            text: None,
            original_text: None,
            font_size: None,
            line_height: None,
            name: None,
            link: None,
            group_ids: Vec::new(),
            frame_id: None,
            bound_elements: None,
            start_binding: None,
            end_binding: None,
            custom_data: None,
            extra: Map::new(),
        }
    }

    /// Text element carrying `text`
    #[must_use]
    pub fn text(id: impl Into<ElementId>, text: impl Into<String>) -> Self {
        let mut element = Self::new(id, ElementKind::Text);
        element.set_text(text);
        element
    }

    /// Move to a position
    #[inline]
    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Resize
    #[inline]
    #[must_use]
    pub fn sized(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    #[inline]
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.kind == ElementKind::Text
    }

    #[inline]
    #[must_use]
    pub fn is_arrow(&self) -> bool {
        self.kind == ElementKind::Arrow
    }

    #[inline]
    #[must_use]
    pub fn is_frame(&self) -> bool {
        self.kind == ElementKind::Frame
    }

    /// Own text, or empty
    #[inline]
    #[must_use]
    pub fn text_str(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Replace `text` and `originalText` together
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.original_text = Some(text.clone());
        self.text = Some(text);
    }

    /// Record a semantic change
    #[inline]
    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    /// Weak references to bound arrows and labels
    #[inline]
    pub fn bound(&self) -> impl Iterator<Item = &BoundElement> {
        self.bound_elements.iter().flatten()
    }

    /// Element the arrow starts at
    #[inline]
    #[must_use]
    pub fn start_id(&self) -> Option<&ElementId> {
        self.start_binding.as_ref().map(|b| &b.element_id)
    }

    /// Element the arrow ends at
    #[inline]
    #[must_use]
    pub fn end_id(&self) -> Option<&ElementId> {
        self.end_binding.as_ref().map(|b| &b.element_id)
    }

    /// Whether the element belongs to `group`
    #[inline]
    #[must_use]
    pub fn in_group(&self, group: &str) -> bool {
        self.group_ids.iter().any(|g| g == group)
    }

    /// Shallow-merge a patch onto a copy of this element
    ///
    /// The `id` key of the patch is ignored; ids are stable across merges.
    /// The version is left to the caller.
    pub fn merged_with(&self, patch: &ElementPatch) -> Result<Element, serde_json::Error> {
        let mut fields = match serde_json::to_value(self)? {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        for (key, value) in patch.fields() {
            if key == "id" {
                continue;
            }
            fields.insert(key.clone(), value.clone());
        }
        serde_json::from_value(Value::Object(fields))
    }
}

/// Partial element used for shallow merges
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementPatch(Map<String, Value>);

impl ElementPatch {
    /// Empty patch
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch that sets `text` and `originalText`
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new()
            .set("text", Value::String(text.clone()))
            .set("originalText", Value::String(text))
    }

    /// Every present field of `element`, nulls dropped
    ///
    /// Merging this onto another element keeps the target's value wherever
    /// `element` leaves an optional field unset.
    pub fn from_element(element: &Element) -> Result<Self, serde_json::Error> {
        let fields = match serde_json::to_value(element)? {
            Value::Object(fields) => fields
                .into_iter()
                .filter(|(_, value)| !value.is_null())
                .collect(),
            _ => Map::new(),
        };
        Ok(Self(fields))
    }

    /// Builder-style field assignment
    #[must_use]
    pub fn set(mut self, key: &str, value: Value) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    /// Field value, if present
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// All fields
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// The `id` key, when it is a string
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    #[inline]
    #[must_use]
    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for ElementPatch {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn element_round_trips_unknown_fields() {
        let raw = json!({
            "id": "t1",
            "type": "text",
            "x": 10.0,
            "y": 20.0,
            "width": 100.0,
            "height": 25.0,
            "version": 3,
            "text": "hello",
            "originalText": "hello",
            "strokeColor": "#1e1e1e",
            "containerId": null
        });
        let element: Element = serde_json::from_value(raw).unwrap();
        assert_eq!(element.kind, ElementKind::Text);
        assert_eq!(element.text_str(), "hello");
        assert_eq!(element.extra.get("strokeColor"), Some(&json!("#1e1e1e")));

        let back = serde_json::to_value(&element).unwrap();
        assert_eq!(back["strokeColor"], json!("#1e1e1e"));
        assert_eq!(back["type"], json!("text"));
    }

    #[test]
    fn unknown_kind_is_preserved() {
        let element: Element =
            serde_json::from_value(json!({"id": "d", "type": "diamond"})).unwrap();
        assert_eq!(element.kind, ElementKind::Other("diamond".into()));
        assert_eq!(serde_json::to_value(&element).unwrap()["type"], json!("diamond"));
    }

    #[test]
    fn custom_data_macros_accept_object_and_list() {
        let from_object: CustomData = serde_json::from_value(json!({
            "macros": {"save": true, "open": true, "publish": false},
            "outputTo": "out"
        }))
        .unwrap();
        assert_eq!(
            from_object.macros.iter().cloned().collect::<Vec<_>>(),
            vec!["save".to_string(), "open".to_string()]
        );
        assert_eq!(from_object.output_to, Some(ElementId::from("out")));

        let from_list: CustomData =
            serde_json::from_value(json!({"macros": ["ls"], "parentId": "p"})).unwrap();
        assert!(from_list.macros.contains("ls"));
        assert_eq!(from_list.parent_id, Some(ElementId::from("p")));
    }

    #[test]
    fn merge_ignores_id_and_overrides_fields() {
        let element = Element::text("a", "old").at(5.0, 6.0);
        let patch = ElementPatch::text("new").set("id", json!("b"));
        let merged = element.merged_with(&patch).unwrap();
        assert_eq!(merged.id, ElementId::from("a"));
        assert_eq!(merged.text_str(), "new");
        assert_eq!(merged.original_text.as_deref(), Some("new"));
        assert_eq!(merged.x, 5.0);
    }

    #[test]
    fn patch_from_element_drops_unset_fields() {
        let mut frame = Element::new("f", ElementKind::Frame);
        frame.name = Some("loaded".into());
        let patch = ElementPatch::from_element(&frame).unwrap();
        assert!(patch.get("frameId").is_none());
        assert_eq!(patch.get("name"), Some(&json!("loaded")));
    }
}
