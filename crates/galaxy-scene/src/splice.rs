//! Result splicing
//!
//! A macro returns a [`MacroOutput`]; [`Splicer::splice`] turns the prior
//! element list plus that output into the next element list. Only the
//! output element's slot changes shape:
//!
//! | result | frame | text | rectangle | embeddable |
//! |---|---|---|---|---|
//! | `Text` | `name` | `text` + reflow | error | `link` |
//! | `Element` | merge | merge | merge | merge |
//! | `Elements` | merge frame, adopt rest | replace slot | replace slot | error |
//! | `Partial` | merge frame keys, adopt rest | replace slot | replace slot | error |
//!
//! Every other element passes through unchanged and in order.

use crate::element::{Element, ElementId, ElementKind, ElementPatch};
use crate::error::SpliceError;
use crate::layout::{MonospaceMetrics, TextLayout, TextMetrics};
use serde_json::Value;
use std::collections::HashSet;

/// Value produced by a macro
#[derive(Debug, Clone, PartialEq)]
pub enum MacroOutput {
    /// Replacement text (frame name, text body or embed link)
    Text(String),
    /// Fields merged onto the output element
    Element(ElementPatch),
    /// Elements expanding or filling the output slot
    Elements(Vec<Element>),
    /// Loosely typed element list; a frame entry merges only the keys it carries
    Partial(Vec<ElementPatch>),
    /// No scene change
    Unchanged,
}

impl MacroOutput {
    /// Numeric result, formatted the way the canvas prints numbers
    #[must_use]
    pub fn number(value: f64) -> Self {
        Self::Text(format_number(value))
    }

    /// Decode a loosely typed result
    ///
    /// Strings and numbers become text, objects become patches, arrays
    /// become partial element lists, `null` leaves the scene alone.
    /// Array items must be objects.
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        Ok(match value {
            Value::Null => Self::Unchanged,
            Value::String(text) => Self::Text(text),
            Value::Bool(flag) => Self::Text(flag.to_string()),
            Value::Number(number) => match number.as_f64() {
                Some(value) => Self::number(value),
                None => Self::Text(number.to_string()),
            },
            Value::Object(fields) => Self::Element(ElementPatch::from(fields)),
            Value::Array(items) => Self::Partial(
                items
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    /// Shape name used in diagnostics
    #[must_use]
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Element(_) => "element",
            Self::Elements(_) | Self::Partial(_) => "element list",
            Self::Unchanged => "empty",
        }
    }
}

impl From<String> for MacroOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for MacroOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<Element>> for MacroOutput {
    fn from(elements: Vec<Element>) -> Self {
        Self::Elements(elements)
    }
}

impl From<ElementPatch> for MacroOutput {
    fn from(patch: ElementPatch) -> Self {
        Self::Element(patch)
    }
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let sign = if value > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// Applies macro results to element lists
pub struct Splicer<'m> {
    layout: TextLayout,
    metrics: &'m dyn TextMetrics,
}

static MONOSPACE: MonospaceMetrics = MonospaceMetrics { advance: 0.6 };

impl Default for Splicer<'static> {
    fn default() -> Self {
        Self {
            layout: TextLayout::default(),
            metrics: &MONOSPACE,
        }
    }
}

impl std::fmt::Debug for Splicer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Splicer").field("layout", &self.layout).finish_non_exhaustive()
    }
}

impl<'m> Splicer<'m> {
    #[inline]
    #[must_use]
    pub fn new(layout: TextLayout, metrics: &'m dyn TextMetrics) -> Self {
        Self { layout, metrics }
    }

    /// Compute the element list after applying `output` to element `target`
    ///
    /// # Errors
    /// - `MissingOutput` if `target` is not in `prior`
    /// - `InvalidResultShape` if the result does not fit the target type
    /// - `MissingFrame` if a list result for a frame omits the frame
    pub fn splice(
        &self,
        prior: &[Element],
        target: &str,
        output: MacroOutput,
    ) -> Result<Vec<Element>, SpliceError> {
        let slot = prior
            .iter()
            .position(|element| element.id.as_str() == target)
            .ok_or_else(|| SpliceError::MissingOutput(ElementId::from(target)))?;
        let current = &prior[slot];

        let mut replacement = match output {
            MacroOutput::Unchanged => return Ok(prior.to_vec()),
            MacroOutput::Text(text) => vec![self.apply_text(current, text)?],
            MacroOutput::Element(patch) => vec![self.apply_patch(current, &patch)?],
            MacroOutput::Elements(items) => self.apply_list(current, items, None)?,
            MacroOutput::Partial(items) => {
                let (frame, items) = split_frame_patch(current, items)?;
                self.apply_list(current, items, frame)?
            }
        };

        // re-inserted ids must read as changed
        for element in &mut replacement {
            if let Some(previous) = prior.iter().find(|p| p.id == element.id) {
                element.version = element.version.max(previous.version + 1);
            }
        }

        let inserted: HashSet<ElementId> = replacement.iter().map(|e| e.id.clone()).collect();
        let mut replacement = Some(replacement);
        let mut next = Vec::with_capacity(prior.len() + inserted.len());
        for (position, element) in prior.iter().enumerate() {
            if position == slot {
                next.extend(replacement.take().into_iter().flatten());
            } else if !inserted.contains(&element.id) {
                next.push(element.clone());
            }
        }
        Ok(next)
    }

    fn apply_text(&self, current: &Element, text: String) -> Result<Element, SpliceError> {
        let mut next = current.clone();
        match current.kind {
            ElementKind::Frame => next.name = Some(text),
            ElementKind::Text => {
                next.set_text(text);
                self.layout.reflow(&mut next, self.metrics);
            }
            ElementKind::Embeddable => next.link = Some(text),
            _ => {
                return Err(SpliceError::InvalidResultShape {
                    output_kind: current.kind.clone(),
                    result: "text",
                })
            }
        }
        next.bump_version();
        Ok(next)
    }

    fn apply_patch(&self, current: &Element, patch: &ElementPatch) -> Result<Element, SpliceError> {
        let mut merged = current.merged_with(patch)?;
        if merged.kind == ElementKind::Text && patch.get("text").is_some() {
            self.layout.reflow(&mut merged, self.metrics);
        }
        merged.version = current.version + 1;
        Ok(merged)
    }

    fn apply_list(
        &self,
        current: &Element,
        mut items: Vec<Element>,
        frame: Option<ElementPatch>,
    ) -> Result<Vec<Element>, SpliceError> {
        match current.kind {
            ElementKind::Frame => {
                let frame = match frame {
                    Some(patch) => patch,
                    None => {
                        let position = items
                            .iter()
                            .position(|item| item.id == current.id)
                            .ok_or_else(|| SpliceError::MissingFrame(current.id.clone()))?;
                        ElementPatch::from_element(&items.remove(position))?
                    }
                };
                let merged = current.merged_with(&frame)?;

                let mut out = Vec::with_capacity(items.len() + 1);
                out.push(merged);
                out.extend(
                    items
                        .into_iter()
                        .filter(|item| item.id != current.id)
                        .map(|mut item| {
                            if !item.is_frame() {
                                item.frame_id = Some(current.id.clone());
                            }
                            item
                        }),
                );
                Ok(out)
            }
            ElementKind::Rectangle | ElementKind::Text => Ok(items),
            _ => Err(SpliceError::InvalidResultShape {
                output_kind: current.kind.clone(),
                result: "element list",
            }),
        }
    }
}

/// Pull the output frame's own entry out of a partial list and decode the rest
fn split_frame_patch(
    current: &Element,
    items: Vec<ElementPatch>,
) -> Result<(Option<ElementPatch>, Vec<Element>), SpliceError> {
    let mut frame = None;
    let mut elements = Vec::with_capacity(items.len());
    for item in items {
        let own = current.is_frame() && item.id() == Some(current.id.as_str());
        if own && frame.is_none() {
            frame = Some(item);
        } else if !own {
            elements.push(serde_json::from_value(Value::Object(item.into_fields()))?);
        }
    }
    if current.is_frame() && frame.is_none() {
        return Err(SpliceError::MissingFrame(current.id.clone()));
    }
    Ok((frame, elements))
}
