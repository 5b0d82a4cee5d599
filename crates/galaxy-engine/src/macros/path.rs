//! Path-driven macros
//!
//! The input's full tree path (ancestors, own text, trailing arrow label)
//! names a URL, file or directory.

use crate::capability::DirEntry;
use crate::error::MacroError;
use crate::invocation::{Macro, MacroCall, MacroContext};
use async_trait::async_trait;
use galaxy_scene::{CustomData, Element, ElementId, ElementKind, MacroOutput, DEFAULT_FONT_SIZE};

const GITHUB: &str = "https://github.com";
const GITHUB_RAW: &str = "https://raw.githubusercontent.com";

/// Raw-content URL for a GitHub page URL; other URLs pass through
#[must_use]
pub fn github_raw_url(url: &str) -> String {
    match url.strip_prefix(GITHUB) {
        Some(rest) => format!("{GITHUB_RAW}{}", rest.replacen("/blob/", "/", 1)),
        None => url.to_string(),
    }
}

/// `fetch`: download the URL the tree path spells
#[derive(Debug, Clone, Copy)]
pub struct Fetch;

#[async_trait]
impl Macro for Fetch {
    async fn call(&self, cx: &MacroContext, call: MacroCall) -> Result<MacroOutput, MacroError> {
        let path = cx.tree_path(&call)?;
        let url = if cx.config().github_raw_rewrite {
            github_raw_url(&path)
        } else {
            path
        };
        tracing::debug!(url = %url, "fetching");
        let body = cx.capabilities().http()?.fetch_text(&url).await?;
        Ok(MacroOutput::Text(body))
    }
}

/// `cat`: read the file the tree path spells
#[derive(Debug, Clone, Copy)]
pub struct Cat;

#[async_trait]
impl Macro for Cat {
    async fn call(&self, cx: &MacroContext, call: MacroCall) -> Result<MacroOutput, MacroError> {
        let path = cx.tree_path(&call)?;
        let body = cx.capabilities().paths()?.read_file(&path).await?;
        Ok(MacroOutput::Text(body))
    }
}

/// `ls`: expand the output into a listing of the directory the tree path spells
///
/// The output becomes the listing header (`/---` for text outputs); every
/// entry is a text element stacked below it, grouped with it and pointing
/// back at it through `customData.parentId`, so each entry resolves to its
/// own full path.
#[derive(Debug, Clone, Copy)]
pub struct List;

#[async_trait]
impl Macro for List {
    async fn call(&self, cx: &MacroContext, call: MacroCall) -> Result<MacroOutput, MacroError> {
        let path = cx.tree_path(&call)?;
        let entries = cx.capabilities().paths()?.list_dir(&path).await?;
        tracing::debug!(path = %path, entries = entries.len(), "listing directory");
        Ok(MacroOutput::Elements(listing(
            &call.output,
            &entries,
            cx.config().layout.line_height,
        )))
    }
}

fn listing(output: &Element, entries: &[DirEntry], line_height: f64) -> Vec<Element> {
    let group = ElementId::generate().to_string();
    let font_size = output.font_size.unwrap_or(DEFAULT_FONT_SIZE);
    let step = font_size * output.line_height.unwrap_or(line_height);

    let mut header = output.clone();
    if header.kind == ElementKind::Text {
        header.set_text("/---");
    }
    header.group_ids.push(group.clone());

    let mut elements = Vec::with_capacity(entries.len() + 1);
    elements.push(header);
    for (row, entry) in entries.iter().enumerate() {
        let mut item = Element::text(ElementId::generate(), entry.name.clone())
            .at(output.x, output.y + step * (row + 1) as f64)
            .sized(output.width, step);
        item.font_size = Some(font_size);
        item.group_ids = vec![group.clone()];
        item.custom_data = Some(CustomData {
            parent_id: Some(output.id.clone()),
            ..CustomData::default()
        });
        elements.push(item);
    }
    elements
}
