//! Scene persistence macros
//!
//! `save` stores a frame locally under a user-chosen name, `publish` uploads
//! it to the content-addressed store and records the link on the ledger,
//! `open` reverses `publish` into an existing frame. Each suspends on a
//! prompt; a dismissed prompt fails the invocation.

use crate::capability::{LedgerCall, NoticeLevel, PromptRequest};
use crate::error::{CollabError, MacroError};
use crate::invocation::{Macro, MacroCall, MacroContext};
use async_trait::async_trait;
use chrono::Local;
use galaxy_scene::{Bounds, Element, MacroOutput};
use serde_json::{json, Value};

/// The input element followed by its frame members, read from the live scene
fn frame_payload(cx: &MacroContext, input: &Element) -> Vec<Element> {
    let cx = cx.refreshed();
    let input = cx.current(input);
    let index = cx.index();
    let mut payload = vec![input.clone()];
    if input.is_frame() {
        payload.extend(index.frame_members(input.id.as_str()).cloned());
    }
    payload
}

fn required(answer: String, what: &str) -> Result<String, MacroError> {
    let answer = answer.trim().to_string();
    if answer.is_empty() {
        return Err(MacroError::InvalidInput(format!("{what} not provided")));
    }
    Ok(answer)
}

/// `save`: store the input (and its frame members) in key/value storage
#[derive(Debug, Clone, Copy)]
pub struct Save;

#[async_trait]
impl Macro for Save {
    async fn call(&self, cx: &MacroContext, call: MacroCall) -> Result<MacroOutput, MacroError> {
        let prompt = cx.capabilities().prompt()?;
        let kv = cx.capabilities().kv()?;

        let answer = prompt
            .ask(PromptRequest::new("Save scene").with_placeholder("Scene Name"))
            .await?;
        let name = required(answer, "scene name")?;

        let payload = frame_payload(cx, &call.input);
        let blob = serde_json::to_vec(&payload).map_err(CollabError::from)?;
        kv.put(&name, blob).await?;

        tracing::info!(scene = %name, elements = payload.len(), "scene saved");
        Ok(MacroOutput::Text(format!(
            "Frame {} saved as \"{name}\" at {}",
            call.input.id,
            Local::now().format("%H:%M:%S")
        )))
    }
}

/// `open`: load a published scene into the input frame
#[derive(Debug, Clone, Copy)]
pub struct Open;

#[async_trait]
impl Macro for Open {
    async fn call(&self, cx: &MacroContext, call: MacroCall) -> Result<MacroOutput, MacroError> {
        if !call.input.is_frame() {
            return Err(MacroError::InvalidInput("open expects a frame".into()));
        }
        let prompt = cx.capabilities().prompt()?;
        let ledger = cx.capabilities().ledger()?;
        let content = cx.capabilities().content()?;

        let answer = prompt
            .ask(PromptRequest::new("Open from Galaxy").with_placeholder("Galaxy Link"))
            .await?;
        let link = required(answer, "galaxy link")?;

        let resolved = ledger
            .read(LedgerCall::new("resolveLink", vec![json!(link)]))
            .await?;
        let content_link = resolved
            .as_str()
            .ok_or_else(|| CollabError::failed(format!("ledger has no content link for {link}")))?;

        let document = content.download(content_link).await?;
        let mut elements = decode_elements(document)?;

        let mut frame = cx.refreshed().current(&call.input);
        frame.name = Some(format!("frame {link}"));
        if let Some(bounds) = Bounds::union_of(&elements) {
            frame.x = bounds.min_x;
            frame.y = bounds.min_y;
            frame.width = bounds.width();
            frame.height = bounds.height();
        }

        tracing::info!(link = %link, elements = elements.len(), "scene opened");
        elements.push(frame);
        Ok(MacroOutput::Elements(elements))
    }
}

/// Element list from a downloaded document: a bare array or `{ elements }`
fn decode_elements(document: Value) -> Result<Vec<Element>, CollabError> {
    let list = match document {
        Value::Object(mut fields) => fields.remove("elements").unwrap_or(Value::Null),
        other => other,
    };
    if !list.is_array() {
        return Err(CollabError::failed("downloaded document holds no element list"));
    }
    Ok(serde_json::from_value(list)?)
}

/// `publish`: upload the input frame and record it on the ledger
#[derive(Debug, Clone, Copy)]
pub struct Publish;

#[async_trait]
impl Macro for Publish {
    async fn call(&self, cx: &MacroContext, call: MacroCall) -> Result<MacroOutput, MacroError> {
        let caps = cx.capabilities();
        let prompt = caps.prompt()?;
        let content = caps.content()?;
        let ledger = caps.ledger()?;

        let answer = prompt
            .ask(
                PromptRequest::new("Publish to Galaxy")
                    .with_label("Layer Name")
                    .with_placeholder("Enter Layer Name"),
            )
            .await?;
        let layer = required(answer, "layer name")?;

        let payload = serde_json::to_value(frame_payload(cx, &call.input)).map_err(CollabError::from)?;
        let link = content.upload(payload).await?.into_link()?;

        let prepared = ledger
            .prepare_write(LedgerCall::new("createLayer", vec![json!(layer), json!(link)]))
            .await?;
        prompt
            .confirm(
                PromptRequest::new("Confirm transaction")
                    .with_description(format!("Estimated gas: {}", prepared.gas_estimate)),
            )
            .await?;
        let transaction = ledger.confirm_write(prepared).await?;

        tracing::info!(layer = %layer, link = %link, transaction = %transaction, "layer published");
        if let Ok(notifier) = caps.notifier() {
            notifier.notify(NoticeLevel::Info, &format!("{transaction} broadcasted"));
        }
        Ok(MacroOutput::Text(format!("{layer} - {link}")))
    }
}
