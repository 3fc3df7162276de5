//! On-disk project documents.
//!
//! A saved project is one JSON document:
//!
//! ```json
//! { "format": "tintcut-project", "schema": 2, "written_by": "0.1.0", "project": { ... } }
//! ```
//!
//! Schema history:
//! - 0: the bare project object. No envelope; the media lists may be absent.
//! - 1: envelope with `schema` and `written_by`. The selection was two
//!   nullable ids, `selected_video` and `selected_image`.
//! - 2: envelope gains `format`; the selection is a tagged `{kind, id}`.
//!
//! Adjustments are working state and never reach the document.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use tintcut_core::{Result, TintcutError};
use tracing::debug;

use crate::project::Project;

pub const FORMAT_TAG: &str = "tintcut-project";

/// Schema written by this build.
pub const SCHEMA: u32 = 2;

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectFile {
    pub format: String,
    pub schema: u32,
    /// Crate version of the writer.
    pub written_by: String,
    pub project: Project,
}

impl ProjectFile {
    pub fn new(project: Project) -> Self {
        Self {
            format: FORMAT_TAG.to_string(),
            schema: SCHEMA,
            written_by: env!("CARGO_PKG_VERSION").to_string(),
            project,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| malformed("cannot encode project", e))
    }

    /// Parse a document of any known schema, upgrading it step by step.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut doc: Value =
            serde_json::from_slice(data).map_err(|e| malformed("not a project document", e))?;
        let mut schema = schema_of(&doc)?;
        if schema > SCHEMA {
            return Err(TintcutError::Serialization(format!(
                "project schema {schema} needs a newer tintcut (this build reads up to {SCHEMA})"
            )));
        }
        while schema < SCHEMA {
            doc = match schema {
                0 => wrap_bare_project(doc),
                1 => tag_selection(doc)?,
                other => {
                    return Err(TintcutError::Serialization(format!(
                        "no upgrade from project schema {other}"
                    )))
                }
            };
            schema += 1;
            debug!(schema, "Upgraded project document");
        }
        serde_json::from_value(doc).map_err(|e| malformed("unreadable project", e))
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.encode()?)?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        Self::decode(&std::fs::read(path)?)
    }
}

fn malformed(what: &str, e: serde_json::Error) -> TintcutError {
    TintcutError::Serialization(format!("{what}: {e}"))
}

/// The `schema` field, or 0 for a bare project object.
fn schema_of(doc: &Value) -> Result<u32> {
    let obj = doc
        .as_object()
        .ok_or_else(|| TintcutError::Serialization("project document is not an object".into()))?;
    if let Some(tag) = obj.get("format") {
        if tag.as_str() != Some(FORMAT_TAG) {
            return Err(TintcutError::Serialization(format!(
                "not a tintcut project (format {tag})"
            )));
        }
    }
    match obj.get("schema") {
        None => Ok(0),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| TintcutError::Serialization(format!("bad project schema {v}"))),
    }
}

/// 0 → 1: put the bare project in an envelope and fill the lists it could omit.
fn wrap_bare_project(mut project: Value) -> Value {
    if let Some(obj) = project.as_object_mut() {
        for list in ["audio", "images", "videos"] {
            obj.entry(list).or_insert_with(|| json!([]));
        }
        obj.entry("show_media_tables").or_insert(Value::Bool(false));
    }
    json!({ "schema": 1, "written_by": "0.0.0", "project": project })
}

/// 1 → 2: fold the two nullable ids into one tagged selection.
fn tag_selection(mut doc: Value) -> Result<Value> {
    let project = doc
        .get_mut("project")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| TintcutError::Serialization("schema 1 document has no project".into()))?;
    let video = project.remove("selected_video").filter(|v| !v.is_null());
    let image = project.remove("selected_image").filter(|v| !v.is_null());
    // Nothing selected is the field's default.
    if let Some((kind, id)) = video.map(|id| ("video", id)).or(image.map(|id| ("image", id))) {
        project.insert("selection".into(), json!({ "kind": kind, "id": id }));
    }
    if let Some(obj) = doc.as_object_mut() {
        obj.insert("format".into(), json!(FORMAT_TAG));
        obj.insert("schema".into(), json!(2));
    }
    Ok(doc)
}
