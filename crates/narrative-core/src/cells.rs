//! Narrative cell assembly
//!
//! Turns caller cell descriptors (app id, method id or markdown text) and
//! step parameters into [`CellRecord`]s. App and method specs are fetched
//! in one batched registry call per kind.

use crate::clients::{IntroSource, SpecRegistry};
use crate::error::{NarrativeError, Result};
use narrative_model::{to_spaced_string, CellRecord};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Widget-state key for parameters whose step index did not parse
pub const NO_STEP_KEY: &str = "step_None";

/// Caller cell descriptor, as received on the wire
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
}

impl CellDescriptor {
    #[must_use]
    pub fn app(id: impl Into<String>) -> Self {
        Self {
            app: Some(id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn method(id: impl Into<String>) -> Self {
        Self {
            method: Some(id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            markdown: Some(text.into()),
            ..Self::default()
        }
    }

    /// Classify; app wins over method, method over markdown
    fn kind(&self, position: usize) -> Result<CellKind<'_>> {
        if let Some(id) = &self.app {
            Ok(CellKind::App(id))
        } else if let Some(id) = &self.method {
            Ok(CellKind::Method(id))
        } else if let Some(text) = &self.markdown {
            Ok(CellKind::Markdown(text))
        } else {
            Err(NarrativeError::invalid(format!(
                "cannot add cell #{position}, unrecognized cell content"
            )))
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum CellKind<'a> {
    App(&'a str),
    Method(&'a str),
    Markdown(&'a str),
}

type StepParamTuple = (Option<Value>, String, Value);

/// One `(step, name, value)` input parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StepParamTuple", into = "StepParamTuple")]
pub struct StepParam {
    /// `None` when the index was absent or not a number
    pub step: Option<i64>,
    pub name: String,
    pub value: Value,
}

impl StepParam {
    #[must_use]
    pub fn new(step: Option<i64>, name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            step,
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parse `step,name,value;step,name,value`
    ///
    /// A step that is empty or not an integer becomes "no index". Fields
    /// past the third are ignored.
    ///
    /// # Errors
    /// `InvalidArgument` when an entry has fewer than three fields
    pub fn parse_list(text: &str) -> Result<Vec<Self>> {
        text.split(';')
            .map(|item| {
                let fields: Vec<&str> = item.split(',').collect();
                let [step, name, value, ..] = fields.as_slice() else {
                    return Err(NarrativeError::invalid(format!(
                        "app parameter '{item}' must be step,name,value"
                    )));
                };
                Ok(Self::new(step.trim().parse().ok(), *name, *value))
            })
            .collect()
    }

    fn step_key(&self) -> String {
        self.step.map_or_else(|| NO_STEP_KEY.to_string(), |s| format!("step_{s}"))
    }
}

impl From<StepParamTuple> for StepParam {
    fn from((step, name, value): StepParamTuple) -> Self {
        let step = match step {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };
        Self { step, name, value }
    }
}

impl From<StepParam> for StepParamTuple {
    fn from(p: StepParam) -> Self {
        (p.step.map(Value::from), p.name, p.value)
    }
}

/// Replace `'` and `"` in every string value, recursively.
///
/// Keys and non-string scalars are left alone.
#[must_use]
pub fn escape_for_script(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.replace('\'', "&apos;").replace('"', "&quot;")),
        Value::Array(items) => Value::Array(items.into_iter().map(escape_for_script).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k, escape_for_script(v)))
                .collect(),
        ),
        other => other,
    }
}

#[derive(Debug, Default)]
struct SpecMapping {
    apps: HashMap<String, Value>,
    methods: HashMap<String, Value>,
}

fn index_specs(specs: Vec<Value>) -> HashMap<String, Value> {
    specs
        .into_iter()
        .filter_map(|spec| {
            let id = spec.pointer("/info/id")?.as_str()?.to_string();
            Some((id, spec))
        })
        .collect()
}

/// Builds narrative cells from descriptors
#[derive(Clone)]
pub struct CellAssembler {
    registry: Arc<dyn SpecRegistry>,
    intro: Arc<dyn IntroSource>,
}

impl std::fmt::Debug for CellAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellAssembler").finish_non_exhaustive()
    }
}

impl CellAssembler {
    #[must_use]
    pub fn new(registry: Arc<dyn SpecRegistry>, intro: Arc<dyn IntroSource>) -> Self {
        Self { registry, intro }
    }

    /// Assemble cells in order, optionally preceded by the intro cell
    ///
    /// # Errors
    /// - `InvalidArgument` for a descriptor with no recognized content
    /// - `NotFound` for an app or method id the registry did not return
    /// - registry or intro failures
    pub async fn assemble(
        &self,
        cells: &[CellDescriptor],
        params: &[StepParam],
        include_intro: bool,
    ) -> Result<Vec<CellRecord>> {
        let kinds = cells
            .iter()
            .enumerate()
            .map(|(pos, cell)| cell.kind(pos))
            .collect::<Result<Vec<_>>>()?;
        let specs = self.fetch_specs(&kinds).await?;

        let mut out = Vec::with_capacity(kinds.len() + usize::from(include_intro));
        if include_intro {
            out.push(CellRecord::markdown(self.intro.intro_markdown().await?));
        }
        for kind in kinds {
            let position = out.len();
            let cell = match kind {
                CellKind::App(id) => {
                    let spec = specs
                        .apps
                        .get(id)
                        .ok_or_else(|| NarrativeError::not_found("app spec", id))?;
                    build_app_cell(position, spec, params)?
                }
                CellKind::Method(id) => {
                    let spec = specs
                        .methods
                        .get(id)
                        .ok_or_else(|| NarrativeError::not_found("method spec", id))?;
                    build_method_cell(position, id, spec, params)?
                }
                CellKind::Markdown(text) => CellRecord::markdown(text),
            };
            out.push(cell);
        }
        Ok(out)
    }

    async fn fetch_specs(&self, kinds: &[CellKind<'_>]) -> Result<SpecMapping> {
        let mut app_ids = Vec::new();
        let mut method_ids = Vec::new();
        for kind in kinds {
            match kind {
                CellKind::App(id) => app_ids.push((*id).to_string()),
                CellKind::Method(id) => method_ids.push((*id).to_string()),
                CellKind::Markdown(_) => {}
            }
        }
        let mut mapping = SpecMapping::default();
        if !app_ids.is_empty() {
            mapping.apps = index_specs(self.registry.get_app_specs(&app_ids).await?);
        }
        if !method_ids.is_empty() {
            mapping.methods = index_specs(self.registry.get_method_specs(&method_ids).await?);
        }
        tracing::debug!(apps = mapping.apps.len(), methods = mapping.methods.len(), "fetched specs");
        Ok(mapping)
    }
}

fn cell_anchor(position: usize) -> String {
    format!("kb-cell-{position}-{}", Uuid::new_v4())
}

fn build_app_cell(position: usize, spec: &Value, params: &[StepParam]) -> Result<CellRecord> {
    let cell_id = cell_anchor(position);
    let spec = escape_for_script(spec.clone());
    let spec_text = to_spaced_string(&spec)?;
    let source = format!(
        "<div id='{cell_id}'></div>\n<script>$('#{cell_id}').kbaseNarrativeAppCell(\
         {{'appSpec' : '{spec_text}', 'cellId' : '{cell_id}'}});</script>"
    );

    let mut widget_state = Vec::new();
    if !params.is_empty() {
        let mut steps = Map::new();
        for param in params {
            let step = steps
                .entry(param.step_key())
                .or_insert_with(|| json!({ "inputState": {} }));
            if let Some(inputs) = step.get_mut("inputState").and_then(Value::as_object_mut) {
                inputs.insert(param.name.clone(), param.value.clone());
            }
        }
        widget_state.push(json!({ "state": { "step": steps } }));
    }

    let kb_cell = json!({
        "type": "kb_app",
        "app": spec,
        "widget_state": widget_state,
    });
    Ok(CellRecord::with_kb_cell(source, kb_cell))
}

fn build_method_cell(position: usize, id: &str, spec: &Value, params: &[StepParam]) -> Result<CellRecord> {
    let cell_id = cell_anchor(position);
    let spec = escape_for_script(spec.clone());
    let widget = spec
        .pointer("/widgets/input")
        .cloned()
        .ok_or_else(|| NarrativeError::invalid(format!("method spec {id} has no input widget")))?;
    let spec_text = to_spaced_string(&spec)?;
    let source = format!(
        "<div id='{cell_id}'></div>\n<script>$('#{cell_id}').kbaseNarrativeMethodCell(\
         {{'method' : '{spec_text}'}});</script>"
    );

    let mut widget_state = Vec::new();
    if !params.is_empty() {
        let inputs: Map<String, Value> = params
            .iter()
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect();
        widget_state.push(json!({ "state": inputs }));
    }

    let kb_cell = json!({
        "method": spec,
        "widget": widget,
        "type": "function_input",
        "widget_state": widget_state,
    });
    Ok(CellRecord::with_kb_cell(source, kb_cell))
}
