//! Narrative documents and cell records

use crate::info::Metadata;
use crate::json_text::to_spaced_string;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Storage type of narrative objects
pub const NARRATIVE_TYPE: &str = "KBaseNarrative.Narrative";

/// Display name given to narratives without a title
pub const UNTITLED: &str = "Untitled";

/// Workspace metadata keys
pub mod meta_keys {
    /// Object id of the narrative owned by the workspace
    pub const NARRATIVE: &str = "narrative";
    /// `"true"` or `"false"`
    pub const IS_TEMPORARY: &str = "is_temporary";
    pub const CELL_COUNT: &str = "cell_count";
    pub const NICE_NAME: &str = "narrative_nice_name";
    pub const SEARCHTAGS: &str = "searchtags";
    /// Object-level key holding JSON-encoded job counters
    pub const JOB_INFO: &str = "job_info";
    pub const NAME: &str = "name";
    pub const WS_NAME: &str = "ws_name";
}

/// Render a flag the way workspace metadata stores it
#[inline]
#[must_use]
pub fn flag(value: bool) -> String {
    if value { "true" } else { "false" }.to_string()
}

/// Job queue/run time totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobUsage {
    pub queue_time: u64,
    pub run_time: u64,
}

/// Job tracking block of the document metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobIds {
    pub methods: Vec<Value>,
    pub apps: Vec<Value>,
    pub job_usage: JobUsage,
}

/// Zeroed job counters stored in the object metadata as a JSON string
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInfo {
    pub queue_time: u64,
    pub running: u64,
    pub completed: u64,
    pub run_time: u64,
    pub error: u64,
}

impl JobInfo {
    /// JSON text form
    ///
    /// # Errors
    /// Serialization failures
    pub fn encoded(&self) -> serde_json::Result<String> {
        to_spaced_string(self)
    }
}

/// Document-level metadata of a narrative
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeMetadata {
    pub job_ids: JobIds,
    pub format: String,
    pub creator: String,
    pub ws_name: String,
    pub name: String,
    #[serde(rename = "type")]
    pub object_type: String,
    pub description: String,
    pub data_dependencies: Vec<Value>,
}

impl NarrativeMetadata {
    /// Metadata for a freshly created narrative
    #[must_use]
    pub fn new(creator: impl Into<String>, ws_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            job_ids: JobIds::default(),
            format: "ipynb".to_string(),
            creator: creator.into(),
            ws_name: ws_name.into(),
            name: name.into(),
            object_type: NARRATIVE_TYPE.to_string(),
            description: String::new(),
            data_dependencies: Vec::new(),
        }
    }

    /// Flatten into object metadata: strings kept, everything else JSON-encoded
    ///
    /// # Errors
    /// Serialization failures
    pub fn to_object_metadata(&self) -> serde_json::Result<Metadata> {
        let Value::Object(fields) = serde_json::to_value(self)? else {
            return Ok(Metadata::new());
        };
        fields
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(s) => Ok((key, s)),
                other => Ok((key, to_spaced_string(&other)?)),
            })
            .collect()
    }
}

/// A notebook cell as stored in the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub cell_type: String,
    pub source: String,
    pub metadata: Map<String, Value>,
}

impl CellRecord {
    /// Key under which the structured cell block lives
    pub const KB_CELL: &'static str = "kb-cell";

    /// Plain markdown cell
    #[must_use]
    pub fn markdown(source: impl Into<String>) -> Self {
        Self {
            cell_type: "markdown".to_string(),
            source: source.into(),
            metadata: Map::new(),
        }
    }

    /// Markdown cell carrying a `kb-cell` block
    #[must_use]
    pub fn with_kb_cell(source: impl Into<String>, kb_cell: Value) -> Self {
        let mut cell = Self::markdown(source);
        cell.metadata.insert(Self::KB_CELL.to_string(), kb_cell);
        cell
    }

    /// The `kb-cell` block, if any
    #[inline]
    #[must_use]
    pub fn kb_cell(&self) -> Option<&Value> {
        self.metadata.get(Self::KB_CELL)
    }
}

/// Narrative document as saved on creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeDocument {
    pub nbformat_minor: u32,
    pub cells: Vec<CellRecord>,
    pub metadata: NarrativeMetadata,
    pub nbformat: u32,
}

impl NarrativeDocument {
    /// Current notebook format document
    #[must_use]
    pub fn new(cells: Vec<CellRecord>, metadata: NarrativeMetadata) -> Self {
        Self {
            nbformat_minor: 0,
            cells,
            metadata,
            nbformat: 4,
        }
    }
}

/// Cell layout of a stored document
///
/// Old narratives nest cells in `worksheets[0].cells`; current ones have a
/// flat `cells` list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellLayout<'a> {
    /// Legacy worksheet layout, first worksheet's cells
    Worksheets(&'a [Value]),
    /// Flat cell list
    Cells(&'a [Value]),
}

impl<'a> CellLayout<'a> {
    /// Resolve the layout of a raw document; `None` if neither shape fits
    #[must_use]
    pub fn of(document: &'a Value) -> Option<Self> {
        if let Some(worksheets) = document.get("worksheets") {
            return worksheets
                .get(0)
                .and_then(|ws| ws.get("cells"))
                .and_then(Value::as_array)
                .map(|cells| Self::Worksheets(cells.as_slice()));
        }
        document
            .get("cells")
            .and_then(Value::as_array)
            .map(|cells| Self::Cells(cells.as_slice()))
    }

    /// Number of cells
    #[inline]
    #[must_use]
    pub fn cell_count(&self) -> usize {
        match self {
            Self::Worksheets(cells) | Self::Cells(cells) => cells.len(),
        }
    }
}
