//! Request and response shapes exchanged with the storage, set and
//! palette services

use crate::catalog::DataPaletteInfo;
use crate::ids::{ObjectReference, WorkspaceIdentity};
use crate::info::{Metadata, ObjectInfo};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One member of a set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetItem {
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub info: ObjectInfo,
}

/// A set object and its members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetRecord {
    #[serde(rename = "ref")]
    pub reference: ObjectReference,
    pub info: ObjectInfo,
    #[serde(default)]
    pub items: Vec<SetItem>,
}

/// Object known to a data palette
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteItem {
    #[serde(rename = "ref")]
    pub reference: ObjectReference,
    pub info: ObjectInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp_refs: Option<Vec<String>>,
}

impl PaletteItem {
    /// Palette provenance attached to the catalog entry
    #[must_use]
    pub fn provenance(&self) -> DataPaletteInfo {
        DataPaletteInfo {
            reference: self.dp_ref.clone(),
            refs: self.dp_refs.clone(),
        }
    }
}

/// `list_sets` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSetsRequest {
    pub workspaces: Vec<String>,
    pub include_set_item_info: bool,
    /// Ask the set service to embed palette listings in its answer
    pub include_raw_data_palettes: bool,
    pub include_metadata: bool,
}

/// `list_sets` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetListing {
    pub sets: Vec<SetRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data_palettes: Option<Vec<PaletteItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data_palette_refs: Option<BTreeMap<String, String>>,
}

impl SetListing {
    /// Embedded palette listing, present only when both halves came back
    #[must_use]
    pub fn embedded_palettes(&mut self) -> Option<PaletteListing> {
        match (self.raw_data_palettes.take(), self.raw_data_palette_refs.take()) {
            (Some(data), Some(data_palette_refs)) => Some(PaletteListing {
                data,
                data_palette_refs,
            }),
            (data, refs) => {
                self.raw_data_palettes = data;
                self.raw_data_palette_refs = refs;
                None
            }
        }
    }
}

/// `list_data` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListDataRequest {
    pub workspaces: Vec<String>,
    pub include_metadata: bool,
}

/// `list_data` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteListing {
    pub data: Vec<PaletteItem>,
    #[serde(default)]
    pub data_palette_refs: BTreeMap<String, String>,
}

/// Workspace permission filter for `list_workspace_info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceFilter {
    /// Minimum permission: `r`, `w` or `a`
    pub perm: String,
}

impl WorkspaceFilter {
    /// Workspaces the caller can read
    #[must_use]
    pub fn readable() -> Self {
        Self {
            perm: "r".to_string(),
        }
    }
}

/// One page of a `list_objects` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListObjectsParams {
    pub ids: Vec<u64>,
    #[serde(rename = "minObjectID")]
    pub min_object_id: u64,
    #[serde(rename = "maxObjectID")]
    pub max_object_id: u64,
    #[serde(rename = "includeMetadata")]
    pub include_metadata: bool,
}

/// Object payload as returned by `get_objects`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectData {
    pub info: ObjectInfo,
    pub data: Value,
    #[serde(default)]
    pub provenance: Vec<Value>,
}

/// One object in a `save_objects` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSaveData {
    #[serde(rename = "type")]
    pub type_string: String,
    pub data: Value,
    pub name: String,
    pub meta: Metadata,
    pub provenance: Vec<Value>,
    #[serde(default)]
    pub hidden: bool,
}

/// Destination of `copy_object`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyTarget {
    pub workspace: WorkspaceIdentity,
    pub name: String,
}

/// `clone_workspace` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneWorkspaceParams {
    pub source: WorkspaceIdentity,
    pub new_name: String,
    pub meta: Metadata,
    /// Object ids left out of the clone
    pub exclude: Vec<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn info_json(objid: u64) -> Value {
        json!([objid, "o", "A.A-1.0", "", 1, "u", 1, "ws", "", 0, null])
    }

    #[test]
    fn set_listing_reads_optional_palettes() {
        let raw = json!({
            "sets": [{"ref": "1/1/1", "info": info_json(1), "items": [{"ref": "1/2/1", "info": info_json(2)}]}],
        });
        let mut listing: SetListing = serde_json::from_value(raw).unwrap();
        assert_eq!(listing.sets[0].items.len(), 1);
        assert!(listing.embedded_palettes().is_none());
    }

    #[test]
    fn embedded_palettes_need_both_halves() {
        let mut listing = SetListing {
            sets: vec![],
            raw_data_palettes: Some(vec![]),
            raw_data_palette_refs: None,
        };
        assert!(listing.embedded_palettes().is_none());
        assert!(listing.raw_data_palettes.is_some());

        listing.raw_data_palette_refs = Some(BTreeMap::from([("1".to_string(), "1/9/1".to_string())]));
        let palettes = listing.embedded_palettes().unwrap();
        assert_eq!(palettes.data_palette_refs["1"], "1/9/1");
    }

    #[test]
    fn palette_item_provenance() {
        let raw = json!({"ref": "3/4/5", "info": info_json(4), "dp_ref": "3/9/1"});
        let item: PaletteItem = serde_json::from_value(raw).unwrap();
        let dp = item.provenance();
        assert_eq!(dp.reference.as_deref(), Some("3/9/1"));
        assert!(dp.refs.is_none());
    }
}
