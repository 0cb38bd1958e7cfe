//! Object and workspace info snapshots
//!
//! The storage service reports objects and workspaces as fixed-order
//! tuples. [`ObjectInfo`] and [`WorkspaceInfo`] keep that wire shape
//! (they serialize as JSON arrays) while giving named access in Rust.

use crate::ids::ObjectReference;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// String-to-string metadata map used by objects and workspaces
pub type Metadata = BTreeMap<String, String>;

type ObjectInfoTuple = (
    u64,
    String,
    String,
    String,
    u64,
    String,
    u64,
    String,
    String,
    u64,
    Option<Metadata>,
);

/// Immutable snapshot of an object's state at read time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ObjectInfoTuple", into = "ObjectInfoTuple")]
pub struct ObjectInfo {
    pub objid: u64,
    pub name: String,
    /// `Module.Type-major.minor`
    pub type_string: String,
    pub save_date: String,
    pub version: u64,
    pub saved_by: String,
    pub wsid: u64,
    pub workspace: String,
    pub checksum: String,
    pub size: u64,
    /// `None` when the listing was made without metadata
    pub metadata: Option<Metadata>,
}

impl ObjectInfo {
    /// Canonical reference of this object version
    #[inline]
    #[must_use]
    pub fn reference(&self) -> ObjectReference {
        ObjectReference::new(self.wsid, self.objid, self.version)
    }

    /// Metadata value for `key`, when metadata was returned
    #[must_use]
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key).map(String::as_str)
    }

    /// Type string with its version suffix stripped
    #[inline]
    #[must_use]
    pub fn type_prefix(&self) -> &str {
        type_prefix(&self.type_string)
    }

    /// Named-field form returned to callers
    #[must_use]
    pub fn to_descriptor(&self) -> ObjectDescriptor {
        ObjectDescriptor {
            id: self.objid,
            name: self.name.clone(),
            type_string: self.type_string.clone(),
            save_date: self.save_date.clone(),
            version: self.version,
            saved_by: self.saved_by.clone(),
            wsid: self.wsid,
            ws: self.workspace.clone(),
            checksum: self.checksum.clone(),
            size: self.size,
            metadata: self.metadata.clone(),
            reference: self.reference().to_string(),
            obj_id: format!("ws.{}.obj.{}", self.wsid, self.objid),
        }
    }
}

impl From<ObjectInfoTuple> for ObjectInfo {
    fn from(t: ObjectInfoTuple) -> Self {
        Self {
            objid: t.0,
            name: t.1,
            type_string: t.2,
            save_date: t.3,
            version: t.4,
            saved_by: t.5,
            wsid: t.6,
            workspace: t.7,
            checksum: t.8,
            size: t.9,
            metadata: t.10,
        }
    }
}

impl From<ObjectInfo> for ObjectInfoTuple {
    fn from(i: ObjectInfo) -> Self {
        (
            i.objid,
            i.name,
            i.type_string,
            i.save_date,
            i.version,
            i.saved_by,
            i.wsid,
            i.workspace,
            i.checksum,
            i.size,
            i.metadata,
        )
    }
}

/// Strip the `-major.minor` suffix of a type string.
///
/// `KBaseGenomes.Genome-1.0` becomes `KBaseGenomes.Genome`; a string
/// without `-` is returned whole.
#[inline]
#[must_use]
pub fn type_prefix(type_string: &str) -> &str {
    type_string.split('-').next().unwrap_or(type_string)
}

/// Object info with named fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub type_string: String,
    pub save_date: String,
    pub version: u64,
    pub saved_by: String,
    pub wsid: u64,
    pub ws: String,
    pub checksum: String,
    pub size: u64,
    pub metadata: Option<Metadata>,
    #[serde(rename = "ref")]
    pub reference: String,
    pub obj_id: String,
}

impl ObjectDescriptor {
    /// Metadata value for `key`, when metadata was returned
    #[must_use]
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key).map(String::as_str)
    }
}

type WorkspaceInfoTuple = (u64, String, String, String, u64, String, String, String, Option<Metadata>);

/// Snapshot of a workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WorkspaceInfoTuple", into = "WorkspaceInfoTuple")]
pub struct WorkspaceInfo {
    pub id: u64,
    pub name: String,
    pub owner: String,
    pub moddate: String,
    /// Highest object id ever assigned in the workspace
    pub max_objid: u64,
    pub user_permission: String,
    pub globalread: String,
    pub lockstat: String,
    pub metadata: Metadata,
}

impl WorkspaceInfo {
    /// Named-field form returned to callers
    #[must_use]
    pub fn to_descriptor(&self) -> WorkspaceDescriptor {
        WorkspaceDescriptor {
            id: self.id,
            name: self.name.clone(),
            owner: self.owner.clone(),
            moddate: self.moddate.clone(),
            object_count: self.max_objid,
            user_permission: self.user_permission.clone(),
            globalread: self.globalread.clone(),
            lockstat: self.lockstat.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

impl From<WorkspaceInfoTuple> for WorkspaceInfo {
    fn from(t: WorkspaceInfoTuple) -> Self {
        Self {
            id: t.0,
            name: t.1,
            owner: t.2,
            moddate: t.3,
            max_objid: t.4,
            user_permission: t.5,
            globalread: t.6,
            lockstat: t.7,
            metadata: t.8.unwrap_or_default(),
        }
    }
}

impl From<WorkspaceInfo> for WorkspaceInfoTuple {
    fn from(w: WorkspaceInfo) -> Self {
        (
            w.id,
            w.name,
            w.owner,
            w.moddate,
            w.max_objid,
            w.user_permission,
            w.globalread,
            w.lockstat,
            Some(w.metadata),
        )
    }
}

/// Workspace info with named fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceDescriptor {
    pub id: u64,
    pub name: String,
    pub owner: String,
    pub moddate: String,
    pub object_count: u64,
    pub user_permission: String,
    pub globalread: String,
    pub lockstat: String,
    pub metadata: Metadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn genome() -> ObjectInfo {
        ObjectInfo {
            objid: 4,
            name: "genome".into(),
            type_string: "KBaseGenomes.Genome-1.0".into(),
            save_date: "2024-01-01T00:00:00+0000".into(),
            version: 2,
            saved_by: "alice".into(),
            wsid: 10,
            workspace: "alice:narrative_1".into(),
            checksum: "abc".into(),
            size: 100,
            metadata: None,
        }
    }

    #[test]
    fn object_info_reads_tuple_with_null_metadata() {
        let raw = json!([4, "genome", "KBaseGenomes.Genome-1.0", "2024-01-01T00:00:00+0000",
                         2, "alice", 10, "alice:narrative_1", "abc", 100, null]);
        let info: ObjectInfo = serde_json::from_value(raw).unwrap();
        assert_eq!(info, genome());
        assert_eq!(info.reference().to_string(), "10/4/2");
    }

    #[test]
    fn object_info_writes_tuple() {
        let value = serde_json::to_value(genome()).unwrap();
        assert!(value.is_array());
        assert_eq!(value[2], "KBaseGenomes.Genome-1.0");
        assert_eq!(value[10], json!(null));
    }

    #[test]
    fn object_metadata_passes_through_as_listed() {
        let with_meta = json!([4, "genome", "KBaseGenomes.Genome-1.0", "2024-01-01T00:00:00+0000",
                               2, "alice", 10, "alice:narrative_1", "abc", 100, {}]);
        let info: ObjectInfo = serde_json::from_value(with_meta.clone()).unwrap();
        assert_eq!(info.metadata, Some(Metadata::new()));
        assert_eq!(serde_json::to_value(&info).unwrap(), with_meta);

        let listed_without = serde_json::to_value(genome()).unwrap();
        let info: ObjectInfo = serde_json::from_value(listed_without.clone()).unwrap();
        assert_eq!(serde_json::to_value(&info).unwrap(), listed_without);
        assert_eq!(info.to_descriptor().metadata, None);
        assert_eq!(serde_json::to_value(info.to_descriptor()).unwrap()["metadata"], json!(null));
    }

    #[test]
    fn meta_reads_single_keys() {
        let mut info = genome();
        assert_eq!(info.meta("name"), None);
        info.metadata = Some(Metadata::from([("name".to_string(), "G".to_string())]));
        assert_eq!(info.meta("name"), Some("G"));
        assert_eq!(info.to_descriptor().meta("name"), Some("G"));
    }

    #[test]
    fn type_prefix_strips_version() {
        assert_eq!(genome().type_prefix(), "KBaseGenomes.Genome");
        assert_eq!(type_prefix("NoVersion.Type"), "NoVersion.Type");
        assert_eq!(type_prefix(""), "");
    }

    #[test]
    fn object_descriptor_carries_ref_and_obj_id() {
        let d = genome().to_descriptor();
        assert_eq!(d.reference, "10/4/2");
        assert_eq!(d.obj_id, "ws.10.obj.4");
        let value = serde_json::to_value(&d).unwrap();
        assert_eq!(value["ref"], "10/4/2");
        assert_eq!(value["type"], "KBaseGenomes.Genome-1.0");
    }

    #[test]
    fn workspace_info_round_trips_descriptor_fields() {
        let raw = json!([12, "bob:narrative_5", "bob", "2024-02-02T00:00:00+0000", 7, "a", "n", "unlocked",
                         {"narrative": "1"}]);
        let info: WorkspaceInfo = serde_json::from_value(raw).unwrap();
        let d = info.to_descriptor();
        assert_eq!(d.id, 12);
        assert_eq!(d.object_count, 7);
        assert_eq!(d.metadata.get("narrative").map(String::as_str), Some("1"));
    }
}
