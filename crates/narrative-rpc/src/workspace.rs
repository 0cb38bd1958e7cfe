//! Workspace service client

use crate::jsonrpc::{int_flag, JsonRpcClient};
use async_trait::async_trait;
use narrative_core::{RemoteError, WorkspaceStore};
use narrative_model::{
    CloneWorkspaceParams, CopyTarget, ListObjectsParams, Metadata, ObjectData, ObjectInfo,
    ObjectSaveData, WorkspaceFilter, WorkspaceIdentity, WorkspaceInfo,
};
use serde::Deserialize;
use serde_json::{json, Value};

/// Workspace identity object: `{"id": n}` or `{"workspace": name}`
fn wsi(workspace: &WorkspaceIdentity) -> Value {
    match workspace {
        WorkspaceIdentity::Id(id) => json!({ "id": id }),
        WorkspaceIdentity::Name(name) => json!({ "workspace": name }),
    }
}

/// `wsi` merged into the top level of a parameter object
fn with_wsi(workspace: &WorkspaceIdentity, mut params: Value) -> Value {
    if let (Value::Object(target), Value::Object(ids)) = (&mut params, wsi(workspace)) {
        target.extend(ids);
    }
    params
}

fn object_specs(refs: &[String]) -> Vec<Value> {
    refs.iter().map(|r| json!({ "ref": r })).collect()
}

#[derive(Debug, Deserialize)]
struct GetObjectsResult {
    data: Vec<ObjectData>,
}

#[derive(Debug, Deserialize)]
struct GetObjectInfoResult {
    infos: Vec<ObjectInfo>,
}

/// [`WorkspaceStore`] over the Workspace JSON-RPC API
#[derive(Debug, Clone)]
pub struct WorkspaceClient {
    rpc: JsonRpcClient,
}

impl WorkspaceClient {
    /// Service name used in method names
    pub const SERVICE: &'static str = "Workspace";

    #[must_use]
    pub fn new(rpc: JsonRpcClient) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl WorkspaceStore for WorkspaceClient {
    async fn get_workspace_info(&self, workspace: &WorkspaceIdentity) -> Result<WorkspaceInfo, RemoteError> {
        self.rpc.call("get_workspace_info", &wsi(workspace)).await
    }

    async fn list_workspace_info(&self, filter: &WorkspaceFilter) -> Result<Vec<WorkspaceInfo>, RemoteError> {
        self.rpc.call("list_workspace_info", &json!({ "perm": filter.perm })).await
    }

    async fn list_objects(&self, params: &ListObjectsParams) -> Result<Vec<ObjectInfo>, RemoteError> {
        let params = json!({
            "ids": params.ids,
            "minObjectID": params.min_object_id,
            "maxObjectID": params.max_object_id,
            "includeMetadata": int_flag(params.include_metadata),
        });
        self.rpc.call("list_objects", &params).await
    }

    async fn get_objects(&self, refs: &[String]) -> Result<Vec<ObjectData>, RemoteError> {
        let result: GetObjectsResult = self
            .rpc
            .call("get_objects2", &json!({ "objects": object_specs(refs) }))
            .await?;
        Ok(result.data)
    }

    async fn save_objects(
        &self,
        workspace: &WorkspaceIdentity,
        objects: Vec<ObjectSaveData>,
    ) -> Result<Vec<ObjectInfo>, RemoteError> {
        let objects: Vec<Value> = objects
            .into_iter()
            .map(|o| {
                json!({
                    "type": o.type_string,
                    "data": o.data,
                    "name": o.name,
                    "meta": o.meta,
                    "provenance": o.provenance,
                    "hidden": int_flag(o.hidden),
                })
            })
            .collect();
        let params = with_wsi(workspace, json!({ "objects": objects }));
        self.rpc.call("save_objects", &params).await
    }

    async fn copy_object(&self, from: &str, to: &CopyTarget) -> Result<ObjectInfo, RemoteError> {
        let target = match &to.workspace {
            WorkspaceIdentity::Id(id) => json!({ "wsid": id, "name": to.name }),
            WorkspaceIdentity::Name(ws) => json!({ "workspace": ws, "name": to.name }),
        };
        let params = json!({ "from": { "ref": from }, "to": target });
        self.rpc.call("copy_object", &params).await
    }

    async fn clone_workspace(&self, params: &CloneWorkspaceParams) -> Result<WorkspaceInfo, RemoteError> {
        let exclude: Vec<Value> = params.exclude.iter().map(|objid| json!({ "objid": objid })).collect();
        let params = json!({
            "wsi": wsi(&params.source),
            "workspace": params.new_name,
            "meta": params.meta,
            "exclude": exclude,
        });
        self.rpc.call("clone_workspace", &params).await
    }

    async fn delete_workspace(&self, workspace: &WorkspaceIdentity) -> Result<(), RemoteError> {
        self.rpc.call_unit("delete_workspace", &wsi(workspace)).await
    }

    async fn alter_workspace_metadata(&self, workspace: &WorkspaceIdentity, new: Metadata) -> Result<(), RemoteError> {
        let params = json!({ "wsi": wsi(workspace), "new": new });
        self.rpc.call_unit("alter_workspace_metadata", &params).await
    }

    async fn create_workspace(&self, name: &str, description: &str) -> Result<WorkspaceInfo, RemoteError> {
        let params = json!({ "workspace": name, "description": description });
        self.rpc.call("create_workspace", &params).await
    }

    async fn get_object_info(&self, refs: &[String], include_metadata: bool) -> Result<Vec<ObjectInfo>, RemoteError> {
        let params = json!({
            "objects": object_specs(refs),
            "includeMetadata": int_flag(include_metadata),
        });
        let result: GetObjectInfoResult = self.rpc.call("get_object_info3", &params).await?;
        Ok(result.infos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn identity_objects() {
        assert_eq!(wsi(&WorkspaceIdentity::Id(4)), json!({"id": 4}));
        assert_eq!(
            wsi(&WorkspaceIdentity::Name("alice:narrative_1".into())),
            json!({"workspace": "alice:narrative_1"})
        );
        assert_eq!(
            with_wsi(&WorkspaceIdentity::Id(4), json!({"objects": []})),
            json!({"id": 4, "objects": []})
        );
    }

    #[test]
    fn get_objects2_result_shape() {
        let raw = json!({"data": [{
            "info": [3, "Narrative.1", "KBaseNarrative.Narrative-4.0", "2026-01-01T00:00:00+0000", 2,
                     "alice", 9, "alice:narrative_1", "abc", 120, {"name": "N"}],
            "data": {"cells": []},
            "provenance": [{"script": "x"}],
            "creator": "alice"
        }]});
        let result: GetObjectsResult = serde_json::from_value(raw).unwrap();
        assert_eq!(result.data[0].info.objid, 3);
        assert_eq!(result.data[0].info.meta("name"), Some("N"));
        assert_eq!(result.data[0].provenance.len(), 1);
    }
}
