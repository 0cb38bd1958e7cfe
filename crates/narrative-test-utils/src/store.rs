use async_trait::async_trait;
use narrative_core::{RemoteError, WorkspaceStore};
use narrative_model::{
    CloneWorkspaceParams, CopyTarget, ListObjectsParams, Metadata, ObjectData, ObjectInfo,
    ObjectSaveData, WorkspaceFilter, WorkspaceIdentity, WorkspaceInfo,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};

const SERVICE: &str = "Workspace";
const SAVE_DATE: &str = "2026-01-01T00:00:00+0000";

#[derive(Debug, Clone)]
struct StoredObject {
    info: ObjectInfo,
    data: Value,
    provenance: Vec<Value>,
}

#[derive(Debug, Clone)]
struct StoredWorkspace {
    info: WorkspaceInfo,
    objects: BTreeMap<u64, StoredObject>,
}

impl StoredWorkspace {
    fn insert(&mut self, name: &str, type_string: &str, data: Value, meta: Metadata, provenance: Vec<Value>) -> ObjectInfo {
        let existing = self.objects.values().find(|o| o.info.name == name).map(|o| (o.info.objid, o.info.version));
        let (objid, version) = match existing {
            Some((objid, version)) => (objid, version + 1),
            None => {
                self.info.max_objid += 1;
                (self.info.max_objid, 1)
            }
        };
        let info = ObjectInfo {
            objid,
            name: name.to_string(),
            type_string: type_string.to_string(),
            save_date: SAVE_DATE.to_string(),
            version,
            saved_by: self.info.owner.clone(),
            wsid: self.info.id,
            workspace: self.info.name.clone(),
            checksum: format!("{objid:032x}"),
            size: data.to_string().len() as u64,
            metadata: Some(meta),
        };
        self.objects.insert(
            objid,
            StoredObject {
                info: info.clone(),
                data,
                provenance,
            },
        );
        info
    }
}

#[derive(Debug, Default)]
struct State {
    next_ws_id: u64,
    workspaces: BTreeMap<u64, StoredWorkspace>,
    calls: Vec<&'static str>,
    copy_sources: Vec<String>,
    failures: HashMap<&'static str, RemoteError>,
}

impl State {
    fn ws_id(&self, method: &str, ws: &WorkspaceIdentity) -> Result<u64, RemoteError> {
        self.workspaces
            .values()
            .find(|w| ws.matches(w.info.id, &w.info.name))
            .map(|w| w.info.id)
            .ok_or_else(|| RemoteError::service(SERVICE, method, format!("No workspace with identity {ws}")))
    }

    fn ws_mut(&mut self, method: &str, ws: &WorkspaceIdentity) -> Result<&mut StoredWorkspace, RemoteError> {
        let id = self.ws_id(method, ws)?;
        self.workspaces
            .get_mut(&id)
            .ok_or_else(|| RemoteError::service(SERVICE, method, format!("No workspace with id {id}")))
    }

    /// Resolve `ws/obj[/ver]` where each part is a number or a name
    fn object(&self, method: &str, reference: &str) -> Result<&StoredObject, RemoteError> {
        let missing = || RemoteError::service(SERVICE, method, format!("No object with reference {reference}"));
        let mut parts = reference.split('/');
        let (Some(ws), Some(obj)) = (parts.next(), parts.next()) else {
            return Err(missing());
        };
        let ws: WorkspaceIdentity = ws.parse().map_err(|_| missing())?;
        let ws = self.workspaces.get(&self.ws_id(method, &ws)?).ok_or_else(missing)?;
        let found = match obj.parse::<u64>() {
            Ok(objid) => ws.objects.get(&objid),
            Err(_) => ws.objects.values().find(|o| o.info.name == obj),
        };
        found.ok_or_else(missing)
    }

    fn create(&mut self, name: &str, owner: &str, method: &str) -> Result<u64, RemoteError> {
        if self.workspaces.values().any(|w| w.info.name == name) {
            return Err(RemoteError::service(SERVICE, method, format!("Workspace name {name} is already in use")));
        }
        self.next_ws_id += 1;
        let id = self.next_ws_id;
        self.workspaces.insert(
            id,
            StoredWorkspace {
                info: WorkspaceInfo {
                    id,
                    name: name.to_string(),
                    owner: owner.to_string(),
                    moddate: SAVE_DATE.to_string(),
                    max_objid: 0,
                    user_permission: "a".to_string(),
                    globalread: "n".to_string(),
                    lockstat: "unlocked".to_string(),
                    metadata: Metadata::new(),
                },
                objects: BTreeMap::new(),
            },
        );
        Ok(id)
    }
}

/// Workspace store kept in memory
///
/// Every trait call is recorded by method name. A failure injected with
/// [`fail_on`](Self::fail_on) is returned by every later call of that
/// method until [`clear_failures`](Self::clear_failures).
#[derive(Debug)]
pub struct InMemoryWorkspace {
    state: Mutex<State>,
    owner: String,
}

impl InMemoryWorkspace {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            owner: "tester".to_string(),
        }
    }

    /// Add an empty workspace, returning its id
    pub fn add_workspace(&self, name: &str) -> u64 {
        self.state.lock().create(name, &self.owner, "add_workspace").unwrap()
    }

    /// Add an object with empty data
    pub fn add_object(&self, wsid: u64, name: &str, type_string: &str) -> ObjectInfo {
        self.add_object_with(wsid, name, type_string, json!({}), Metadata::new())
    }

    pub fn add_object_with(&self, wsid: u64, name: &str, type_string: &str, data: Value, meta: Metadata) -> ObjectInfo {
        let mut state = self.state.lock();
        let ws = state.workspaces.get_mut(&wsid).unwrap();
        ws.insert(name, type_string, data, meta, vec![json!({"service": "fixture"})])
    }

    pub fn set_workspace_metadata(&self, wsid: u64, meta: Metadata) {
        self.state.lock().workspaces.get_mut(&wsid).unwrap().info.metadata = meta;
    }

    pub fn fail_on(&self, method: &'static str, error: RemoteError) {
        self.state.lock().failures.insert(method, error);
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// Method names of every call so far, in order
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().calls.clone()
    }

    /// `from` references of every successful `copy_object`, in order
    pub fn copy_sources(&self) -> Vec<String> {
        self.state.lock().copy_sources.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| **c == method).count()
    }

    pub fn workspace(&self, wsid: u64) -> Option<WorkspaceInfo> {
        self.state.lock().workspaces.get(&wsid).map(|w| w.info.clone())
    }

    pub fn workspace_by_name(&self, name: &str) -> Option<WorkspaceInfo> {
        self.state
            .lock()
            .workspaces
            .values()
            .find(|w| w.info.name == name)
            .map(|w| w.info.clone())
    }

    pub fn workspace_count(&self) -> usize {
        self.state.lock().workspaces.len()
    }

    pub fn objects(&self, wsid: u64) -> Vec<ObjectInfo> {
        self.state
            .lock()
            .workspaces
            .get(&wsid)
            .map(|w| w.objects.values().map(|o| o.info.clone()).collect())
            .unwrap_or_default()
    }

    pub fn object_data(&self, wsid: u64, objid: u64) -> Option<Value> {
        self.state
            .lock()
            .workspaces
            .get(&wsid)
            .and_then(|w| w.objects.get(&objid))
            .map(|o| o.data.clone())
    }

    fn enter(&self, method: &'static str) -> Result<parking_lot::MutexGuard<'_, State>, RemoteError> {
        let mut state = self.state.lock();
        state.calls.push(method);
        if let Some(error) = state.failures.get(method).cloned() {
            return Err(error);
        }
        Ok(state)
    }
}

impl Default for InMemoryWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

fn without_metadata(mut info: ObjectInfo, include: bool) -> ObjectInfo {
    if !include {
        info.metadata = None;
    }
    info
}

#[async_trait]
impl WorkspaceStore for InMemoryWorkspace {
    async fn get_workspace_info(&self, workspace: &WorkspaceIdentity) -> Result<WorkspaceInfo, RemoteError> {
        let state = self.enter("get_workspace_info")?;
        let id = state.ws_id("get_workspace_info", workspace)?;
        Ok(state.workspaces[&id].info.clone())
    }

    async fn list_workspace_info(&self, _filter: &WorkspaceFilter) -> Result<Vec<WorkspaceInfo>, RemoteError> {
        let state = self.enter("list_workspace_info")?;
        Ok(state.workspaces.values().map(|w| w.info.clone()).collect())
    }

    async fn list_objects(&self, params: &ListObjectsParams) -> Result<Vec<ObjectInfo>, RemoteError> {
        let state = self.enter("list_objects")?;
        Ok(params
            .ids
            .iter()
            .filter_map(|id| state.workspaces.get(id))
            .flat_map(|w| w.objects.range(params.min_object_id..=params.max_object_id))
            .map(|(_, o)| without_metadata(o.info.clone(), params.include_metadata))
            .collect())
    }

    async fn get_objects(&self, refs: &[String]) -> Result<Vec<ObjectData>, RemoteError> {
        let state = self.enter("get_objects")?;
        refs.iter()
            .map(|r| {
                let o = state.object("get_objects", r)?;
                Ok(ObjectData {
                    info: o.info.clone(),
                    data: o.data.clone(),
                    provenance: o.provenance.clone(),
                })
            })
            .collect()
    }

    async fn save_objects(
        &self,
        workspace: &WorkspaceIdentity,
        objects: Vec<ObjectSaveData>,
    ) -> Result<Vec<ObjectInfo>, RemoteError> {
        let mut state = self.enter("save_objects")?;
        let ws = state.ws_mut("save_objects", workspace)?;
        Ok(objects
            .into_iter()
            .map(|o| ws.insert(&o.name, &o.type_string, o.data, o.meta, o.provenance))
            .collect())
    }

    async fn copy_object(&self, from: &str, to: &CopyTarget) -> Result<ObjectInfo, RemoteError> {
        let mut state = self.enter("copy_object")?;
        let source = state.object("copy_object", from)?.clone();
        let ws = state.ws_mut("copy_object", &to.workspace)?;
        let info = ws.insert(
            &to.name,
            &source.info.type_string,
            source.data,
            source.info.metadata.unwrap_or_default(),
            source.provenance,
        );
        state.copy_sources.push(from.to_string());
        Ok(info)
    }

    async fn clone_workspace(&self, params: &CloneWorkspaceParams) -> Result<WorkspaceInfo, RemoteError> {
        let mut state = self.enter("clone_workspace")?;
        let source_id = state.ws_id("clone_workspace", &params.source)?;
        let source = state.workspaces[&source_id].clone();
        let id = state.create(&params.new_name, &self.owner, "clone_workspace")?;
        let ws = state
            .workspaces
            .get_mut(&id)
            .ok_or_else(|| RemoteError::service(SERVICE, "clone_workspace", "clone vanished"))?;
        ws.info.max_objid = source.info.max_objid;
        ws.info.metadata = params.meta.clone();
        for (objid, mut object) in source.objects {
            if params.exclude.contains(&objid) {
                continue;
            }
            object.info.wsid = id;
            object.info.workspace = params.new_name.clone();
            ws.objects.insert(objid, object);
        }
        Ok(ws.info.clone())
    }

    async fn delete_workspace(&self, workspace: &WorkspaceIdentity) -> Result<(), RemoteError> {
        let mut state = self.enter("delete_workspace")?;
        let id = state.ws_id("delete_workspace", workspace)?;
        state.workspaces.remove(&id);
        Ok(())
    }

    async fn alter_workspace_metadata(&self, workspace: &WorkspaceIdentity, new: Metadata) -> Result<(), RemoteError> {
        let mut state = self.enter("alter_workspace_metadata")?;
        state.ws_mut("alter_workspace_metadata", workspace)?.info.metadata.extend(new);
        Ok(())
    }

    async fn create_workspace(&self, name: &str, _description: &str) -> Result<WorkspaceInfo, RemoteError> {
        let mut state = self.enter("create_workspace")?;
        let id = state.create(name, &self.owner, "create_workspace")?;
        Ok(state.workspaces[&id].info.clone())
    }

    async fn get_object_info(&self, refs: &[String], include_metadata: bool) -> Result<Vec<ObjectInfo>, RemoteError> {
        let state = self.enter("get_object_info")?;
        refs.iter()
            .map(|r| {
                let o = state.object("get_object_info", r)?;
                Ok(without_metadata(o.info.clone(), include_metadata))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saving_an_existing_name_bumps_version() {
        let store = InMemoryWorkspace::new();
        let ws = store.add_workspace("alice:narrative_1");
        let first = store.add_object(ws, "reads", "KBaseFile.PairedEndLibrary-2.0");
        let second = store.add_object(ws, "reads", "KBaseFile.PairedEndLibrary-2.0");
        assert_eq!(first.objid, second.objid);
        assert_eq!(second.version, 2);
        assert_eq!(store.workspace(ws).unwrap().max_objid, 1);
    }

    #[tokio::test]
    async fn injected_failure_is_returned_and_recorded() {
        let store = InMemoryWorkspace::new();
        store.fail_on("create_workspace", RemoteError::service(SERVICE, "create_workspace", "nope"));
        assert!(store.create_workspace("x", "").await.is_err());
        assert_eq!(store.calls(), vec!["create_workspace"]);
        store.clear_failures();
        assert!(store.create_workspace("x", "").await.is_ok());
    }

    #[tokio::test]
    async fn references_resolve_by_id_or_name() {
        let store = InMemoryWorkspace::new();
        let ws = store.add_workspace("bob:data");
        store.add_object(ws, "genome", "KBaseGenomes.Genome-1.0");
        let by_id = store.get_object_info(&[format!("{ws}/1/1")], false).await.unwrap();
        let by_name = store.get_object_info(&["bob:data/genome".to_string()], false).await.unwrap();
        assert_eq!(by_id, by_name);
    }
}
