use crate::store::InMemoryWorkspace;
use async_trait::async_trait;
use narrative_core::{
    AggregatorConfig, Collaborators, IntroSource, NarrativeError, NarrativeManager, PaletteLister,
    RemoteError, SetLister, SpecRegistry,
};
use narrative_model::{
    ListDataRequest, ListSetsRequest, Metadata, ObjectInfo, PaletteItem, PaletteListing, SetItem,
    SetListing, SetRecord, WorkspaceInfo,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

pub fn object_info(wsid: u64, objid: u64, version: u64, name: &str, type_string: &str) -> ObjectInfo {
    ObjectInfo {
        objid,
        name: name.to_string(),
        type_string: type_string.to_string(),
        save_date: "2026-01-01T00:00:00+0000".to_string(),
        version,
        saved_by: "tester".to_string(),
        wsid,
        workspace: format!("ws_{wsid}"),
        checksum: String::new(),
        size: 0,
        metadata: None,
    }
}

pub fn workspace_info(id: u64, name: &str, max_objid: u64) -> WorkspaceInfo {
    WorkspaceInfo {
        id,
        name: name.to_string(),
        owner: "tester".to_string(),
        moddate: "2026-01-01T00:00:00+0000".to_string(),
        max_objid,
        user_permission: "a".to_string(),
        globalread: "n".to_string(),
        lockstat: "unlocked".to_string(),
        metadata: Metadata::new(),
    }
}

pub fn set_record(info: ObjectInfo, members: Vec<ObjectInfo>) -> SetRecord {
    SetRecord {
        reference: info.reference(),
        info,
        items: members
            .into_iter()
            .map(|m| SetItem {
                reference: Some(m.reference().to_string()),
                info: m,
            })
            .collect(),
    }
}

pub fn palette_item(info: ObjectInfo, dp_ref: &str) -> PaletteItem {
    PaletteItem {
        reference: info.reference(),
        info,
        dp_ref: Some(dp_ref.to_string()),
        dp_refs: None,
    }
}

pub fn app_spec(id: &str) -> Value {
    json!({
        "info": {"id": id, "name": format!("App {id}")},
        "steps": [{"method_id": format!("{id}/step")}]
    })
}

pub fn method_spec(id: &str) -> Value {
    json!({
        "info": {"id": id, "name": format!("Method {id}")},
        "widgets": {"input": "kbaseNarrativeMethodInput", "output": "kbaseDefaultNarrativeOutput"}
    })
}

/// Set service returning one fixed listing
#[derive(Debug, Default)]
pub struct StaticSetLister {
    listing: Mutex<SetListing>,
    requests: Mutex<Vec<ListSetsRequest>>,
    failure: Mutex<Option<RemoteError>>,
}

impl StaticSetLister {
    pub fn new(listing: SetListing) -> Self {
        Self {
            listing: Mutex::new(listing),
            ..Self::default()
        }
    }

    pub fn set_listing(&self, listing: SetListing) {
        *self.listing.lock() = listing;
    }

    pub fn fail_with(&self, error: RemoteError) {
        *self.failure.lock() = Some(error);
    }

    pub fn requests(&self) -> Vec<ListSetsRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl SetLister for StaticSetLister {
    async fn list_sets(&self, request: &ListSetsRequest) -> Result<SetListing, RemoteError> {
        self.requests.lock().push(request.clone());
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }
        Ok(self.listing.lock().clone())
    }
}

/// Palette service returning one fixed listing
#[derive(Debug, Default)]
pub struct StaticPaletteLister {
    listing: Mutex<PaletteListing>,
    requests: Mutex<Vec<ListDataRequest>>,
}

impl StaticPaletteLister {
    pub fn new(listing: PaletteListing) -> Self {
        Self {
            listing: Mutex::new(listing),
            ..Self::default()
        }
    }

    pub fn set_listing(&self, listing: PaletteListing) {
        *self.listing.lock() = listing;
    }

    pub fn requests(&self) -> Vec<ListDataRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl PaletteLister for StaticPaletteLister {
    async fn list_data(&self, request: &ListDataRequest) -> Result<PaletteListing, RemoteError> {
        self.requests.lock().push(request.clone());
        Ok(self.listing.lock().clone())
    }
}

/// Spec registry over fixed spec lists; unknown ids are left out
#[derive(Debug, Default)]
pub struct StaticSpecRegistry {
    apps: Vec<Value>,
    methods: Vec<Value>,
    lookups: Mutex<Vec<Vec<String>>>,
}

impl StaticSpecRegistry {
    pub fn new(apps: Vec<Value>, methods: Vec<Value>) -> Self {
        Self {
            apps,
            methods,
            lookups: Mutex::new(Vec::new()),
        }
    }

    /// Id lists of every lookup, apps and methods alike
    pub fn lookups(&self) -> Vec<Vec<String>> {
        self.lookups.lock().clone()
    }

    fn select(&self, specs: &[Value], ids: &[String]) -> Vec<Value> {
        self.lookups.lock().push(ids.to_vec());
        specs
            .iter()
            .filter(|s| s["info"]["id"].as_str().is_some_and(|id| ids.iter().any(|i| i == id)))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SpecRegistry for StaticSpecRegistry {
    async fn get_app_specs(&self, ids: &[String]) -> Result<Vec<Value>, RemoteError> {
        Ok(self.select(&self.apps, ids))
    }

    async fn get_method_specs(&self, ids: &[String]) -> Result<Vec<Value>, RemoteError> {
        Ok(self.select(&self.methods, ids))
    }
}

/// Fixed intro text
#[derive(Debug, Clone)]
pub struct StaticIntro(pub String);

impl Default for StaticIntro {
    fn default() -> Self {
        Self("# Welcome to the Narrative".to_string())
    }
}

#[async_trait]
impl IntroSource for StaticIntro {
    async fn intro_markdown(&self) -> Result<String, NarrativeError> {
        Ok(self.0.clone())
    }
}

/// All fakes wired together, with handles kept for assertions
#[derive(Debug, Clone)]
pub struct Harness {
    pub store: Arc<InMemoryWorkspace>,
    pub sets: Arc<StaticSetLister>,
    pub palettes: Arc<StaticPaletteLister>,
    pub registry: Arc<StaticSpecRegistry>,
    pub intro: Arc<StaticIntro>,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(StaticSpecRegistry::default())
    }
}

impl Harness {
    pub fn new(registry: StaticSpecRegistry) -> Self {
        Self {
            store: Arc::new(InMemoryWorkspace::new()),
            sets: Arc::new(StaticSetLister::default()),
            palettes: Arc::new(StaticPaletteLister::default()),
            registry: Arc::new(registry),
            intro: Arc::new(StaticIntro::default()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            store: self.store.clone(),
            sets: self.sets.clone(),
            palettes: self.palettes.clone(),
            registry: self.registry.clone(),
            intro: self.intro.clone(),
        }
    }

    pub fn manager(&self) -> NarrativeManager {
        self.manager_with(AggregatorConfig::default())
    }

    pub fn manager_with(&self, config: AggregatorConfig) -> NarrativeManager {
        NarrativeManager::new(self.collaborators(), config)
    }
}
