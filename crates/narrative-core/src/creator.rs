//! New workspace + narrative bundles

use crate::cells::{CellAssembler, CellDescriptor, StepParam};
use crate::clients::WorkspaceStore;
use crate::context::{AuthContext, Stamp};
use crate::copier::{CopyObjectRequest, ObjectCopier};
use crate::error::{RemoteError, Result};
use narrative_model::{
    flag, meta_keys, Metadata, NarrativeDocument, NarrativeMetadata, ObjectDescriptor,
    ObjectSaveData, WorkspaceDescriptor, WorkspaceIdentity, NARRATIVE_TYPE, UNTITLED,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const PROVENANCE_SCRIPT: &str = concat!(env!("CARGO_PKG_NAME"), "/creator");

/// Content of a narrative to create
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NarrativeBlueprint {
    pub cells: Vec<CellDescriptor>,
    pub parameters: Vec<StepParam>,
    /// Objects copied into the new workspace afterwards
    pub import_refs: Vec<String>,
    pub include_intro: bool,
    pub title: Option<String>,
}

impl NarrativeBlueprint {
    /// Title when present and non-empty
    fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.is_empty())
    }

    /// Temporary unless given a title other than the default one
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.title().map_or(true, |t| t == UNTITLED)
    }
}

/// The created workspace and narrative
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedNarrative {
    #[serde(rename = "workspaceInfo")]
    pub workspace_info: WorkspaceDescriptor,
    #[serde(rename = "narrativeInfo")]
    pub narrative_info: ObjectDescriptor,
}

/// Creates a workspace holding a fresh narrative
#[derive(Clone)]
pub struct NarrativeCreator {
    store: Arc<dyn WorkspaceStore>,
    assembler: CellAssembler,
    copier: ObjectCopier,
}

impl std::fmt::Debug for NarrativeCreator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrativeCreator")
            .field("assembler", &self.assembler)
            .finish_non_exhaustive()
    }
}

impl NarrativeCreator {
    #[must_use]
    pub fn new(store: Arc<dyn WorkspaceStore>, assembler: CellAssembler) -> Self {
        let copier = ObjectCopier::new(Arc::clone(&store));
        Self {
            store,
            assembler,
            copier,
        }
    }

    /// Create the workspace, save the narrative, link it, import data.
    ///
    /// Nothing is undone when a later step fails; the workspace stays
    /// behind under its generated name.
    ///
    /// # Errors
    /// Cell assembly errors and any store failure
    #[tracing::instrument(skip(self, auth, blueprint), fields(user = %auth.user_id, cells = blueprint.cells.len()))]
    pub async fn create(&self, auth: &AuthContext, blueprint: &NarrativeBlueprint) -> Result<CreatedNarrative> {
        let stamp = Stamp::now();
        let ws_name = auth.narrative_workspace_name(stamp);
        let workspace = self.store.create_workspace(&ws_name, "").await?;
        tracing::info!(ws_id = workspace.id, %ws_name, "workspace created");

        let cells = self
            .assembler
            .assemble(&blueprint.cells, &blueprint.parameters, blueprint.include_intro)
            .await?;
        let cell_count = cells.len();
        let title = blueprint.title().unwrap_or(UNTITLED);
        let doc_meta = NarrativeMetadata::new(&auth.user_id, &ws_name, title);
        let is_temporary = flag(blueprint.is_temporary());

        let mut object_meta = doc_meta.to_object_metadata()?;
        object_meta.insert(meta_keys::IS_TEMPORARY.to_string(), is_temporary.clone());
        let document = NarrativeDocument::new(cells, doc_meta);

        let save = ObjectSaveData {
            type_string: NARRATIVE_TYPE.to_string(),
            data: serde_json::to_value(&document)?,
            name: stamp.narrative_object_name(),
            meta: object_meta,
            provenance: vec![json!({
                "script": PROVENANCE_SCRIPT,
                "description": "Created new Workspace/Narrative bundle."
            })],
            hidden: false,
        };
        let ws = WorkspaceIdentity::Name(ws_name.clone());
        let narrative = self
            .store
            .save_objects(&ws, vec![save])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::Decode {
                service: "Workspace".to_string(),
                method: "save_objects".to_string(),
                message: "no object info returned".to_string(),
            })?;

        let mut ws_meta = Metadata::new();
        ws_meta.insert(meta_keys::NARRATIVE.to_string(), narrative.objid.to_string());
        ws_meta.insert(meta_keys::IS_TEMPORARY.to_string(), is_temporary);
        ws_meta.insert(meta_keys::SEARCHTAGS.to_string(), "narrative".to_string());
        ws_meta.insert(meta_keys::CELL_COUNT.to_string(), cell_count.to_string());
        if !blueprint.is_temporary() {
            ws_meta.insert(meta_keys::NICE_NAME.to_string(), title.to_string());
        }
        self.store.alter_workspace_metadata(&ws, ws_meta).await?;
        tracing::info!(narrative = %narrative.reference(), "narrative saved and linked");

        self.import(&blueprint.import_refs, &ws).await?;

        let workspace = self
            .store
            .get_workspace_info(&WorkspaceIdentity::Id(workspace.id))
            .await?;
        Ok(CreatedNarrative {
            workspace_info: workspace.to_descriptor(),
            narrative_info: narrative.to_descriptor(),
        })
    }

    async fn import(&self, refs: &[String], target: &WorkspaceIdentity) -> Result<()> {
        if refs.is_empty() {
            return Ok(());
        }
        let infos = self.store.get_object_info(refs, false).await?;
        let imported = infos.len();
        for info in infos {
            let request = CopyObjectRequest {
                reference: info.reference().to_string(),
                target_name: Some(info.name.clone()),
                src_info: Some(info),
                ..CopyObjectRequest::default()
            }
            .into_workspace(target.clone());
            self.copier.copy(request).await?;
        }
        tracing::debug!(requested = refs.len(), imported, "data imported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_follows_title() {
        let mut bp = NarrativeBlueprint::default();
        assert!(bp.is_temporary());
        bp.title = Some(String::new());
        assert!(bp.is_temporary());
        bp.title = Some(UNTITLED.to_string());
        assert!(bp.is_temporary());
        bp.title = Some("My Analysis".to_string());
        assert!(!bp.is_temporary());
    }
}
