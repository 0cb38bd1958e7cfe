//! Narrative copy via workspace clone
//!
//! Copying a narrative clones its whole workspace minus the narrative
//! object, then saves a rewritten narrative into the clone and links it
//! from the workspace metadata. The clone is not transactional: once the
//! new workspace exists, every failure deletes it before the error is
//! returned.
//!
//! ```text
//! Initial -> WorkspaceCloned -> NarrativeRewritten -> MetadataLinked
//!                  \                    \
//!                   +--------------------+--> RollingBack -> Failed
//! ```

use crate::clients::WorkspaceStore;
use crate::context::{AuthContext, Stamp};
use crate::error::{NarrativeError, RemoteError, Result};
use narrative_model::{
    flag, meta_keys, CellLayout, CloneWorkspaceParams, JobIds, JobInfo, Metadata, ObjectData,
    ObjectSaveData, WorkspaceIdentity, UNTITLED,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Progress of a clone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloneStage {
    Initial,
    WorkspaceCloned,
    NarrativeRewritten,
    MetadataLinked,
    RollingBack,
    Failed,
}

impl CloneStage {
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::MetadataLinked | Self::Failed)
    }

    /// Whether a failure here leaves a workspace to delete
    #[inline]
    #[must_use]
    pub fn owns_workspace(self) -> bool {
        matches!(self, Self::WorkspaceCloned | Self::NarrativeRewritten)
    }
}

impl fmt::Display for CloneStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initial => "initial",
            Self::WorkspaceCloned => "workspace_cloned",
            Self::NarrativeRewritten => "narrative_rewritten",
            Self::MetadataLinked => "metadata_linked",
            Self::RollingBack => "rolling_back",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Ids of the copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClonedNarrative {
    #[serde(rename = "newWsId")]
    pub new_ws_id: u64,
    #[serde(rename = "newNarId")]
    pub new_nar_id: u64,
}

/// Deletes a freshly cloned workspace unless committed.
///
/// `roll_back` awaits the delete. Dropping an armed guard (a cancelled
/// clone) spawns the delete on the current runtime instead.
struct WorkspaceRollback {
    store: Arc<dyn WorkspaceStore>,
    workspace: Option<u64>,
}

impl WorkspaceRollback {
    fn arm(store: Arc<dyn WorkspaceStore>, workspace: u64) -> Self {
        Self {
            store,
            workspace: Some(workspace),
        }
    }

    fn commit(mut self) {
        self.workspace = None;
    }

    /// Delete the workspace; a failed delete is logged, never returned
    async fn roll_back(mut self) {
        let Some(id) = self.workspace.take() else {
            return;
        };
        delete_logged(self.store.as_ref(), id).await;
    }
}

impl Drop for WorkspaceRollback {
    fn drop(&mut self) {
        let Some(id) = self.workspace.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let store = Arc::clone(&self.store);
                handle.spawn(async move { delete_logged(store.as_ref(), id).await });
            }
            Err(_) => tracing::error!(ws_id = id, "clone abandoned outside a runtime; workspace left behind"),
        }
    }
}

async fn delete_logged(store: &dyn WorkspaceStore, id: u64) {
    match store.delete_workspace(&WorkspaceIdentity::Id(id)).await {
        Ok(()) => tracing::warn!(ws_id = id, "cloned workspace deleted"),
        Err(e) => tracing::error!(ws_id = id, error = %e, "failed to delete cloned workspace"),
    }
}

/// Copies narratives into new workspaces
#[derive(Clone)]
pub struct NarrativeCloner {
    store: Arc<dyn WorkspaceStore>,
}

impl fmt::Debug for NarrativeCloner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NarrativeCloner").finish_non_exhaustive()
    }
}

impl NarrativeCloner {
    #[must_use]
    pub fn new(store: Arc<dyn WorkspaceStore>) -> Self {
        Self { store }
    }

    /// Copy the narrative at `narrative_ref` under `new_name`.
    ///
    /// # Errors
    /// - `NotFound` when the narrative object is not returned
    /// - `InvalidArgument` when the stored document lacks metadata or cells
    /// - store failures; after the clone step the new workspace has been
    ///   deleted (or its deletion attempted) by the time this returns
    #[tracing::instrument(skip(self, auth), fields(user = %auth.user_id, stage = %CloneStage::Initial))]
    pub async fn clone_narrative(
        &self,
        auth: &AuthContext,
        narrative_ref: &str,
        new_name: &str,
    ) -> Result<ClonedNarrative> {
        let ws_name = auth.narrative_workspace_name(Stamp::now());
        let source = self
            .store
            .get_objects(&[narrative_ref.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| NarrativeError::not_found("narrative", narrative_ref))?;

        let mut clone_meta = Metadata::new();
        clone_meta.insert(meta_keys::NICE_NAME.to_string(), new_name.to_string());
        clone_meta.insert(meta_keys::SEARCHTAGS.to_string(), "narrative".to_string());
        let new_ws = self
            .store
            .clone_workspace(&CloneWorkspaceParams {
                source: WorkspaceIdentity::Id(source.info.wsid),
                new_name: ws_name.clone(),
                meta: clone_meta,
                exclude: vec![source.info.objid],
            })
            .await?;
        let guard = WorkspaceRollback::arm(Arc::clone(&self.store), new_ws.id);
        record_stage(CloneStage::WorkspaceCloned);
        tracing::info!(ws_id = new_ws.id, %ws_name, "workspace cloned");

        match self.link_copy(source, new_ws.id, &ws_name, new_name).await {
            Ok(cloned) => {
                guard.commit();
                record_stage(CloneStage::MetadataLinked);
                Ok(cloned)
            }
            Err(e) => {
                record_stage(CloneStage::RollingBack);
                tracing::warn!(error = %e, ws_id = new_ws.id, "clone failed, rolling back");
                guard.roll_back().await;
                record_stage(CloneStage::Failed);
                Err(e)
            }
        }
    }

    async fn link_copy(
        &self,
        source: ObjectData,
        new_ws_id: u64,
        ws_name: &str,
        new_name: &str,
    ) -> Result<ClonedNarrative> {
        let ObjectData {
            info,
            mut data,
            provenance,
        } = source;

        let mut meta = info.metadata.unwrap_or_default();
        meta.insert(meta_keys::NAME.to_string(), new_name.to_string());
        meta.insert(meta_keys::WS_NAME.to_string(), ws_name.to_string());
        meta.insert(meta_keys::JOB_INFO.to_string(), JobInfo::default().encoded()?);
        let is_temporary = meta
            .entry(meta_keys::IS_TEMPORARY.to_string())
            .or_insert_with(|| flag(new_name == UNTITLED))
            .clone();

        rewrite_document(&mut data, ws_name, new_name)?;
        let cell_count = CellLayout::of(&data)
            .ok_or_else(|| NarrativeError::invalid("narrative document has no cell list"))?
            .cell_count();
        record_stage(CloneStage::NarrativeRewritten);

        let ws = WorkspaceIdentity::Id(new_ws_id);
        let saved = self
            .store
            .save_objects(
                &ws,
                vec![ObjectSaveData {
                    type_string: info.type_string,
                    data,
                    name: info.name,
                    meta,
                    provenance,
                    hidden: false,
                }],
            )
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::Decode {
                service: "Workspace".to_string(),
                method: "save_objects".to_string(),
                message: "no object info returned".to_string(),
            })?;

        let mut ws_meta = Metadata::new();
        ws_meta.insert(meta_keys::NARRATIVE.to_string(), saved.objid.to_string());
        ws_meta.insert(meta_keys::IS_TEMPORARY.to_string(), is_temporary);
        ws_meta.insert(meta_keys::CELL_COUNT.to_string(), cell_count.to_string());
        self.store.alter_workspace_metadata(&ws, ws_meta).await?;

        Ok(ClonedNarrative {
            new_ws_id,
            new_nar_id: saved.objid,
        })
    }
}

fn rewrite_document(data: &mut Value, ws_name: &str, new_name: &str) -> Result<()> {
    let doc_meta = data
        .get_mut("metadata")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| NarrativeError::invalid("narrative document has no metadata"))?;
    doc_meta.insert(meta_keys::NAME.to_string(), Value::from(new_name));
    doc_meta.insert(meta_keys::WS_NAME.to_string(), Value::from(ws_name));
    doc_meta.insert("job_ids".to_string(), serde_json::to_value(JobIds::default())?);
    Ok(())
}

fn record_stage(stage: CloneStage) {
    tracing::Span::current().record("stage", tracing::field::display(stage));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stages() {
        assert!(CloneStage::MetadataLinked.is_terminal());
        assert!(CloneStage::Failed.is_terminal());
        assert!(!CloneStage::RollingBack.is_terminal());
        assert!(!CloneStage::Initial.owns_workspace());
        assert!(CloneStage::WorkspaceCloned.owns_workspace());
        assert_eq!(CloneStage::RollingBack.to_string(), "rolling_back");
    }

    #[test]
    fn document_rewrite_resets_jobs() {
        let mut doc = json!({
            "cells": [],
            "metadata": {"name": "Old", "ws_name": "a:narrative_1", "job_ids": {"apps": [1]}, "creator": "a"}
        });
        rewrite_document(&mut doc, "b:narrative_2", "New").unwrap();
        assert_eq!(doc["metadata"]["name"], "New");
        assert_eq!(doc["metadata"]["ws_name"], "b:narrative_2");
        assert_eq!(doc["metadata"]["creator"], "a");
        assert_eq!(
            doc["metadata"]["job_ids"],
            json!({"methods": [], "apps": [], "job_usage": {"queue_time": 0, "run_time": 0}})
        );
    }

    #[test]
    fn document_without_metadata_is_rejected() {
        let mut doc = json!({"cells": []});
        assert!(rewrite_document(&mut doc, "w", "n").unwrap_err().is_invalid_argument());
    }
}
