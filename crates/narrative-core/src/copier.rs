//! Copying single objects between workspaces

use crate::clients::WorkspaceStore;
use crate::error::{NarrativeError, Result};
use narrative_model::{CopyTarget, ObjectDescriptor, ObjectInfo, WorkspaceIdentity};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Object copy request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyObjectRequest {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ws_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ws_name: Option<String>,
    /// Defaults to the source object's name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
    /// Looked up when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_info: Option<ObjectInfo>,
}

impl CopyObjectRequest {
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn into_workspace(mut self, workspace: WorkspaceIdentity) -> Self {
        match workspace {
            WorkspaceIdentity::Id(id) => self.target_ws_id = Some(id),
            WorkspaceIdentity::Name(name) => self.target_ws_name = Some(name),
        }
        self
    }
}

/// Result of a copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopiedObject {
    pub info: ObjectDescriptor,
}

/// Copies objects through the store
#[derive(Clone)]
pub struct ObjectCopier {
    store: Arc<dyn WorkspaceStore>,
}

impl std::fmt::Debug for ObjectCopier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectCopier").finish_non_exhaustive()
    }
}

impl ObjectCopier {
    #[must_use]
    pub fn new(store: Arc<dyn WorkspaceStore>) -> Self {
        Self { store }
    }

    /// Copy `request.reference` into the target workspace
    ///
    /// # Errors
    /// - `InvalidArgument` when no target workspace is given
    /// - `NotFound` when the source info lookup returns nothing
    /// - store failures
    #[tracing::instrument(skip(self, request), fields(reference = %request.reference))]
    pub async fn copy(&self, request: CopyObjectRequest) -> Result<CopiedObject> {
        let workspace = WorkspaceIdentity::from_parts(request.target_ws_id, request.target_ws_name.as_deref())
            .ok_or_else(|| NarrativeError::invalid("Neither target workspace id nor name is defined"))?;
        let src_info = match request.src_info {
            Some(info) => info,
            None => self.source_info(&request.reference).await?,
        };
        let name = request
            .target_name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| src_info.name.clone());

        let info = self
            .store
            .copy_object(&request.reference, &CopyTarget { workspace, name })
            .await?;
        tracing::debug!(copied = %info.reference(), "object copied");
        Ok(CopiedObject {
            info: info.to_descriptor(),
        })
    }

    async fn source_info(&self, reference: &str) -> Result<ObjectInfo> {
        self.store
            .get_object_info(&[reference.to_string()], false)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| NarrativeError::not_found("object", reference))
    }
}
