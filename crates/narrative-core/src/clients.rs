//! Collaborator interfaces
//!
//! The storage, set, palette and spec-registry services are reached
//! through these traits. Implement them to plug in a transport; the
//! narrative logic never talks to the network directly.

use crate::error::{NarrativeError, RemoteError};
use async_trait::async_trait;
use narrative_model::{
    CloneWorkspaceParams, CopyTarget, ListDataRequest, ListObjectsParams, ListSetsRequest,
    Metadata, ObjectData, ObjectInfo, ObjectSaveData, PaletteListing, SetListing,
    WorkspaceFilter, WorkspaceIdentity, WorkspaceInfo,
};
use serde_json::Value;
use std::path::PathBuf;

/// Object storage service
#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    async fn get_workspace_info(&self, workspace: &WorkspaceIdentity) -> Result<WorkspaceInfo, RemoteError>;

    async fn list_workspace_info(&self, filter: &WorkspaceFilter) -> Result<Vec<WorkspaceInfo>, RemoteError>;

    /// One page of objects; callers page by object-id range
    async fn list_objects(&self, params: &ListObjectsParams) -> Result<Vec<ObjectInfo>, RemoteError>;

    async fn get_objects(&self, refs: &[String]) -> Result<Vec<ObjectData>, RemoteError>;

    async fn save_objects(
        &self,
        workspace: &WorkspaceIdentity,
        objects: Vec<ObjectSaveData>,
    ) -> Result<Vec<ObjectInfo>, RemoteError>;

    async fn copy_object(&self, from: &str, to: &CopyTarget) -> Result<ObjectInfo, RemoteError>;

    /// Returns the new workspace
    async fn clone_workspace(&self, params: &CloneWorkspaceParams) -> Result<WorkspaceInfo, RemoteError>;

    async fn delete_workspace(&self, workspace: &WorkspaceIdentity) -> Result<(), RemoteError>;

    async fn alter_workspace_metadata(
        &self,
        workspace: &WorkspaceIdentity,
        new: Metadata,
    ) -> Result<(), RemoteError>;

    async fn create_workspace(&self, name: &str, description: &str) -> Result<WorkspaceInfo, RemoteError>;

    async fn get_object_info(
        &self,
        refs: &[String],
        include_metadata: bool,
    ) -> Result<Vec<ObjectInfo>, RemoteError>;
}

/// Set grouping service
#[async_trait]
pub trait SetLister: Send + Sync {
    async fn list_sets(&self, request: &ListSetsRequest) -> Result<SetListing, RemoteError>;
}

/// Data palette overlay service
#[async_trait]
pub trait PaletteLister: Send + Sync {
    async fn list_data(&self, request: &ListDataRequest) -> Result<PaletteListing, RemoteError>;
}

/// App and method specification registry
///
/// Specs are opaque JSON keyed by `info.id`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpecRegistry: Send + Sync {
    async fn get_app_specs(&self, ids: &[String]) -> Result<Vec<Value>, RemoteError>;

    async fn get_method_specs(&self, ids: &[String]) -> Result<Vec<Value>, RemoteError>;
}

/// Source of the introductory markdown cell text
#[async_trait]
pub trait IntroSource: Send + Sync {
    async fn intro_markdown(&self) -> Result<String, NarrativeError>;
}

/// Intro text read from a file on every call
#[derive(Debug, Clone)]
pub struct FileIntro {
    path: PathBuf,
}

impl FileIntro {
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl IntroSource for FileIntro {
    async fn intro_markdown(&self) -> Result<String, NarrativeError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| NarrativeError::IntroUnavailable {
                path: self.path.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn file_intro_reads_text() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "# Welcome").unwrap();
        let intro = FileIntro::new(file.path());
        assert_eq!(intro.intro_markdown().await.unwrap(), "# Welcome");
    }

    #[tokio::test]
    async fn missing_intro_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let intro = FileIntro::new(dir.path().join("absent.md"));
        let err = intro.intro_markdown().await.unwrap_err();
        assert!(matches!(err, NarrativeError::IntroUnavailable { .. }));
    }
}
