//! Narrative Core
//!
//! Orchestration of narratives and workspace object listings on top of
//! an object store, a set service, a data-palette service and an app/method
//! spec registry:
//! - Aggregates sets, workspace objects and palette items into one
//!   deduplicated catalog
//! - Counts objects per type
//! - Creates workspaces with a new narrative built from app, method or
//!   markdown cells
//! - Copies narratives by cloning their workspace, deleting the clone
//!   if the copy cannot be completed
//! - Copies single objects between workspaces
//!
//! Collaborators are reached through the traits in [`clients`].
//!
//! # Example
//!
//! ```rust,ignore
//! use narrative_core::prelude::*;
//!
//! # async fn example(collaborators: Collaborators) -> Result<(), NarrativeError> {
//! let manager = NarrativeManager::new(collaborators, AggregatorConfig::default());
//! let params = ListObjectsWithSetsParams {
//!     ws_name: Some("alice:narrative_1".into()),
//!     ..Default::default()
//! };
//! let catalog = manager.list_objects_with_sets(params).await?;
//! println!("{} entries", catalog.len());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod aggregator;
pub mod cells;
pub mod clients;
pub mod cloner;
pub mod config;
pub mod context;
pub mod copier;
pub mod creator;
pub mod error;
pub mod manager;
pub mod object_stream;
pub mod resolver;
pub mod stats;

pub use aggregator::{CatalogAggregator, CatalogRequest};
pub use cells::{escape_for_script, CellAssembler, CellDescriptor, StepParam};
pub use clients::{FileIntro, IntroSource, PaletteLister, SetLister, SpecRegistry, WorkspaceStore};
pub use cloner::{CloneStage, ClonedNarrative, NarrativeCloner};
pub use config::{AggregatorConfig, ServiceConfig};
pub use context::{AuthContext, Stamp};
pub use copier::{CopiedObject, CopyObjectRequest, ObjectCopier};
pub use creator::{CreatedNarrative, NarrativeBlueprint, NarrativeCreator};
pub use error::{ConfigError, NarrativeError, RemoteError, Result};
pub use manager::{
    Collaborators, CopyNarrativeParams, CreateNarrativeParams, ListAvailableTypesParams,
    ListObjectsWithSetsParams, NarrativeManager,
};
pub use resolver::{parse_workspaces, resolve_workspaces, WorkspaceSelector};
pub use stats::{type_stats, TypeStats};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the narrative service
    pub use crate::{
        AggregatorConfig, AuthContext, Collaborators, CopyNarrativeParams, CopyObjectRequest,
        CreateNarrativeParams, ListAvailableTypesParams, ListObjectsWithSetsParams,
        NarrativeError, NarrativeManager, ServiceConfig,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
