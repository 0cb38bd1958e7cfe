//! Narrative Model
//!
//! Plain data types shared by the narrative service crates.
//!
//! # Core Concepts
//!
//! - [`ObjectReference`]: canonical `wsid/objid/ver` key
//! - [`ObjectInfo`] / [`WorkspaceInfo`]: tuple-shaped snapshots from the store
//! - [`Catalog`] / [`CatalogBuilder`]: deduplicated object listing
//! - [`NarrativeDocument`] / [`CellRecord`]: notebook documents
//!
//! # Example
//!
//! ```rust
//! use narrative_model::{ObjectReference, TypeFilter};
//!
//! let r: ObjectReference = "12/3/1".parse().unwrap();
//! assert_eq!(r.to_string(), "12/3/1");
//!
//! let filter = TypeFilter::only(["KBaseGenomes.Genome"]);
//! assert!(filter.accepts_type("KBaseGenomes.Genome-8.2"));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod catalog;
pub mod ids;
pub mod info;
pub mod json_text;
pub mod listing;
pub mod narrative;

pub use catalog::{Catalog, CatalogBuilder, CatalogEntry, DataPaletteInfo, SetItems, TypeFilter};
pub use ids::{ObjectReference, ReferenceError, WorkspaceIdentity};
pub use json_text::to_spaced_string;
pub use info::{
    type_prefix, Metadata, ObjectDescriptor, ObjectInfo, WorkspaceDescriptor, WorkspaceInfo,
};
pub use listing::{
    CloneWorkspaceParams, CopyTarget, ListDataRequest, ListObjectsParams, ListSetsRequest,
    ObjectData, ObjectSaveData, PaletteItem, PaletteListing, SetItem, SetListing, SetRecord,
    WorkspaceFilter,
};
pub use narrative::{
    flag, meta_keys, CellLayout, CellRecord, JobIds, JobInfo, JobUsage, NarrativeDocument,
    NarrativeMetadata, NARRATIVE_TYPE, UNTITLED,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
