//! Testing utilities for the narrative service
//!
//! In-memory collaborators with call recording and failure injection, and
//! fixture builders for the tuple-shaped store records.

#![allow(missing_docs)]

mod fixtures;
mod store;

pub use fixtures::{
    app_spec, method_spec, object_info, palette_item, set_record, workspace_info, Harness,
    StaticIntro, StaticPaletteLister, StaticSetLister, StaticSpecRegistry,
};
pub use store::InMemoryWorkspace;
