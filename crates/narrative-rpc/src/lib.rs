//! Narrative RPC
//!
//! JSON-RPC 1.1 clients implementing the collaborator traits of
//! `narrative-core`:
//! - [`WorkspaceClient`]: object and workspace storage
//! - [`SetApiClient`]: set listings
//! - [`DataPaletteClient`]: data palette listings
//! - [`MethodStoreClient`]: app and method specs
//!
//! [`connect`] builds all of them from a [`ServiceConfig`].

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod jsonrpc;
pub mod services;
pub mod workspace;

pub use jsonrpc::{JsonRpcClient, DEFAULT_TIMEOUT};
pub use services::{DataPaletteClient, MethodStoreClient, SetApiClient};
pub use workspace::WorkspaceClient;

use narrative_core::{Collaborators, FileIntro, RemoteError, ServiceConfig};
use std::sync::Arc;

/// Collaborators talking to the configured endpoints with `token`
///
/// # Errors
/// `Transport` when a client cannot be built
pub fn connect(config: &ServiceConfig, token: Option<&str>) -> Result<Collaborators, RemoteError> {
    let client = |service: &'static str, url: &str| JsonRpcClient::new(service, url, token, DEFAULT_TIMEOUT);
    let store = WorkspaceClient::new(client(WorkspaceClient::SERVICE, &config.workspace_url)?);
    let sets = SetApiClient::new(client(SetApiClient::SERVICE, &config.set_api_url)?);
    let palettes = DataPaletteClient::new(client(DataPaletteClient::SERVICE, &config.data_palette_url)?);
    let registry = MethodStoreClient::new(client(
        MethodStoreClient::SERVICE,
        &config.narrative_method_store_url,
    )?);
    tracing::debug!(workspace = %config.workspace_url, "collaborator clients built");
    Ok(Collaborators {
        store: Arc::new(store),
        sets: Arc::new(sets),
        palettes: Arc::new(palettes),
        registry: Arc::new(registry),
        intro: Arc::new(FileIntro::new(config.intro_markdown_file.clone())),
    })
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
