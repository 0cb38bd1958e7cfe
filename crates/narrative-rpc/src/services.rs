//! Set, data-palette and method-store clients

use crate::jsonrpc::{int_flag, JsonRpcClient};
use async_trait::async_trait;
use narrative_core::{PaletteLister, RemoteError, SetLister, SpecRegistry};
use narrative_model::{ListDataRequest, ListSetsRequest, PaletteListing, SetListing};
use serde_json::{json, Value};

/// [`SetLister`] over the SetAPI service
#[derive(Debug, Clone)]
pub struct SetApiClient {
    rpc: JsonRpcClient,
}

impl SetApiClient {
    pub const SERVICE: &'static str = "SetAPI";

    #[must_use]
    pub fn new(rpc: JsonRpcClient) -> Self {
        Self { rpc }
    }
}

fn list_sets_params(request: &ListSetsRequest) -> Value {
    json!({
        "workspaces": request.workspaces,
        "include_set_item_info": int_flag(request.include_set_item_info),
        "include_raw_data_palettes": int_flag(request.include_raw_data_palettes),
        "include_metadata": int_flag(request.include_metadata),
    })
}

#[async_trait]
impl SetLister for SetApiClient {
    async fn list_sets(&self, request: &ListSetsRequest) -> Result<SetListing, RemoteError> {
        self.rpc.call("list_sets", &list_sets_params(request)).await
    }
}

/// [`PaletteLister`] over the DataPaletteService
#[derive(Debug, Clone)]
pub struct DataPaletteClient {
    rpc: JsonRpcClient,
}

impl DataPaletteClient {
    pub const SERVICE: &'static str = "DataPaletteService";

    #[must_use]
    pub fn new(rpc: JsonRpcClient) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl PaletteLister for DataPaletteClient {
    async fn list_data(&self, request: &ListDataRequest) -> Result<PaletteListing, RemoteError> {
        let params = json!({
            "workspaces": request.workspaces,
            "include_metadata": int_flag(request.include_metadata),
        });
        self.rpc.call("list_data", &params).await
    }
}

/// [`SpecRegistry`] over the NarrativeMethodStore
#[derive(Debug, Clone)]
pub struct MethodStoreClient {
    rpc: JsonRpcClient,
}

impl MethodStoreClient {
    pub const SERVICE: &'static str = "NarrativeMethodStore";

    #[must_use]
    pub fn new(rpc: JsonRpcClient) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl SpecRegistry for MethodStoreClient {
    async fn get_app_specs(&self, ids: &[String]) -> Result<Vec<Value>, RemoteError> {
        self.rpc.call("get_app_spec", &json!({ "ids": ids })).await
    }

    async fn get_method_specs(&self, ids: &[String]) -> Result<Vec<Value>, RemoteError> {
        self.rpc.call("get_method_spec", &json!({ "ids": ids })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn set_flags_are_integers() {
        let params = list_sets_params(&ListSetsRequest {
            workspaces: vec!["12".into()],
            include_set_item_info: true,
            include_raw_data_palettes: true,
            include_metadata: false,
        });
        assert_eq!(
            params,
            json!({
                "workspaces": ["12"],
                "include_set_item_info": 1,
                "include_raw_data_palettes": 1,
                "include_metadata": 0
            })
        );
    }

    #[test]
    fn set_listing_reads_raw_palettes() {
        let info = json!([5, "g", "KBaseGenomes.Genome-1.0", "d", 1, "u", 3, "ws", "c", 10, null]);
        let raw = json!({
            "sets": [],
            "raw_data_palettes": [{"ref": "3/5/1", "info": info, "dp_ref": "3/1/1"}],
            "raw_data_palette_refs": {"3": "3/1/1"}
        });
        let listing: SetListing = serde_json::from_value(raw).unwrap();
        assert_eq!(listing.raw_data_palettes.unwrap()[0].dp_ref.as_deref(), Some("3/1/1"));
    }
}
