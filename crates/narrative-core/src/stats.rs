//! Per-type object counts

use crate::aggregator::{CatalogAggregator, CatalogRequest};
use crate::error::Result;
use narrative_model::WorkspaceIdentity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Object count per type prefix
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeStats {
    pub type_stat: BTreeMap<String, u64>,
}

/// Count catalog entries by type prefix over `workspaces`.
///
/// Runs an unfiltered aggregation without the palette overlay.
///
/// # Errors
/// Whatever the aggregation returns
pub async fn type_stats(aggregator: &CatalogAggregator, workspaces: Vec<WorkspaceIdentity>) -> Result<TypeStats> {
    let catalog = aggregator.aggregate(&CatalogRequest::new(workspaces)).await?;
    Ok(TypeStats {
        type_stat: catalog.type_counts(),
    })
}
