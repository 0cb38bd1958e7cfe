//! Object catalog aggregation
//!
//! Merges three independent listings into one [`Catalog`]:
//! 1. Sets (with their members) from the set service
//! 2. Every object of the resolved workspaces from the store
//! 3. Optionally, the data-palette overlay
//!
//! Entries are keyed by canonical reference. A later source never adds a
//! second entry for a reference already seen; palette provenance is
//! attached to the existing entry instead.

use crate::clients::{PaletteLister, SetLister, WorkspaceStore};
use crate::config::AggregatorConfig;
use crate::error::{NarrativeError, Result};
use crate::object_stream::list_all_objects;
use crate::resolver::resolve_workspaces;
use futures::TryStreamExt;
use narrative_model::{
    Catalog, CatalogBuilder, ListDataRequest, ListSetsRequest, PaletteListing, TypeFilter,
    WorkspaceIdentity,
};
use std::collections::BTreeMap;
use std::pin::pin;
use std::sync::Arc;
use std::time::Instant;

/// What to aggregate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogRequest {
    pub workspaces: Vec<WorkspaceIdentity>,
    pub types: TypeFilter,
    pub include_metadata: bool,
    pub include_data_palettes: bool,
}

impl CatalogRequest {
    /// Unfiltered request over the given workspaces
    #[must_use]
    pub fn new(workspaces: Vec<WorkspaceIdentity>) -> Self {
        Self {
            workspaces,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn with_types(mut self, types: TypeFilter) -> Self {
        self.types = types;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_data_palettes(mut self, include: bool) -> Self {
        self.include_data_palettes = include;
        self
    }

    fn workspace_keys(&self) -> Vec<String> {
        self.workspaces.iter().map(ToString::to_string).collect()
    }
}

/// Builds catalogs from the three listing sources
#[derive(Clone)]
pub struct CatalogAggregator {
    store: Arc<dyn WorkspaceStore>,
    sets: Arc<dyn SetLister>,
    palettes: Arc<dyn PaletteLister>,
    config: AggregatorConfig,
}

impl std::fmt::Debug for CatalogAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogAggregator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CatalogAggregator {
    #[must_use]
    pub fn new(
        store: Arc<dyn WorkspaceStore>,
        sets: Arc<dyn SetLister>,
        palettes: Arc<dyn PaletteLister>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            store,
            sets,
            palettes,
            config,
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Aggregate the catalog for `request`
    ///
    /// Set listing and workspace resolution run concurrently; the merge
    /// order is fixed regardless: sets, then workspace objects, then
    /// palette items.
    ///
    /// # Errors
    /// The first failed collaborator call, unchanged. No partial catalog
    /// is returned.
    #[tracing::instrument(skip(self, request), fields(workspaces = request.workspaces.len()))]
    pub async fn aggregate(&self, request: &CatalogRequest) -> Result<Catalog> {
        let keys = request.workspace_keys();
        let filter = &request.types;
        let mut builder = CatalogBuilder::new();

        let started = Instant::now();
        let set_request = ListSetsRequest {
            workspaces: keys.clone(),
            include_set_item_info: true,
            include_raw_data_palettes: true,
            include_metadata: request.include_metadata,
        };
        let (mut set_listing, workspace_infos) = tokio::try_join!(
            async { self.sets.list_sets(&set_request).await.map_err(NarrativeError::from) },
            resolve_workspaces(self.store.as_ref(), &request.workspaces),
        )?;
        let embedded_palettes = set_listing.embedded_palettes();
        for set in set_listing.sets {
            if filter.accepts(&set.info) {
                let members = set.items.into_iter().map(|item| item.info).collect();
                builder.add_set(set.reference, set.info, members);
            }
        }
        tracing::debug!(
            sets = builder.len(),
            resolved = workspace_infos.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "processed sets and resolved workspaces"
        );

        let started = Instant::now();
        let mut objects = pin!(list_all_objects(
            self.store.as_ref(),
            &workspace_infos,
            request.include_metadata,
            self.config.page_size,
        ));
        let mut listed = 0usize;
        while let Some(info) = objects.try_next().await? {
            listed += 1;
            if filter.accepts(&info) {
                builder.add_object(info);
            }
        }
        tracing::debug!(
            listed,
            entries = builder.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loaded workspace objects"
        );

        let data_palette_refs = if request.include_data_palettes {
            self.overlay_palettes(&mut builder, request, keys, embedded_palettes)
                .await?
        } else {
            None
        };

        Ok(builder.build(data_palette_refs))
    }

    async fn overlay_palettes(
        &self,
        builder: &mut CatalogBuilder,
        request: &CatalogRequest,
        keys: Vec<String>,
        embedded: Option<PaletteListing>,
    ) -> Result<Option<BTreeMap<String, String>>> {
        if !self.config.data_palettes_enabled {
            tracing::debug!("data palettes disabled, overlay skipped");
            return Ok(None);
        }
        let started = Instant::now();
        let listing = match embedded {
            Some(listing) => listing,
            None => {
                self.palettes
                    .list_data(&ListDataRequest {
                        workspaces: keys,
                        include_metadata: request.include_metadata,
                    })
                    .await?
            }
        };
        for item in listing.data {
            if request.types.accepts(&item.info) {
                let provenance = item.provenance();
                builder.add_palette_item(item.reference, item.info, provenance);
            }
        }
        tracing::debug!(
            entries = builder.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "processed data palettes"
        );
        Ok(Some(listing.data_palette_refs))
    }
}
