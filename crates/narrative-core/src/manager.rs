//! Public operation surface
//!
//! [`NarrativeManager`] owns one instance of each component and exposes
//! the five operations with wire-shaped parameter and result types.

use crate::aggregator::{CatalogAggregator, CatalogRequest};
use crate::cells::{CellAssembler, CellDescriptor, StepParam};
use crate::clients::{IntroSource, PaletteLister, SetLister, SpecRegistry, WorkspaceStore};
use crate::cloner::{ClonedNarrative, NarrativeCloner};
use crate::config::AggregatorConfig;
use crate::context::AuthContext;
use crate::copier::{CopiedObject, CopyObjectRequest, ObjectCopier};
use crate::creator::{CreatedNarrative, NarrativeBlueprint, NarrativeCreator};
use crate::error::{NarrativeError, Result};
use crate::resolver::WorkspaceSelector;
use crate::stats::{type_stats, TypeStats};
use narrative_model::{Catalog, TypeFilter};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

/// Accepts `true`/`false`, `0`/`1` or null
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }
    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(i)) => i != 0,
        None => false,
    })
}

/// Parameters of `list_objects_with_sets`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListObjectsWithSetsParams {
    #[serde(default)]
    pub ws_id: Option<u64>,
    #[serde(default)]
    pub ws_name: Option<String>,
    #[serde(default)]
    pub workspaces: Option<Vec<String>>,
    /// Type prefixes; absent or empty passes everything
    #[serde(default)]
    pub types: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub include_metadata: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub include_data_palettes: bool,
}

/// Parameters of `list_available_types`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListAvailableTypesParams {
    #[serde(default)]
    pub workspaces: Vec<String>,
}

/// Parameters of `copy_narrative`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyNarrativeParams {
    #[serde(alias = "newName")]
    pub new_name: String,
    #[serde(alias = "workspaceRef")]
    pub narrative_ref: String,
}

/// Parameters of `create_new_narrative`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateNarrativeParams {
    #[serde(default)]
    pub app: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    /// `step,name,value;...`, used when `appData` is empty
    #[serde(default)]
    pub appparam: Option<String>,
    #[serde(default, rename = "appData")]
    pub app_data: Vec<StepParam>,
    #[serde(default)]
    pub markdown: Option<String>,
    /// `ref;ref;...`, used when `importData` is empty
    #[serde(default)]
    pub copydata: Option<String>,
    #[serde(default, rename = "importData")]
    pub import_data: Vec<String>,
    #[serde(default, rename = "includeIntroCell", deserialize_with = "lenient_bool")]
    pub include_intro_cell: bool,
    #[serde(default)]
    pub title: Option<String>,
}

impl CreateNarrativeParams {
    /// Normalize into a blueprint
    ///
    /// # Errors
    /// `InvalidArgument` when both `app` and `method` are set or
    /// `appparam` is malformed
    pub fn into_blueprint(self) -> Result<NarrativeBlueprint> {
        let non_empty = |s: Option<String>| s.filter(|v| !v.is_empty());
        let app = non_empty(self.app);
        let method = non_empty(self.method);
        if app.is_some() && method.is_some() {
            return Err(NarrativeError::invalid(
                "Must provide no more than one of the app or method params",
            ));
        }

        let import_refs = if self.import_data.is_empty() {
            self.copydata
                .as_deref()
                .map(|refs| refs.split(';').filter(|r| !r.is_empty()).map(str::to_string).collect())
                .unwrap_or_default()
        } else {
            self.import_data
        };

        let parameters = match non_empty(self.appparam) {
            Some(text) if self.app_data.is_empty() => StepParam::parse_list(&text)?,
            _ => self.app_data,
        };

        let cell = match (app, method, non_empty(self.markdown)) {
            (Some(app), _, _) => Some(CellDescriptor::app(app)),
            (None, Some(method), _) => Some(CellDescriptor::method(method)),
            (None, None, Some(text)) => Some(CellDescriptor::markdown(text)),
            (None, None, None) => None,
        };

        Ok(NarrativeBlueprint {
            cells: cell.into_iter().collect(),
            parameters,
            import_refs,
            include_intro: self.include_intro_cell,
            title: self.title,
        })
    }
}

/// The external services a manager talks to
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn WorkspaceStore>,
    pub sets: Arc<dyn SetLister>,
    pub palettes: Arc<dyn PaletteLister>,
    pub registry: Arc<dyn SpecRegistry>,
    pub intro: Arc<dyn IntroSource>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Entry point for the narrative operations
#[derive(Debug, Clone)]
pub struct NarrativeManager {
    aggregator: CatalogAggregator,
    creator: NarrativeCreator,
    cloner: NarrativeCloner,
    copier: ObjectCopier,
}

impl NarrativeManager {
    #[must_use]
    pub fn new(collaborators: Collaborators, config: AggregatorConfig) -> Self {
        let Collaborators {
            store,
            sets,
            palettes,
            registry,
            intro,
        } = collaborators;
        let assembler = CellAssembler::new(registry, intro);
        Self {
            aggregator: CatalogAggregator::new(Arc::clone(&store), sets, palettes, config),
            creator: NarrativeCreator::new(Arc::clone(&store), assembler),
            cloner: NarrativeCloner::new(Arc::clone(&store)),
            copier: ObjectCopier::new(store),
        }
    }

    #[inline]
    #[must_use]
    pub fn aggregator(&self) -> &CatalogAggregator {
        &self.aggregator
    }

    /// Catalog of sets, objects and (optionally) palette items
    ///
    /// # Errors
    /// `InvalidArgument` on a bad workspace selection; collaborator failures
    pub async fn list_objects_with_sets(&self, params: ListObjectsWithSetsParams) -> Result<Catalog> {
        let selector = WorkspaceSelector {
            ws_id: params.ws_id,
            ws_name: params.ws_name,
            workspaces: params.workspaces,
        };
        let request = CatalogRequest::new(selector.resolve()?)
            .with_types(TypeFilter::from_option(params.types.as_deref()))
            .with_metadata(params.include_metadata)
            .with_data_palettes(params.include_data_palettes);
        self.aggregator.aggregate(&request).await
    }

    /// Object counts per type prefix
    ///
    /// # Errors
    /// `InvalidArgument` on an empty workspace list; collaborator failures
    pub async fn list_available_types(&self, params: ListAvailableTypesParams) -> Result<TypeStats> {
        let selector = WorkspaceSelector {
            workspaces: Some(params.workspaces),
            ..WorkspaceSelector::default()
        };
        type_stats(&self.aggregator, selector.resolve()?).await
    }

    /// Copy a narrative into a new workspace
    ///
    /// # Errors
    /// See [`NarrativeCloner::clone_narrative`]
    pub async fn copy_narrative(&self, auth: &AuthContext, params: CopyNarrativeParams) -> Result<ClonedNarrative> {
        if params.narrative_ref.is_empty() {
            return Err(NarrativeError::invalid("narrative_ref is required"));
        }
        self.cloner
            .clone_narrative(auth, &params.narrative_ref, &params.new_name)
            .await
    }

    /// Create a workspace with a new narrative
    ///
    /// # Errors
    /// Parameter normalization errors; see [`NarrativeCreator::create`]
    pub async fn create_new_narrative(
        &self,
        auth: &AuthContext,
        params: CreateNarrativeParams,
    ) -> Result<CreatedNarrative> {
        let blueprint = params.into_blueprint()?;
        self.creator.create(auth, &blueprint).await
    }

    /// Copy one object
    ///
    /// # Errors
    /// See [`ObjectCopier::copy`]
    pub async fn copy_object(&self, params: CopyObjectRequest) -> Result<CopiedObject> {
        self.copier.copy(params).await
    }
}
