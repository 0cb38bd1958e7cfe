//! Workspace selector normalization and resolution
//!
//! Callers name workspaces by id, by name, or by an explicit list. This
//! module turns those selectors into [`WorkspaceIdentity`] values and, with
//! a store at hand, into full [`WorkspaceInfo`] snapshots.

use crate::clients::WorkspaceStore;
use crate::error::{NarrativeError, Result};
use narrative_model::{WorkspaceFilter, WorkspaceIdentity, WorkspaceInfo};

/// Caller-supplied workspace selectors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceSelector {
    pub ws_id: Option<u64>,
    pub ws_name: Option<String>,
    pub workspaces: Option<Vec<String>>,
}

impl WorkspaceSelector {
    /// Exactly one selector must be present.
    ///
    /// # Errors
    /// `InvalidArgument` when none or several selectors are given, or the
    /// explicit list is empty
    pub fn resolve(&self) -> Result<Vec<WorkspaceIdentity>> {
        let name = self.ws_name.as_deref().filter(|n| !n.is_empty());
        let list = self.workspaces.as_ref().filter(|w| !w.is_empty());
        let given = usize::from(self.ws_id.is_some()) + usize::from(name.is_some()) + usize::from(list.is_some());
        if given != 1 {
            return Err(NarrativeError::invalid(
                "one and only one of 'ws_id', 'ws_name', 'workspaces' parameters should be set",
            ));
        }
        if let Some(list) = list {
            return parse_workspaces(list);
        }
        WorkspaceIdentity::from_parts(self.ws_id, name)
            .map(|ws| vec![ws])
            .ok_or_else(|| NarrativeError::invalid("no workspace selector given"))
    }
}

/// Parse a list of `id-or-name` strings
///
/// # Errors
/// `InvalidArgument` on an empty entry
pub fn parse_workspaces<S: AsRef<str>>(workspaces: &[S]) -> Result<Vec<WorkspaceIdentity>> {
    workspaces
        .iter()
        .map(|w| {
            w.as_ref()
                .parse::<WorkspaceIdentity>()
                .map_err(|e| NarrativeError::invalid(format!("workspace '{}': {e}", w.as_ref())))
        })
        .collect()
}

/// Resolve identities into workspace snapshots.
///
/// A single workspace is fetched directly. Several are resolved by listing
/// every readable workspace and keeping those matching by id or name, so
/// no per-workspace lookup is made. Result order follows the store's
/// listing order in that case.
///
/// # Errors
/// Any store failure, unchanged
pub async fn resolve_workspaces(
    store: &dyn WorkspaceStore,
    workspaces: &[WorkspaceIdentity],
) -> Result<Vec<WorkspaceInfo>> {
    match workspaces {
        [] => Ok(Vec::new()),
        [single] => Ok(vec![store.get_workspace_info(single).await?]),
        many => {
            let readable = store.list_workspace_info(&WorkspaceFilter::readable()).await?;
            Ok(readable
                .into_iter()
                .filter(|info| many.iter().any(|ws| ws.matches(info.id, &info.name)))
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_selector() {
        let none = WorkspaceSelector::default();
        assert!(none.resolve().unwrap_err().is_invalid_argument());

        let both = WorkspaceSelector {
            ws_id: Some(1),
            ws_name: Some("x".into()),
            workspaces: None,
        };
        assert!(both.resolve().unwrap_err().is_invalid_argument());

        let id = WorkspaceSelector {
            ws_id: Some(5),
            ..Default::default()
        };
        assert_eq!(id.resolve().unwrap(), vec![WorkspaceIdentity::Id(5)]);

        let list = WorkspaceSelector {
            workspaces: Some(vec!["5".into(), "alice:narrative_1".into()]),
            ..Default::default()
        };
        assert_eq!(
            list.resolve().unwrap(),
            vec![
                WorkspaceIdentity::Id(5),
                WorkspaceIdentity::Name("alice:narrative_1".into())
            ]
        );
    }

    #[test]
    fn empty_list_counts_as_absent() {
        let sel = WorkspaceSelector {
            ws_name: Some("ws".into()),
            workspaces: Some(vec![]),
            ..Default::default()
        };
        assert_eq!(sel.resolve().unwrap(), vec![WorkspaceIdentity::Name("ws".into())]);
    }

    #[test]
    fn parse_rejects_empty_entry() {
        assert!(parse_workspaces(&["1", ""]).is_err());
    }
}
