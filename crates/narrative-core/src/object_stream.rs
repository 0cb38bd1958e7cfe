//! Paginated listing of every object in a set of workspaces
//!
//! Each workspace is walked in object-id ranges of `page_size` from 1 up
//! to its `max_objid`, one `list_objects` call per range. The stream is
//! lazy and finite; build a new one to restart.

use crate::clients::WorkspaceStore;
use crate::error::RemoteError;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use narrative_model::{ListObjectsParams, ObjectInfo, WorkspaceInfo};

/// Listing calls needed to cover the given workspaces
#[must_use]
pub fn page_plan(workspaces: &[WorkspaceInfo], page_size: u64, include_metadata: bool) -> Vec<ListObjectsParams> {
    let page_size = page_size.max(1);
    let mut pages = Vec::new();
    for ws in workspaces {
        let mut min = 1;
        while min <= ws.max_objid {
            let max = min.saturating_add(page_size - 1).min(ws.max_objid);
            pages.push(ListObjectsParams {
                ids: vec![ws.id],
                min_object_id: min,
                max_object_id: max,
                include_metadata,
            });
            min = max.saturating_add(1);
            if max == u64::MAX {
                break;
            }
        }
    }
    pages
}

/// Stream every object of `workspaces` in listing order
pub fn list_all_objects<'a>(
    store: &'a dyn WorkspaceStore,
    workspaces: &[WorkspaceInfo],
    include_metadata: bool,
    page_size: u64,
) -> impl Stream<Item = Result<ObjectInfo, RemoteError>> + Send + 'a {
    let pages = page_plan(workspaces, page_size, include_metadata);
    stream::iter(pages)
        .then(move |params| async move { store.list_objects(&params).await })
        .map_ok(|page| stream::iter(page.into_iter().map(Ok)))
        .try_flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use narrative_model::Metadata;

    fn ws(id: u64, max_objid: u64) -> WorkspaceInfo {
        WorkspaceInfo {
            id,
            name: format!("ws{id}"),
            owner: "u".into(),
            moddate: String::new(),
            max_objid,
            user_permission: "a".into(),
            globalread: "n".into(),
            lockstat: "unlocked".into(),
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn plan_covers_each_workspace_in_ranges() {
        let plan = page_plan(&[ws(1, 25), ws(2, 0), ws(3, 10)], 10, false);
        let ranges: Vec<(u64, u64, u64)> = plan
            .iter()
            .map(|p| (p.ids[0], p.min_object_id, p.max_object_id))
            .collect();
        assert_eq!(ranges, vec![(1, 1, 10), (1, 11, 20), (1, 21, 25), (3, 1, 10)]);
    }

    #[test]
    fn plan_with_zero_page_size_still_terminates() {
        assert_eq!(page_plan(&[ws(1, 3)], 0, true).len(), 3);
    }
}
