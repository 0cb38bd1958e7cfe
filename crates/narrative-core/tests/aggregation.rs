//! Catalog aggregation and type statistics against in-memory collaborators

use narrative_core::prelude::*;
use narrative_core::{CatalogRequest, RemoteError};
use narrative_model::{
    ObjectInfo, ObjectReference, PaletteListing, SetListing, TypeFilter, WorkspaceIdentity,
};
use narrative_test_utils::{object_info, palette_item, set_record, Harness};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::{BTreeMap, HashSet};

const GENOME: &str = "KBaseGenomes.Genome-1.0";
const MATRIX: &str = "KBaseFeatureValues.Matrix-2.1";
const READS_SET: &str = "KBaseSets.ReadsSet-1.0";
const READS: &str = "KBaseFile.PairedEndLibrary-2.0";

struct Fixture {
    harness: Harness,
    ws: u64,
    set: ObjectInfo,
    members: Vec<ObjectInfo>,
    genome: ObjectInfo,
}

/// One workspace: a reads set with two members, plus a genome
fn fixture() -> Fixture {
    let harness = Harness::default();
    let ws = harness.store.add_workspace("alice:narrative_1");
    let set = harness.store.add_object(ws, "my_reads_set", READS_SET);
    let members = vec![
        harness.store.add_object(ws, "reads_a", READS),
        harness.store.add_object(ws, "reads_b", READS),
    ];
    let genome = harness.store.add_object(ws, "ecoli", GENOME);
    harness.sets.set_listing(SetListing {
        sets: vec![set_record(set.clone(), members.clone())],
        ..SetListing::default()
    });
    Fixture {
        harness,
        ws,
        set,
        members,
        genome,
    }
}

fn by_id(ws: u64) -> ListObjectsWithSetsParams {
    ListObjectsWithSetsParams {
        ws_id: Some(ws),
        ..Default::default()
    }
}

#[tokio::test]
async fn sets_come_first_and_objects_are_not_duplicated() {
    let f = fixture();
    let catalog = f.harness.manager().list_objects_with_sets(by_id(f.ws)).await.unwrap();

    let refs: Vec<ObjectReference> = catalog.references().collect();
    assert_eq!(
        refs,
        vec![
            f.set.reference(),
            f.members[0].reference(),
            f.members[1].reference(),
            f.genome.reference()
        ]
    );
    let set_items = catalog.data[0].set_items.as_ref().unwrap();
    assert_eq!(set_items.set_items_info, f.members);
    assert!(catalog.data[1..].iter().all(|e| e.set_items.is_none() && e.dp_info.is_none()));
    assert_eq!(catalog.data_palette_refs, None);
}

#[tokio::test]
async fn set_request_asks_for_embedded_palettes() {
    let f = fixture();
    let params = ListObjectsWithSetsParams {
        include_metadata: true,
        ..by_id(f.ws)
    };
    f.harness.manager().list_objects_with_sets(params).await.unwrap();

    let requests = f.harness.sets.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].workspaces, vec![f.ws.to_string()]);
    assert!(requests[0].include_set_item_info);
    assert!(requests[0].include_raw_data_palettes);
    assert!(requests[0].include_metadata);
}

#[tokio::test]
async fn palette_overlay_augments_existing_and_adds_foreign_entries() {
    let f = fixture();
    let foreign = object_info(99, 7, 3, "shared_genome", GENOME);
    f.harness.palettes.set_listing(PaletteListing {
        data: vec![
            palette_item(f.genome.clone(), "1/10/1"),
            palette_item(foreign.clone(), "1/10/1"),
        ],
        data_palette_refs: BTreeMap::from([(f.ws.to_string(), "1/10/1".to_string())]),
    });

    let params = ListObjectsWithSetsParams {
        include_data_palettes: true,
        ..by_id(f.ws)
    };
    let catalog = f.harness.manager().list_objects_with_sets(params).await.unwrap();

    assert_eq!(catalog.len(), 5);
    let genome = &catalog.data[3];
    assert_eq!(genome.object_info, f.genome);
    assert_eq!(genome.dp_info.as_ref().unwrap().reference.as_deref(), Some("1/10/1"));

    let last = catalog.data.last().unwrap();
    assert_eq!(last.object_info, foreign);
    assert!(last.set_items.is_none());
    assert!(last.dp_info.is_some());

    assert_eq!(
        catalog.data_palette_refs,
        Some(BTreeMap::from([(f.ws.to_string(), "1/10/1".to_string())]))
    );
    assert_eq!(f.harness.palettes.requests().len(), 1);
}

#[tokio::test]
async fn embedded_palettes_skip_the_palette_service() {
    let f = fixture();
    let foreign = object_info(99, 7, 3, "shared_genome", GENOME);
    f.harness.sets.set_listing(SetListing {
        sets: vec![set_record(f.set.clone(), f.members.clone())],
        raw_data_palettes: Some(vec![palette_item(foreign.clone(), "1/10/1")]),
        raw_data_palette_refs: Some(BTreeMap::from([("1".to_string(), "1/10/1".to_string())])),
    });

    let params = ListObjectsWithSetsParams {
        include_data_palettes: true,
        ..by_id(f.ws)
    };
    let catalog = f.harness.manager().list_objects_with_sets(params).await.unwrap();

    assert!(f.harness.palettes.requests().is_empty());
    assert_eq!(catalog.data.last().unwrap().object_info, foreign);
    assert!(catalog.data_palette_refs.is_some());
}

#[tokio::test]
async fn disabled_palettes_ignore_the_request() {
    let f = fixture();
    let params = ListObjectsWithSetsParams {
        include_data_palettes: true,
        ..by_id(f.ws)
    };
    let manager = f
        .harness
        .manager_with(AggregatorConfig::default().with_palettes(false));
    let catalog = manager.list_objects_with_sets(params).await.unwrap();

    assert!(f.harness.palettes.requests().is_empty());
    assert_eq!(catalog.data_palette_refs, None);
    assert_eq!(catalog.len(), 4);
}

#[tokio::test]
async fn type_filter_applies_to_every_source() {
    let f = fixture();
    f.harness.palettes.set_listing(PaletteListing {
        data: vec![palette_item(object_info(99, 1, 1, "m", MATRIX), "1/10/1")],
        ..PaletteListing::default()
    });
    let params = ListObjectsWithSetsParams {
        types: Some(vec!["KBaseGenomes.Genome".to_string(), "KBaseSets.ReadsSet".to_string()]),
        include_data_palettes: true,
        ..by_id(f.ws)
    };
    let catalog = f.harness.manager().list_objects_with_sets(params).await.unwrap();

    let refs: Vec<ObjectReference> = catalog.references().collect();
    assert_eq!(refs, vec![f.set.reference(), f.genome.reference()]);
}

#[tokio::test]
async fn empty_type_list_passes_everything() {
    let f = fixture();
    let params = ListObjectsWithSetsParams {
        types: Some(Vec::new()),
        ..by_id(f.ws)
    };
    let catalog = f.harness.manager().list_objects_with_sets(params).await.unwrap();
    assert_eq!(catalog.len(), 4);
}

#[tokio::test]
async fn single_workspace_is_fetched_directly() {
    let f = fixture();
    let params = ListObjectsWithSetsParams {
        ws_name: Some("alice:narrative_1".into()),
        ..Default::default()
    };
    f.harness.manager().list_objects_with_sets(params).await.unwrap();
    assert_eq!(f.harness.store.call_count("get_workspace_info"), 1);
    assert_eq!(f.harness.store.call_count("list_workspace_info"), 0);
}

#[tokio::test]
async fn several_workspaces_are_resolved_by_listing() {
    let f = fixture();
    let other = f.harness.store.add_workspace("bob:data");
    let extra = f.harness.store.add_object(other, "matrix", MATRIX);
    f.harness.store.add_workspace("carol:unrelated");

    let params = ListObjectsWithSetsParams {
        workspaces: Some(vec![f.ws.to_string(), "bob:data".to_string()]),
        ..Default::default()
    };
    let catalog = f.harness.manager().list_objects_with_sets(params).await.unwrap();

    assert_eq!(f.harness.store.call_count("get_workspace_info"), 0);
    assert_eq!(f.harness.store.call_count("list_workspace_info"), 1);
    assert_eq!(catalog.len(), 5);
    assert_eq!(catalog.data.last().unwrap().object_info, extra);
}

#[tokio::test]
async fn objects_are_paged_by_id_range() {
    let f = fixture();
    f.harness.store.add_object(f.ws, "extra", MATRIX);
    let manager = f.harness.manager_with(AggregatorConfig::default().with_page_size(2));

    let catalog = manager.list_objects_with_sets(by_id(f.ws)).await.unwrap();

    assert_eq!(catalog.len(), 5);
    assert_eq!(f.harness.store.call_count("list_objects"), 3);
}

#[tokio::test]
async fn selector_errors() {
    let f = fixture();
    let manager = f.harness.manager();

    let none = manager
        .list_objects_with_sets(ListObjectsWithSetsParams::default())
        .await
        .unwrap_err();
    assert!(none.is_invalid_argument());

    let both = ListObjectsWithSetsParams {
        ws_id: Some(f.ws),
        ws_name: Some("alice:narrative_1".into()),
        ..Default::default()
    };
    assert!(manager.list_objects_with_sets(both).await.unwrap_err().is_invalid_argument());
    assert!(f.harness.sets.requests().is_empty());
}

#[tokio::test]
async fn remote_failures_propagate_unchanged() {
    let f = fixture();
    let failure = RemoteError::service("SetAPI", "list_sets", "service unavailable");
    f.harness.sets.fail_with(failure.clone());

    let err = f
        .harness
        .manager()
        .list_objects_with_sets(by_id(f.ws))
        .await
        .unwrap_err();
    assert_eq!(err.as_remote(), Some(&failure));

    let f = fixture();
    let failure = RemoteError::service("Workspace", "list_objects", "timeout");
    f.harness.store.fail_on("list_objects", failure.clone());
    let err = f
        .harness
        .manager()
        .list_objects_with_sets(by_id(f.ws))
        .await
        .unwrap_err();
    assert_eq!(err.as_remote(), Some(&failure));
}

#[tokio::test]
async fn aggregation_is_repeatable() {
    let f = fixture();
    let aggregator = f.harness.manager().aggregator().clone();
    let request = CatalogRequest::new(vec![WorkspaceIdentity::Id(f.ws)]).with_data_palettes(true);
    let first = aggregator.aggregate(&request).await.unwrap();
    let second = aggregator.aggregate(&request).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn type_stats_count_by_prefix() {
    let harness = Harness::default();
    let ws = harness.store.add_workspace("alice:stats");
    for i in 0..3 {
        harness.store.add_object(ws, &format!("genome_{i}"), GENOME);
    }
    for i in 0..2 {
        harness.store.add_object(ws, &format!("matrix_{i}"), MATRIX);
    }

    let stats = harness
        .manager()
        .list_available_types(ListAvailableTypesParams {
            workspaces: vec!["alice:stats".to_string()],
        })
        .await
        .unwrap();

    assert_eq!(
        stats.type_stat,
        BTreeMap::from([
            ("KBaseFeatureValues.Matrix".to_string(), 2),
            ("KBaseGenomes.Genome".to_string(), 3),
        ])
    );
    assert!(harness.palettes.requests().is_empty());
}

#[tokio::test]
async fn type_stats_need_a_workspace() {
    let harness = Harness::default();
    let err = harness
        .manager()
        .list_available_types(ListAvailableTypesParams::default())
        .await
        .unwrap_err();
    assert!(err.is_invalid_argument());
}

fn type_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![GENOME, MATRIX, READS, READS_SET])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_catalog_respects_filter_and_dedup(
        types in prop::collection::vec(type_strategy(), 1..20),
        set_size in 0usize..4,
        palette_overlap in 0usize..4,
        filter in prop::collection::hash_set(type_strategy(), 0..3),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let harness = Harness::default();
        let ws = harness.store.add_workspace("prop:ws");
        let infos: Vec<ObjectInfo> = types
            .iter()
            .enumerate()
            .map(|(i, t)| harness.store.add_object(ws, &format!("obj_{i}"), t))
            .collect();

        let set = object_info(ws, 1000, 1, "set", READS_SET);
        let members: Vec<ObjectInfo> = infos.iter().take(set_size).cloned().collect();
        harness.sets.set_listing(SetListing {
            sets: vec![set_record(set, members)],
            ..SetListing::default()
        });
        harness.palettes.set_listing(PaletteListing {
            data: infos
                .iter()
                .take(palette_overlap)
                .cloned()
                .chain([object_info(500, 1, 1, "foreign", GENOME)])
                .map(|i| palette_item(i, "9/9/9"))
                .collect(),
            ..PaletteListing::default()
        });

        let prefixes: Vec<String> = filter
            .iter()
            .map(|t| narrative_model::type_prefix(t).to_string())
            .collect();
        let params = ListObjectsWithSetsParams {
            ws_id: Some(ws),
            types: Some(prefixes.clone()),
            include_data_palettes: true,
            ..Default::default()
        };
        let catalog = runtime
            .block_on(harness.manager().list_objects_with_sets(params))
            .unwrap();

        let refs: Vec<ObjectReference> = catalog.references().collect();
        let unique: HashSet<ObjectReference> = refs.iter().copied().collect();
        prop_assert_eq!(unique.len(), refs.len());

        let type_filter = TypeFilter::only(prefixes);
        for entry in &catalog.data {
            prop_assert!(type_filter.accepts(&entry.object_info));
        }

        let expected = infos.iter().filter(|i| type_filter.accepts(i)).count()
            + usize::from(type_filter.accepts_type(READS_SET))
            + usize::from(type_filter.accepts_type(GENOME));
        prop_assert_eq!(catalog.len(), expected);
    }
}
