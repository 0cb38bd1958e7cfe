//! Object catalog types
//!
//! A [`Catalog`] is the merged, deduplicated view over set listings,
//! workspace listings and data-palette listings. [`CatalogBuilder`] keeps a
//! map from canonical reference to entry so that every source either
//! creates an entry or augments the existing one; there is never more than
//! one entry per reference.

use crate::ids::ObjectReference;
use crate::info::{type_prefix, ObjectInfo};
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Type-prefix filter
///
/// An empty or absent filter passes everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeFilter(Option<HashSet<String>>);

impl TypeFilter {
    /// Pass-all filter
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self(None)
    }

    /// Filter accepting only the given type prefixes (`Module.Type`)
    #[must_use]
    pub fn only<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: HashSet<String> = prefixes.into_iter().map(Into::into).collect();
        if set.is_empty() {
            Self(None)
        } else {
            Self(Some(set))
        }
    }

    /// Build from an optional caller-supplied list
    #[must_use]
    pub fn from_option(types: Option<&[String]>) -> Self {
        types.map_or_else(Self::all, |t| Self::only(t.iter().cloned()))
    }

    /// Whether this filter passes everything
    #[inline]
    #[must_use]
    pub fn is_pass_all(&self) -> bool {
        self.0.is_none()
    }

    /// Whether a full type string passes
    #[must_use]
    pub fn accepts_type(&self, type_string: &str) -> bool {
        match &self.0 {
            None => true,
            Some(set) => set.contains(type_prefix(type_string)),
        }
    }

    /// Whether an object passes
    #[inline]
    #[must_use]
    pub fn accepts(&self, info: &ObjectInfo) -> bool {
        self.accepts_type(&info.type_string)
    }
}

/// Members of a set object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetItems {
    pub set_items_info: Vec<ObjectInfo>,
}

/// Data-palette provenance of a catalog entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPaletteInfo {
    /// Palette object holding the reference
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Reference path through the palette
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refs: Option<Vec<String>>,
}

/// One object visible in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub object_info: ObjectInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_items: Option<SetItems>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp_info: Option<DataPaletteInfo>,
}

impl CatalogEntry {
    /// Entry with only object info
    #[inline]
    #[must_use]
    pub fn plain(object_info: ObjectInfo) -> Self {
        Self {
            object_info,
            set_items: None,
            dp_info: None,
        }
    }
}

/// Ordered, deduplicated catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub data: Vec<CatalogEntry>,
    /// Workspace id to palette container reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_palette_refs: Option<BTreeMap<String, String>>,
}

impl Catalog {
    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the catalog has no entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Canonical references in catalog order
    pub fn references(&self) -> impl Iterator<Item = ObjectReference> + '_ {
        self.data.iter().map(|e| e.object_info.reference())
    }

    /// Count entries by type prefix
    #[must_use]
    pub fn type_counts(&self) -> BTreeMap<String, u64> {
        let mut counts = BTreeMap::new();
        for entry in &self.data {
            *counts
                .entry(entry.object_info.type_prefix().to_string())
                .or_insert(0) += 1;
        }
        counts
    }
}

/// Incremental create-or-augment catalog builder
///
/// Insertion order is preserved; augmenting an entry never moves it.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    entries: IndexMap<ObjectReference, CatalogEntry>,
}

impl CatalogBuilder {
    /// Create empty builder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a set and its members under the set's reference
    pub fn add_set(&mut self, reference: ObjectReference, info: ObjectInfo, items: Vec<ObjectInfo>) {
        let set_items = Some(SetItems {
            set_items_info: items,
        });
        match self.entries.entry(reference) {
            Entry::Occupied(mut slot) => slot.get_mut().set_items = set_items,
            Entry::Vacant(slot) => {
                slot.insert(CatalogEntry {
                    object_info: info,
                    set_items,
                    dp_info: None,
                });
            }
        }
    }

    /// Record a plain object; returns `false` if the reference was already present
    pub fn add_object(&mut self, info: ObjectInfo) -> bool {
        match self.entries.entry(info.reference()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(CatalogEntry::plain(info));
                true
            }
        }
    }

    /// Attach palette provenance, creating the entry when absent
    pub fn add_palette_item(
        &mut self,
        reference: ObjectReference,
        info: ObjectInfo,
        dp_info: DataPaletteInfo,
    ) {
        self.entries
            .entry(reference)
            .or_insert_with(|| CatalogEntry::plain(info))
            .dp_info = Some(dp_info);
    }

    /// Whether a reference is present
    #[inline]
    #[must_use]
    pub fn contains(&self, reference: &ObjectReference) -> bool {
        self.entries.contains_key(reference)
    }

    /// Number of entries so far
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries were added
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finish into a catalog
    #[must_use]
    pub fn build(self, data_palette_refs: Option<BTreeMap<String, String>>) -> Catalog {
        Catalog {
            data: self.entries.into_values().collect(),
            data_palette_refs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn info(wsid: u64, objid: u64, version: u64, type_string: &str) -> ObjectInfo {
        ObjectInfo {
            objid,
            name: format!("obj{objid}"),
            type_string: type_string.to_string(),
            save_date: String::new(),
            version,
            saved_by: "u".into(),
            wsid,
            workspace: format!("ws{wsid}"),
            checksum: String::new(),
            size: 0,
            metadata: None,
        }
    }

    #[test]
    fn empty_filter_passes_all() {
        assert!(TypeFilter::only(Vec::<String>::new()).is_pass_all());
        assert!(TypeFilter::from_option(None).accepts_type("A.B-1.0"));
    }

    #[test]
    fn filter_matches_prefix_only() {
        let f = TypeFilter::only(["KBaseGenomes.Genome"]);
        assert!(f.accepts_type("KBaseGenomes.Genome-1.0"));
        assert!(!f.accepts_type("KBaseGenomes.ContigSet-1.0"));
        assert!(!f.accepts_type("KBaseGenomes.Genome2-1.0"));
    }

    #[test]
    fn set_then_object_is_one_entry() {
        let set = info(1, 1, 1, "KBaseSets.ReadsSet-1.0");
        let mut b = CatalogBuilder::new();
        b.add_set(set.reference(), set.clone(), vec![info(1, 2, 1, "KBaseFile.Reads-1.0")]);
        assert!(!b.add_object(set));
        let catalog = b.build(None);
        assert_eq!(catalog.len(), 1);
        assert!(catalog.data[0].set_items.is_some());
    }

    #[test]
    fn palette_augments_in_place() {
        let a = info(1, 1, 1, "A.A-1.0");
        let b_info = info(1, 2, 1, "B.B-1.0");
        let mut b = CatalogBuilder::new();
        b.add_object(a.clone());
        b.add_object(b_info);
        b.add_palette_item(
            a.reference(),
            a.clone(),
            DataPaletteInfo {
                reference: Some("1/9/1".into()),
                refs: None,
            },
        );
        let catalog = b.build(None);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.data[0].object_info, a);
        assert_eq!(
            catalog.data[0].dp_info.as_ref().and_then(|d| d.reference.as_deref()),
            Some("1/9/1")
        );
    }

    #[test]
    fn same_objid_different_versions_are_distinct() {
        let mut b = CatalogBuilder::new();
        assert!(b.add_object(info(1, 1, 1, "A.A-1.0")));
        assert!(b.add_object(info(1, 1, 2, "A.A-1.0")));
        assert!(b.add_object(info(2, 1, 1, "A.A-1.0")));
        assert_eq!(b.len(), 3);
    }

    #[test]
    fn entry_json_omits_absent_parts() {
        let value = serde_json::to_value(CatalogEntry::plain(info(1, 1, 1, "A.A-1.0"))).unwrap();
        assert!(value.get("set_items").is_none());
        assert!(value.get("dp_info").is_none());
    }

    proptest! {
        #[test]
        fn prop_builder_never_duplicates(
            refs in proptest::collection::vec((1..4u64, 1..6u64, 1..3u64), 0..60)
        ) {
            let mut b = CatalogBuilder::new();
            for (ws, obj, ver) in &refs {
                b.add_object(info(*ws, *obj, *ver, "A.A-1.0"));
            }
            let catalog = b.build(None);
            let unique: HashSet<ObjectReference> = catalog.references().collect();
            prop_assert_eq!(unique.len(), catalog.len());
            let expected: HashSet<ObjectReference> =
                refs.iter().map(|(w, o, v)| ObjectReference::new(*w, *o, *v)).collect();
            prop_assert_eq!(unique, expected);
        }
    }
}
