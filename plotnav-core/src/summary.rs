//! Collection summary document model.
//!
//! A [`Summary`] enumerates the plot-like dataset references recorded in one
//! registry collection, grouped first by bucket (tract / visit / global) and
//! then by dataset type name. It is the document persisted gzip-compressed
//! in the cache store and returned decompressed by the fetch endpoint.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Storage class marking a dataset type as plot-like. Only dataset types
/// with this storage class appear in summaries.
pub const PLOT_STORAGE_CLASS: &str = "Plot";

/// Bucket classification for a dataset type, determined by its dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotBucket {
    Tracts,
    Visits,
    Global,
}

/// A dataset type as reported by the registry: a named artifact category
/// with a storage class and a set of dimension labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetTypeInfo {
    pub name: String,
    pub storage_class: String,
    pub dimensions: BTreeSet<String>,
}

impl DatasetTypeInfo {
    pub fn new<I, S>(name: impl Into<String>, storage_class: impl Into<String>, dimensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            storage_class: storage_class.into(),
            dimensions: dimensions.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether this dataset type is plot-like and belongs in a summary.
    pub fn is_plot(&self) -> bool {
        self.storage_class == PLOT_STORAGE_CLASS
    }

    pub fn has_dimension(&self, dimension: &str) -> bool {
        self.dimensions.contains(dimension)
    }

    /// Classify this type into exactly one bucket.
    ///
    /// `tract` wins over everything else; `visit` or `detector` (without
    /// `tract`) classifies as a visit-level plot; a type with none of the
    /// three is a global plot.
    pub fn bucket(&self) -> PlotBucket {
        if self.has_dimension("tract") {
            PlotBucket::Tracts
        } else if self.has_dimension("visit") || self.has_dimension("detector") {
            PlotBucket::Visits
        } else {
            PlotBucket::Global
        }
    }
}

/// One dataset reference returned by a registry find-first query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    /// Name of the dataset type this record belongs to.
    pub dataset_type: String,
    /// The data coordinate of the reference, as an opaque key/value map.
    pub data_id: BTreeMap<String, serde_json::Value>,
    /// Opaque dataset identifier.
    pub id: String,
}

/// A dataset reference as persisted in a summary document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DatasetRefSummary {
    #[serde(rename = "dataId")]
    pub data_id: BTreeMap<String, serde_json::Value>,
    pub id: String,
}

impl From<DatasetRecord> for DatasetRefSummary {
    fn from(record: DatasetRecord) -> Self {
        Self {
            data_id: record.data_id,
            id: record.id,
        }
    }
}

/// The cached summary document for one collection.
///
/// All three top-level keys are always present, even when empty; within a
/// bucket, a dataset type key is present only with at least one reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Summary {
    pub tracts: BTreeMap<String, Vec<DatasetRefSummary>>,
    pub visits: BTreeMap<String, Vec<DatasetRefSummary>>,
    pub global: BTreeMap<String, Vec<DatasetRefSummary>>,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutable access to the group map for a bucket.
    pub fn bucket_mut(
        &mut self,
        bucket: PlotBucket,
    ) -> &mut BTreeMap<String, Vec<DatasetRefSummary>> {
        match bucket {
            PlotBucket::Tracts => &mut self.tracts,
            PlotBucket::Visits => &mut self.visits,
            PlotBucket::Global => &mut self.global,
        }
    }

    /// Total count of dataset references across all three buckets. This is
    /// the `N` reported in a successful job's `"Success: N plots"` result.
    pub fn total_refs(&self) -> usize {
        self.tracts
            .values()
            .chain(self.visits.values())
            .chain(self.global.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tracts.is_empty() && self.visits.is_empty() && self.global.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plot_type<const N: usize>(name: &str, dims: [&str; N]) -> DatasetTypeInfo {
        DatasetTypeInfo::new(name, PLOT_STORAGE_CLASS, dims)
    }

    #[test]
    fn tract_dimension_wins_over_detector() {
        assert_eq!(
            plot_type("coaddQuality", ["tract", "detector"]).bucket(),
            PlotBucket::Tracts
        );
    }

    #[test]
    fn visit_only_classifies_as_visits() {
        assert_eq!(plot_type("visitQa", ["visit"]).bucket(), PlotBucket::Visits);
    }

    #[test]
    fn detector_only_classifies_as_visits() {
        assert_eq!(
            plot_type("detectorQa", ["detector"]).bucket(),
            PlotBucket::Visits
        );
    }

    #[test]
    fn no_spatial_dimension_classifies_as_global() {
        assert_eq!(plot_type("wholeSkyQa", []).bucket(), PlotBucket::Global);
    }

    #[test]
    fn buckets_partition_a_type_set() {
        let types = vec![
            plot_type("a", ["tract", "detector"]),
            plot_type("b", ["visit"]),
            plot_type("c", ["detector"]),
            plot_type("d", []),
            plot_type("e", ["tract", "visit"]),
        ];
        let buckets = [PlotBucket::Tracts, PlotBucket::Visits, PlotBucket::Global];
        for t in &types {
            let memberships = buckets.iter().filter(|b| t.bucket() == **b).count();
            assert_eq!(memberships, 1, "{} must land in exactly one bucket", t.name);
        }
        assert_eq!(plot_type("e", ["tract", "visit"]).bucket(), PlotBucket::Tracts);
    }

    #[test]
    fn non_plot_storage_class_is_excluded() {
        let table = DatasetTypeInfo::new("objectTable", "DataFrame", ["tract"]);
        assert!(!table.is_plot());
        assert!(plot_type("p", ["tract"]).is_plot());
    }

    #[test]
    fn total_refs_counts_across_buckets() {
        let mut summary = Summary::new();
        let one_ref = DatasetRefSummary {
            data_id: BTreeMap::new(),
            id: "uuid-1".to_string(),
        };
        summary
            .tracts
            .insert("a".to_string(), vec![one_ref.clone(), one_ref.clone()]);
        summary.visits.insert("b".to_string(), vec![one_ref.clone()]);
        summary.global.insert("c".to_string(), vec![one_ref]);
        assert_eq!(summary.total_refs(), 4);
    }

    #[test]
    fn summary_serializes_all_top_level_keys() {
        let json = serde_json::to_value(Summary::new()).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("tracts"));
        assert!(obj.contains_key("visits"));
        assert!(obj.contains_key("global"));
    }

    #[test]
    fn dataset_ref_uses_data_id_wire_name() {
        let r = DatasetRefSummary {
            data_id: BTreeMap::from([("tract".to_string(), serde_json::json!(9813))]),
            id: "uuid-2".to_string(),
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["dataId"]["tract"], 9813);
        assert_eq!(json["id"], "uuid-2");
    }
}
