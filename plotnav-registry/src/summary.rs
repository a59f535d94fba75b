//! Summary builder.
//!
//! Turns registry answers about one collection into the cacheable
//! [`Summary`] document: plot-like dataset types only, partitioned into
//! tract/visit/global buckets, with one batched find-first query per bucket
//! and empty groups omitted.

use plotnav_core::{DatasetRefSummary, DatasetTypeInfo, PlotBucket, Summary};

use crate::client::{Registry, RegistryResult};

/// Build the summary document for `collection`.
///
/// Fails with [`plotnav_core::RegistryError::CollectionNotFound`] when the
/// collection does not exist; transport errors propagate unchanged. The
/// caller decides what to do with either - this function never retries.
pub async fn build_summary(registry: &dyn Registry, collection: &str) -> RegistryResult<Summary> {
    let dataset_types = registry.dataset_types(collection).await?;
    let plot_types: Vec<DatasetTypeInfo> = dataset_types
        .into_iter()
        .filter(DatasetTypeInfo::is_plot)
        .collect();

    tracing::debug!(
        collection,
        plot_types = plot_types.len(),
        "Building collection summary"
    );

    let mut summary = Summary::new();
    for bucket in [PlotBucket::Tracts, PlotBucket::Visits, PlotBucket::Global] {
        let bucket_types: Vec<DatasetTypeInfo> = plot_types
            .iter()
            .filter(|t| t.bucket() == bucket)
            .cloned()
            .collect();
        if bucket_types.is_empty() {
            continue;
        }

        // One query for the whole bucket; fanning out per type is too slow
        // against the registry.
        let records = registry
            .find_first_datasets(&bucket_types, collection)
            .await?;

        let groups = summary.bucket_mut(bucket);
        for dataset_type in &bucket_types {
            let refs: Vec<DatasetRefSummary> = records
                .iter()
                .filter(|r| r.dataset_type == dataset_type.name)
                .cloned()
                .map(DatasetRefSummary::from)
                .collect();
            if !refs.is_empty() {
                groups.insert(dataset_type.name.clone(), refs);
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRegistry;
    use plotnav_core::{DatasetRecord, RegistryError, PLOT_STORAGE_CLASS};
    use std::collections::BTreeMap;

    fn plot_type<const N: usize>(name: &str, dims: [&str; N]) -> DatasetTypeInfo {
        DatasetTypeInfo::new(name, PLOT_STORAGE_CLASS, dims)
    }

    fn record(dataset_type: &str, id: &str) -> DatasetRecord {
        DatasetRecord {
            dataset_type: dataset_type.to_string(),
            data_id: BTreeMap::from([("tract".to_string(), serde_json::json!(1))]),
            id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn buckets_are_partitioned_and_grouped() {
        let registry = MockRegistry::new();
        registry.add_collection(
            "run1",
            vec![
                plot_type("tractPlot", ["tract", "detector"]),
                plot_type("visitPlot", ["visit"]),
                plot_type("detectorPlot", ["detector"]),
                plot_type("skyPlot", []),
            ],
            vec![
                record("tractPlot", "t1"),
                record("tractPlot", "t2"),
                record("visitPlot", "v1"),
                record("detectorPlot", "d1"),
                record("skyPlot", "g1"),
            ],
        );

        let summary = build_summary(&registry, "run1").await.unwrap();
        assert_eq!(summary.tracts.keys().collect::<Vec<_>>(), ["tractPlot"]);
        assert_eq!(
            summary.visits.keys().collect::<Vec<_>>(),
            ["detectorPlot", "visitPlot"]
        );
        assert_eq!(summary.global.keys().collect::<Vec<_>>(), ["skyPlot"]);
        assert_eq!(summary.tracts["tractPlot"].len(), 2);
        assert_eq!(summary.total_refs(), 5);
    }

    #[tokio::test]
    async fn one_find_first_query_per_nonempty_bucket() {
        let registry = MockRegistry::new();
        registry.add_collection(
            "run1",
            vec![
                plot_type("a", ["tract"]),
                plot_type("b", ["tract"]),
                plot_type("c", ["visit"]),
            ],
            vec![record("a", "1"), record("b", "2"), record("c", "3")],
        );

        build_summary(&registry, "run1").await.unwrap();
        // Two non-empty buckets (tracts, visits), so exactly two queries -
        // not one per dataset type and none for the empty global bucket.
        assert_eq!(registry.find_first_calls(), 2);
    }

    #[tokio::test]
    async fn non_plot_types_are_excluded() {
        let registry = MockRegistry::new();
        registry.add_collection(
            "run1",
            vec![
                DatasetTypeInfo::new("objectTable", "DataFrame", ["tract"]),
                plot_type("tractPlot", ["tract"]),
            ],
            vec![record("objectTable", "x"), record("tractPlot", "t1")],
        );

        let summary = build_summary(&registry, "run1").await.unwrap();
        assert!(!summary.tracts.contains_key("objectTable"));
        assert!(summary.tracts.contains_key("tractPlot"));
    }

    #[tokio::test]
    async fn types_with_no_refs_are_omitted_not_empty() {
        let registry = MockRegistry::new();
        registry.add_collection(
            "run1",
            vec![plot_type("withRefs", ["tract"]), plot_type("noRefs", ["tract"])],
            vec![record("withRefs", "t1")],
        );

        let summary = build_summary(&registry, "run1").await.unwrap();
        assert!(summary.tracts.contains_key("withRefs"));
        assert!(!summary.tracts.contains_key("noRefs"));
    }

    #[tokio::test]
    async fn missing_collection_surfaces_collection_not_found() {
        let registry = MockRegistry::new();
        let err = build_summary(&registry, "gone").await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::CollectionNotFound { collection } if collection == "gone"
        ));
    }

    #[tokio::test]
    async fn transport_errors_propagate_unchanged() {
        let registry = MockRegistry::new();
        registry.add_collection("run1", vec![plot_type("a", ["tract"])], vec![]);
        registry.set_unavailable(true);
        assert!(matches!(
            build_summary(&registry, "run1").await,
            Err(RegistryError::Unavailable { .. })
        ));
    }
}
