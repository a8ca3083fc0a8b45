use anyhow::{Context, Result};
use tracing::info;

use crate::base::{Bucket, DatasetSpec, ObjectKey, PartitionDate};
use crate::enrich;
use crate::estimate::{self, EstimateSource};
use crate::lister;
use crate::store::ObjectStore;

#[derive(Debug, Default)]
pub struct RunSummary {
    pub datasets: usize,
    pub objects_written: usize,
    pub unique_dates: usize,
}

/// Drive the full pipeline: list every dataset, resolve the estimate map
/// once across all of them, then enrich each dataset to completion before
/// the next. Listings are reused between the date-collection pass and
/// enrichment. First failure aborts the run; destination objects already
/// written stay in place.
pub fn run(
    store: &dyn ObjectStore,
    source: &dyn EstimateSource,
    bucket: &Bucket,
    specs: &[DatasetSpec],
) -> Result<RunSummary> {
    let mut listings: Vec<(&DatasetSpec, Vec<(ObjectKey, PartitionDate)>)> = Vec::new();
    for spec in specs {
        let entries = lister::list_dataset(store, bucket, &spec.source_prefix)
            .with_context(|| format!("list dataset {}", spec.name))?;
        info!(
            dataset = spec.name.as_str(),
            objects = entries.len(),
            "listed dataset"
        );
        listings.push((spec, entries));
    }

    if listings.iter().all(|(_, entries)| entries.is_empty()) {
        info!("no objects found under any source prefix, nothing to do");
        return Ok(RunSummary {
            datasets: specs.len(),
            ..RunSummary::default()
        });
    }

    let dates = listings
        .iter()
        .flat_map(|(_, entries)| entries.iter().map(|(_, date)| date));
    let estimates = estimate::build_estimate_map(dates, source).context("resolve estimate map")?;

    let mut summary = RunSummary {
        datasets: specs.len(),
        unique_dates: estimates.len(),
        ..RunSummary::default()
    };
    for (spec, entries) in &listings {
        info!(
            dataset = spec.name.as_str(),
            destination = spec.destination_prefix.as_str(),
            "enriching dataset"
        );
        for (key, date) in entries {
            enrich::enrich_object(store, bucket, key, date, &spec.destination_prefix, &estimates)
                .with_context(|| format!("enrich {key}"))?;
            summary.objects_written += 1;
        }
    }

    Ok(summary)
}
