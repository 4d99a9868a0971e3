use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::evidence::compute_summary;
use crate::matcher::{match_records, resolve_keys};
use crate::model::{RecordSet, ReconMeta, ReconResult};
use crate::reconcile::reconcile;

/// Run reconciliation per config. Returns merged rows + summary.
///
/// Required key fields are checked against both sheets before any matching.
pub fn run(config: &ReconConfig, left: &RecordSet, right: &RecordSet) -> Result<ReconResult, ReconError> {
    let keys = config.key_spec()?;
    resolve_keys(left, right, &keys)?;

    log::info!(
        "{}: {} rows, {} columns; {}: {} rows, {} columns",
        left.name,
        left.len(),
        left.fields.len(),
        right.name,
        right.len(),
        right.fields.len(),
    );

    let matches = match_records(left, right, &keys, config.matching)?;
    log::info!(
        "matched {} of {} {} records ({} mode, duplicates: {})",
        matches.consumed_count(),
        right.len(),
        right.name,
        config.matching.mode,
        config.matching.on_duplicate,
    );

    let merged = reconcile(left, right, &matches, &config.layout())?;
    let summary = compute_summary(left.len(), right.len(), &matches, &merged);
    log::info!("merged output: {} rows, {} columns", merged.rows.len(), merged.columns.len() + 1);

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            left_sheet: left.name.clone(),
            right_sheet: right.name.clone(),
            mode: config.matching.mode,
            on_duplicate: config.matching.on_duplicate,
            key_pairs: keys.pairs().to_vec(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        matches,
        merged,
    })
}
