use crate::model::Tags;

/// Geography used in dedup keys of metrics without a geo code
pub const NATION_GEO_CODE: &str = "NATION";

/// Builds the canonical identity of an observation.
///
/// The key is `source|sheet|metric|geo|date|tags`, where `tags` renders each
/// entry as `key=value` in key order, joined by `|`. An empty tag set leaves
/// an empty trailing segment. `Tags` is ordered, so two keys built from the
/// same entries are identical regardless of how the map was filled.
pub fn build_dedup_key(
    source_code: &str,
    sheet_name: &str,
    metric_key: &str,
    geo_code: &str,
    date: &str,
    tags: &Tags,
) -> String {
    let canonical_tags = tags
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("|");

    format!(
        "{}|{}|{}|{}|{}|{}",
        source_code, sheet_name, metric_key, geo_code, date, canonical_tags
    )
}
