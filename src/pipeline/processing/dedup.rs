use csv::StringRecord;
use std::collections::HashSet;
use std::hash::Hash;
use tracing::debug;

use crate::types::CanonicalRecord;

/// Keep the first item per key, in input order.
///
/// Items whose key is `None` are never treated as duplicates.
pub fn dedup_by_key<T, K, F>(items: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> Option<K>,
{
    let before = items.len();
    let mut seen = HashSet::new();
    let kept: Vec<T> = items
        .into_iter()
        .filter(|item| match key(item) {
            Some(k) => seen.insert(k),
            None => true,
        })
        .collect();
    debug!(before, after = kept.len(), "Deduplicated");
    kept
}

/// Deduplicate canonical records by identifier. Records without an
/// identifier (unresolvable input) are all kept.
pub fn dedup_by_identifier(records: Vec<CanonicalRecord>) -> Vec<CanonicalRecord> {
    dedup_by_key(records, |r| (!r.cnpj.is_empty()).then(|| r.cnpj.clone()))
}

/// Deduplicate flat CSV rows by a named column.
///
/// Every value counts as a key, so rows with a blank cell collapse to the
/// first of them. When the column is not part of the header the rows pass
/// through unchanged.
pub fn dedup_rows(headers: &StringRecord, rows: Vec<StringRecord>, column: &str) -> Vec<StringRecord> {
    let Some(index) = headers.iter().position(|h| h == column) else {
        debug!(column, "Dedup column absent, rows unchanged");
        return rows;
    };
    dedup_by_key(rows, |row| Some(row.get(index).unwrap_or("").trim().to_string()))
}
