use crate::record::FileRecord;
use std::collections::{HashMap, HashSet};

/// Make every computed name unique.
///
/// Records sharing a computed name are renamed in discovery order by
/// prefixing a per-name counter: the counter starts at zero and is
/// incremented before use, so the first member of a collision group becomes
/// `1_{name}`, the second `2_{name}`, and so on. A candidate that is already
/// taken by another record is skipped (the counter keeps going). Records
/// whose name is unique are left untouched.
///
/// Returns the number of records renamed.
pub fn deduplicate(records: &mut [FileRecord]) -> usize {
    let mut occurrences: HashMap<String, usize> = HashMap::new();
    for record in records.iter() {
        *occurrences.entry(record.computed_name().to_string()).or_default() += 1;
    }
    let mut taken: HashSet<String> = occurrences
        .iter()
        .filter(|(_, count)| **count == 1)
        .map(|(name, _)| name.clone())
        .collect();

    let mut counters: HashMap<String, u64> = HashMap::new();
    let mut renamed = 0;
    for record in records.iter_mut() {
        let name = record.computed_name().to_string();
        if occurrences.get(&name).copied().unwrap_or_default() <= 1 {
            continue;
        }
        let counter = counters.entry(name.clone()).or_default();
        let candidate = loop {
            *counter += 1;
            let candidate = format!("{counter}_{name}");
            if taken.insert(candidate.clone()) {
                break candidate;
            }
        };
        tracing::debug!(path = %record.full_path().display(), from = %name, to = %candidate, "Renamed duplicate");
        record.rename(candidate);
        renamed += 1;
    }
    renamed
}
