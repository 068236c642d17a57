//! Column header mapping (variable key -> variable label)

use crate::types::VariableLabelMap;
use std::collections::HashSet;

/// Map column keys to display headers.
///
/// A key with a non-empty variable label uses the label, otherwise the key
/// itself. Headers are unique: the first column to claim a header keeps it,
/// later ones become `"{label} ({key})"` and, if that is still taken,
/// `"{label} ({key}) 2"`, `"{label} ({key}) 3"`, ...
pub fn map_headers<S: AsRef<str>>(keys: &[S], labels: &VariableLabelMap) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::with_capacity(keys.len());
    let mut headers = Vec::with_capacity(keys.len());

    for key in keys {
        let key = key.as_ref();
        let base = match labels.get(key) {
            Some(label) if !label.trim().is_empty() => label.as_str(),
            _ => key,
        };

        let mut candidate = base.to_string();
        if used.contains(&candidate) {
            candidate = format!("{} ({})", base, key);
            let mut n = 2;
            while used.contains(&candidate) {
                candidate = format!("{} ({}) {}", base, key, n);
                n += 1;
            }
        }

        used.insert(candidate.clone());
        headers.push(candidate);
    }

    headers
}
