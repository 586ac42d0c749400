use crate::dataset::Identities;
use std::collections::BTreeSet;

/// Names present in the dataset but missing from the store.
pub fn compute_remaining(identities: &Identities, known_names: &BTreeSet<String>) -> BTreeSet<String> {
    identities
        .names()
        .filter(|name| !known_names.contains(*name))
        .map(str::to_string)
        .collect()
}
