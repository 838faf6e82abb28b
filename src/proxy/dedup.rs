//! Order-preserving deduplication

use std::collections::HashSet;
use std::hash::Hash;

/// First occurrences of a sequence plus how many repeats were dropped
#[derive(Debug, Clone)]
pub struct Deduplicated<T> {
    pub unique: Vec<T>,
    pub duplicates: usize,
}

/// Keep the first occurrence of every value, in input order.
///
/// Runs in O(n) time and space.
pub fn deduplicate<T, I>(items: I) -> Deduplicated<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let iter = items.into_iter();
    let (lower, _) = iter.size_hint();
    let mut seen = HashSet::with_capacity(lower);
    let mut unique = Vec::with_capacity(lower);
    let mut duplicates = 0;

    for item in iter {
        if seen.insert(item.clone()) {
            unique.push(item);
        } else {
            duplicates += 1;
        }
    }

    log::info!(
        "Removed {} duplicates, unique proxies count: {}",
        duplicates,
        unique.len()
    );

    Deduplicated { unique, duplicates }
}
