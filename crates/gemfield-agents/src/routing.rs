//! Greedy nearest-neighbour ordering of reported cells.
//!
//! From the current cell, repeatedly visit the closest remaining target by
//! Manhattan distance. O(n^2) and not tour-optimal, but pure and
//! deterministic: ties go to the first target in `BTreeSet` order
//! (lowest `x`, then lowest `z`).

use std::collections::BTreeSet;

use gemfield_types::Cell;

/// Order `targets` into a visiting sequence starting from `start`.
pub fn greedy_route(start: Cell, targets: &BTreeSet<Cell>) -> Vec<Cell> {
    let mut remaining = targets.clone();
    let mut plan = Vec::with_capacity(remaining.len());
    let mut current = start;

    loop {
        // min_by_key returns the first minimum, which gives the tie-break.
        let Some(next) = remaining.iter().copied().min_by_key(|c| current.manhattan(*c)) else {
            break;
        };
        remaining.remove(&next);
        plan.push(next);
        current = next;
    }
    plan
}
