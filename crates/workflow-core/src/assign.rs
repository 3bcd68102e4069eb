//! Least-loaded candidate selection.

/// Pick the candidate with the lowest load.
///
/// Ties on load go to the candidate whose most recent assignment is oldest.
/// A candidate that has never been assigned (`recency` returns `None`) sorts
/// before every assigned one. Any remaining tie keeps input order.
///
/// Returns `None` only when `candidates` is empty.
pub fn resolve_least_loaded<'a, C, L, R>(
    candidates: &'a [C],
    load: impl Fn(&C) -> L,
    recency: impl Fn(&C) -> Option<R>,
) -> Option<&'a C>
where
    L: Ord,
    R: Ord,
{
    if let [only] = candidates {
        return Some(only);
    }

    let mut best: Option<(&C, L, Option<R>)> = None;
    for candidate in candidates {
        let candidate_load = load(candidate);
        let candidate_recency = recency(candidate);

        let better = match &best {
            None => true,
            // Option<R> orders None first, which is what never-assigned needs.
            Some((_, best_load, best_recency)) => {
                (&candidate_load, &candidate_recency) < (best_load, best_recency)
            }
        };

        if better {
            best = Some((candidate, candidate_load, candidate_recency));
        }
    }

    best.map(|(candidate, _, _)| candidate)
}
