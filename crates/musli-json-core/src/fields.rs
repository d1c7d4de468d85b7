//! Embedded-field ("flatten") dominance resolution, spec §4.3.
//!
//! When a struct embeds another struct's fields (via
//! `#[musli_json(flatten)]`), two fields at different embedding depths can
//! end up with the same visible name. The winner is chosen the same way Go's
//! `encoding/json` resolves promoted fields: shallowest depth wins; if more
//! than one candidate shares the shallowest depth, an explicit name (an
//! attribute-provided rename, as opposed to one taken from the field's own
//! identifier) breaks the tie; if the tie still can't be broken, the name is
//! dropped entirely rather than guessing.

/// One field, at some embedding depth, that is visible under `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The visible JSON name.
    pub name: String,
    /// Embedding depth: `0` for a field declared directly on the struct
    /// being described, `1` for a field of a directly flattened struct, and
    /// so on.
    pub depth: usize,
    /// Whether `name` came from an explicit rename attribute rather than the
    /// field's own identifier.
    pub explicit: bool,
    /// Position in the original candidate list, used to keep the result in
    /// a stable, deterministic order.
    pub index: usize,
}

/// Resolve which candidates are actually visible, applying the dominance
/// rule above. The result is sorted by `index`, i.e. the order fields were
/// first discovered in (struct's own fields before its flattened children,
/// breadth-first across embedding levels).
pub fn resolve_visible(candidates: Vec<Candidate>) -> Vec<Candidate> {
    use std::collections::HashMap;

    let mut by_name: HashMap<&str, Vec<&Candidate>> = HashMap::new();
    for c in &candidates {
        by_name.entry(c.name.as_str()).or_default().push(c);
    }

    let mut winners: Vec<Candidate> = Vec::new();

    for group in by_name.values() {
        let min_depth = group.iter().map(|c| c.depth).min().unwrap();
        let shallowest: Vec<&&Candidate> =
            group.iter().filter(|c| c.depth == min_depth).collect();

        match shallowest.len() {
            0 => unreachable!("group is non-empty and min_depth came from it"),
            1 => winners.push((*shallowest[0]).clone()),
            _ => {
                let explicit: Vec<&&Candidate> =
                    shallowest.iter().filter(|c| c.explicit).copied().collect();
                if explicit.len() == 1 {
                    winners.push((*explicit[0]).clone());
                }
                // 0 or >1 explicit candidates at the same depth: ambiguous,
                // the name is dropped from the visible set entirely.
            }
        }
    }

    winners.sort_by_key(|c| c.index);
    winners
}
