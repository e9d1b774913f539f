//! Paper identifier normalization
//!
//! Different code paths tag paper ids with synthetic prefixes: the
//! search pipeline emits `corpus:`/`search:` source tags, expansion
//! emits `expanded:`, and graph assembly historically emitted `root-`,
//! `paper-` and `rec-` role tags. The same logical paper can therefore
//! arrive under several spellings. `normalize` strips every known
//! prefix so normalized ids are the canonical dedup key everywhere
//! (node identity, relationship keys, edge endpoints).

/// Synthetic prefixes stripped from the front of an id, in the order
/// they are tried. Stacked prefixes (e.g. `corpus:paper-123`) resolve
/// because stripping repeats until no prefix matches.
const SYNTHETIC_PREFIXES: &[&str] = &[
    "corpus:", "search:", "expanded:", "root-", "paper-", "rec-",
];

/// Strip known synthetic prefixes and surrounding whitespace.
///
/// Total and idempotent: unrecognized formats pass through unchanged
/// (after trimming), and normalizing an already-normalized id is a
/// no-op.
pub fn normalize(id: &str) -> String {
    let mut current = id.trim();
    loop {
        let mut stripped = false;
        for prefix in SYNTHETIC_PREFIXES {
            if let Some(rest) = current.strip_prefix(prefix) {
                current = rest.trim_start();
                stripped = true;
                break;
            }
        }
        if !stripped {
            return current.to_string();
        }
    }
}

/// Whether two ids refer to the same logical paper.
pub fn same_paper(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}
