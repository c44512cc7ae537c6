//! Occurrence-index tokens (`P31-7`, `Q5-0`) and statement-node ids.

use ahash::AHashMap;

/// One monotonic counter per key, handing out 0, 1, 2, … in first-seen order.
#[derive(Debug, Default)]
pub struct OccurrenceCounter {
    next: AHashMap<String, u64>,
}

impl OccurrenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_index(&mut self, key: &str) -> u64 {
        match self.next.get_mut(key) {
            Some(next) => {
                let index = *next;
                *next += 1;
                index
            }
            None => {
                self.next.insert(key.to_string(), 1);
                0
            }
        }
    }

    pub fn next_token(&mut self, key: &str) -> String {
        let index = self.next_index(key);
        token(key, index)
    }

    pub fn distinct_keys(&self) -> usize {
        self.next.len()
    }
}

pub fn token(key: &str, index: u64) -> String {
    format!("{key}-{index}")
}

/// Text before the first `-`; the whole token when there is none.
pub fn base_of(token: &str) -> &str {
    token.split_once('-').map_or(token, |(base, _)| base)
}

/// Statement-node ids are the only subjects carrying a `-`.
pub fn is_statement_node(id: &str) -> bool {
    id.contains('-')
}

/// Entity id owning a statement node, with the entity casing restored
/// (`q42-abc` → `Q42`).
pub fn entity_form(statement: &str) -> String {
    let base = base_of(statement);
    match base.strip_prefix('q') {
        Some(rest) => format!("Q{rest}"),
        None => base.to_string(),
    }
}

/// `id` with its first character replaced by `first`.
pub(crate) fn recased(id: &str, first: char) -> Option<String> {
    let mut chars = id.chars();
    chars.next()?;
    let mut out = String::with_capacity(id.len());
    out.push(first);
    out.push_str(chars.as_str());
    Some(out)
}
