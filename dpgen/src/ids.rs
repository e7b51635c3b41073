//! Build-wide identifier namespace.
//!
//! Every name that ends up as a variable in generated source goes through
//! here: instance ids, page ids, bus ids, and the pin and callback objects
//! the sequencer creates.

use std::collections::{HashMap, HashSet};

/// Claims explicit ids and generates the rest.
///
/// The only state shared between instances of one build.
#[derive(Debug, Default)]
pub struct IdAllocator {
    claimed: HashSet<String>,
    counters: HashMap<String, usize>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `id`. Returns `false` if it is already taken.
    pub fn claim(&mut self, id: &str) -> bool {
        self.claimed.insert(id.to_string())
    }

    pub fn is_claimed(&self, id: &str) -> bool {
        self.claimed.contains(id)
    }

    /// Claim `base` if free, otherwise the first free `<base>_<n>` from 2.
    pub fn derive(&mut self, base: &str) -> String {
        if self.claimed.insert(base.to_string()) {
            return base.to_string();
        }
        let mut n = 1;
        loop {
            n += 1;
            let candidate = format!("{base}_{n}");
            if self.claimed.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// Generate and claim `<prefix>_<n>`, skipping names already taken.
    pub fn generate(&mut self, prefix: &str) -> String {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{prefix}_{counter}");
            if self.claimed.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}
