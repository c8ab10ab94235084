//! Fresh-name generation for table aliases, synthetic columns and node ids.
//!
//! Every alias minted during one top-level resolution comes from a single
//! generator, so names never collide inside the produced statement tree.
//!
//! ## Naming Convention
//! Format: `{prefix}{counter}` with one counter per prefix.
//!
//! Examples:
//! - `"t"` → `"t0"`, `"t1"`, ...
//! - `"q"` → `"q0"` (independent of the `"t"` counter)

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::sql_expr::{EntityId, GroupingId};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct UniqueIdentifierGenerator {
    counters: HashMap<String, usize>,
    next_entity: u32,
    next_grouping: u32,
}

impl UniqueIdentifierGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `prefix` followed by the next unused counter for that prefix.
    ///
    /// # Examples
    /// ```
    /// use sqlresolve::utils::unique_identifier::UniqueIdentifierGenerator;
    ///
    /// let mut generator = UniqueIdentifierGenerator::new();
    /// assert_eq!(generator.get_unique_identifier("t"), "t0");
    /// assert_eq!(generator.get_unique_identifier("t"), "t1");
    /// assert_eq!(generator.get_unique_identifier("q"), "q0");
    /// ```
    pub fn get_unique_identifier(&mut self, prefix: &str) -> String {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        let identifier = format!("{}{}", prefix, counter);
        *counter += 1;
        identifier
    }

    pub fn next_entity_id(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        id
    }

    pub fn next_grouping_id(&mut self) -> GroupingId {
        let id = GroupingId(self.next_grouping);
        self.next_grouping += 1;
        id
    }

    /// Forget every minted name. Only meaningful between independent compilations.
    pub fn reset(&mut self) {
        self.counters.clear();
        self.next_entity = 0;
        self.next_grouping = 0;
    }
}
