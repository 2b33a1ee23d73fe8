use std::collections::HashMap;

use chrono::NaiveDateTime;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Mutable state owned by one generation run.
///
/// Holds the seeded random source, the pinned anchor time and the shared
/// counters. Auto-increment counters are keyed by field name, in the run
/// scope for parent-less tables (shared across them) and in a fresh group
/// scope for each parent row; `code` sequence
/// counters are keyed by the literal pattern and shared across tables.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    rng: ChaCha8Rng,
    anchor: NaiveDateTime,
    run_counters: HashMap<String, i64>,
    group_counters: Option<HashMap<String, i64>>,
    sequences: HashMap<String, u64>,
}

impl GenerationContext {
    pub fn new(seed: u64, anchor: NaiveDateTime) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            anchor,
            run_counters: HashMap::new(),
            group_counters: None,
            sequences: HashMap::new(),
        }
    }

    /// Reset every counter and reseed, as at the start of a run.
    pub fn reset(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self.run_counters.clear();
        self.group_counters = None;
        self.sequences.clear();
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    pub fn anchor(&self) -> NaiveDateTime {
        self.anchor
    }

    /// Open a fresh auto-increment scope for the children of one parent row.
    pub fn begin_parent_group(&mut self) {
        self.group_counters = Some(HashMap::new());
    }

    pub fn end_parent_group(&mut self) {
        self.group_counters = None;
    }

    /// Next auto-increment value, starting at 1.
    pub fn next_auto_increment(&mut self, field: &str) -> i64 {
        let counters = match self.group_counters.as_mut() {
            Some(group) => group,
            None => &mut self.run_counters,
        };
        let counter = counters.entry(field.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Next value of the sequence shared by every use of `pattern`.
    pub fn next_sequence(&mut self, pattern: &str) -> u64 {
        let counter = self.sequences.entry(pattern.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::Rng;

    fn anchor() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .unwrap()
    }

    #[test]
    fn auto_increment_is_scoped_per_parent_group() {
        let mut ctx = GenerationContext::new(1, anchor());
        assert_eq!(ctx.next_auto_increment("id"), 1);
        assert_eq!(ctx.next_auto_increment("id"), 2);
        assert_eq!(ctx.next_auto_increment("ticket_no"), 1);

        ctx.begin_parent_group();
        assert_eq!(ctx.next_auto_increment("line_no"), 1);
        assert_eq!(ctx.next_auto_increment("line_no"), 2);
        assert_eq!(ctx.next_auto_increment("id"), 1);
        ctx.begin_parent_group();
        assert_eq!(ctx.next_auto_increment("line_no"), 1);
        ctx.end_parent_group();

        assert_eq!(ctx.next_auto_increment("id"), 3);
    }

    #[test]
    fn sequences_are_keyed_by_pattern() {
        let mut ctx = GenerationContext::new(1, anchor());
        assert_eq!(ctx.next_sequence("INV-{seq:4}"), 1);
        assert_eq!(ctx.next_sequence("INV-{seq:4}"), 2);
        assert_eq!(ctx.next_sequence("PO-{seq:4}"), 1);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut ctx = GenerationContext::new(7, anchor());
        let first: u64 = ctx.rng().random();
        ctx.next_sequence("A{seq:1}");
        ctx.next_auto_increment("id");

        ctx.reset(7);
        let again: u64 = ctx.rng().random();
        assert_eq!(first, again);
        assert_eq!(ctx.next_sequence("A{seq:1}"), 1);
        assert_eq!(ctx.next_auto_increment("id"), 1);
    }
}
