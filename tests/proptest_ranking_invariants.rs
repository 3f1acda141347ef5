//! Property-based invariant tests for matching, highlighting and ranking.
//!
//! 1. An empty pattern always matches with the sentinel score.
//! 2. Matched indices are strictly increasing, one per pattern char, and
//!    each points at a case-insensitively equal character.
//! 3. Matching is deterministic.
//! 4. Stripping highlight tags gives back the label.
//! 5. At most one item per id survives, and it is the best version seen.
//! 6. Group counts add up to the number of distinct ids.
//! 7. Both hold after explicit-position inserts, and items placed by rank stay
//!    sorted among themselves.

use proptest::prelude::*;
use quickfind::highlight::HighlightFormatter;
use quickfind::matcher::{EMPTY_PATTERN_SCORE, FuzzyMatcher};
use quickfind::results::{RankedItem, RankedResultList};
use std::collections::{HashMap, HashSet};

// ── Helpers ─────────────────────────────────────────────────────────────

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn candidate_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z_ <>]{0,24}"
}

fn pattern_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z_ ]{0,5}"
}

fn items_strategy() -> impl Strategy<Value = Vec<(u8, u8, i8, i16)>> {
    // (id, group, priority, score)
    prop::collection::vec((0u8..12, 0u8..3, -2i8..3, any::<i16>()), 0..60)
}

#[derive(Debug, Clone)]
enum Op {
    Add((u8, u8, i8, i16)),
    Insert(usize, Vec<(u8, u8, i8, i16)>),
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let entry = (0u8..8, 0u8..3, -2i8..3, any::<i16>());
    let op = prop_oneof![
        3 => entry.clone().prop_map(Op::Add),
        1 => (0usize..12, prop::collection::vec(entry, 0..4)).prop_map(|(at, items)| Op::Insert(at, items)),
    ];
    prop::collection::vec(op, 0..40)
}

fn ranked((id, group, priority, score): (u8, u8, i8, i16)) -> RankedItem<()> {
    RankedItem::new(format!("item{id}"), format!("group{group}"), priority as i32, score as i64, ())
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Empty pattern
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn empty_pattern_always_matches(candidate in candidate_strategy()) {
        let result = FuzzyMatcher::new().fuzzy_match("", &candidate);
        prop_assert!(result.matched);
        prop_assert_eq!(result.score, EMPTY_PATTERN_SCORE);
        prop_assert!(result.matched_indices.is_empty());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Index shape
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn matched_indices_are_well_formed(pattern in pattern_strategy(), candidate in candidate_strategy()) {
        let result = FuzzyMatcher::new().fuzzy_match(&pattern, &candidate);
        if result.matched && !pattern.is_empty() {
            let pattern: Vec<char> = pattern.chars().collect();
            let chars: Vec<char> = candidate.chars().collect();
            prop_assert_eq!(result.matched_indices.len(), pattern.len());
            for pair in result.matched_indices.windows(2) {
                prop_assert!(pair[0] < pair[1], "indices not increasing: {:?}", result.matched_indices);
            }
            for (p, &i) in pattern.iter().zip(&result.matched_indices) {
                prop_assert_eq!(fold(chars[i]), fold(*p));
            }
        } else if !result.matched {
            prop_assert!(result.matched_indices.is_empty());
        }
    }

    #[test]
    fn subsequences_always_match(candidate in "[a-zA-Z_ ]{1,24}", mask in prop::collection::vec(any::<bool>(), 24)) {
        let pattern: String = candidate
            .chars()
            .zip(mask)
            .filter_map(|(c, keep)| keep.then_some(c))
            .collect();
        let result = FuzzyMatcher::new().fuzzy_match(&pattern, &candidate);
        prop_assert!(result.matched, "{:?} should match {:?}", pattern, candidate);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Determinism
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn matching_is_idempotent(pattern in pattern_strategy(), candidate in candidate_strategy()) {
        let matcher = FuzzyMatcher::new();
        prop_assert_eq!(matcher.fuzzy_match(&pattern, &candidate), matcher.fuzzy_match(&pattern, &candidate));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Highlight round trip
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn stripping_tags_restores_label(label in "[a-zA-Z0-9 ]{0,20}", marks in prop::collection::vec(-25isize..25, 0..12)) {
        let formatter = HighlightFormatter::new("<b>", "<i>");
        let out = formatter.format(&label, &marks);
        let stripped = out.replace("<b>", "").replace("</b>", "").replace("<i>", "").replace("</i>", "");
        prop_assert_eq!(stripped, label);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5-6. Ranking
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn one_best_entry_per_id(items in items_strategy()) {
        let mut list = RankedResultList::default();
        let mut best: HashMap<String, (i32, i64)> = HashMap::new();
        for (id, group, priority, score) in items {
            let id = format!("item{id}");
            let (priority, score) = (priority as i32, score as i64);
            // Lower priority first, then higher score.
            let entry = best.entry(id.clone()).or_insert((priority, score));
            if (priority, -score) < (entry.0, -entry.1) {
                *entry = (priority, score);
            }
            list.add(RankedItem::new(id, format!("group{group}"), priority, score, ()));
        }

        prop_assert_eq!(list.len(), best.len());
        let mut seen = HashSet::new();
        for item in list.iter() {
            prop_assert!(seen.insert(item.id.clone()), "duplicate id {}", item.id);
            prop_assert_eq!(Some(&(item.priority, item.score)), best.get(&item.id));
        }

        let group_total: usize = list.groups().iter().map(|g| g.count).sum();
        prop_assert_eq!(group_total, best.len());
        for group in list.groups() {
            prop_assert_eq!(group.items().count(), group.count);
        }
    }

    #[test]
    fn iteration_is_sorted(items in items_strategy()) {
        let mut list = RankedResultList::default();
        for (id, group, priority, score) in items {
            list.add(RankedItem::new(format!("item{id}"), format!("group{group}"), priority as i32, score as i64, ()));
        }
        let keys: Vec<(i32, i64, String)> = list.iter().map(|i| (i.priority, -i.score, i.id.clone())).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        prop_assert_eq!(keys, sorted);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 7. Explicit-position inserts
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn inserts_keep_ids_unique_and_ranked_items_sorted(ops in ops_strategy()) {
        let mut list = RankedResultList::default();
        for op in ops {
            match op {
                Op::Add(entry) => {
                    list.add(ranked(entry));
                }
                Op::Insert(at, entries) => list.insert_range(at, entries.into_iter().map(ranked)),
            }
        }

        let ids: Vec<&str> = list.iter().map(|i| i.id.as_str()).collect();
        let distinct: HashSet<&str> = ids.iter().copied().collect();
        prop_assert_eq!(distinct.len(), ids.len(), "duplicate ids: {:?}", ids);
        prop_assert_eq!(list.len(), ids.len());
        for id in &ids {
            prop_assert!(list.contains(id));
        }

        let group_total: usize = list.groups().iter().map(|g| g.count).sum();
        prop_assert_eq!(group_total, list.len());
        for group in list.groups() {
            prop_assert_eq!(group.items().count(), group.count);
        }

        let keys: Vec<(i32, i64, String)> = list
            .iter()
            .filter(|i| !list.is_pinned(&i.id))
            .map(|i| (i.priority, -i.score, i.id.clone()))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        prop_assert_eq!(keys, sorted);
    }
}
