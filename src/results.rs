use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResultsError {
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

/// Which end of the score range ranks first.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScoreOrder {
    /// Higher scores rank first.
    #[default]
    Descending,
    Ascending,
}

impl ScoreOrder {
    fn rank(self, score: i64) -> Rank {
        match self {
            ScoreOrder::Descending => Rank::Descending(Reverse(score)),
            ScoreOrder::Ascending => Rank::Ascending(score),
        }
    }
}

/// Score in comparison form; smaller ranks first. A list only ever holds one
/// variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    Descending(Reverse<i64>),
    Ascending(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedItem<T> {
    pub id: String,
    pub group: String,
    pub priority: i32,
    pub score: i64,
    pub label: String,
    pub payload: T,
}

impl<T> RankedItem<T> {
    pub fn new(id: impl Into<String>, group: impl Into<String>, priority: i32, score: i64, payload: T) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            group: group.into(),
            priority,
            score,
            payload,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Ordering key: priority, then score best-first, then id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SortKey {
    priority: i32,
    rank: Rank,
    id: String,
}

impl SortKey {
    fn of<T>(item: &RankedItem<T>, order: ScoreOrder) -> Self {
        Self {
            priority: item.priority,
            rank: order.rank(item.score),
            id: item.id.clone(),
        }
    }

    /// True when `self` should replace an entry with key `existing`.
    fn beats(&self, existing: &SortKey) -> bool {
        (self.priority, self.rank) < (existing.priority, existing.rank)
    }
}

enum Slot<T> {
    Ranked(RankedItem<T>),
    /// Injected through `insert_range`; stays where it was placed.
    Pinned(RankedItem<T>),
}

impl<T> Slot<T> {
    fn item(&self) -> &RankedItem<T> {
        match self {
            Slot::Ranked(item) | Slot::Pinned(item) => item,
        }
    }

    fn into_item(self) -> RankedItem<T> {
        match self {
            Slot::Ranked(item) | Slot::Pinned(item) => item,
        }
    }
}

enum Entries<T> {
    Sorted(BTreeMap<SortKey, RankedItem<T>>),
    Unordered(Vec<Slot<T>>),
}

#[derive(Debug, Clone, Default)]
struct Group {
    count: usize,
    keys: BTreeSet<SortKey>,
}

impl Group {
    /// Priority of the best-ranked member.
    fn priority(&self) -> i32 {
        self.keys.first().map(|key| key.priority).unwrap_or_default()
    }
}

/// Read-only view over one group of a [`RankedResultList`].
pub struct GroupView<'a, T> {
    pub id: &'a str,
    pub priority: i32,
    pub count: usize,
    list: &'a RankedResultList<T>,
}

impl<'a, T> GroupView<'a, T> {
    pub fn items(&self) -> Box<dyn Iterator<Item = &'a RankedItem<T>> + 'a> {
        self.list.iter_group(self.id)
    }
}

/// Ordered, deduplicated, grouped container of scored items.
///
/// Items arrive in any number of batches. The list starts out backed by an
/// ordered map; the first [`insert_range`](Self::insert_range) turns it into a
/// plain sequence for the rest of the session.
pub struct RankedResultList<T> {
    order: ScoreOrder,
    entries: Entries<T>,
    keys: HashMap<String, SortKey>,
    groups: HashMap<String, Group>,
    len: usize,
}

impl<T> Default for RankedResultList<T> {
    fn default() -> Self {
        Self::new(ScoreOrder::default())
    }
}

impl<T> RankedResultList<T> {
    pub fn new(order: ScoreOrder) -> Self {
        Self {
            order,
            entries: Entries::Sorted(BTreeMap::new()),
            keys: HashMap::new(),
            groups: HashMap::new(),
            len: 0,
        }
    }

    pub fn order(&self) -> ScoreOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_sorted(&self) -> bool {
        matches!(self.entries, Entries::Sorted(_))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.keys.contains_key(id)
    }

    pub fn clear(&mut self) {
        self.entries = Entries::Sorted(BTreeMap::new());
        self.keys.clear();
        self.groups.clear();
        self.len = 0;
    }

    /// Inserts `item`, or replaces the entry with the same id if `item` ranks
    /// better. Returns whether the list changed.
    pub fn add(&mut self, item: RankedItem<T>) -> bool {
        let key = SortKey::of(&item, self.order);
        if let Some(existing) = self.keys.get(&item.id) {
            if !key.beats(existing) {
                return false;
            }
            let existing = existing.clone();
            self.detach(&existing);
        }

        self.attach(&item, key.clone());
        match &mut self.entries {
            Entries::Sorted(map) => {
                map.insert(key, item);
            }
            Entries::Unordered(slots) => {
                let order = self.order;
                let at = slots
                    .iter()
                    .position(|slot| match slot {
                        Slot::Ranked(other) => SortKey::of(other, order) > key,
                        Slot::Pinned(_) => false,
                    })
                    .unwrap_or(slots.len());
                slots.insert(at, Slot::Ranked(item));
            }
        }
        true
    }

    /// Adds every item of the batch. Returns how many changed the list.
    pub fn add_batch(&mut self, items: impl IntoIterator<Item = RankedItem<T>>) -> usize {
        items.into_iter().map(|item| self.add(item)).filter(|&changed| changed).count()
    }

    /// Places `items` at `index` in iteration order, regardless of rank.
    ///
    /// Switches the list to its unordered representation for good. Injected
    /// items replace any existing entry with the same id.
    /// A repeated id inside `items` keeps the last occurrence.
    pub fn insert_range(&mut self, index: usize, items: impl IntoIterator<Item = RankedItem<T>>) {
        if let Entries::Sorted(map) = &mut self.entries {
            let slots = std::mem::take(map).into_values().map(Slot::Ranked).collect();
            self.entries = Entries::Unordered(slots);
        }

        let mut at = index.min(self.len);
        for item in items {
            if let Some(existing) = self.keys.get(&item.id).cloned() {
                if self.position_of(&item.id).is_some_and(|pos| pos < at) {
                    at -= 1;
                }
                self.detach(&existing);
            }
            let key = SortKey::of(&item, self.order);
            self.attach(&item, key);
            if let Entries::Unordered(slots) = &mut self.entries {
                slots.insert(at.min(slots.len()), Slot::Pinned(item));
                at += 1;
            }
        }
    }

    /// Whether `id` was placed by [`insert_range`](Self::insert_range) and
    /// has not been replaced since.
    pub fn is_pinned(&self, id: &str) -> bool {
        match &self.entries {
            Entries::Sorted(_) => false,
            Entries::Unordered(slots) => slots
                .iter()
                .any(|slot| matches!(slot, Slot::Pinned(item) if item.id == id)),
        }
    }

    fn position_of(&self, id: &str) -> Option<usize> {
        match &self.entries {
            Entries::Sorted(map) => map.values().position(|item| item.id == id),
            Entries::Unordered(slots) => slots.iter().position(|slot| slot.item().id == id),
        }
    }

    /// Removes the entry with `id`. Only the sorted representation supports
    /// removal.
    pub fn remove(&mut self, id: &str) -> Result<Option<RankedItem<T>>, ResultsError> {
        if !self.is_sorted() {
            return Err(ResultsError::Unsupported("remove on an unordered result list"));
        }
        match self.keys.get(id).cloned() {
            Some(key) => Ok(self.detach(&key)),
            None => Ok(None),
        }
    }

    pub fn get(&self, index: usize) -> Option<&RankedItem<T>> {
        match &self.entries {
            Entries::Sorted(map) => map.values().nth(index),
            Entries::Unordered(slots) => slots.get(index).map(Slot::item),
        }
    }

    pub fn get_by_id(&self, id: &str) -> Option<&RankedItem<T>> {
        let key = self.keys.get(id)?;
        match &self.entries {
            Entries::Sorted(map) => map.get(key),
            Entries::Unordered(slots) => slots.iter().map(Slot::item).find(|item| item.id == id),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = &RankedItem<T>> + '_> {
        match &self.entries {
            Entries::Sorted(map) => Box::new(map.values()),
            Entries::Unordered(slots) => Box::new(slots.iter().map(Slot::item)),
        }
    }

    /// Items of a single group, in the same order as [`iter`](Self::iter).
    pub fn iter_group<'a>(&'a self, group: &'a str) -> Box<dyn Iterator<Item = &'a RankedItem<T>> + 'a> {
        match &self.entries {
            Entries::Sorted(map) => match self.groups.get(group) {
                Some(g) => Box::new(g.keys.iter().filter_map(move |key| map.get(key))),
                None => Box::new(std::iter::empty()),
            },
            Entries::Unordered(slots) => Box::new(slots.iter().map(Slot::item).filter(move |item| item.group == group)),
        }
    }

    pub fn group(&self, id: &str) -> Option<GroupView<'_, T>> {
        let (id, group) = self.groups.get_key_value(id)?;
        Some(GroupView {
            id,
            priority: group.priority(),
            count: group.count,
            list: self,
        })
    }

    /// Groups ordered by the priority of their best item, then name.
    pub fn groups(&self) -> Vec<GroupView<'_, T>> {
        let mut views: Vec<GroupView<'_, T>> = self
            .groups
            .iter()
            .map(|(id, group)| GroupView {
                id,
                priority: group.priority(),
                count: group.count,
                list: self,
            })
            .collect();
        views.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(b.id)));
        views
    }

    fn attach(&mut self, item: &RankedItem<T>, key: SortKey) {
        let group = self.groups.entry(item.group.clone()).or_default();
        group.count += 1;
        group.keys.insert(key.clone());
        self.keys.insert(item.id.clone(), key);
        self.len += 1;
    }

    fn detach(&mut self, key: &SortKey) -> Option<RankedItem<T>> {
        let removed = match &mut self.entries {
            Entries::Sorted(map) => map.remove(key),
            Entries::Unordered(slots) => slots
                .iter()
                .position(|slot| slot.item().id == key.id)
                .map(|at| slots.remove(at).into_item()),
        }?;

        self.keys.remove(&removed.id);
        self.len -= 1;
        if let Some(group) = self.groups.get_mut(&removed.group) {
            group.keys.remove(key);
            group.count -= 1;
            if group.count == 0 {
                self.groups.remove(&removed.group);
            }
        }
        Some(removed)
    }
}
