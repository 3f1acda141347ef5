use crate::config::{Config, ConfigError, Engine, ProviderFilter};
use crate::highlight::HighlightFormatter;
use crate::matcher::{FuzzyMatcher, NucleoScorer, Scorer};
use crate::model::{Candidate, ResultRecord};
use crate::results::{RankedItem, RankedResultList};
use std::collections::HashMap;

pub const NO_SELECTION_ID: &str = "__no_selection__";
const NO_SELECTION_GROUP: &str = "";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Accumulating,
    Stable,
}

/// What a ranked result carries besides its rank.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub candidate: Candidate,
    pub matched_indices: Vec<usize>,
}

pub type Results = RankedResultList<Hit>;

pub struct SearchSession {
    pub config: Config,
    pub query: String,
    pub selected_index: usize,
    pub active_group: Option<String>,
    scorer: Box<dyn Scorer>,
    formatter: HighlightFormatter,
    results: Results,
    filters: HashMap<String, ProviderFilter>,
    /// Loaders still running, per provider name.
    pending: HashMap<String, usize>,
    state: SessionState,
}

impl SearchSession {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let scorer: Box<dyn Scorer> = match config.general.engine {
            Engine::Quick => Box::new(FuzzyMatcher::with_weights(config.scoring)),
            Engine::Nucleo => Box::new(NucleoScorer::new()),
        };
        let filters = config
            .providers
            .iter()
            .map(|(name, provider)| Ok((name.clone(), ProviderFilter::compile(name, provider)?)))
            .collect::<Result<HashMap<_, _>, ConfigError>>()?;

        Ok(Self {
            formatter: HighlightFormatter::from_config(&config.highlight),
            results: RankedResultList::new(config.general.score_order),
            config,
            query: String::new(),
            selected_index: 0,
            active_group: None,
            scorer,
            filters,
            pending: HashMap::new(),
            state: SessionState::Empty,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn results(&self) -> &Results {
        &self.results
    }

    /// Starts a new query. Results of the previous query are dropped.
    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.results.clear();
        self.pending.clear();
        self.selected_index = 0;
        self.state = SessionState::Empty;
    }

    /// Registers the providers expected to deliver batches for this query.
    /// A name listed twice has to finish twice.
    pub fn begin<I, S>(&mut self, providers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for provider in providers {
            *self.pending.entry(provider.into()).or_insert(0) += 1;
        }
        if self.pending.is_empty() && self.state == SessionState::Empty {
            self.state = SessionState::Stable;
        }
    }

    /// Scores and ranks one batch. Returns how many results changed.
    pub fn add_batch(&mut self, provider: &str, candidates: Vec<Candidate>) -> usize {
        if self.state != SessionState::Accumulating {
            self.state = SessionState::Accumulating;
        }
        let priority = self.config.priority_of(provider);
        let filter = self.filters.get(provider);
        let scorer = &mut self.scorer;
        let query = &self.query;

        let ranked: Vec<RankedItem<Hit>> = candidates
            .into_iter()
            .filter(|c| filter.is_none_or(|f| f.allows(&c.id, &c.label)))
            .filter_map(|candidate| {
                let result = scorer.score(query, &candidate.label);
                if !result.matched {
                    return None;
                }
                Some(
                    RankedItem::new(
                        candidate.id.clone(),
                        candidate.provider.clone(),
                        priority,
                        result.score,
                        Hit {
                            matched_indices: result.matched_indices,
                            candidate: candidate.clone(),
                        },
                    )
                    .with_label(candidate.label),
                )
            })
            .collect();

        let changed = self.results.add_batch(ranked);
        log::debug!(
            "SearchSession: query='{}', provider={}, changed={}, total={}",
            self.query,
            provider,
            changed,
            self.results.len()
        );
        changed
    }

    /// Marks `provider` as done. Once nothing is pending the session is stable.
    pub fn finish(&mut self, provider: &str) {
        if let Some(count) = self.pending.get_mut(provider) {
            *count -= 1;
            if *count == 0 {
                self.pending.remove(provider);
            }
        }
        if self.pending.is_empty() {
            self.state = SessionState::Stable;
            log::info!(
                "SearchSession: query='{}' stable with {} results",
                self.query,
                self.results.len()
            );
        }
    }

    /// Gives up on providers that never reported back.
    pub fn finish_all(&mut self) {
        if !self.pending.is_empty() {
            let missing: usize = self.pending.values().sum();
            log::warn!("SearchSession: {} providers did not finish", missing);
        }
        self.pending.clear();
        self.state = SessionState::Stable;
    }

    pub fn is_pending(&self, provider: &str) -> bool {
        self.pending.contains_key(provider)
    }

    pub fn set_active_group(&mut self, group: Option<String>) {
        self.active_group = group;
        self.selected_index = 0;
    }

    /// Results as shown: all groups, or only the active one.
    pub fn visible(&self) -> Box<dyn Iterator<Item = &RankedItem<Hit>> + '_> {
        match &self.active_group {
            Some(group) => self.results.iter_group(group),
            None => self.results.iter(),
        }
    }

    fn visible_len(&self) -> usize {
        match &self.active_group {
            Some(group) => self.results.group(group).map(|g| g.count).unwrap_or(0),
            None => self.results.len(),
        }
    }

    pub fn move_selection(&mut self, delta: i32) {
        let len = self.visible_len();
        if len == 0 {
            self.selected_index = 0;
            return;
        }

        let new_index = (self.selected_index as i64 + delta as i64).rem_euclid(len as i64);
        self.selected_index = new_index as usize;
    }

    pub fn selected(&self) -> Option<&RankedItem<Hit>> {
        self.visible().nth(self.selected_index)
    }

    /// Puts an empty "no selection" entry in front of the results.
    pub fn insert_no_selection(&mut self) {
        let sentinel = Candidate::new(NO_SELECTION_ID, "", NO_SELECTION_GROUP);
        let item = RankedItem::new(
            NO_SELECTION_ID,
            NO_SELECTION_GROUP,
            i32::MIN,
            0,
            Hit {
                candidate: sentinel,
                matched_indices: Vec::new(),
            },
        )
        .with_label("");
        self.results.insert_range(0, [item]);
    }

    pub fn highlighted(&self, item: &RankedItem<Hit>) -> String {
        self.formatter.format_indices(&item.label, &item.payload.matched_indices)
    }

    pub fn records(&self, limit: usize) -> Vec<ResultRecord> {
        self.visible()
            .filter(|item| item.id != NO_SELECTION_ID)
            .take(limit)
            .map(|item| ResultRecord {
                id: item.id.clone(),
                provider: item.group.clone(),
                priority: item.priority,
                score: item.score,
                label: item.label.clone(),
                highlighted: self.highlighted(item),
                matched_indices: item.payload.matched_indices.clone(),
                description: item.payload.candidate.description.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn words(provider: &str, labels: &[&str]) -> Vec<Candidate> {
        labels
            .iter()
            .map(|label| Candidate::new(format!("{provider}:{label}"), *label, provider))
            .collect()
    }

    fn session() -> SearchSession {
        SearchSession::new(Config::default()).unwrap()
    }

    #[test]
    fn state_moves_from_empty_to_stable() {
        let mut session = session();
        session.set_query("qs");
        session.begin(["files", "menu"]);
        assert_eq!(session.state(), SessionState::Empty);

        session.add_batch("files", words("files", &["QuickSearch.cs"]));
        assert_eq!(session.state(), SessionState::Accumulating);
        session.finish("files");
        assert_eq!(session.state(), SessionState::Accumulating);
        assert!(session.is_pending("menu"));
        session.finish("menu");
        assert_eq!(session.state(), SessionState::Stable);

        session.set_query("qs");
        session.begin(["slow"]);
        session.finish_all();
        assert_eq!(session.state(), SessionState::Stable);
        assert!(!session.is_pending("slow"));

        session.set_query("other");
        assert_eq!(session.state(), SessionState::Empty);
        assert!(session.results().is_empty());
    }

    #[test]
    fn providers_sharing_a_name_must_all_finish() {
        let mut session = session();
        session.set_query("n");
        session.begin(["notes.txt", "notes.txt"]);
        session.add_batch("notes.txt", words("notes.txt", &["note"]));
        session.finish("notes.txt");
        assert_eq!(session.state(), SessionState::Accumulating);
        assert!(session.is_pending("notes.txt"));

        session.finish("notes.txt");
        assert_eq!(session.state(), SessionState::Stable);
        assert!(!session.is_pending("notes.txt"));
    }

    #[test]
    fn begin_without_providers_is_stable() {
        let mut session = session();
        session.begin(Vec::<String>::new());
        assert_eq!(session.state(), SessionState::Stable);
    }

    #[test]
    fn ranks_matches_across_batches() {
        let mut session = session();
        session.set_query("qs");
        session.add_batch("files", words("files", &["quicksort", "abc"]));
        session.add_batch("files", words("files", &["QuickSearch", "quicksort"]));

        let labels: Vec<&str> = session.visible().map(|item| item.label.as_str()).collect();
        assert_eq!(labels, vec!["QuickSearch", "quicksort"]);
        assert_eq!(session.results().len(), 2);
    }

    #[test]
    fn provider_priority_and_filters_apply() {
        let config = parse_config(
            r#"
            [providers.menu]
            priority = -10
            [providers.files]
            blacklist = ["\\.meta$"]
            "#,
        )
        .unwrap();
        let mut session = SearchSession::new(config).unwrap();
        session.set_query("s");
        session.add_batch("files", words("files", &["s", "s.meta"]));
        session.add_batch("menu", words("menu", &["xxxxxxxxxs"]));

        let ids: Vec<&str> = session.visible().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["menu:xxxxxxxxxs", "files:s"]);
    }

    #[test]
    fn active_group_and_selection_wrap() {
        let mut session = session();
        session.set_query("a");
        session.add_batch("files", words("files", &["a1", "a2"]));
        session.add_batch("menu", words("menu", &["a3"]));

        session.set_active_group(Some("files".to_string()));
        assert_eq!(session.visible().count(), 2);
        session.move_selection(-1);
        assert_eq!(session.selected_index, 1);
        session.move_selection(1);
        assert_eq!(session.selected_index, 0);

        session.set_active_group(Some("missing".to_string()));
        session.move_selection(3);
        assert_eq!(session.selected_index, 0);
        assert!(session.selected().is_none());
    }

    #[test]
    fn no_selection_sentinel_leads() {
        let mut session = session();
        session.set_query("b");
        session.add_batch("files", words("files", &["b", "ab"]));
        session.insert_no_selection();
        session.add_batch("files", words("files", &["bb"]));

        let first = session.selected().map(|item| item.id.as_str());
        assert_eq!(first, Some(NO_SELECTION_ID));
        let records = session.records(10);
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.id != NO_SELECTION_ID));
    }

    #[test]
    fn records_carry_highlight() {
        let mut session = session();
        session.set_query("se");
        session.add_batch("files", words("files", &["Search"]));
        let records = session.records(5);
        assert_eq!(records[0].highlighted, "<b>Se</b>arch");
        assert_eq!(records[0].matched_indices, vec![0, 1]);
    }

    #[test]
    fn invalid_blacklist_fails_construction() {
        let config = parse_config("[providers.files]\nblacklist = [\"(\"]").unwrap();
        assert!(SearchSession::new(config).is_err());
    }
}
