use crate::config::StaticItem;
use crate::model::Candidate;
use crate::sources::Source;
use anyhow::Result;
use log::info;

pub const STATIC_PROVIDER: &str = "static";

/// Items declared under `[[providers.static.items]]` in the config.
pub struct StaticSource {
    items: Vec<StaticItem>,
}

impl StaticSource {
    pub fn new(items: Vec<StaticItem>) -> Self {
        Self { items }
    }
}

impl Source for StaticSource {
    fn name(&self) -> &str {
        STATIC_PROVIDER
    }

    fn scan(&self, _batch_size: usize, emit: &mut dyn FnMut(Vec<Candidate>)) -> Result<()> {
        let entries: Vec<Candidate> = self
            .items
            .iter()
            .map(|item| {
                let id = item.id.clone().unwrap_or_else(|| format!("{}:{}", STATIC_PROVIDER, item.name));
                Candidate::new(id, item.name.clone(), STATIC_PROVIDER).with_description(item.description.clone())
            })
            .collect();
        info!("StaticSource: found {} entries", entries.len());
        if !entries.is_empty() {
            emit(entries);
        }
        Ok(())
    }
}
