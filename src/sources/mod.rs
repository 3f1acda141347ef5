use crate::model::Candidate;
use anyhow::Result;

/// A provider of candidates. Sources hand over their items in batches so a
/// slow source never holds back results that are already known.
pub trait Source: Send {
    fn name(&self) -> &str;
    fn scan(&self, batch_size: usize, emit: &mut dyn FnMut(Vec<Candidate>)) -> Result<()>;
}

pub mod lines;
pub mod static_items;
