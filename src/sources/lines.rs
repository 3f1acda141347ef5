use crate::model::Candidate;
use crate::sources::Source;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use log::{info, debug};

#[derive(Debug, Clone)]
pub enum LineInput {
    Stdin,
    File(PathBuf),
}

/// One candidate per non-empty line of stdin or a file.
pub struct LinesSource {
    name: String,
    input: LineInput,
}

impl LinesSource {
    pub fn stdin() -> Self {
        Self {
            name: "stdin".to_string(),
            input: LineInput::Stdin,
        }
    }

    /// The provider is named after the full path, so files that share a
    /// file name stay apart.
    pub fn file(path: PathBuf) -> Self {
        let name = path.to_string_lossy().to_string();
        Self {
            name,
            input: LineInput::File(path),
        }
    }
}

impl Source for LinesSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn scan(&self, batch_size: usize, emit: &mut dyn FnMut(Vec<Candidate>)) -> Result<()> {
        let reader: Box<dyn BufRead> = match &self.input {
            LineInput::Stdin => Box::new(BufReader::new(io::stdin())),
            LineInput::File(path) => {
                debug!("Reading candidates from {:?}", path);
                let file = File::open(path).with_context(|| format!("failed to open {:?}", path))?;
                Box::new(BufReader::new(file))
            }
        };
        let total = read_batches(&self.name, reader, batch_size, emit)?;
        info!("LinesSource[{}]: found {} entries", self.name, total);
        Ok(())
    }
}

/// Splits `reader` into batches of at most `batch_size` candidates. Identical
/// lines share an id, so the result list keeps only one of them.
pub fn read_batches(
    provider: &str,
    reader: impl BufRead,
    batch_size: usize,
    emit: &mut dyn FnMut(Vec<Candidate>),
) -> Result<usize> {
    let batch_size = batch_size.max(1);
    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0;
    for line in reader.lines() {
        let line = line.with_context(|| format!("failed to read from {provider}"))?;
        let label = line.trim_end();
        if label.is_empty() {
            continue;
        }
        batch.push(Candidate::new(format!("{provider}:{label}"), label, provider));
        total += 1;
        if batch.len() == batch_size {
            emit(std::mem::replace(&mut batch, Vec::with_capacity(batch_size)));
        }
    }
    if !batch.is_empty() {
        emit(batch);
    }
    Ok(total)
}
