use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Matcher, Utf32Str};
use serde::Deserialize;

/// Score reported for an empty pattern. Every candidate matches it equally.
pub const EMPTY_PATTERN_SCORE: i64 = 0;

/// Bonus and penalty table used by [`FuzzyMatcher`].
///
/// The defaults are empirically tuned; they reproduce the ranking users are
/// used to and are not derived from anything.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ScoreWeights {
    pub base: i64,
    pub sequential_bonus: i64,
    pub separator_bonus: i64,
    pub camel_bonus: i64,
    pub first_letter_bonus: i64,
    pub leading_letter_penalty: i64,
    pub max_leading_letter_penalty: i64,
    pub unmatched_letter_penalty: i64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            base: 100,
            sequential_bonus: 75,
            separator_bonus: 30,
            camel_bonus: 30,
            first_letter_bonus: 35,
            leading_letter_penalty: -5,
            max_leading_letter_penalty: -15,
            unmatched_letter_penalty: -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchResult {
    pub matched: bool,
    pub score: i64,
    /// Character (not byte) indices into the candidate, strictly increasing.
    pub matched_indices: Vec<usize>,
}

impl MatchResult {
    pub fn no_match() -> Self {
        Self::default()
    }

    fn empty_pattern() -> Self {
        Self {
            matched: true,
            score: EMPTY_PATTERN_SCORE,
            matched_indices: Vec::new(),
        }
    }
}

/// Anything that can score a candidate string against a query.
pub trait Scorer {
    fn score(&mut self, pattern: &str, candidate: &str) -> MatchResult;
}

#[derive(Debug, Clone, Default)]
pub struct FuzzyMatcher {
    weights: ScoreWeights,
}

impl FuzzyMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Matches `pattern` as a case-insensitive subsequence of `candidate`.
    ///
    /// Characters inside `<...>` tags never match, so candidates that already
    /// carry markup can be matched directly.
    pub fn fuzzy_match(&self, pattern: &str, candidate: &str) -> MatchResult {
        let pattern: Vec<char> = pattern.chars().map(fold).collect();
        if pattern.is_empty() {
            return MatchResult::empty_pattern();
        }

        let original: Vec<char> = candidate.chars().collect();
        if original.is_empty() {
            return MatchResult::no_match();
        }
        let folded: Vec<char> = original.iter().copied().map(fold).collect();
        let matchable = matchable_mask(&original);

        let (first, last) = match (pattern.first(), pattern.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return MatchResult::no_match(),
        };
        let is_hit = |pos: usize, ch: char| matchable[pos] && folded[pos] == ch;

        let Some(start) = (0..folded.len()).find(|&pos| is_hit(pos, first)) else {
            return MatchResult::no_match();
        };
        let Some(end) = (0..folded.len()).rev().find(|&pos| is_hit(pos, last)).map(|pos| pos + 1) else {
            return MatchResult::no_match();
        };
        if end <= start || end - start < pattern.len() {
            return MatchResult::no_match();
        }

        // Cheap in-order scan before paying for the full table.
        let mut cursor = start;
        for &ch in &pattern {
            match (cursor..end).find(|&pos| is_hit(pos, ch)) {
                Some(pos) => cursor = pos + 1,
                None => return MatchResult::no_match(),
            }
        }

        let mut positions: Vec<Vec<usize>> = Vec::with_capacity(pattern.len());
        let mut from = start;
        for (i, &ch) in pattern.iter().enumerate() {
            // Leave room for the remaining pattern characters.
            let last_allowed = end - (pattern.len() - i);
            let hits: Vec<usize> = (from..=last_allowed).filter(|&pos| is_hit(pos, ch)).collect();
            let Some(&earliest) = hits.first() else {
                return MatchResult::no_match();
            };
            from = earliest + 1;
            positions.push(hits);
        }

        let w = &self.weights;
        let mut scores: Vec<Vec<i64>> = Vec::with_capacity(positions.len());
        let mut back: Vec<Vec<usize>> = Vec::with_capacity(positions.len());

        let first_row: Vec<i64> = positions[0]
            .iter()
            .map(|&pos| {
                let leading = (w.leading_letter_penalty * pos as i64).max(w.max_leading_letter_penalty);
                w.base + leading + self.position_bonus(&original, pos)
            })
            .collect();
        back.push(vec![0; first_row.len()]);
        scores.push(first_row);

        for i in 1..positions.len() {
            let prev_positions = &positions[i - 1];
            let prev_scores = &scores[i - 1];
            let mut row = Vec::with_capacity(positions[i].len());
            let mut links = Vec::with_capacity(positions[i].len());

            for &pos in &positions[i] {
                let mut best: Option<(i64, usize)> = None;
                for (k, &prev_pos) in prev_positions.iter().enumerate() {
                    if prev_pos >= pos {
                        break;
                    }
                    let Some(&prev_score) = prev_scores.get(k) else {
                        break;
                    };
                    if prev_score == i64::MIN {
                        continue;
                    }
                    let mut candidate_score = prev_score;
                    if prev_pos + 1 == pos {
                        candidate_score += w.sequential_bonus;
                    }
                    if best.is_none_or(|(score, _)| candidate_score > score) {
                        best = Some((candidate_score, k));
                    }
                }
                match best {
                    Some((score, k)) => {
                        row.push(score + self.position_bonus(&original, pos));
                        links.push(k);
                    }
                    None => {
                        row.push(i64::MIN);
                        links.push(0);
                    }
                }
            }
            scores.push(row);
            back.push(links);
        }

        let last_row = scores.len() - 1;
        let mut best: Option<(i64, usize)> = None;
        for (k, &score) in scores[last_row].iter().enumerate() {
            if score != i64::MIN && best.is_none_or(|(best_score, _)| score > best_score) {
                best = Some((score, k));
            }
        }
        let Some((best_score, mut k)) = best else {
            return MatchResult::no_match();
        };

        let mut matched_indices = vec![0; pattern.len()];
        for i in (0..pattern.len()).rev() {
            let (Some(&pos), Some(&link)) = (positions[i].get(k), back[i].get(k)) else {
                return MatchResult::no_match();
            };
            matched_indices[i] = pos;
            k = link;
        }

        let unmatched = (original.len() - pattern.len()) as i64;
        MatchResult {
            matched: true,
            score: best_score + w.unmatched_letter_penalty * unmatched,
            matched_indices,
        }
    }

    fn position_bonus(&self, original: &[char], pos: usize) -> i64 {
        let w = &self.weights;
        if pos == 0 {
            return w.first_letter_bonus;
        }
        let (Some(&prev), Some(&current)) = (original.get(pos - 1), original.get(pos)) else {
            return 0;
        };
        let mut bonus = 0;
        if (prev.is_lowercase() || !prev.is_alphabetic()) && current.is_uppercase() {
            bonus += w.camel_bonus;
        }
        if prev == '_' || prev == ' ' {
            bonus += w.separator_bonus;
        }
        bonus
    }
}

impl Scorer for FuzzyMatcher {
    fn score(&mut self, pattern: &str, candidate: &str) -> MatchResult {
        self.fuzzy_match(pattern, candidate)
    }
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Marks every character that sits outside a closed `<...>` tag.
fn matchable_mask(chars: &[char]) -> Vec<bool> {
    let mut mask = vec![true; chars.len()];
    let mut pos = 0;
    while pos < chars.len() {
        if chars[pos] == '<' {
            if let Some(offset) = chars[pos + 1..].iter().position(|&c| c == '>') {
                let close = pos + 1 + offset;
                mask[pos..=close].fill(false);
                pos = close + 1;
                continue;
            }
        }
        pos += 1;
    }
    mask
}

/// Scorer backed by `nucleo-matcher`, for users who prefer fzf-style ranking.
pub struct NucleoScorer {
    matcher: Matcher,
    buf: Vec<char>,
    indices: Vec<u32>,
}

impl Default for NucleoScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl NucleoScorer {
    pub fn new() -> Self {
        Self {
            matcher: Matcher::new(nucleo_matcher::Config::DEFAULT),
            buf: Vec::new(),
            indices: Vec::new(),
        }
    }
}

impl Scorer for NucleoScorer {
    fn score(&mut self, pattern: &str, candidate: &str) -> MatchResult {
        if pattern.is_empty() {
            return MatchResult::empty_pattern();
        }
        let pattern = Pattern::parse(pattern, CaseMatching::Smart, Normalization::Smart);
        let haystack = Utf32Str::new(candidate, &mut self.buf);
        self.indices.clear();
        match pattern.indices(haystack, &mut self.matcher, &mut self.indices) {
            Some(score) => {
                // Multi-atom patterns report indices per atom.
                self.indices.sort_unstable();
                self.indices.dedup();
                MatchResult {
                    matched: true,
                    score: score as i64,
                    matched_indices: self.indices.iter().map(|&i| i as usize).collect(),
                }
            }
            None => MatchResult::no_match(),
        }
    }
}
