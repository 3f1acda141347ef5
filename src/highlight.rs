use crate::config::HighlightConfig;

/// A highlighted character position, decoded from the signed index form.
///
/// Non-negative indices are normal highlights; `-(pos + 1)` marks `pos` as
/// special.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    Normal(usize),
    Special(usize),
}

impl Highlight {
    pub fn decode(index: isize) -> Self {
        if index < 0 {
            Highlight::Special(index.unsigned_abs() - 1)
        } else {
            Highlight::Normal(index.unsigned_abs())
        }
    }

    /// `None` when the position does not fit the signed form.
    pub fn encode(self) -> Option<isize> {
        match self {
            Highlight::Normal(pos) => isize::try_from(pos).ok(),
            Highlight::Special(pos) => isize::try_from(pos).ok().map(|pos| -pos - 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Normal,
    Special,
}

#[derive(Debug, Clone)]
pub struct HighlightFormatter {
    normal_open: String,
    normal_close: String,
    special_open: String,
    special_close: String,
}

impl Default for HighlightFormatter {
    fn default() -> Self {
        Self::from_config(&HighlightConfig::default())
    }
}

impl HighlightFormatter {
    pub fn new(normal_tag: &str, special_tag: &str) -> Self {
        Self {
            normal_open: normal_tag.to_string(),
            normal_close: closing_tag(normal_tag),
            special_open: special_tag.to_string(),
            special_close: closing_tag(special_tag),
        }
    }

    pub fn from_config(config: &HighlightConfig) -> Self {
        let mut formatter = Self::new(&config.normal, &config.special);
        if let Some(close) = &config.close {
            formatter.normal_close = close.clone();
            formatter.special_close = close.clone();
        }
        formatter
    }

    /// Wraps every run of highlighted characters of `label` in tags.
    ///
    /// `matches` uses the signed encoding of [`Highlight`]. Positions past the
    /// end of the label are ignored.
    pub fn format(&self, label: &str, matches: &[isize]) -> String {
        let len = label.chars().count();
        let mut marks: Vec<Option<Mark>> = vec![None; len];
        for &index in matches {
            match Highlight::decode(index) {
                Highlight::Normal(pos) => {
                    if let Some(slot) = marks.get_mut(pos) {
                        if slot.is_none() {
                            *slot = Some(Mark::Normal);
                        }
                    }
                }
                Highlight::Special(pos) => {
                    if let Some(slot) = marks.get_mut(pos) {
                        *slot = Some(Mark::Special);
                    }
                }
            }
        }

        let widest = (self.normal_open.len() + self.normal_close.len())
            .max(self.special_open.len() + self.special_close.len());
        let mut out = String::with_capacity(label.len() + matches.len() * widest);

        let mut open: Option<Mark> = None;
        for (ch, mark) in label.chars().zip(marks) {
            if open != mark {
                if let Some(current) = open {
                    out.push_str(self.close_tag(current));
                }
                if let Some(next) = mark {
                    out.push_str(self.open_tag(next));
                }
                open = mark;
            }
            out.push(ch);
        }
        if let Some(current) = open {
            out.push_str(self.close_tag(current));
        }
        out
    }

    /// Highlights the given character positions with the normal tag.
    pub fn format_indices(&self, label: &str, indices: &[usize]) -> String {
        let signed: Vec<isize> = indices.iter().filter_map(|&i| Highlight::Normal(i).encode()).collect();
        self.format(label, &signed)
    }

    fn open_tag(&self, mark: Mark) -> &str {
        match mark {
            Mark::Normal => &self.normal_open,
            Mark::Special => &self.special_open,
        }
    }

    fn close_tag(&self, mark: Mark) -> &str {
        match mark {
            Mark::Normal => &self.normal_close,
            Mark::Special => &self.special_close,
        }
    }
}

/// `<b>` closes with `</b>`, `<color=#f80>` with `</color>`.
fn closing_tag(open: &str) -> String {
    let inner = open.trim_start_matches('<');
    let name: String = inner
        .chars()
        .take_while(|c| !matches!(c, '=' | ' ' | '>'))
        .collect();
    if name.is_empty() {
        return String::new();
    }
    format!("</{name}>")
}
