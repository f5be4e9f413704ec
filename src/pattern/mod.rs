/// Rhythm patterns: named eight-step on/off sequences.
use crate::config::STEPS_PER_MEASURE;
use crate::{Result, TonegridError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    name: String,
    steps: [bool; STEPS_PER_MEASURE],
}

impl Pattern {
    pub fn new(name: impl Into<String>, steps: [bool; STEPS_PER_MEASURE]) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    /// Builds a pattern from `0`/`1` flags, the way the catalog is written.
    pub fn from_bits(name: impl Into<String>, bits: [u8; STEPS_PER_MEASURE]) -> Self {
        Self::new(name, bits.map(|b| b != 0))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[bool; STEPS_PER_MEASURE] {
        &self.steps
    }

    pub fn is_active(&self, step: usize) -> bool {
        self.steps
            .get(step % STEPS_PER_MEASURE)
            .copied()
            .unwrap_or(false)
    }

    /// One preview row: `█` for a hit, a blank otherwise, space separated.
    pub fn render(&self) -> String {
        self.steps
            .iter()
            .map(|&on| if on { "█" } else { " " })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Immutable catalog of patterns, looked up by name.
#[derive(Debug, Clone)]
pub struct PatternBank {
    patterns: Vec<Pattern>,
}

impl PatternBank {
    pub fn builtin() -> Self {
        Self {
            patterns: vec![
                Pattern::from_bits("Four-on-the-Floor", [1, 0, 1, 0, 1, 0, 1, 0]),
                Pattern::from_bits("Backbeat", [1, 0, 0, 1, 1, 0, 0, 1]),
                Pattern::from_bits("Shuffle", [1, 0, 1, 1, 0, 1, 1, 0]),
                Pattern::from_bits("Sparse", [1, 0, 0, 1, 0, 0, 1, 0]),
                Pattern::from_bits("Custom", [1, 0, 0, 0, 1, 0, 0, 1]),
            ],
        }
    }

    /// Built-in patterns followed by `extra`. An extra pattern whose name
    /// matches an earlier one shadows it.
    pub fn with_patterns(extra: impl IntoIterator<Item = Pattern>) -> Self {
        let mut bank = Self::builtin();
        for pattern in extra {
            match bank.patterns.iter_mut().find(|p| p.name == pattern.name) {
                Some(existing) => *existing = pattern,
                None => bank.patterns.push(pattern),
            }
        }
        bank
    }

    pub fn resolve(&self, name: &str) -> Result<&Pattern> {
        self.patterns
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| TonegridError::UnknownPattern(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.patterns.iter().map(|p| p.name.as_str()).collect()
    }
}

impl Default for PatternBank {
    fn default() -> Self {
        Self::builtin()
    }
}
