use std::collections::{HashSet, VecDeque};
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use rand::Rng;
use rand::seq::IndexedRandom;
use wordzy_types::{GameError, WORD_LENGTH};

const EMBEDDED_TARGETS: &str = include_str!("../words/targets.txt");

/// Curated pool of target words. Every entry is five uppercase ASCII letters.
#[derive(Debug, Clone)]
pub struct WordList {
    words: Vec<String>,
    lookup: HashSet<String>,
}

impl WordList {
    /// Parse a newline separated list; blank lines, `#` comments and words that
    /// are not exactly five letters are skipped.
    pub fn from_word_list(word_list: &str) -> Self {
        let mut words = Vec::new();
        let mut lookup = HashSet::new();

        for line in word_list.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let word = line.to_ascii_uppercase();
            if !is_five_letters(&word) {
                continue;
            }
            if lookup.insert(word.clone()) {
                words.push(word);
            }
        }

        Self { words, lookup }
    }

    /// The list shipped with the crate.
    pub fn embedded() -> Self {
        Self::from_word_list(EMBEDDED_TARGETS)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read word list {}", path.display()))?;
        let list = Self::from_word_list(&contents);
        if list.is_empty() {
            return Err(anyhow!(
                "word list {} has no five-letter words",
                path.display()
            ));
        }
        Ok(list)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.lookup.contains(&word.to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Pick a target uniformly, avoiding the room's recent words while that
    /// still leaves something to pick from.
    pub fn pick_target<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        recent: &VecDeque<String>,
    ) -> Option<String> {
        let fresh: Vec<&String> = self
            .words
            .iter()
            .filter(|word| !recent.contains(word))
            .collect();

        let picked = if fresh.is_empty() {
            tracing::debug!("all {} words used recently, reusing pool", self.words.len());
            self.words.choose(rng)
        } else {
            fresh.choose(rng).copied()
        };

        picked.cloned()
    }
}

impl Default for WordList {
    fn default() -> Self {
        Self::embedded()
    }
}

fn is_five_letters(word: &str) -> bool {
    word.len() == WORD_LENGTH && word.chars().all(|c| c.is_ascii_alphabetic())
}

/// Trim and uppercase a submitted guess, rejecting anything but five letters.
pub fn normalize_guess(word: &str) -> Result<String, GameError> {
    let word = word.trim().to_ascii_uppercase();
    if word.chars().count() != WORD_LENGTH {
        return Err(GameError::invalid_guess(format!(
            "guess must be {} letters",
            WORD_LENGTH
        )));
    }
    if !word.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(GameError::invalid_guess("guess must only contain letters A-Z"));
    }
    Ok(word)
}
