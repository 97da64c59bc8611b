use std::collections::HashMap;
use wordzy_types::LetterStatus;

pub struct FeedbackEvaluator;

impl FeedbackEvaluator {
    /// Score a guess against the target, Wordle style.
    ///
    /// Exact matches are resolved first and consume their letter, so a letter
    /// guessed more often than it appears in the target is only marked as many
    /// times as the target holds it, and the positional match always wins.
    pub fn evaluate(guess: &str, target: &str) -> Vec<LetterStatus> {
        let guess_chars: Vec<char> = guess.chars().map(|c| c.to_ascii_uppercase()).collect();
        let target_chars: Vec<char> = target.chars().map(|c| c.to_ascii_uppercase()).collect();

        let mut remaining: HashMap<char, usize> = HashMap::new();
        for ch in &target_chars {
            *remaining.entry(*ch).or_insert(0) += 1;
        }

        let mut statuses = vec![LetterStatus::Absent; guess_chars.len()];

        // First pass: correct positions
        let mut matched = vec![false; guess_chars.len()];
        for (i, &ch) in guess_chars.iter().enumerate() {
            if target_chars.get(i) == Some(&ch) {
                statuses[i] = LetterStatus::Correct;
                matched[i] = true;
                if let Some(count) = remaining.get_mut(&ch) {
                    *count -= 1;
                }
            }
        }

        // Second pass: present letters, limited by what is left over
        for (i, &ch) in guess_chars.iter().enumerate() {
            if matched[i] {
                continue;
            }
            if let Some(count) = remaining.get_mut(&ch) {
                if *count > 0 {
                    *count -= 1;
                    statuses[i] = LetterStatus::Present;
                }
            }
        }

        statuses
    }

    /// Wire form of an evaluation.
    pub fn codes(statuses: &[LetterStatus]) -> Vec<u8> {
        statuses.iter().map(|status| status.code()).collect()
    }

    pub fn is_solved(statuses: &[LetterStatus]) -> bool {
        !statuses.is_empty() && statuses.iter().all(|s| *s == LetterStatus::Correct)
    }
}
