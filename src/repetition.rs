// src/repetition.rs
//! Degenerate-text detector guarding the summarization gate. Model output
//! failure modes are loops (the same phrase or line over and over) and
//! mid-sentence truncation; three independent rules catch them, any single
//! hit is enough. Empty input is always flagged — the gate must never
//! accept a blank summary.

use crate::config::PipelineConfig;
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::HashMap;

/// Words per phrase window for the phrase-repetition rule.
pub const PHRASE_WINDOW_WORDS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepetitionRule {
    /// A 5-word phrase occurs more often than the configured limit.
    PhraseRepeat,
    /// An exact non-blank line occurs more often than the configured limit.
    LineRepeat,
    /// Too many lines end in a dangling fragment (cut-off sentences).
    TruncatedFragments,
    /// Nothing to assess; degenerate by definition.
    EmptyInput,
}

#[derive(Debug, Clone, Copy)]
pub struct RepetitionVerdict {
    pub flagged: bool,
    pub rule: Option<RepetitionRule>,
}

impl RepetitionVerdict {
    fn clean() -> Self {
        Self {
            flagged: false,
            rule: None,
        }
    }

    fn hit(rule: RepetitionRule) -> Self {
        Self {
            flagged: true,
            rule: Some(rule),
        }
    }
}

fn re_word() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?u)\b\w+\b").expect("word regex"))
}

fn re_dangling_line() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    // At least three words and no terminal punctuation: a cut-off sentence.
    RE.get_or_init(|| Regex::new(r"(?u)\b\w+\s+\w+\s+\w+$").expect("fragment regex"))
}

/// Assess `text` against the three degeneracy rules, in a fixed order so the
/// reported rule is deterministic.
pub fn assess(text: &str, cfg: &PipelineConfig) -> RepetitionVerdict {
    if text.trim().is_empty() {
        return RepetitionVerdict::hit(RepetitionRule::EmptyInput);
    }

    // Rule 1: overlapping 5-word windows.
    let words: Vec<&str> = re_word().find_iter(text).map(|m| m.as_str()).collect();
    if words.len() >= PHRASE_WINDOW_WORDS {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for window in words.windows(PHRASE_WINDOW_WORDS) {
            let phrase = window.join(" ");
            let n = counts.entry(phrase).or_insert(0);
            *n += 1;
            if *n > cfg.phrase_repeat_limit {
                return RepetitionVerdict::hit(RepetitionRule::PhraseRepeat);
            }
        }
    }

    // Rule 2: exact repeated lines, blank lines ignored.
    let mut line_counts: HashMap<&str, usize> = HashMap::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let n = line_counts.entry(line).or_insert(0);
        *n += 1;
        if *n > cfg.line_repeat_limit {
            return RepetitionVerdict::hit(RepetitionRule::LineRepeat);
        }
    }

    // Rule 3: dangling-fragment lines.
    let fragment_lines = text
        .lines()
        .map(str::trim_end)
        .filter(|l| re_dangling_line().is_match(l))
        .count();
    if fragment_lines > cfg.fragment_line_limit {
        return RepetitionVerdict::hit(RepetitionRule::TruncatedFragments);
    }

    RepetitionVerdict::clean()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> PipelineConfig {
        PipelineConfig::default()
    }

    #[test]
    fn empty_text_is_always_flagged() {
        let v = assess("   \n\n ", &cfg());
        assert!(v.flagged);
        assert_eq!(v.rule, Some(RepetitionRule::EmptyInput));
    }

    #[test]
    fn phrase_repeated_four_times_is_flagged() {
        let text = "the quick brown fox jumps. ".repeat(4);
        let v = assess(&text, &cfg());
        assert!(v.flagged);
        assert_eq!(v.rule, Some(RepetitionRule::PhraseRepeat));
    }

    #[test]
    fn phrase_repeated_three_times_passes() {
        let text = "the quick brown fox jumps. ".repeat(3);
        let v = assess(&text, &cfg());
        assert!(!v.flagged, "three occurrences are within the limit: {v:?}");
    }

    #[test]
    fn repeated_line_is_flagged() {
        let text = "All work and no play.\n\nAll work and no play.\nAll work and no play.\n";
        let v = assess(text, &cfg());
        assert!(v.flagged);
        assert_eq!(v.rule, Some(RepetitionRule::LineRepeat));
    }

    #[test]
    fn two_identical_lines_pass() {
        let text = "Same line here today.\nSame line here today.\nSomething else entirely.";
        assert!(!assess(text, &cfg()).flagged);
    }

    #[test]
    fn many_cutoff_lines_are_flagged() {
        let text = "\
The market shifted because the\n\
Investors responded to early signs of\n\
Nobody expected that the quarterly\n\
Meanwhile analysts pointed at the\n";
        let v = assess(text, &cfg());
        assert!(v.flagged);
        assert_eq!(v.rule, Some(RepetitionRule::TruncatedFragments));
    }

    #[test]
    fn properly_terminated_prose_passes() {
        let text = "\
The market shifted because of new data.\n\
Investors responded to early signals.\n\
Analysts expect a quiet quarter.\n\
Nothing here repeats or dangles.\n";
        assert!(!assess(text, &cfg()).flagged);
    }
}
