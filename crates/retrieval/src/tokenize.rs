use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

static CLEANER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{Hangul}\p{Latin}\p{Nd}\s]+").expect("valid tokenizer regex"));

pub fn tokenize(input: &str) -> Vec<String> {
    let normalized = CLEANER.replace_all(input, " ").to_lowercase();

    normalized
        .split_whitespace()
        .map(str::trim)
        .filter(|token| token.chars().count() > 1)
        .map(|token| token.to_string())
        .collect()
}

/// Words plus Hangul character bigrams. Korean attaches particles and
/// compounds without spaces ("외옹치해변", "속초의"), so whole-word overlap
/// alone misses most matches.
pub fn keyword_set(input: &str) -> HashSet<String> {
    let mut keywords = HashSet::new();

    for token in tokenize(input) {
        let chars = token.chars().collect::<Vec<_>>();
        if chars.len() > 2 && chars.iter().all(|c| is_hangul(*c)) {
            for pair in chars.windows(2) {
                keywords.insert(pair.iter().collect::<String>());
            }
        }
        keywords.insert(token);
    }

    keywords
}

fn is_hangul(c: char) -> bool {
    ('가'..='힣').contains(&c)
}
