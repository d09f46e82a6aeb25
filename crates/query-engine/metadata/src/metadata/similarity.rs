//! Fuzzy string similarity.
//!
//! Candidate selection and field repair only depend on the [`Similarity`] trait, so the
//! scoring algorithm can be swapped out. [`WeightedRatio`] is the default: it combines a
//! plain edit-based ratio with partial-substring and token-order-insensitive variants and
//! keeps the best, which makes it tolerant of reordered words and of a short query matching
//! part of a long search text.

use std::collections::BTreeSet;

use similar::{DiffOp, TextDiff};

/// Scores how close `choice` is to `query`, from 0 (unrelated) to 100 (identical).
pub trait Similarity: Send + Sync {
    fn score(&self, query: &str, choice: &str) -> u8;
}

/// Weighted combination of ratio, partial ratio, token sort and token set ratios.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedRatio;

const UNBASE_SCALE: f64 = 0.95;

impl Similarity for WeightedRatio {
    fn score(&self, query: &str, choice: &str) -> u8 {
        let p1 = preprocess(query);
        let p2 = preprocess(choice);
        if p1.is_empty() || p2.is_empty() {
            return 0;
        }

        let len1 = p1.chars().count();
        let len2 = p2.chars().count();
        #[allow(clippy::cast_precision_loss)]
        let len_ratio = len1.max(len2) as f64 / len1.min(len2) as f64;

        let base = ratio(&p1, &p2);

        let best = if len_ratio < 1.5 {
            base.max(token_sort_ratio(&p1, &p2, ratio) * UNBASE_SCALE)
                .max(token_set_ratio(&p1, &p2, ratio) * UNBASE_SCALE)
        } else {
            let partial_scale = if len_ratio > 8.0 { 0.6 } else { 0.9 };
            base.max(partial_ratio(&p1, &p2) * partial_scale)
                .max(token_sort_ratio(&p1, &p2, partial_ratio) * UNBASE_SCALE * partial_scale)
                .max(token_set_ratio(&p1, &p2, partial_ratio) * UNBASE_SCALE * partial_scale)
        };

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let score = best.round().clamp(0.0, 100.0) as u8;
        score
    }
}

/// Score every choice against `query` and return the indexes of the best `limit` choices,
/// best first. Ties keep their input order.
pub fn extract<'a, S>(
    similarity: &S,
    query: &str,
    choices: impl IntoIterator<Item = &'a str>,
    limit: usize,
) -> Vec<(usize, u8)>
where
    S: Similarity + ?Sized,
{
    let mut scored: Vec<(usize, u8)> = choices
        .into_iter()
        .enumerate()
        .map(|(index, choice)| (index, similarity.score(query, choice)))
        .collect();
    scored.sort_by(|(_, left), (_, right)| right.cmp(left));
    scored.truncate(limit);
    scored
}

/// The single closest choice to `query`, if there are any choices.
pub fn best_match<'a, S>(
    similarity: &S,
    query: &str,
    choices: impl IntoIterator<Item = &'a str>,
) -> Option<(&'a str, u8)>
where
    S: Similarity + ?Sized,
{
    choices
        .into_iter()
        .map(|choice| (choice, similarity.score(query, choice)))
        .fold(None, |best, (choice, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((choice, score)),
        })
}

/// Lowercase, replace everything that is not a letter or digit with a space, trim.
fn preprocess(input: &str) -> String {
    let replaced: String = input
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .flat_map(char::to_lowercase)
        .collect();
    replaced.trim().to_string()
}

/// Edit-based similarity in the range 0..=100.
fn ratio(a: &str, b: &str) -> f64 {
    f64::from(TextDiff::from_chars(a, b).ratio()) * 100.0
}

/// Best ratio of the shorter string against any equally long window of the longer one.
/// Windows are aligned on the matching blocks between the two strings.
fn partial_ratio(a: &str, b: &str) -> f64 {
    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let short_len = shorter.chars().count();
    let long_chars: Vec<char> = longer.chars().collect();
    if short_len == 0 {
        return 0.0;
    }

    let diff = TextDiff::from_chars(shorter, longer);
    let mut starts: Vec<usize> = diff
        .ops()
        .iter()
        .filter_map(|op| match op {
            DiffOp::Equal {
                old_index,
                new_index,
                ..
            } => Some(new_index.saturating_sub(*old_index)),
            _ => None,
        })
        .collect();
    starts.push(long_chars.len().saturating_sub(short_len));

    let mut best: f64 = 0.0;
    for start in starts {
        let end = (start + short_len).min(long_chars.len());
        let window: String = long_chars[start..end].iter().collect();
        let score = ratio(shorter, &window);
        if score > 99.5 {
            return 100.0;
        }
        best = best.max(score);
    }
    best
}

fn token_sort_ratio(a: &str, b: &str, scorer: fn(&str, &str) -> f64) -> f64 {
    scorer(&sorted_tokens(a), &sorted_tokens(b))
}

fn token_set_ratio(a: &str, b: &str, scorer: fn(&str, &str) -> f64) -> f64 {
    let left: BTreeSet<&str> = a.split_whitespace().collect();
    let right: BTreeSet<&str> = b.split_whitespace().collect();

    let intersection = join(left.intersection(&right));
    let left_only = join(left.difference(&right));
    let right_only = join(right.difference(&left));

    let combined_left = format!("{intersection} {left_only}").trim().to_string();
    let combined_right = format!("{intersection} {right_only}").trim().to_string();

    scorer(&intersection, &combined_left)
        .max(scorer(&intersection, &combined_right))
        .max(scorer(&combined_left, &combined_right))
}

fn sorted_tokens(input: &str) -> String {
    let mut tokens: Vec<&str> = input.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn join<'a, 'b: 'a>(tokens: impl Iterator<Item = &'a &'b str>) -> String {
    tokens.copied().collect::<Vec<_>>().join(" ")
}
