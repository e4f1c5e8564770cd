//! Canonical ordering of item numbers
//!
//! This is the one comparator used by selection, inventory, reports, and
//! status display. Identifiers are split into alternating maximal runs of
//! ASCII digits and non-digits and compared run by run:
//!
//! - digit runs compare as unsigned integers of any length (`2 < 10`)
//! - non-digit runs compare case-insensitively by code point
//! - a digit run sorts before a non-digit run at the same position
//! - when one identifier runs out of runs first, it sorts first
//!
//! Identifiers equal under those rules are ordered by leading-zero count
//! (`1` before `01`) and finally by their exact text, so distinct
//! identifiers never compare equal. Empty identifiers sort after every
//! non-empty one.

use crate::domain::ItemDescriptor;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn runs(s: &str) -> Vec<Run<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut digit_run: Option<bool> = None;

    for (idx, c) in s.char_indices() {
        let is_digit = c.is_ascii_digit();
        match digit_run {
            Some(prev) if prev != is_digit => {
                out.push(make_run(&s[start..idx], prev));
                start = idx;
            }
            _ => {}
        }
        digit_run = Some(is_digit);
    }
    if let Some(prev) = digit_run {
        out.push(make_run(&s[start..], prev));
    }
    out
}

fn make_run(s: &str, digits: bool) -> Run<'_> {
    if digits {
        Run::Digits(s)
    } else {
        Run::Text(s)
    }
}

/// Compares two digit strings by numeric value without parsing
fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

fn leading_zeros(s: &str) -> usize {
    s.len() - s.trim_start_matches('0').len()
}

/// Primary comparison: the natural order without tie-breakers
fn cmp_runs(a: &[Run<'_>], b: &[Run<'_>]) -> Ordering {
    for (ra, rb) in a.iter().zip(b.iter()) {
        let ord = match (ra, rb) {
            (Run::Digits(x), Run::Digits(y)) => cmp_digits(x, y),
            (Run::Text(x), Run::Text(y)) => cmp_text(x, y),
            (Run::Digits(_), Run::Text(_)) => Ordering::Less,
            (Run::Text(_), Run::Digits(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

/// Secondary comparison for identifiers with equal primary order
fn cmp_zero_padding(a: &[Run<'_>], b: &[Run<'_>]) -> Ordering {
    let zeros = |runs: &[Run<'_>]| -> Vec<usize> {
        runs.iter()
            .filter_map(|r| match r {
                Run::Digits(d) => Some(leading_zeros(d)),
                Run::Text(_) => None,
            })
            .collect()
    };
    zeros(a).cmp(&zeros(b))
}

/// Total order over item numbers
///
/// Surrounding whitespace is ignored. Empty numbers sort last and compare
/// equal to each other.
pub fn compare_numbers(a: &str, b: &str) -> Ordering {
    let a = a.trim();
    let b = b.trim();
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    let ra = runs(a);
    let rb = runs(b);
    cmp_runs(&ra, &rb)
        .then_with(|| cmp_zero_padding(&ra, &rb))
        .then_with(|| a.cmp(b))
}

/// Total order over items: number first, then name, then opaque id
///
/// The secondary keys give items with empty or duplicate numbers a stable
/// position across runs.
pub fn compare_items(a: &ItemDescriptor, b: &ItemDescriptor) -> Ordering {
    compare_numbers(&a.number, &b.number)
        .then_with(|| cmp_text(a.name.trim(), b.name.trim()))
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.opaque_id.cmp(&b.opaque_id))
}

/// Sorts items into canonical order
pub fn sort_items(items: &mut [ItemDescriptor]) {
    items.sort_by(compare_items);
}

/// Sorts item numbers into canonical order
pub fn sort_numbers<S: AsRef<str>>(numbers: &mut [S]) {
    numbers.sort_by(|a, b| compare_numbers(a.as_ref(), b.as_ref()));
}
