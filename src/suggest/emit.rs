//! Script assembly: value quoting, predicate rendering, and the entry walk.
//!
//! Entries are emitted in input order; each positioned segment prints the
//! predicate its group's choice dictates and advances that choice's state,
//! so the `or count(...)=0` disjunct of tiers 2 and 3 appears on exactly
//! the lines up to and including the record that discharges it.

use crate::config::Options;

use super::Entry;
use super::choose::{self, TierState};
use super::group::{Group, Tail};
use super::split::Segment;

/// Walk `entries` and render one `set` line each, substituting predicates
/// for positional markers. Choice states are advanced in place.
pub fn render(entries: &[Entry], groups: &mut [Group], opts: &Options) -> String {
    let mut out = String::new();
    let mut prev_key: Option<Option<(usize, usize)>> = None;
    for (i, entry) in entries.iter().enumerate() {
        if is_implicit_anchor(entry, entries.get(i + 1)) {
            continue;
        }
        let key = emission_key(entry);
        if opts.pretty
            && let Some(prev) = prev_key
            && prev != key
        {
            out.push('\n');
        }
        out.push_str("set ");
        for seg in &entry.segments {
            out.push_str(&seg.text);
            let Some(pos) = seg.position else { continue };
            if seg.seq_form {
                out.push_str(opts.seq_star());
            }
            let predicate = match seg.group {
                Some(gid) => render_predicate(&mut groups[gid], pos, entry, seg, opts),
                None => {
                    eprintln!("[augscript] internal error: ungrouped segment in {}", entry.path);
                    wildcard(seg.seq_form)
                }
            };
            out.push_str(&predicate);
        }
        if let Some(value) = &entry.value {
            out.push(' ');
            out.push_str(&quote_value(value));
        }
        out.push('\n');
        prev_key = Some(key);
    }
    out
}

/// A null-valued node whose path is a strict prefix of the next entry's
/// path is created implicitly by the deeper `set`; its own line is
/// suppressed.
fn is_implicit_anchor(entry: &Entry, next: Option<&Entry>) -> bool {
    if entry.value.is_some() {
        return false;
    }
    let Some(next) = next else { return false };
    next.path.len() > entry.path.len()
        && next.path.starts_with(&entry.path)
        && next.path.as_bytes()[entry.path.len()] == b'/'
}

/// The (group, position) of the entry's innermost positioned segment,
/// used for `--pretty` blank-line separation.
fn emission_key(entry: &Entry) -> Option<(usize, usize)> {
    entry.segments.iter().rev().find_map(|s| match (s.group, s.position) {
        (Some(g), Some(p)) => Some((g, p)),
        _ => None,
    })
}

fn render_predicate(
    group: &mut Group,
    pos: usize,
    entry: &Entry,
    seg: &Segment,
    opts: &Options,
) -> String {
    let Some(choice) = group.choices.get(pos).cloned() else {
        eprintln!("[augscript] internal error: no choice at {}[{pos}]", group.head);
        return wildcard(seg.seq_form);
    };
    match choice.state {
        TierState::NoChildNodes => wildcard(seg.seq_form),
        TierState::FirstTail => {
            let Some(t) = choice.first.map(|id| &group.tails[id]) else {
                return missing_tail(group, pos, seg);
            };
            if t.tail.is_empty() {
                if t.value.is_none() {
                    return wildcard(seg.seq_form);
                }
                // a lone self-valued record needs no predicate: the set
                // line itself assigns the discriminating value
                if occupied_positions(group) <= 1 {
                    return String::new();
                }
            }
            format!("[{}]", comparison(t, choice.width, opts))
        }
        TierState::ChosenTailStart | TierState::ChosenTailWip => {
            let Some(tid) = choice.chosen else {
                return missing_tail(group, pos, seg);
            };
            let t = &group.tails[tid];
            let predicate = format!(
                "[{} or count({})=0]",
                comparison(t, choice.width, opts),
                expr(&t.tail)
            );
            advance(group, pos, tid, entry, seg);
            predicate
        }
        TierState::ChosenTailDone => {
            let Some(t) = choice.chosen.map(|id| &group.tails[id]) else {
                return missing_tail(group, pos, seg);
            };
            format!("[{}]", comparison(t, choice.width, opts))
        }
        TierState::ChosenTailPlusFirstTailStart | TierState::ChosenTailPlusFirstTailWip => {
            let (Some(fid), Some(tid)) = (choice.first, choice.chosen) else {
                return missing_tail(group, pos, seg);
            };
            let predicate = format!(
                "[{} and ({} or count({})=0)]",
                comparison(&group.tails[fid], 0, opts),
                comparison(&group.tails[tid], choice.width, opts),
                expr(&group.tails[tid].tail)
            );
            advance(group, pos, tid, entry, seg);
            predicate
        }
        TierState::ChosenTailPlusFirstTailDone => {
            let (Some(fid), Some(tid)) = (choice.first, choice.chosen) else {
                return missing_tail(group, pos, seg);
            };
            format!(
                "[{} and {}]",
                comparison(&group.tails[fid], 0, opts),
                comparison(&group.tails[tid], choice.width, opts)
            )
        }
        TierState::FirstTailPlusPosition => {
            let Some(t) = choice.first.map(|id| &group.tails[id]) else {
                return missing_tail(group, pos, seg);
            };
            if choice.ordinal == 0 {
                eprintln!(
                    "[augscript] internal error: no subgroup ordinal at {}[{pos}]",
                    group.head
                );
                return wildcard(seg.seq_form);
            }
            if t.value.is_some() {
                format!("[{}][{}]", comparison(t, choice.width, opts), choice.ordinal)
            } else {
                format!("[{}]", choice.ordinal)
            }
        }
    }
}

/// Move a tier-2/3 state along: Start becomes Wip once any sibling is
/// emitted, and the entry matching the chosen (tail, value) flips it to
/// Done so later lines drop the `count(...)=0` disjunct.
fn advance(group: &mut Group, pos: usize, chosen: usize, entry: &Entry, seg: &Segment) {
    let discharged = {
        let t = &group.tails[chosen];
        seg.tail == t.tail && entry.value == t.value
    };
    let state = &mut group.choices[pos].state;
    *state = match (*state, discharged) {
        (TierState::ChosenTailStart | TierState::ChosenTailWip, true) => TierState::ChosenTailDone,
        (TierState::ChosenTailStart, false) => TierState::ChosenTailWip,
        (
            TierState::ChosenTailPlusFirstTailStart | TierState::ChosenTailPlusFirstTailWip,
            true,
        ) => TierState::ChosenTailPlusFirstTailDone,
        (TierState::ChosenTailPlusFirstTailStart, false) => TierState::ChosenTailPlusFirstTailWip,
        (other, _) => other,
    };
}

fn missing_tail(group: &Group, pos: usize, seg: &Segment) -> String {
    eprintln!("[augscript] internal error: no chosen tail at {}[{pos}]", group.head);
    wildcard(seg.seq_form)
}

fn occupied_positions(group: &Group) -> usize {
    group.at_position.iter().filter(|l| !l.is_empty()).count()
}

/// Fallback selector: `[*]` for the bracket form. The `/n` form already
/// names the record set with the seq wildcard, so it gets no predicate.
fn wildcard(seq_form: bool) -> String {
    if seq_form { String::new() } else { "[*]".to_string() }
}

/// Predicate expression for a simplified tail: the tail without its leading
/// slash, or `.` for the positioned node itself.
fn expr(tail: &str) -> &str {
    match tail.strip_prefix('/') {
        Some(rest) => rest,
        None if tail.is_empty() => ".",
        None => tail,
    }
}

/// One comparison clause: `expr='value'`, `expr=~regexp('...')` under
/// `--regexp`, or a bare existence test for a null-valued tail.
fn comparison(t: &Tail, width: usize, opts: &Options) -> String {
    match value_token(t, opts) {
        Some(token) => {
            let op = if opts.regexp.is_some() { "=~" } else { "=" };
            format!("{}{op}{}", expr(&t.tail), pad(&token, width))
        }
        None => expr(&t.tail).to_string(),
    }
}

/// Rendered value token for a tail: the quoted literal, or the cached
/// regexp form under `--regexp`. `None` for null values.
pub fn value_token(t: &Tail, opts: &Options) -> Option<String> {
    let value = t.value.as_deref()?;
    Some(if opts.regexp.is_some() {
        let body = t
            .regex
            .clone()
            .unwrap_or_else(|| choose::regex_value(value, value.chars().count()));
        format!("regexp({})", quote_regex(&body))
    } else {
        quote_value(value)
    })
}

fn pad(token: &str, width: usize) -> String {
    let len = token.chars().count();
    if width > len {
        format!("{token}{}", " ".repeat(width - len))
    } else {
        token.to_string()
    }
}

/// Shell-quote a literal value: single quotes preferred, double quotes when
/// the value contains `'` but no `"`, single quotes with the inner `'`
/// backslash-escaped when both are present. Backslash, newline and tab are
/// always escaped.
pub fn quote_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(c),
        }
    }
    quote_body(&escaped)
}

/// Quote an already-escaped regex body. The escaper produces final script
/// text, so only the quote choice applies; a second round of backslash
/// escaping would double every escape.
pub fn quote_regex(body: &str) -> String {
    quote_body(body)
}

fn quote_body(body: &str) -> String {
    let single = body.contains('\'');
    let double = body.contains('"');
    if !single {
        format!("'{body}'")
    } else if !double {
        format!("\"{body}\"")
    } else {
        format!("'{}'", body.replace('\'', "\\'"))
    }
}
