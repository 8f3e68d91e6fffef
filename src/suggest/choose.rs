//! Four-tier predicate selection.
//!
//! For each (group, position) the chooser picks a recipe by trying tiers in
//! order and stopping at the first that applies:
//!
//! 1. the first tail alone identifies the record;
//! 2. a unique-valued tail that is present under every sibling;
//! 3. a tail unique within the positions sharing this first tail;
//! 4. the first tail plus the record's ordinal within that subgroup.
//!
//! Tiers 2 and 3 guard their predicate with an `or count(...)=0` disjunct
//! until the record carrying the chosen value has been replayed; the
//! [`TierState`] machine tracks that hand-off across sibling emissions.

use std::collections::HashMap;

use crate::config::Options;

use super::emit;
use super::group::{Group, TailId, ensure_subgroup, find_first_tail};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierState {
    /// No child observations at this position; the emitter writes a
    /// wildcard.
    NoChildNodes,
    /// The first tail alone identifies the record.
    FirstTail,
    /// Unique-valued tail present everywhere; no sibling emitted yet.
    ChosenTailStart,
    /// Siblings emitted, the chosen record still pending.
    ChosenTailWip,
    /// The chosen record has been emitted; the disjunct is dropped.
    ChosenTailDone,
    /// Tier 3 counterparts of the three states above.
    ChosenTailPlusFirstTailStart,
    ChosenTailPlusFirstTailWip,
    ChosenTailPlusFirstTailDone,
    /// Unavoidable duplicate: first tail plus subgroup ordinal.
    FirstTailPlusPosition,
}

/// Outcome of the chooser for one (group, position).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub state: TierState,
    pub first: Option<TailId>,
    pub chosen: Option<TailId>,
    pub subgroup: Option<usize>,
    /// 1-based ordinal within the subgroup, tier 4 only.
    pub ordinal: usize,
    /// Field width for the chosen value token under `--pretty`; 0 disables
    /// padding.
    pub width: usize,
}

impl Default for Choice {
    fn default() -> Self {
        Self {
            state: TierState::NoChildNodes,
            first: None,
            chosen: None,
            subgroup: None,
            ordinal: 0,
            width: 0,
        }
    }
}

/// Run the chooser over every group: per-position recipes, then the
/// optional regex and padding passes.
pub fn choose_all(groups: &mut [Group], opts: &Options) {
    for group in groups.iter_mut() {
        let firsts: Vec<Option<(TailId, usize)>> = (0..=group.max_position)
            .map(|pos| find_first_tail(group, pos))
            .collect();
        let first_ids: Vec<Option<TailId>> =
            firsts.iter().map(|f| f.map(|(id, _)| id)).collect();

        let mut choices = vec![Choice::default(); group.max_position + 1];
        for pos in 0..=group.max_position {
            choices[pos] = choose_position(group, pos, &firsts, &first_ids);
        }
        group.choices = choices;

        if let Some(min_len) = opts.regexp {
            relax_group(group, min_len);
        }
        if opts.pretty {
            assign_widths(group, opts);
        }
    }
}

fn choose_position(
    group: &mut Group,
    pos: usize,
    firsts: &[Option<(TailId, usize)>],
    first_ids: &[Option<TailId>],
) -> Choice {
    let Some((first, first_idx)) = firsts.get(pos).copied().flatten() else {
        // sparse gap: no entries at this position
        return Choice::default();
    };
    let list: Vec<TailId> = group.at_position[pos].clone();

    // Tier 1: the first tail alone identifies the record. A null-valued
    // first tail only discriminates by existence, so it must occur at no
    // other position.
    {
        let t = &group.tails[first];
        let discriminates = t.value.is_some()
            || (0..=group.max_position).all(|q| q == pos || t.found_at[q] == 0);
        if t.value_found == 1 && discriminates {
            return Choice {
                state: TierState::FirstTail,
                first: Some(first),
                chosen: Some(first),
                ..Choice::default()
            };
        }
    }

    // Tier 2: a unique value at a tail present under every sibling. A
    // predicate needs a comparable value, so null-valued tails are skipped;
    // an earlier list entry with the same tail string would bind the
    // occurrence the count() guard cannot cover.
    for idx in first_idx..list.len() {
        let tid = list[idx];
        let t = &group.tails[tid];
        if t.value.is_none() || t.value_found != 1 {
            continue;
        }
        if !present_everywhere(group, tid) {
            continue;
        }
        if earlier_same_tail(group, &list, idx) {
            continue;
        }
        return Choice {
            state: TierState::ChosenTailStart,
            first: Some(first),
            chosen: Some(tid),
            ..Choice::default()
        };
    }

    // Tier 3: unique within the positions sharing this first tail.
    let sgid = ensure_subgroup(group, first, first_ids);
    let positions = group.subgroups[sgid].positions.clone();
    for idx in first_idx + 1..list.len() {
        let tid = list[idx];
        let t = &group.tails[tid];
        if t.value.is_none() {
            continue;
        }
        if !positions.iter().all(|&q| q == pos || t.value_found_at[q] == 0) {
            continue;
        }
        if !positions.iter().all(|&q| t.found_at[q] >= 1) {
            continue;
        }
        if earlier_same_tail(group, &list, idx) {
            continue;
        }
        return Choice {
            state: TierState::ChosenTailPlusFirstTailStart,
            first: Some(first),
            chosen: Some(tid),
            subgroup: Some(sgid),
            ..Choice::default()
        };
    }

    // Tier 4: fall back to the ordinal within the subgroup.
    let ordinal = positions.iter().position(|&q| q == pos).map_or(0, |i| i + 1);
    Choice {
        state: TierState::FirstTailPlusPosition,
        first: Some(first),
        chosen: Some(first),
        subgroup: Some(sgid),
        ordinal,
        ..Choice::default()
    }
}

/// The tail string is present under every sibling that exists. Positions
/// with no entries are sparse gaps: a record that does not exist cannot be
/// mis-matched by the predicate.
fn present_everywhere(group: &Group, tid: TailId) -> bool {
    (0..=group.max_position)
        .filter(|&q| !group.at_position[q].is_empty())
        .all(|q| group.tails[tid].found_at[q] >= 1)
}

/// A tail earlier in the position's list shares the candidate's tail
/// string. Such a candidate is rejected: its `count(...)=0` guard would be
/// discharged by the earlier occurrence and the predicate would go dead
/// mid-replay.
fn earlier_same_tail(group: &Group, list: &[TailId], idx: usize) -> bool {
    let tid = list[idx];
    let tail = &group.tails[tid].tail;
    list[..idx]
        .iter()
        .any(|&j| j != tid && group.tails[j].tail == *tail)
}

/// Cache an escaped regex body for every tail the choices reference.
fn relax_group(group: &mut Group, min_len: usize) {
    let ids: Vec<TailId> = group
        .choices
        .iter()
        .flat_map(|c| [c.first, c.chosen])
        .flatten()
        .collect();
    for tid in ids {
        ensure_regex(group, tid, min_len);
    }
}

fn ensure_regex(group: &mut Group, tid: TailId, min_len: usize) {
    if group.tails[tid].regex.is_some() {
        return;
    }
    let Some(value) = group.tails[tid].value.clone() else {
        return;
    };
    let tail = group.tails[tid].tail.clone();
    let mut needed = 0;
    for (id, other) in group.tails.iter().enumerate() {
        if id == tid || other.tail != tail {
            continue;
        }
        let Some(other_value) = &other.value else { continue };
        // one character past the longest shared prefix tells the two apart
        needed = needed.max(common_prefix_chars(&value, other_value) + 1);
    }
    let width = needed.max(min_len);
    group.tails[tid].regex = Some(regex_value(&value, width));
}

/// Length in characters of the common prefix of `a` and `b`. A `]` on
/// either side matches any character: the escaper rewrites `]` to the `.`
/// wildcard, so it can never contribute a distinguishing character.
fn common_prefix_chars(a: &str, b: &str) -> usize {
    a.chars()
        .zip(b.chars())
        .take_while(|&(x, y)| x == y || x == ']' || y == ']')
        .count()
}

/// Escape `value` for the parser's regex dialect, truncated to `width`
/// characters. Truncation appends `.*` and only happens when at least three
/// characters would be dropped.
pub fn regex_value(value: &str, width: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    let truncate = chars.len() > width && chars.len() - width >= 3;
    let take = if truncate { width } else { chars.len() };
    let mut out = String::with_capacity(take + 4);
    for &c in &chars[..take] {
        match c {
            '*' | '?' | '.' | '(' | ')' | '^' | '$' | '|' => {
                out.push_str("\\\\");
                out.push(c);
            }
            '\\' | ']' => out.push('.'),
            '[' => out.push_str("\\["),
            _ => out.push(c),
        }
    }
    if truncate {
        out.push_str(".*");
    }
    out
}

/// Assign `--pretty` field widths: for each distinct chosen tail string in
/// the group, every position sharing it gets the longest rendered value
/// token, capped at 30.
fn assign_widths(group: &mut Group, opts: &Options) {
    let mut max_by_tail: HashMap<String, usize> = HashMap::new();
    for choice in &group.choices {
        let Some(tid) = choice.chosen else { continue };
        if let Some(token) = emit::value_token(&group.tails[tid], opts) {
            let len = token.chars().count();
            let entry = max_by_tail.entry(group.tails[tid].tail.clone()).or_insert(0);
            *entry = (*entry).max(len);
        }
    }
    for pos in 0..=group.max_position {
        let Some(tid) = group.choices[pos].chosen else { continue };
        if let Some(&width) = max_by_tail.get(&group.tails[tid].tail) {
            group.choices[pos].width = width.min(30);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::super::group::build_groups;
    use super::super::split::split_path;
    use super::super::Entry;
    use super::*;

    fn entry(path: &str, value: Option<&str>) -> Entry {
        Entry {
            path: path.to_string(),
            value: value.map(str::to_string),
            segments: split_path(path, "seq::*"),
        }
    }

    fn chosen_groups(mut entries: Vec<Entry>, opts: &Options) -> Vec<Group> {
        let mut groups = build_groups(&mut entries);
        choose_all(&mut groups, opts);
        groups
    }

    #[test]
    fn unique_first_tail_takes_tier_one() {
        let groups = chosen_groups(
            vec![
                entry("/files/etc/x/acl[1]/setting", Some("localnet")),
                entry("/files/etc/x/acl[2]/setting", Some("SSL_ports")),
            ],
            &Options::default(),
        );
        let c = &groups[0].choices[1];
        assert_eq!(c.state, TierState::FirstTail);
        assert_eq!(c.first, c.chosen);
        assert_eq!(groups[0].tails[c.first.unwrap()].value.as_deref(), Some("localnet"));
    }

    #[test]
    fn duplicate_first_tail_falls_to_tier_two() {
        // both records share the first tail value, but each has a unique
        // name present under every sibling
        let groups = chosen_groups(
            vec![
                entry("/files/etc/x/rec[1]/kind", Some("a")),
                entry("/files/etc/x/rec[1]/name", Some("one")),
                entry("/files/etc/x/rec[2]/kind", Some("a")),
                entry("/files/etc/x/rec[2]/name", Some("two")),
            ],
            &Options::default(),
        );
        let c = &groups[0].choices[1];
        assert_eq!(c.state, TierState::ChosenTailStart);
        assert_eq!(groups[0].tails[c.chosen.unwrap()].tail, "/name");
    }

    #[test]
    fn tail_missing_at_some_position_falls_to_tier_three() {
        // port is unique but absent under rec[1], so tier 2 is rejected and
        // the subgroup of kind=b records carries the predicate
        let groups = chosen_groups(
            vec![
                entry("/files/etc/x/rec[1]/kind", Some("a")),
                entry("/files/etc/x/rec[2]/kind", Some("b")),
                entry("/files/etc/x/rec[2]/port", Some("80")),
                entry("/files/etc/x/rec[3]/kind", Some("b")),
                entry("/files/etc/x/rec[3]/port", Some("21")),
            ],
            &Options::default(),
        );
        let g = &groups[0];
        let c = &g.choices[2];
        assert_eq!(c.state, TierState::ChosenTailPlusFirstTailStart);
        assert_eq!(g.tails[c.chosen.unwrap()].tail, "/port");
        assert_eq!(g.subgroups[c.subgroup.unwrap()].positions, vec![2, 3]);
    }

    #[test]
    fn identical_records_fall_to_tier_four() {
        let groups = chosen_groups(
            vec![
                entry("/files/etc/x/opt[1]/flag", Some("on")),
                entry("/files/etc/x/opt[2]/flag", Some("on")),
            ],
            &Options::default(),
        );
        let g = &groups[0];
        assert_eq!(g.choices[1].state, TierState::FirstTailPlusPosition);
        assert_eq!(g.choices[1].ordinal, 1);
        assert_eq!(g.choices[2].ordinal, 2);
    }

    #[test]
    fn value_variant_behind_same_tail_is_rejected() {
        // rec[1] carries mode=a then mode=b; mode=b is unique but a
        // predicate on it would bind the earlier mode occurrence, so the
        // chooser must not pick it for tier 2
        let groups = chosen_groups(
            vec![
                entry("/files/etc/x/rec[1]/mode", Some("a")),
                entry("/files/etc/x/rec[1]/mode", Some("b")),
                entry("/files/etc/x/rec[2]/mode", Some("a")),
                entry("/files/etc/x/rec[2]/mode", Some("c")),
            ],
            &Options::default(),
        );
        let c = &groups[0].choices[1];
        assert_eq!(c.state, TierState::FirstTailPlusPosition);
    }

    #[test]
    fn null_valued_tails_are_skipped_by_tier_two() {
        let groups = chosen_groups(
            vec![
                entry("/files/etc/x/rec[1]/kind", Some("a")),
                entry("/files/etc/x/rec[1]/marker", None),
                entry("/files/etc/x/rec[2]/kind", Some("a")),
                entry("/files/etc/x/rec[2]/marker", Some("m")),
            ],
            &Options::default(),
        );
        // (marker, null) is unique and /marker is present everywhere, but a
        // bare existence test cannot discriminate; tier 4 remains
        let c = &groups[0].choices[1];
        assert_eq!(c.state, TierState::FirstTailPlusPosition);
    }

    #[test]
    fn regex_width_grows_past_the_shared_prefix() {
        let opts = Options { regexp: Some(4), ..Options::default() };
        let groups = chosen_groups(
            vec![
                entry("/files/etc/x/rec[1]/name", Some("webserver-alpha")),
                entry("/files/etc/x/rec[2]/name", Some("webserver-beta")),
            ],
            &opts,
        );
        let g = &groups[0];
        let chosen = g.choices[1].chosen.unwrap();
        // shared prefix "webserver-" is 10 chars; 11 are needed
        assert_eq!(g.tails[chosen].regex.as_deref(), Some("webserver-a.*"));
    }

    #[test]
    fn regex_keeps_short_values_whole() {
        let opts = Options { regexp: Some(8), ..Options::default() };
        let groups = chosen_groups(
            vec![
                entry("/files/etc/x/rec[1]/name", Some("alpha")),
                entry("/files/etc/x/rec[2]/name", Some("beta")),
            ],
            &opts,
        );
        let g = &groups[0];
        let chosen = g.choices[1].chosen.unwrap();
        assert_eq!(g.tails[chosen].regex.as_deref(), Some("alpha"));
    }

    #[test]
    fn regex_escapes_specials_and_rewrites_wildcards() {
        assert_eq!(regex_value("127.0.0.1", 20), "127\\\\.0\\\\.0\\\\.1");
        assert_eq!(regex_value("a*b?c", 20), "a\\\\*b\\\\?c");
        assert_eq!(regex_value("a[b]c\\d", 20), "a\\[b.c.d");
        assert_eq!(regex_value("x(y)|z^$", 20), "x\\\\(y\\\\)\\\\|z\\\\^\\\\$");
    }

    #[test]
    fn regex_truncation_needs_three_spare_chars() {
        // 7 chars at width 5: only 2 would be dropped, keep whole
        assert_eq!(regex_value("abcdefg", 5), "abcdefg");
        // 8 chars at width 5: truncate and wildcard the rest
        assert_eq!(regex_value("abcdefgh", 5), "abcde.*");
    }

    #[test]
    fn bracket_matches_anything_in_prefix_comparison() {
        assert_eq!(common_prefix_chars("a]c", "abc"), 3);
        assert_eq!(common_prefix_chars("a]cX", "abcY"), 3);
        assert_eq!(common_prefix_chars("abc", "abd"), 2);
    }

    #[test]
    fn pretty_widths_cover_the_longest_token_per_tail() {
        let opts = Options { pretty: true, ..Options::default() };
        let groups = chosen_groups(
            vec![
                entry("/files/etc/x/opt[1]/name", Some("a")),
                entry("/files/etc/x/opt[2]/name", Some("bbbb")),
            ],
            &opts,
        );
        // 'bbbb' renders as six chars; both positions share the width
        assert_eq!(groups[0].choices[1].width, 6);
        assert_eq!(groups[0].choices[2].width, 6);
    }

    #[test]
    fn pretty_width_is_capped() {
        let opts = Options { pretty: true, ..Options::default() };
        let long = "x".repeat(60);
        let groups = chosen_groups(
            vec![
                entry("/files/etc/x/opt[1]/name", Some(long.as_str())),
                entry("/files/etc/x/opt[2]/name", Some("y")),
            ],
            &opts,
        );
        assert_eq!(groups[0].choices[1].width, 30);
    }
}
