//! JSON view of the chooser's decisions, for inspecting why a predicate
//! was picked for a given sibling set.

use serde::Serialize;

use crate::aug::TreeEntry;
use crate::config::Options;
use crate::suggest;
use crate::suggest::choose::TierState;
use crate::suggest::group::Group;

#[derive(Debug, Serialize)]
pub struct GroupReport {
    pub head: String,
    pub max_position: usize,
    pub positions: Vec<PositionReport>,
}

#[derive(Debug, Serialize)]
pub struct PositionReport {
    pub position: usize,
    pub strategy: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<TailReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chosen: Option<TailReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordinal: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TailReport {
    pub tail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Run the chooser over `pairs` and summarise every group's per-position
/// decision.
pub fn analyze_pairs(pairs: &[TreeEntry], opts: &Options) -> Vec<GroupReport> {
    let mut entries = suggest::build_entries(pairs, opts);
    let mut groups = suggest::group::build_groups(&mut entries);
    suggest::choose::choose_all(&mut groups, opts);
    groups.iter().map(group_report).collect()
}

fn group_report(group: &Group) -> GroupReport {
    let positions = (0..=group.max_position)
        .filter(|&pos| !group.at_position[pos].is_empty())
        .map(|pos| {
            let choice = &group.choices[pos];
            PositionReport {
                position: pos,
                strategy: strategy_name(choice.state),
                first: choice.first.map(|id| tail_report(group, id)),
                chosen: choice.chosen.map(|id| tail_report(group, id)),
                ordinal: (choice.ordinal > 0).then_some(choice.ordinal),
            }
        })
        .collect();
    GroupReport {
        head: group.head.clone(),
        max_position: group.max_position,
        positions,
    }
}

fn tail_report(group: &Group, id: usize) -> TailReport {
    TailReport {
        tail: group.tails[id].tail.clone(),
        value: group.tails[id].value.clone(),
    }
}

fn strategy_name(state: TierState) -> &'static str {
    match state {
        TierState::NoChildNodes => "no-child-nodes",
        TierState::FirstTail => "first-tail",
        TierState::ChosenTailStart | TierState::ChosenTailWip | TierState::ChosenTailDone => {
            "unique-tail"
        }
        TierState::ChosenTailPlusFirstTailStart
        | TierState::ChosenTailPlusFirstTailWip
        | TierState::ChosenTailPlusFirstTailDone => "first-tail-and-unique-tail",
        TierState::FirstTailPlusPosition => "first-tail-and-ordinal",
    }
}

/// Print a report as pretty JSON, logging serialization errors to stderr.
pub fn print_json(value: &(impl Serialize + ?Sized)) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("[augscript] JSON serialization error: {e}"),
    }
}
