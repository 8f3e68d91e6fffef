//! The predicate chooser and emitter pipeline.
//!
//! Stages run strictly in order over the parser's flat (path, value) list:
//! segmentation ([`split`]), grouping ([`group`]), disambiguation
//! ([`choose`]) and emission ([`emit`]). Everything is built once at ingest
//! and only the chooser's per-position state changes during emission.

pub mod choose;
pub mod emit;
pub mod group;
pub mod split;

use crate::aug::TreeEntry;
use crate::config::Options;

/// One parser result with its segment chain.
#[derive(Debug, Clone)]
pub struct Entry {
    pub path: String,
    pub value: Option<String>,
    pub segments: Vec<split::Segment>,
}

/// Build one entry per (path, value) pair, splitting each path at its
/// positional markers.
pub fn build_entries(pairs: &[TreeEntry], opts: &Options) -> Vec<Entry> {
    pairs
        .iter()
        .map(|p| Entry {
            path: p.path.clone(),
            value: p.value.clone(),
            segments: split::split_path(&p.path, opts.seq_star()),
        })
        .collect()
}

/// Run the full pipeline and return the rendered set-script.
pub fn render_script(pairs: &[TreeEntry], opts: &Options) -> String {
    let mut entries = build_entries(pairs, opts);
    let mut groups = group::build_groups(&mut entries);
    choose::choose_all(&mut groups, opts);
    emit::render(&entries, &mut groups, opts)
}
