//! Positional-marker scanning and path segmentation.
//!
//! An Augeas path addresses sibling records either as `label[n]` or as a
//! bare numbered child `/n`. Both forms are markers: the emitter replaces
//! them with content-based predicates, and the tail simplifier strips them
//! so that records with different ordinals still compare equal.

/// One positional marker found in a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    /// Byte offset where the head prefix ends: before `[` for the bracket
    /// form, just after the `/` for the numbered-child form.
    pub head_end: usize,
    /// Byte offset just past the marker (past `]`, or past the last digit).
    pub end: usize,
    /// The numeric position. Zero is a valid position.
    pub position: usize,
    /// True for the `/n` form, false for `[n]`.
    pub seq_form: bool,
}

/// Scan `path` from byte offset `from` for the next positional marker.
///
/// `[n]` is one or more decimal digits terminated by `]`; `/n` is one or
/// more decimal digits terminated by `/` or end of string. Anything else
/// (`[x]`, `/1a`) belongs to the label.
pub fn next_marker(path: &str, from: usize) -> Option<Marker> {
    let bytes = path.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'[' => {
                let digits_end = scan_digits(bytes, i + 1);
                if digits_end > i + 1
                    && bytes.get(digits_end) == Some(&b']')
                    && let Ok(position) = path[i + 1..digits_end].parse()
                {
                    return Some(Marker {
                        head_end: i,
                        end: digits_end + 1,
                        position,
                        seq_form: false,
                    });
                }
            }
            b'/' => {
                let digits_end = scan_digits(bytes, i + 1);
                if digits_end > i + 1
                    && (digits_end == bytes.len() || bytes[digits_end] == b'/')
                    && let Ok(position) = path[i + 1..digits_end].parse()
                {
                    return Some(Marker {
                        head_end: i + 1,
                        end: digits_end,
                        position,
                        seq_form: true,
                    });
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn scan_digits(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    i
}

/// Rewrite every embedded positional marker in `raw`: `[n]` is deleted and
/// the `n` of `/n` is replaced by the seq wildcard (`seq::*`, or `*` under
/// `--noseq`).
pub fn simplify_tail(raw: &str, seq_star: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev = 0;
    let mut from = 0;
    while let Some(m) = next_marker(raw, from) {
        out.push_str(&raw[prev..m.head_end]);
        if m.seq_form {
            out.push_str(seq_star);
        }
        prev = m.end;
        from = m.end;
    }
    out.push_str(&raw[prev..]);
    out
}

/// One link in an entry's segment chain. Positioned segments reference the
/// group that owns their sibling set; the trailing tailpiece does not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Absolute prefix ending at the label carrying the position. Segments
    /// with byte-identical heads belong to the same group.
    pub head: String,
    /// Slice of the path from the previous marker boundary, printed
    /// verbatim during emission.
    pub text: String,
    /// The numeric position, `None` for the trailing tailpiece.
    pub position: Option<usize>,
    /// True when the raw marker was the `/n` form.
    pub seq_form: bool,
    /// Remainder of the path after the marker, with embedded markers
    /// simplified away.
    pub tail: String,
    /// Index of the owning group, filled in during grouping.
    pub group: Option<usize>,
}

/// Split an absolute path at each positional marker: one segment per
/// marker, plus a trailing tailpiece with no position and an empty tail.
pub fn split_path(path: &str, seq_star: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut prev = 0;
    let mut from = 0;
    while let Some(m) = next_marker(path, from) {
        segments.push(Segment {
            head: path[..m.head_end].to_string(),
            text: path[prev..m.head_end].to_string(),
            position: Some(m.position),
            seq_form: m.seq_form,
            tail: simplify_tail(&path[m.end..], seq_star),
            group: None,
        });
        prev = m.end;
        from = m.end;
    }
    segments.push(Segment {
        head: String::new(),
        text: path[prev..].to_string(),
        position: None,
        seq_form: false,
        tail: String::new(),
        group: None,
    });
    segments
}
