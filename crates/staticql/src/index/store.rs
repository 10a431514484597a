//! Streaming reads over a prefix-sharded index directory.
//!
//! Each directory holds at most one line at its own level (a value whose
//! natural length equals that level's depth) plus a `_prefixes.jsonl`
//! pointing at child shards; a leaf shard (depth reached) holds every value
//! sharing that depth-prefix, pre-sorted ascending. Walking own-line-then-
//! children in ascending child order therefore yields the whole subtree in
//! ascending `v` order "for free", without a final sort.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{QueryEngineError, Result};
use crate::index::line::PrefixIndexLine;
use crate::index::shard::{self, INDEX_FILE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOp {
    Eq,
    StartsWith,
}

pub fn read_shard_lines(dir: &Path) -> Result<Vec<PrefixIndexLine>> {
    let path = dir.join(INDEX_FILE);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = fs::File::open(&path)?;
    let reader = BufReader::new(file);
    let mut out = Vec::new();
    let mut offset = 0usize;
    for line in reader.lines() {
        let line = line?;
        let len = line.len() + 1;
        if !line.trim().is_empty() {
            out.push(PrefixIndexLine::decode_line(&line, &path, offset)?);
        }
        offset += len;
    }
    Ok(out)
}

/// One pending unit of work for [`ShardIter`]: either a directory not yet
/// visited, or the remaining lines of a directory already read.
enum Frame {
    Dir(PathBuf),
    Lines(std::vec::IntoIter<PrefixIndexLine>),
}

/// Lazily walks a shard subtree in ascending (or descending) `v` order, one
/// directory at a time. Only the directory currently being visited is ever
/// read into memory - the stack holds unexpanded child paths, not their
/// content - so memory use stays O(depth x fanout) plus one `_index.jsonl`
/// regardless of how much of the iterator a caller actually consumes.
struct ShardIter {
    descending: bool,
    stack: Vec<Frame>,
}

impl ShardIter {
    fn new(root: &Path, descending: bool) -> Self {
        ShardIter {
            descending,
            stack: vec![Frame::Dir(root.to_path_buf())],
        }
    }
}

impl Iterator for ShardIter {
    type Item = Result<PrefixIndexLine>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.stack.pop()? {
                Frame::Lines(mut lines) => {
                    if let Some(line) = lines.next() {
                        self.stack.push(Frame::Lines(lines));
                        return Some(Ok(line));
                    }
                }
                Frame::Dir(dir) => match expand(&dir, self.descending) {
                    Ok(frames) => self.stack.extend(frames.into_iter().rev()),
                    Err(err) => return Some(Err(err)),
                },
            }
        }
    }
}

/// Splits one directory into its own-line frame and child-directory frames,
/// in the order they should be visited (own-first for ascending, own-last
/// for descending - see module docs).
fn expand(dir: &Path, descending: bool) -> Result<Vec<Frame>> {
    let own = read_shard_lines(dir)?;
    let mut prefixes = shard::read_prefixes(dir)?;
    prefixes.sort();
    if descending {
        prefixes.reverse();
    }

    let mut child_frames = Vec::with_capacity(prefixes.len());
    for segment in &prefixes {
        let child_dir = dir.join(segment);
        if !child_dir.join(INDEX_FILE).exists() && shard::read_prefixes(&child_dir)?.is_empty() {
            return Err(QueryEngineError::InconsistentIndex {
                path: child_dir,
                message: "prefix listed in manifest has no content".to_string(),
            });
        }
        child_frames.push(Frame::Dir(child_dir));
    }

    let own_frame = (!own.is_empty()).then(|| Frame::Lines(own.into_iter()));
    let mut frames = Vec::with_capacity(child_frames.len() + 1);
    if descending {
        frames.extend(child_frames);
        frames.extend(own_frame);
    } else {
        frames.extend(own_frame);
        frames.extend(child_frames);
    }
    Ok(frames)
}

/// Collects an entire shard subtree, in ascending (or descending) `v` order.
///
/// A thin `.collect()` over [`ShardIter`], for callers that genuinely need
/// the whole subtree at once (a bounded-prefix `startsWith` lookup, or a
/// relation's full slug roster) rather than a bounded page of it.
pub fn collect_subtree(dir: &Path, descending: bool) -> Result<Vec<PrefixIndexLine>> {
    ShardIter::new(dir, descending).collect()
}

/// Finds lines matching `value` under `op` inside the index directory for a
/// single (source, field), rooted at `index_root` with shard `depth`.
pub fn find_index_lines(
    index_root: &Path,
    depth: usize,
    value: &str,
    op: MatchOp,
) -> Result<Vec<PrefixIndexLine>> {
    let dir = shard::shard_dir(index_root, value, depth);
    match op {
        MatchOp::Eq => {
            let lines = read_shard_lines(&dir)?;
            Ok(lines.into_iter().filter(|l| l.v == value).collect())
        }
        MatchOp::StartsWith => {
            if value.chars().count() >= depth {
                let lines = read_shard_lines(&dir)?;
                Ok(lines.into_iter().filter(|l| l.v.starts_with(value)).collect())
            } else {
                let lines = collect_subtree(&dir, false)?;
                Ok(lines.into_iter().filter(|l| l.v.starts_with(value)).collect())
            }
        }
    }
}

/// Reads up to `limit` lines forward from the start of the index (or after
/// a previously-seen line identified by `(slug, order_value)`), in `v` order
/// under the field named `order_field`. Pulls from the shard tree one
/// directory at a time and stops as soon as `limit` lines are collected -
/// a caller reading a bounded page never materializes the rest of the index.
pub fn read_forward(
    index_root: &Path,
    order_field: &str,
    limit: usize,
    skip_until: Option<(&str, &str)>,
    descending: bool,
) -> Result<Vec<PrefixIndexLine>> {
    let mut iter = ShardIter::new(index_root, descending);
    if let Some((slug, order_value)) = skip_until {
        advance_past(&mut iter, order_field, slug, order_value)?;
    }

    let mut out = Vec::new();
    for line in iter {
        if out.len() >= limit {
            break;
        }
        out.push(line?);
    }
    Ok(out)
}

/// Symmetric to [`read_forward`]: yields the `limit` lines immediately
/// preceding `skip_until`, in the same order `read_forward` would (caller
/// reverses for presentation). Implemented by walking the tree in the
/// opposite direction from the anchor - the lines immediately before a
/// point in ascending order are the lines immediately after it in
/// descending order - so this stays just as pull-based as `read_forward`.
/// Without an anchor there is no forward point to walk back from; "the last
/// `limit` lines" needs the total count, so that case is an intentional
/// full scan (the same tradeoff the no-cursor backward regime documents
/// elsewhere).
pub fn read_backward(
    index_root: &Path,
    order_field: &str,
    limit: usize,
    skip_until: Option<(&str, &str)>,
    descending: bool,
) -> Result<Vec<PrefixIndexLine>> {
    let Some((slug, order_value)) = skip_until else {
        let all = collect_subtree(index_root, descending)?;
        let start = all.len().saturating_sub(limit);
        return Ok(all[start..].to_vec());
    };

    let mut iter = ShardIter::new(index_root, !descending);
    advance_past(&mut iter, order_field, slug, order_value)?;

    let mut out = Vec::new();
    for line in iter {
        if out.len() >= limit {
            break;
        }
        out.push(line?);
    }
    out.reverse();
    Ok(out)
}

/// Pulls lines off `iter` until the one matching `(slug, order_value)` under
/// `order_field` has been consumed, leaving the iterator positioned right
/// after it. Errors if the iterator runs dry first.
fn advance_past(iter: &mut ShardIter, order_field: &str, slug: &str, order_value: &str) -> Result<()> {
    for line in iter {
        let line = line?;
        if line_matches(&line, order_field, slug, order_value) {
            return Ok(());
        }
    }
    Err(QueryEngineError::InvalidCursor(format!("slug {slug} not found in index")))
}

fn line_matches(line: &PrefixIndexLine, order_field: &str, slug: &str, order_value: &str) -> bool {
    line.refs.get(slug).is_some_and(|fields| {
        fields
            .get(order_field)
            .is_some_and(|values| values.iter().any(|v| v == order_value))
    })
}

pub fn index_file_exists(index_root: &Path) -> bool {
    index_root.exists()
}
