//! Branching token-level refinement.
//!
//! Works purely on in-memory token streams: anchors `[lo, hi]` per
//! transcript mark the currently agreed phrase. The expansion runs RIGHT
//! then LEFT; at each step the still-active transcripts are grouped by the
//! token they propose next, the group carrying the seed advances, and the
//! rest are frozen at their last-agreed bounds, staying in the parent
//! result with those bounds. Divergence points produce child candidates:
//! the phrase everyone agreed on up to that step, over every transcript
//! still active.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use refrain_corpus::SegSpan;

use crate::tokens::TokenStream;

/// Inclusive token indices of the agreed phrase within one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub lo: usize,
    pub hi: usize,
}

impl Anchor {
    pub fn new(lo: usize, hi: usize) -> Self {
        Self { lo, hi }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Right,
    Left,
}

#[derive(Debug, Clone)]
pub struct RefineConfig {
    /// Smallest diverging group that still triggers a child candidate.
    pub min_child_size: usize,
    /// Cap on child candidates recorded at any single step.
    pub max_children_per_step: usize,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            min_child_size: 1,
            max_children_per_step: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChildCandidate {
    pub spans: BTreeMap<i64, SegSpan>,
    pub phrase: String,
}

#[derive(Debug, Clone)]
pub struct Refined {
    pub spans: BTreeMap<i64, SegSpan>,
    pub phrase: String,
    pub children: Vec<ChildCandidate>,
}

/// The most recent state in which at least two transcripts still agreed.
struct Snapshot {
    active: BTreeSet<i64>,
    anchors: BTreeMap<i64, Anchor>,
}

/// Expand the anchored phrase across all streams.
///
/// Guarantees:
/// - the parent never advances with fewer than two active transcripts;
/// - if the survivors drop below two, the result falls back to the last
///   state where at least two agreed;
/// - transcripts frozen along the way (diverging or exhausted) stay in the
///   parent spans with their last-agreed bounds;
/// - every child candidate spans at least two transcripts (the parent
///   group plus the group that diverged).
///
/// Returns `None` when the seed transcript is missing from the inputs; the
/// caller then keeps its segment-level result.
pub fn refine(
    streams: &BTreeMap<i64, TokenStream>,
    initial: &BTreeMap<i64, Anchor>,
    seed_tid: i64,
    config: &RefineConfig,
) -> Option<Refined> {
    if !initial.contains_key(&seed_tid) || !streams.contains_key(&seed_tid) {
        return None;
    }

    let mut anchors = initial.clone();
    let mut active: BTreeSet<i64> = anchors.keys().copied().collect();
    let mut frozen: BTreeMap<i64, Anchor> = BTreeMap::new();
    let mut children: Vec<ChildCandidate> = Vec::new();
    let mut snapshot = Snapshot {
        active: active.clone(),
        anchors: anchors.clone(),
    };

    for direction in [Direction::Right, Direction::Left] {
        expand(
            direction,
            streams,
            seed_tid,
            config,
            &mut active,
            &mut anchors,
            &mut frozen,
            &mut children,
            &mut snapshot,
        );
    }

    if active.len() < 2 {
        tracing::debug!(
            "survivors collapsed to {}, restoring last {}-member snapshot",
            active.len(),
            snapshot.active.len()
        );
        active = snapshot.active.clone();
        for (tid, anchor) in &snapshot.anchors {
            anchors.insert(*tid, *anchor);
        }
        for tid in anchors.keys() {
            if !active.contains(tid) {
                frozen.entry(*tid).or_insert(anchors[tid]);
            }
        }
    }

    if active.len() >= 2 {
        tighten(streams, &active, &mut anchors);
    }

    if !active.contains(&seed_tid) {
        return None;
    }

    let seed_anchor = anchors[&seed_tid];
    let phrase = streams[&seed_tid].phrase(seed_anchor.lo, seed_anchor.hi);

    let mut spans = BTreeMap::new();
    for tid in &active {
        let anchor = anchors[tid];
        spans.insert(*tid, streams[tid].seg_span(anchor.lo, anchor.hi));
    }
    // frozen outliers keep their last-agreed range; survivors win on overlap
    for (tid, anchor) in &frozen {
        if !spans.contains_key(tid) {
            spans.insert(*tid, streams[tid].seg_span(anchor.lo, anchor.hi));
        }
    }

    let mut seen: HashSet<(Vec<(i64, i64, i64)>, String)> = HashSet::new();
    seen.insert((fingerprint(&spans), phrase.clone()));
    let mut deduped = Vec::new();
    for child in children {
        let key = (fingerprint(&child.spans), child.phrase.clone());
        if !child.spans.is_empty() && seen.insert(key) {
            deduped.push(child);
        }
    }

    Some(Refined {
        spans,
        phrase,
        children: deduped,
    })
}

fn fingerprint(spans: &BTreeMap<i64, SegSpan>) -> Vec<(i64, i64, i64)> {
    spans
        .iter()
        .map(|(tid, span)| (*tid, span.start_id, span.end_id))
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn expand(
    direction: Direction,
    streams: &BTreeMap<i64, TokenStream>,
    seed_tid: i64,
    config: &RefineConfig,
    active: &mut BTreeSet<i64>,
    anchors: &mut BTreeMap<i64, Anchor>,
    frozen: &mut BTreeMap<i64, Anchor>,
    children: &mut Vec<ChildCandidate>,
    snapshot: &mut Snapshot,
) {
    loop {
        if active.len() >= 2 {
            snapshot.active = active.clone();
            snapshot.anchors = active.iter().map(|tid| (*tid, anchors[tid])).collect();
        }

        let mut groups: BTreeMap<&str, BTreeSet<i64>> = BTreeMap::new();
        let mut exhausted: BTreeSet<i64> = BTreeSet::new();
        let mut seed_exhausted = false;

        for tid in active.iter() {
            let stream = &streams[tid];
            let anchor = anchors[tid];
            let next_idx = match direction {
                Direction::Right => {
                    let idx = anchor.hi + 1;
                    (idx < stream.len()).then_some(idx)
                }
                Direction::Left => anchor.lo.checked_sub(1),
            };
            match next_idx {
                Some(idx) => {
                    groups
                        .entry(stream.tokens[idx].as_str())
                        .or_default()
                        .insert(*tid);
                }
                None if *tid == seed_tid => seed_exhausted = true,
                None => {
                    exhausted.insert(*tid);
                }
            }
        }

        if seed_exhausted {
            tracing::debug!("seed exhausted going {:?}", direction);
            break;
        }

        if !exhausted.is_empty() {
            for tid in &exhausted {
                frozen.entry(*tid).or_insert(anchors[tid]);
                active.remove(tid);
            }
            tracing::debug!("froze {} exhausted transcripts", exhausted.len());
            if active.len() < 2 {
                return;
            }
        }

        if groups.is_empty() {
            break;
        }

        let parent: BTreeSet<i64> = match groups.values().find(|g| g.contains(&seed_tid)) {
            Some(group) => group.clone(),
            // the seed is always present by construction; largest group
            // is a defensive fallback only
            None => match groups.values().max_by_key(|g| g.len()) {
                Some(group) => group.clone(),
                None => break,
            },
        };

        let mut spawned = 0usize;
        let mut dropped: BTreeSet<i64> = BTreeSet::new();
        for group in groups.values() {
            if *group == parent {
                continue;
            }
            if group.len() >= config.min_child_size && spawned < config.max_children_per_step {
                children.push(child_snapshot(streams, anchors, active, seed_tid));
                spawned += 1;
            }
            dropped.extend(group.iter().copied());
        }
        if !dropped.is_empty() {
            tracing::debug!("froze {} diverging transcripts", dropped.len());
            for tid in &dropped {
                frozen.entry(*tid).or_insert(anchors[tid]);
                active.remove(tid);
            }
        }

        if active.len() < 2 {
            // about to become single-member: stop without advancing
            return;
        }

        for tid in &parent {
            if let Some(anchor) = anchors.get_mut(tid) {
                match direction {
                    Direction::Right => anchor.hi += 1,
                    Direction::Left => anchor.lo -= 1,
                }
            }
        }
    }
}

/// Snapshot of the phrase everyone currently active agrees on, over every
/// active transcript. Taken before any freeze of the step applies.
fn child_snapshot(
    streams: &BTreeMap<i64, TokenStream>,
    anchors: &BTreeMap<i64, Anchor>,
    active: &BTreeSet<i64>,
    seed_tid: i64,
) -> ChildCandidate {
    let rep = if active.contains(&seed_tid) {
        seed_tid
    } else {
        active.iter().next().copied().unwrap_or(seed_tid)
    };
    let anchor = anchors[&rep];
    let phrase = streams[&rep].phrase(anchor.lo, anchor.hi);

    let mut spans = BTreeMap::new();
    for tid in active {
        let a = anchors[tid];
        spans.insert(*tid, streams[tid].seg_span(a.lo, a.hi));
    }

    ChildCandidate { spans, phrase }
}

/// One more symmetric grow-while-all-equal pass over the survivors.
fn tighten(
    streams: &BTreeMap<i64, TokenStream>,
    active: &BTreeSet<i64>,
    anchors: &mut BTreeMap<i64, Anchor>,
) {
    loop {
        let mut proposal: Option<&str> = None;
        let mut grow = true;
        for tid in active {
            let stream = &streams[tid];
            let idx = anchors[tid].hi + 1;
            if idx >= stream.len() {
                grow = false;
                break;
            }
            match proposal {
                None => proposal = Some(stream.tokens[idx].as_str()),
                Some(p) if p == stream.tokens[idx] => {}
                _ => {
                    grow = false;
                    break;
                }
            }
        }
        if !grow || proposal.is_none() {
            break;
        }
        for tid in active {
            if let Some(anchor) = anchors.get_mut(tid) {
                anchor.hi += 1;
            }
        }
    }

    loop {
        let mut proposal: Option<&str> = None;
        let mut grow = true;
        for tid in active {
            let stream = &streams[tid];
            let Some(idx) = anchors[tid].lo.checked_sub(1) else {
                grow = false;
                break;
            };
            match proposal {
                None => proposal = Some(stream.tokens[idx].as_str()),
                Some(p) if p == stream.tokens[idx] => {}
                _ => {
                    grow = false;
                    break;
                }
            }
        }
        if !grow || proposal.is_none() {
            break;
        }
        for tid in active {
            if let Some(anchor) = anchors.get_mut(tid) {
                anchor.lo -= 1;
            }
        }
    }
}
