use std::collections::{BTreeMap, HashSet};

use itertools::Itertools;
use refrain_corpus::{CuDraft, SegSpan, cus, segments};
use refrain_db_core::Database;
use refrain_window_index::{WindowHit, phrase_hits};
use serde::Serialize;

use crate::Error;
use crate::refine::{Anchor, RefineConfig, Refined, refine};
use crate::tokens::{TokenStream, find_anchor, word_tokens};

#[derive(Debug, Clone)]
pub struct MinerConfig {
    /// Window size `k` of the sliding index.
    pub window_size: usize,
    /// Minimum word-token count for a seed window to be considered.
    pub min_seed_tokens: usize,
    pub min_child_size: usize,
    pub max_children_per_step: usize,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            window_size: 3,
            min_seed_tokens: 10,
            min_child_size: 1,
            max_children_per_step: 4,
        }
    }
}

/// Outcome of one mining cycle.
#[derive(Debug, Clone, Serialize)]
pub struct MineSummary {
    pub cu_id: i64,
    pub phrase: String,
    /// Transcript id → occurrence segment span.
    pub members: BTreeMap<i64, SegSpan>,
    pub children_created: usize,
}

/// Scan the seed transcript left to right, find the first window recurring
/// in at least one other transcript, grow it greedily at segment
/// granularity, refine it token by token across all matched transcripts,
/// and persist the resulting CU family in one transaction.
///
/// Benign absences (seed shorter than the window, nothing recurring,
/// nothing above the token threshold) return `Ok(None)`.
pub async fn build_first_cu(
    db: &Database,
    seed_tid: i64,
    config: &MinerConfig,
) -> Result<Option<MineSummary>, Error> {
    let k = config.window_size;
    if k == 0 {
        return Err(Error::InvalidWindowSize);
    }

    let ro = db.reader().await?;

    let seed_segs = segments::ordered(&ro, seed_tid).await?;
    if seed_segs.len() < k {
        tracing::debug!(
            "seed transcript {} has {} segments, needs {}",
            seed_tid,
            seed_segs.len(),
            k
        );
        return Ok(None);
    }

    let phrase_for = |lo: usize, hi: usize| -> String {
        seed_segs[lo..=hi]
            .iter()
            .map(|s| s.text.trim())
            .join(" ")
            .trim()
            .to_string()
    };

    for i in 0..=(seed_segs.len() - k) {
        let window_phrase = phrase_for(i, i + k - 1);
        let pattern = word_tokens(&window_phrase);
        if pattern.len() < config.min_seed_tokens {
            continue;
        }

        let hits = phrase_hits(&ro, &window_phrase).await?;
        if !recurs_with_seed(&hits, seed_tid) {
            continue;
        }
        tracing::debug!(
            "window at offset {} recurs across {} hits",
            i,
            hits.len()
        );

        // greedy growth at segment granularity, right then left; each
        // step must keep the seed and at least one other transcript
        let mut lo = i;
        let mut hi = i + k - 1;
        let mut cur_hits = hits;

        while hi + 1 < seed_segs.len() {
            let cand_hits = phrase_hits(&ro, &phrase_for(lo, hi + 1)).await?;
            if recurs_with_seed(&cand_hits, seed_tid) {
                hi += 1;
                cur_hits = cand_hits;
            } else {
                break;
            }
        }
        while lo > 0 {
            let cand_hits = phrase_hits(&ro, &phrase_for(lo - 1, hi)).await?;
            if recurs_with_seed(&cand_hits, seed_tid) {
                lo -= 1;
                cur_hits = cand_hits;
            } else {
                break;
            }
        }

        // collapse matching windows to one min/max span per transcript
        let mut per_tid: BTreeMap<i64, SegSpan> = BTreeMap::new();
        for hit in &cur_hits {
            per_tid
                .entry(hit.transcript_id)
                .and_modify(|span| {
                    span.start_id = span.start_id.min(hit.seg_start_id);
                    span.end_id = span.end_id.max(hit.seg_end_id);
                })
                .or_insert(SegSpan::new(hit.seg_start_id, hit.seg_end_id));
        }

        let refined = refine_members(&ro, &per_tid, seed_tid, &pattern, config).await?;
        let (parent, children) = match refined {
            Some(r) => (
                CuDraft {
                    phrase: r.phrase,
                    spans: r.spans,
                },
                r.children
                    .into_iter()
                    .map(|c| CuDraft {
                        phrase: c.phrase,
                        spans: c.spans,
                    })
                    .collect::<Vec<_>>(),
            ),
            None => {
                tracing::warn!("token anchoring failed, keeping segment-level result");
                (
                    CuDraft {
                        phrase: word_tokens(&phrase_for(lo, hi)).join(" "),
                        spans: per_tid,
                    },
                    Vec::new(),
                )
            }
        };

        let rw = db.conn();
        let cu_id = cus::insert_family(&rw, &parent, &children).await?;
        tracing::info!(
            "persisted cu {} with {} members and {} children",
            cu_id,
            parent.spans.len(),
            children.len()
        );

        return Ok(Some(MineSummary {
            cu_id,
            phrase: parent.phrase,
            members: parent.spans,
            children_created: children.len(),
        }));
    }

    tracing::debug!("no recurring window found from seed {}", seed_tid);
    Ok(None)
}

fn recurs_with_seed(hits: &[WindowHit], seed_tid: i64) -> bool {
    let tids: HashSet<i64> = hits.iter().map(|h| h.transcript_id).collect();
    tids.len() >= 2 && tids.contains(&seed_tid)
}

/// Tokenize the full transcripts behind `per_tid`, anchor the seed pattern
/// near each span, and run the branching expansion. `None` means anchoring
/// failed somewhere and the segment-level result should stand.
async fn refine_members(
    conn: &libsql::Connection,
    per_tid: &BTreeMap<i64, SegSpan>,
    seed_tid: i64,
    pattern: &[String],
    config: &MinerConfig,
) -> Result<Option<Refined>, Error> {
    if pattern.is_empty() {
        return Ok(None);
    }

    let mut streams = BTreeMap::new();
    let mut anchors = BTreeMap::new();
    for (tid, span) in per_tid {
        let segs = segments::ordered(conn, *tid).await?;
        let stream = TokenStream::from_segments(&segs);
        match find_anchor(&stream, pattern, *span) {
            Some((lo, hi)) => {
                anchors.insert(*tid, Anchor::new(lo, hi));
            }
            None => {
                tracing::warn!("seed pattern not anchorable in transcript {}", tid);
                return Ok(None);
            }
        }
        streams.insert(*tid, stream);
    }

    let refine_config = RefineConfig {
        min_child_size: config.min_child_size,
        max_children_per_step: config.max_children_per_step,
    };
    Ok(refine(&streams, &anchors, seed_tid, &refine_config))
}
