//! Binds accessibility link nodes to HTML anchors by accessible name.
//!
//! Every link node first looks for an unconsumed anchor with the same
//! normalized name anywhere in the document. Under [`MatchPolicy::Scored`]
//! a node without an exact partner then scans a bounded window of anchors
//! starting at a forward-only cursor, accepting a substring match. Each anchor
//! is bound to at most one link node.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::anchors::AnchorRecord;
use crate::axtree::LinkNode;
use crate::mapping::{LinkMapping, MatchRecord};

pub const EXACT_SCORE: u32 = 100;
pub const SUBSTRING_SCORE: u32 = 60;
pub const DEFAULT_MIN_SCORE: u32 = SUBSTRING_SCORE;
pub const DEFAULT_LOOKAHEAD: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Exact normalized-name matches only.
    ExactOnly,
    /// Exact matches first, then a windowed similarity search.
    Scored { min_score: u32, lookahead: usize },
}

impl MatchPolicy {
    pub fn kind(&self) -> MatchPolicyKind {
        match self {
            Self::ExactOnly => MatchPolicyKind::Strict,
            Self::Scored { .. } => MatchPolicyKind::Scored,
        }
    }
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self::Scored {
            min_score: DEFAULT_MIN_SCORE,
            lookahead: DEFAULT_LOOKAHEAD,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicyKind {
    Strict,
    #[default]
    Scored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    pub resolve_urls: bool,
    pub policy: MatchPolicy,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            resolve_urls: true,
            policy: MatchPolicy::default(),
        }
    }
}

impl MatchOptions {
    pub fn strict() -> Self {
        Self {
            policy: MatchPolicy::ExactOnly,
            ..Self::default()
        }
    }

    pub fn scored(min_score: u32, lookahead: usize) -> Self {
        Self {
            policy: MatchPolicy::Scored {
                min_score,
                lookahead,
            },
            ..Self::default()
        }
    }

    pub fn with_resolve_urls(mut self, resolve_urls: bool) -> Self {
        self.resolve_urls = resolve_urls;
        self
    }
}

/// 100 for equal names, 60 when one contains the other, else 0.
/// Empty names never score.
pub fn similarity_score(ax_name_norm: &str, html_name_norm: &str) -> u32 {
    if ax_name_norm.is_empty() || html_name_norm.is_empty() {
        return 0;
    }
    if ax_name_norm == html_name_norm {
        return EXACT_SCORE;
    }
    if html_name_norm.contains(ax_name_norm) || ax_name_norm.contains(html_name_norm) {
        return SUBSTRING_SCORE;
    }
    0
}

pub fn match_links(
    link_nodes: &[LinkNode],
    anchors: &[AnchorRecord],
    options: &MatchOptions,
) -> LinkMapping {
    let mut state = MatchState::new(anchors);
    let mut mapping = LinkMapping::new();

    for link in link_nodes {
        let committed = state.exact_candidate(link).or_else(|| match options.policy {
            MatchPolicy::ExactOnly => None,
            MatchPolicy::Scored {
                min_score,
                lookahead,
            } => state.window_candidate(link, lookahead, min_score),
        });

        let record = match committed {
            Some(Candidate { position, score }) => {
                state.commit(position);
                let anchor = &anchors[position];
                trace!(
                    backend_id = link.backend_id,
                    position,
                    score,
                    cursor = state.cursor,
                    "bound link node to anchor"
                );
                MatchRecord {
                    node_id: link.node_id.clone(),
                    href: anchor.href(options.resolve_urls).to_string(),
                    ax_name: link.name.clone(),
                    matched_html_name: Some(anchor.name.clone()),
                    score,
                    anchor_position: Some(position),
                }
            }
            None => {
                trace!(backend_id = link.backend_id, ax_name = %link.name, "no anchor for link node");
                MatchRecord::unmatched(link.node_id.clone(), link.name.clone())
            }
        };
        mapping.insert(link.backend_id, record);
    }

    debug!(
        links = link_nodes.len(),
        anchors = anchors.len(),
        matched = mapping.matched_count(),
        policy = ?options.policy.kind(),
        "matched link nodes to anchors"
    );
    mapping
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Candidate {
    position: usize,
    score: u32,
}

// Per-call bookkeeping; nothing here outlives one `match_links` call.
struct MatchState<'a> {
    anchors: &'a [AnchorRecord],
    by_name: HashMap<&'a str, Vec<usize>>,
    consumed: Vec<bool>,
    cursor: usize,
}

impl<'a> MatchState<'a> {
    fn new(anchors: &'a [AnchorRecord]) -> Self {
        let mut by_name: HashMap<&'a str, Vec<usize>> = HashMap::new();
        for (position, anchor) in anchors.iter().enumerate() {
            if anchor.normalized_name.is_empty() {
                continue;
            }
            by_name
                .entry(anchor.normalized_name.as_str())
                .or_default()
                .push(position);
        }
        Self {
            anchors,
            by_name,
            consumed: vec![false; anchors.len()],
            cursor: 0,
        }
    }

    fn exact_candidate(&self, link: &LinkNode) -> Option<Candidate> {
        if link.normalized_name.is_empty() {
            return None;
        }
        self.by_name
            .get(link.normalized_name.as_str())?
            .iter()
            .copied()
            .find(|position| !self.consumed[*position])
            .map(|position| Candidate {
                position,
                score: EXACT_SCORE,
            })
    }

    fn window_candidate(
        &self,
        link: &LinkNode,
        lookahead: usize,
        min_score: u32,
    ) -> Option<Candidate> {
        let end = self.anchors.len().min(self.cursor.saturating_add(lookahead));
        let mut best: Option<Candidate> = None;

        for position in self.cursor..end {
            if self.consumed[position] {
                continue;
            }
            let score = similarity_score(
                &link.normalized_name,
                &self.anchors[position].normalized_name,
            );
            if best.is_none_or(|current| score > current.score) {
                best = Some(Candidate { position, score });
                if score == EXACT_SCORE {
                    break;
                }
            }
        }

        best.filter(|candidate| candidate.score >= min_score)
    }

    fn commit(&mut self, position: usize) {
        self.consumed[position] = true;
        if position >= self.cursor {
            self.cursor = position + 1;
        }
    }
}
