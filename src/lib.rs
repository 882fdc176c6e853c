//! Recover the `href` behind every accessibility-tree link node.
//!
//! Accessibility trees expose a role, an accessible name and an opaque
//! backend id per node, but not the anchor's attributes. This crate extracts
//! the `<a>` elements of the source HTML with their computed accessible names
//! and binds each link node to one of them by name.
//!
//! ```
//! use axtree_href_mapper::{AnchorRecord, LinkNode, MatchOptions, match_links};
//!
//! let anchors = vec![
//!     AnchorRecord::new(0, "Home", "/", "/"),
//!     AnchorRecord::new(1, "Learn more about pricing", "/pricing", "/pricing"),
//! ];
//! let links = vec![LinkNode::new(10, "1", "home"), LinkNode::new(11, "2", "Pricing")];
//!
//! let mapping = match_links(&links, &anchors, &MatchOptions::default());
//! assert_eq!(mapping.get(10).map(|r| r.score), Some(100));
//! assert_eq!(mapping.get(11).map(|r| r.href.as_str()), Some("/pricing"));
//! ```

use std::path::PathBuf;

pub mod anchors;
pub mod axtree;
pub mod cli;
pub mod config;
mod html;
pub mod mapping;
pub mod matcher;
pub mod normalize;
pub mod pipeline;
pub mod quality;
pub mod source;

pub use anchors::{AnchorRecord, AnchorSummary, extract_anchors, list_anchors};
pub use axtree::{LinkNode, extract_link_nodes, parse_axtree};
pub use config::MapperConfig;
pub use mapping::{BackendId, LinkMapping, MatchRecord};
pub use matcher::{MatchOptions, MatchPolicy, MatchPolicyKind, match_links, similarity_score};
pub use normalize::normalize;
pub use pipeline::map_axtree_links_to_html_hrefs;
pub use quality::{
    BadEntry, FailReason, QualityOptions, QualityReport, ValidationFailure, check_quality,
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("html parse error: {0}")]
    HtmlParse(String),
    #[error("unsupported axtree format: {0}")]
    AxTreeShape(String),
    #[error("link node {node_id} has a non-integer backendDOMNodeId: {value}")]
    InvalidBackendId { node_id: String, value: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Validation(ValidationFailure),
}

impl Error {
    /// Process exit status for the `axmap` binary.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            _ => 1,
        }
    }
}
