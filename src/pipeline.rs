use serde_json::Value;
use tracing::info;

use crate::Result;
use crate::anchors::extract_anchors;
use crate::axtree::extract_link_nodes;
use crate::config::MapperConfig;
use crate::mapping::LinkMapping;
use crate::matcher::match_links;

/// Extracts link nodes and anchors, then matches them.
pub fn map_axtree_links_to_html_hrefs(
    axtree: &Value,
    html: &str,
    config: &MapperConfig,
) -> Result<LinkMapping> {
    let links = extract_link_nodes(axtree)?;
    let anchors = extract_anchors(html, config.base_url.as_deref())?;
    let mapping = match_links(&links, &anchors, &config.match_options());

    info!(
        links = links.len(),
        anchors = anchors.len(),
        matched = mapping.matched_count(),
        policy = ?config.policy,
        "mapped axtree links to html hrefs"
    );
    Ok(mapping)
}
