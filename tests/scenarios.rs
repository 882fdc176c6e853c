use axtree_href_mapper::{
    AnchorRecord, Error, LinkMapping, LinkNode, MatchOptions, MatchRecord, QualityOptions,
    check_quality, match_links,
};

fn anchor(position: usize, name: &str, href: &str) -> AnchorRecord {
    AnchorRecord::new(position, name, href, href)
}

fn link(backend_id: i64, name: &str) -> LinkNode {
    LinkNode::new(backend_id, format!("ax-{backend_id}"), name)
}

fn href_and_score(mapping: &LinkMapping, backend_id: i64) -> Option<(&str, u32)> {
    mapping
        .get(backend_id)
        .map(|record| (record.href.as_str(), record.score))
}

#[test]
fn case_and_whitespace_insensitive_exact_matches() {
    let anchors = vec![anchor(0, "Home", "/"), anchor(1, "About Us", "/about")];
    let links = vec![link(1, "home"), link(2, "About us")];

    for options in [MatchOptions::default(), MatchOptions::strict()] {
        let mapping = match_links(&links, &anchors, &options);
        assert_eq!(href_and_score(&mapping, 1), Some(("/", 100)));
        assert_eq!(href_and_score(&mapping, 2), Some(("/about", 100)));
    }
}

#[test]
fn substring_fallback_scores_sixty() {
    let anchors = vec![anchor(0, "Learn more about pricing", "/pricing")];
    let links = vec![link(1, "pricing")];

    let mapping = match_links(&links, &anchors, &MatchOptions::scored(60, 1));
    assert_eq!(href_and_score(&mapping, 1), Some(("/pricing", 60)));
    assert_eq!(
        mapping.get(1).and_then(|r| r.matched_html_name.as_deref()),
        Some("Learn more about pricing")
    );
}

#[test]
fn empty_names_never_match() {
    let anchors = vec![anchor(0, "", "/icon1")];
    let links = vec![link(1, "")];

    for options in [
        MatchOptions::default(),
        MatchOptions::strict(),
        MatchOptions::scored(1, 10),
    ] {
        let mapping = match_links(&links, &anchors, &options);
        assert_eq!(
            mapping.get(1),
            Some(&MatchRecord::unmatched("ax-1", "")),
            "{options:?}"
        );
    }
}

#[test]
fn duplicate_names_consume_anchors_in_document_order() {
    let anchors = vec![anchor(0, "Download", "/d1"), anchor(1, "Download", "/d2")];
    let links = vec![link(1, "Download"), link(2, "Download")];

    let mapping = match_links(&links, &anchors, &MatchOptions::default());
    assert_eq!(href_and_score(&mapping, 1), Some(("/d1", 100)));
    assert_eq!(href_and_score(&mapping, 2), Some(("/d2", 100)));
}

#[test]
fn quality_gate_reports_empty_href() {
    let mut mapping = LinkMapping::new();
    mapping.insert(
        1,
        MatchRecord {
            node_id: "a".into(),
            href: "/ok".into(),
            ax_name: "Ok".into(),
            matched_html_name: Some("Ok".into()),
            score: 100,
            anchor_position: Some(0),
        },
    );
    mapping.insert(
        2,
        MatchRecord {
            node_id: "b".into(),
            href: String::new(),
            ax_name: "Fragment".into(),
            matched_html_name: Some("Fragment".into()),
            score: 100,
            anchor_position: Some(1),
        },
    );

    let options = QualityOptions {
        require_href: true,
        require_matched_name: false,
        min_score: None,
        max_bad: 0,
        ..QualityOptions::default()
    };
    let failure = match check_quality(&mapping, &options) {
        Err(Error::Validation(failure)) => failure,
        other => panic!("expected validation failure, got {other:?}"),
    };
    assert_eq!(failure.bad, 1);
    assert_eq!(failure.total, 2);
    assert_eq!(failure.examples.len(), 1);
    assert_eq!(failure.examples[0].backend_id, 2);
    assert_eq!(failure.examples[0].ax_name, "Fragment");
    assert_eq!(failure.examples[0].reasons.len(), 1);
    assert!(failure.to_string().contains("bad=1/2"));
}

#[test]
fn exact_match_outside_window_beats_fallback_inside_it() {
    let anchors = vec![
        anchor(0, "Support center", "/support-center"),
        anchor(1, "Blog", "/blog"),
        anchor(2, "Careers", "/careers"),
        anchor(3, "Support", "/support"),
    ];
    let links = vec![link(1, "support")];

    let mapping = match_links(&links, &anchors, &MatchOptions::scored(60, 1));
    assert_eq!(href_and_score(&mapping, 1), Some(("/support", 100)));
}

#[test]
fn repeated_calls_share_no_state() {
    let anchors = vec![anchor(0, "Home", "/")];
    let links = vec![link(1, "Home")];
    let options = MatchOptions::default();

    let first = match_links(&links, &anchors, &options);
    let second = match_links(&links, &anchors, &options);
    assert_eq!(first, second);
    assert_eq!(href_and_score(&second, 1), Some(("/", 100)));
}
