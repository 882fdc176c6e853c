use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::mapping::{BackendId, LinkMapping, MatchRecord};
use crate::matcher::DEFAULT_MIN_SCORE;
use crate::{Error, Result};

pub const DEFAULT_SHOW_EXAMPLES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityOptions {
    pub require_href: bool,
    pub require_matched_name: bool,
    /// `None` skips the score check, as for exact-only mappings.
    pub min_score: Option<u32>,
    pub max_bad: usize,
    pub dump_path: Option<PathBuf>,
    pub show_examples: usize,
}

impl Default for QualityOptions {
    fn default() -> Self {
        Self {
            require_href: true,
            require_matched_name: true,
            min_score: Some(DEFAULT_MIN_SCORE),
            max_bad: 0,
            dump_path: None,
            show_examples: DEFAULT_SHOW_EXAMPLES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailReason {
    MissingMatchedName,
    EmptyHref,
    ScoreBelow { min_score: u32, score: u32 },
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingMatchedName => f.write_str("matched_html_name=None"),
            Self::EmptyHref => f.write_str("href=''"),
            Self::ScoreBelow { min_score, score } => {
                write!(f, "score<{min_score} (score={score})")
            }
        }
    }
}

impl Serialize for FailReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadEntry {
    pub backend_id: BackendId,
    pub ax_name: String,
    pub href: String,
    pub reasons: Vec<FailReason>,
}

impl fmt::Display for BadEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reasons = self
            .reasons
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "- backendDOMNodeId={}: {} -> {} | [{}]",
            self.backend_id, self.ax_name, self.href, reasons
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub bad: usize,
    pub total: usize,
    pub examples: Vec<BadEntry>,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mapping quality check failed: bad={}/{}",
            self.bad, self.total
        )?;
        if !self.examples.is_empty() {
            write!(f, "\nfirst {} bad examples:", self.examples.len())?;
            for example in &self.examples {
                write!(f, "\n{example}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}

/// Outcome of a passing check; `bad` may be non-zero up to `max_bad`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityReport {
    pub total: usize,
    pub bad: usize,
}

pub fn fail_reasons(record: &MatchRecord, options: &QualityOptions) -> Vec<FailReason> {
    let mut reasons = Vec::new();
    if options.require_matched_name && record.matched_html_name.is_none() {
        reasons.push(FailReason::MissingMatchedName);
    }
    if options.require_href && record.href.is_empty() {
        reasons.push(FailReason::EmptyHref);
    }
    if let Some(min_score) = options.min_score {
        if record.score < min_score {
            reasons.push(FailReason::ScoreBelow {
                min_score,
                score: record.score,
            });
        }
    }
    reasons
}

pub fn check_quality(mapping: &LinkMapping, options: &QualityOptions) -> Result<QualityReport> {
    let bad = mapping
        .iter()
        .filter_map(|(backend_id, record)| {
            let reasons = fail_reasons(record, options);
            (!reasons.is_empty()).then_some((backend_id, record, reasons))
        })
        .collect::<Vec<_>>();

    if let Some(path) = options.dump_path.as_deref() {
        if !bad.is_empty() {
            if let Err(err) = dump_bad_entries(path, &bad) {
                warn!(path = %path.display(), %err, "could not write bad mapping entries");
            }
        }
    }

    let report = QualityReport {
        total: mapping.len(),
        bad: bad.len(),
    };

    if report.bad > options.max_bad {
        let examples = bad
            .into_iter()
            .take(options.show_examples)
            .map(|(backend_id, record, reasons)| BadEntry {
                backend_id,
                ax_name: record.ax_name.clone(),
                href: record.href.clone(),
                reasons,
            })
            .collect();
        return Err(Error::Validation(ValidationFailure {
            bad: report.bad,
            total: report.total,
            examples,
        }));
    }

    info!(
        total = report.total,
        bad = report.bad,
        max_bad = options.max_bad,
        "mapping quality check passed"
    );
    Ok(report)
}

fn dump_bad_entries(path: &Path, bad: &[(BackendId, &MatchRecord, Vec<FailReason>)]) -> Result<()> {
    let mut out = Map::new();
    for (backend_id, record, reasons) in bad {
        let mut entry = match serde_json::to_value(record)? {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        entry.insert("_fails".into(), serde_json::to_value(reasons)?);
        out.insert(backend_id.to_string(), Value::Object(entry));
    }
    let text = serde_json::to_string_pretty(&Value::Object(out))?;
    fs::write(path, text).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(href: &str, score: u32) -> MatchRecord {
        MatchRecord {
            node_id: "1".into(),
            href: href.into(),
            ax_name: "Docs".into(),
            matched_html_name: Some("Docs".into()),
            score,
            anchor_position: Some(0),
        }
    }

    fn sample() -> LinkMapping {
        let mut mapping = LinkMapping::new();
        mapping.insert(1, matched("/docs", 100));
        mapping.insert(2, matched("/pricing", 60));
        mapping.insert(3, MatchRecord::unmatched("3", "Ghost"));
        mapping
    }

    #[test]
    fn reasons_follow_options() {
        let options = QualityOptions::default();
        let unmatched = MatchRecord::unmatched("3", "Ghost");
        assert_eq!(
            fail_reasons(&unmatched, &options),
            vec![
                FailReason::MissingMatchedName,
                FailReason::EmptyHref,
                FailReason::ScoreBelow { min_score: 60, score: 0 },
            ]
        );

        let relaxed = QualityOptions {
            require_href: false,
            require_matched_name: false,
            min_score: None,
            ..QualityOptions::default()
        };
        assert!(fail_reasons(&unmatched, &relaxed).is_empty());
    }

    #[test]
    fn reason_codes_render_like_dump_format() {
        assert_eq!(FailReason::MissingMatchedName.to_string(), "matched_html_name=None");
        assert_eq!(FailReason::EmptyHref.to_string(), "href=''");
        assert_eq!(
            FailReason::ScoreBelow { min_score: 60, score: 0 }.to_string(),
            "score<60 (score=0)"
        );
    }

    #[test]
    fn passes_within_tolerance() -> Result<()> {
        let options = QualityOptions {
            max_bad: 1,
            ..QualityOptions::default()
        };
        assert_eq!(check_quality(&sample(), &options)?, QualityReport { total: 3, bad: 1 });
        Ok(())
    }

    #[test]
    fn fails_with_counts_and_bounded_examples() {
        let mut mapping = sample();
        mapping.insert(4, MatchRecord::unmatched("4", "Ghost 2"));
        let options = QualityOptions {
            show_examples: 1,
            ..QualityOptions::default()
        };
        let failure = match check_quality(&mapping, &options) {
            Err(Error::Validation(failure)) => failure,
            other => panic!("expected a validation failure, got {other:?}"),
        };
        assert_eq!((failure.bad, failure.total), (2, 4));
        assert_eq!(failure.examples.len(), 1);
        assert_eq!(failure.examples[0].backend_id, 3);
        let message = failure.to_string();
        assert!(message.contains("bad=2/4"), "{message}");
        assert!(message.contains("backendDOMNodeId=3: Ghost -> "), "{message}");
    }

    #[test]
    fn score_threshold_alone_can_fail() {
        let options = QualityOptions {
            min_score: Some(100),
            ..QualityOptions::default()
        };
        let mut mapping = LinkMapping::new();
        mapping.insert(2, matched("/pricing", 60));
        let err = check_quality(&mapping, &options).unwrap_err();
        assert!(err.to_string().contains("score<100 (score=60)"), "{err}");
    }

    #[test]
    fn dumps_only_bad_entries_with_fail_codes() -> Result<()> {
        let dir = tempfile::tempdir().map_err(|source| Error::Io {
            path: PathBuf::from("tempdir"),
            source,
        })?;
        let path = dir.path().join("bad.json");
        let options = QualityOptions {
            dump_path: Some(path.clone()),
            max_bad: 5,
            ..QualityOptions::default()
        };
        check_quality(&sample(), &options)?;

        let text = fs::read_to_string(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        let dumped: Value = serde_json::from_str(&text)?;
        let object = dumped.as_object().cloned().unwrap_or_default();
        assert_eq!(object.keys().collect::<Vec<_>>(), vec!["3"]);
        assert_eq!(dumped["3"]["ax_name"], "Ghost");
        assert_eq!(dumped["3"]["score"], "0");
        assert_eq!(
            dumped["3"]["_fails"],
            serde_json::json!(["matched_html_name=None", "href=''", "score<60 (score=0)"])
        );
        Ok(())
    }

    #[test]
    fn no_dump_when_everything_passes() -> Result<()> {
        let dir = tempfile::tempdir().map_err(|source| Error::Io {
            path: PathBuf::from("tempdir"),
            source,
        })?;
        let path = dir.path().join("bad.json");
        let mut mapping = LinkMapping::new();
        mapping.insert(1, matched("/docs", 100));
        let options = QualityOptions {
            dump_path: Some(path.clone()),
            ..QualityOptions::default()
        };
        check_quality(&mapping, &options)?;
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn unwritable_dump_path_does_not_change_verdict() -> Result<()> {
        let options = QualityOptions {
            dump_path: Some(PathBuf::from("/nonexistent-dir/for/sure/bad.json")),
            max_bad: 1,
            ..QualityOptions::default()
        };
        assert_eq!(check_quality(&sample(), &options)?.bad, 1);
        Ok(())
    }
}
