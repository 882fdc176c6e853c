use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::matcher::{
    DEFAULT_LOOKAHEAD, DEFAULT_MIN_SCORE, MatchOptions, MatchPolicy, MatchPolicyKind,
};
use crate::source::read_lossy;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapperConfig {
    pub base_url: Option<String>,
    pub resolve_urls: bool,
    pub min_score: u32,
    pub lookahead: usize,
    pub policy: MatchPolicyKind,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            resolve_urls: true,
            min_score: DEFAULT_MIN_SCORE,
            lookahead: DEFAULT_LOOKAHEAD,
            policy: MatchPolicyKind::Scored,
        }
    }
}

impl MapperConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|err| Error::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        Self::from_json_str(&read_lossy(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_score > crate::matcher::EXACT_SCORE {
            return Err(Error::Config(format!(
                "min_score {} can never be reached (maximum is {})",
                self.min_score,
                crate::matcher::EXACT_SCORE
            )));
        }
        if let Some(base_url) = &self.base_url {
            if base_url.trim().is_empty() {
                return Err(Error::Config("base_url is empty".into()));
            }
        }
        Ok(())
    }

    pub fn match_options(&self) -> MatchOptions {
        let policy = match self.policy {
            MatchPolicyKind::Strict => MatchPolicy::ExactOnly,
            MatchPolicyKind::Scored => MatchPolicy::Scored {
                min_score: self.min_score,
                lookahead: self.lookahead,
            },
        };
        MatchOptions {
            resolve_urls: self.resolve_urls,
            policy,
        }
    }
}
