//! Text assets compiled into the binary, addressed by relative path.

use thiserror::Error;

use crate::storage::{NewRssSource, TxtTocRule};

pub const APP_HELP: &str = "help/appHelp.md";
pub const UPDATE_LOG: &str = "updateLog.md";
pub const TXT_TOC_RULES: &str = "defaultData/txtTocRule.json";
pub const RSS_SOURCES: &str = "defaultData/rssSources.json";

/// Bump when the bundled file changes so upgrades re-import it.
pub const TXT_TOC_RULES_VERSION: i64 = 1;
pub const RSS_SOURCES_VERSION: i64 = 1;

const BUNDLED: [(&str, &str); 4] = [
    (APP_HELP, include_str!("../assets/help/appHelp.md")),
    (UPDATE_LOG, include_str!("../assets/updateLog.md")),
    (TXT_TOC_RULES, include_str!("../assets/defaultData/txtTocRule.json")),
    (RSS_SOURCES, include_str!("../assets/defaultData/rssSources.json")),
];

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("No bundled asset at {0}")]
    NotFound(String),

    #[error("Malformed asset {path}: {source}")]
    Malformed {
        path: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Contents of a bundled asset.
pub fn read(path: &str) -> Result<&'static str, AssetError> {
    BUNDLED
        .iter()
        .find(|(p, _)| *p == path)
        .map(|(_, text)| *text)
        .ok_or_else(|| AssetError::NotFound(path.to_string()))
}

pub fn txt_toc_rules() -> Result<Vec<TxtTocRule>, AssetError> {
    parse_json(TXT_TOC_RULES)
}

pub fn rss_sources() -> Result<Vec<NewRssSource>, AssetError> {
    parse_json(RSS_SOURCES)
}

fn parse_json<T: serde::de::DeserializeOwned>(path: &'static str) -> Result<T, AssetError> {
    serde_json::from_str(read(path)?).map_err(|source| AssetError::Malformed { path, source })
}
