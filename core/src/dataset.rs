//! Dataset scope and resolution.
//!
//! RULE: A single-state scope always resolves to that state's dataset.
//! An unknown state is an error, never a quiet switch to the national file.

use crate::{
    error::{AnalysisError, AnalysisResult},
    types::StateCode,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_STATE_URI_TEMPLATE: &str =
    "hf://policyengine/policyengine-us-data/states/{state}.h5";
pub const DEFAULT_NATIONAL_URI: &str =
    "hf://policyengine/policyengine-us-data/enhanced_cps_2024.h5";

/// FIPS codes for the 50 states and DC.
const STATE_FIPS: &[(&str, u32)] = &[
    ("AL", 1),  ("AK", 2),  ("AZ", 4),  ("AR", 5),  ("CA", 6),
    ("CO", 8),  ("CT", 9),  ("DE", 10), ("DC", 11), ("FL", 12),
    ("GA", 13), ("HI", 15), ("ID", 16), ("IL", 17), ("IN", 18),
    ("IA", 19), ("KS", 20), ("KY", 21), ("LA", 22), ("ME", 23),
    ("MD", 24), ("MA", 25), ("MI", 26), ("MN", 27), ("MS", 28),
    ("MO", 29), ("MT", 30), ("NE", 31), ("NV", 32), ("NH", 33),
    ("NJ", 34), ("NM", 35), ("NY", 36), ("NC", 37), ("ND", 38),
    ("OH", 39), ("OK", 40), ("OR", 41), ("PA", 42), ("RI", 44),
    ("SC", 45), ("SD", 46), ("TN", 47), ("TX", 48), ("UT", 49),
    ("VT", 50), ("VA", 51), ("WA", 53), ("WV", 54), ("WI", 55),
    ("WY", 56),
];

/// Look up the FIPS code for a postal state code (case-insensitive).
pub fn state_fips(code: &str) -> Option<u32> {
    let code = code.trim().to_ascii_uppercase();
    STATE_FIPS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, fips)| *fips)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum DatasetScope {
    State { code: StateCode },
    National,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub scope:              DatasetScope,
    /// Must contain `{state}`, replaced by the upper-case state code.
    pub state_uri_template: String,
    pub national_uri:       String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            scope:              DatasetScope::State { code: "SC".into() },
            state_uri_template: DEFAULT_STATE_URI_TEMPLATE.into(),
            national_uri:       DEFAULT_NATIONAL_URI.into(),
        }
    }
}

/// A dataset the engine can load, plus the state filter to apply to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDataset {
    pub uri:        String,
    pub state:      Option<StateCode>,
    pub state_fips: Option<u32>,
}

impl DatasetConfig {
    pub fn resolve(&self) -> AnalysisResult<ResolvedDataset> {
        match &self.scope {
            DatasetScope::State { code } => {
                let code = code.trim().to_ascii_uppercase();
                let fips = state_fips(&code)
                    .ok_or_else(|| AnalysisError::UnknownDataset(format!("state '{code}'")))?;
                if !self.state_uri_template.contains("{state}") {
                    return Err(AnalysisError::Config(format!(
                        "state_uri_template '{}' has no {{state}} placeholder",
                        self.state_uri_template
                    )));
                }
                Ok(ResolvedDataset {
                    uri:        self.state_uri_template.replace("{state}", &code),
                    state:      Some(code),
                    state_fips: Some(fips),
                })
            }
            DatasetScope::National => {
                if self.national_uri.trim().is_empty() {
                    return Err(AnalysisError::UnknownDataset("national dataset URI is empty".into()));
                }
                Ok(ResolvedDataset {
                    uri:        self.national_uri.clone(),
                    state:      None,
                    state_fips: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fips_lookup_ignores_case_and_whitespace() {
        assert_eq!(state_fips("SC"), Some(45));
        assert_eq!(state_fips(" sc "), Some(45));
        assert_eq!(state_fips("DC"), Some(11));
        assert_eq!(state_fips("PR"), None);
    }
}
