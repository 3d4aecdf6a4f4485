//! Classification and parsing of policy engine output.
//!
//! The engine logs are human-readable; the name of the matched policy and
//! the resource type are extracted by pattern, while the resource payload
//! itself comes from the engine's structured resources file.

use regex::Regex;
use std::sync::LazyLock;
use sweep_core::{Error, Result};

static POLICY_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"policy:.*?policy:(.*?)\sresource:").expect("valid regex"));

static RESOURCE_TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"resource:(.*?)\s").expect("valid regex"));

/// Names extracted from a successful engine log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOutput {
    pub policy_name: String,
    pub resource_type: String,
}

/// An invocation failed iff its captured output contains "ERROR",
/// case-insensitively.
pub fn is_error(output: &str) -> bool {
    output.to_lowercase().contains("error")
}

/// Extract the matched policy name and resource type from the engine log.
pub fn parse(output: &str) -> Result<ParsedOutput> {
    let policy_name = POLICY_NAME_RE
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .ok_or_else(|| Error::OutputParse("no policy name in engine output".to_string()))?;

    let resource_type = RESOURCE_TYPE_RE
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .ok_or_else(|| Error::OutputParse("no resource type in engine output".to_string()))?;

    Ok(ParsedOutput {
        policy_name,
        resource_type,
    })
}
