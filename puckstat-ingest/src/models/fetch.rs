//! Fetch targets and results

use crate::error::{FetchError, ParseError};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;

/// Where a target's payload is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetLocation {
    Http(String),
    File(PathBuf),
}

impl TargetLocation {
    /// Interpret a location string
    ///
    /// `http://` and `https://` are network locations, `file://` and bare paths are local
    /// files. Anything else with a scheme is kept as-is and rejected at fetch time.
    pub fn parse(location: &str) -> Self {
        if let Some(path) = location.strip_prefix("file://") {
            return TargetLocation::File(PathBuf::from(path));
        }
        if location.contains("://") {
            return TargetLocation::Http(location.to_string());
        }
        TargetLocation::File(PathBuf::from(location))
    }

    /// Join a base location and a relative resource path
    pub fn join(base: &str, path: &str) -> Self {
        let joined = format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Self::parse(&joined)
    }

    pub fn validate(&self) -> Result<(), FetchError> {
        match self {
            TargetLocation::Http(url) => {
                let rest = url
                    .strip_prefix("https://")
                    .or_else(|| url.strip_prefix("http://"))
                    .ok_or_else(|| FetchError::MalformedTarget(url.clone()))?;
                let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
                if host.is_empty() || url.chars().any(char::is_whitespace) {
                    return Err(FetchError::MalformedTarget(url.clone()));
                }
                Ok(())
            }
            TargetLocation::File(path) => {
                if path.as_os_str().is_empty() {
                    return Err(FetchError::MalformedTarget("empty file path".to_string()));
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for TargetLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetLocation::Http(url) => f.write_str(url),
            TargetLocation::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// One unit of fetching work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    pub source: String,
    /// Adapter-defined tag telling `parse` what the payload is (`roster:TOR`, `skaters`)
    pub resource: String,
    pub location: TargetLocation,
}

impl FetchTarget {
    pub fn new(
        source: impl Into<String>,
        resource: impl Into<String>,
        location: TargetLocation,
    ) -> Self {
        Self {
            source: source.into(),
            resource: resource.into(),
            location,
        }
    }
}

impl fmt::Display for FetchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.source, self.resource, self.location)
    }
}

/// Bytes read for a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl Payload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: None,
        }
    }

    pub fn text(&self) -> Result<&str, ParseError> {
        std::str::from_utf8(&self.bytes).map_err(|_| ParseError::Encoding)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(Payload),
    Failure(FetchError),
}

/// Result of fetching one target, retries included
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub source: String,
    pub target: FetchTarget,
    pub outcome: FetchOutcome,
    pub fetched_at: DateTime<Utc>,
    /// Reads attempted (0 when the target was rejected before any read)
    pub attempts: u32,
}

impl FetchResult {
    pub fn success(target: FetchTarget, payload: Payload, attempts: u32) -> Self {
        Self {
            source: target.source.clone(),
            target,
            outcome: FetchOutcome::Success(payload),
            fetched_at: Utc::now(),
            attempts,
        }
    }

    pub fn failure(target: FetchTarget, error: FetchError, attempts: u32) -> Self {
        Self {
            source: target.source.clone(),
            target,
            outcome: FetchOutcome::Failure(error),
            fetched_at: Utc::now(),
            attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, FetchOutcome::Success(_))
    }

    pub fn error(&self) -> Option<&FetchError> {
        match &self.outcome {
            FetchOutcome::Failure(e) => Some(e),
            FetchOutcome::Success(_) => None,
        }
    }

    pub fn payload(&self) -> Result<&Payload, ParseError> {
        match &self.outcome {
            FetchOutcome::Success(payload) => Ok(payload),
            FetchOutcome::Failure(e) => Err(ParseError::NoPayload(e.to_string())),
        }
    }

    /// Payload as UTF-8 text
    pub fn text(&self) -> Result<&str, ParseError> {
        self.payload()?.text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_parse() {
        assert_eq!(
            TargetLocation::parse("https://api-web.nhle.com/v1/standings/now"),
            TargetLocation::Http("https://api-web.nhle.com/v1/standings/now".into())
        );
        assert_eq!(
            TargetLocation::parse("file:///data/skaters.csv"),
            TargetLocation::File(PathBuf::from("/data/skaters.csv"))
        );
        assert_eq!(
            TargetLocation::parse("/data/skaters.csv"),
            TargetLocation::File(PathBuf::from("/data/skaters.csv"))
        );
    }

    #[test]
    fn test_location_join_trims_slashes() {
        assert_eq!(
            TargetLocation::join("https://puckpedia.com/", "/toronto-maple-leafs/cap"),
            TargetLocation::Http("https://puckpedia.com/toronto-maple-leafs/cap".into())
        );
        assert_eq!(
            TargetLocation::join("/drops", "skaters.csv"),
            TargetLocation::File(PathBuf::from("/drops/skaters.csv"))
        );
    }

    #[test]
    fn test_validate_rejects_unknown_scheme_and_empty_host() {
        assert!(TargetLocation::parse("ftp://example.com/x").validate().is_err());
        assert!(TargetLocation::Http("https:///nohost".into()).validate().is_err());
        assert!(TargetLocation::Http("https://exa mple.com".into()).validate().is_err());
        assert!(TargetLocation::parse("https://moneypuck.com/x.csv").validate().is_ok());
    }

    #[test]
    fn test_failed_result_has_no_payload() {
        let target = FetchTarget::new("nhl_api", "standings", TargetLocation::parse("/x"));
        let result = FetchResult::failure(target, FetchError::FileNotFound("/x".into()), 1);

        assert!(!result.is_success());
        assert!(matches!(result.payload(), Err(ParseError::NoPayload(_))));
        assert_eq!(result.source, "nhl_api");
    }
}
