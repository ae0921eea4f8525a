use crate::error::{MinerError, Result};
use std::time::Duration;
use wordminer_protocol::Language;

/// Limits and pacing for the mining loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinerConfig {
    /// Languages mined each cycle, in order
    pub languages: Vec<Language>,

    /// Repositories per language per cycle
    pub repo_limit: usize,

    /// Files per repository
    pub file_limit: usize,

    /// Wall-clock budget for one repository
    pub repo_timeout: Duration,

    /// Files larger than this are skipped, never truncated
    pub max_file_bytes: u64,

    /// Pause between two repositories of the same language
    pub repo_pause: Duration,

    /// Pause between two languages
    pub language_pause: Duration,

    /// Pause between two cycles
    pub cycle_pause: Duration,

    /// Pause after a cycle crashed
    pub error_backoff: Duration,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            languages: Language::ALL.to_vec(),
            repo_limit: 5,
            file_limit: 5,
            repo_timeout: Duration::from_secs(120),
            max_file_bytes: 1_048_576,
            repo_pause: Duration::from_secs(2),
            language_pause: Duration::from_secs(10),
            cycle_pause: Duration::from_secs(60),
            error_backoff: Duration::from_secs(30),
        }
    }
}

impl MinerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.languages.is_empty() {
            return Err(MinerError::InvalidConfig(
                "at least one language must be mined".to_string(),
            ));
        }

        if self.repo_timeout.is_zero() {
            return Err(MinerError::InvalidConfig(
                "repo_timeout must be > 0".to_string(),
            ));
        }

        if self.max_file_bytes == 0 {
            return Err(MinerError::InvalidConfig(
                "max_file_bytes must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parse a comma separated language list such as `python,java`.
///
/// Blank entries are ignored and duplicates keep their first position.
pub fn parse_languages(raw: &str) -> Result<Vec<Language>> {
    let mut languages = Vec::new();
    for part in raw.split(',') {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }
        let language: Language = trimmed
            .parse()
            .map_err(|e| MinerError::InvalidConfig(format!("{e}")))?;
        if !languages.contains(&language) {
            languages.push(language);
        }
    }
    Ok(languages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_documented_values() {
        let config = MinerConfig::default();
        assert_eq!(config.repo_limit, 5);
        assert_eq!(config.file_limit, 5);
        assert_eq!(config.repo_timeout, Duration::from_secs(120));
        assert_eq!(config.languages, vec![Language::Python, Language::Java]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_degenerate_values() {
        let config = MinerConfig {
            languages: Vec::new(),
            ..MinerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = MinerConfig {
            repo_timeout: Duration::ZERO,
            ..MinerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn parse_languages_handles_blanks_and_duplicates() {
        assert_eq!(
            parse_languages(" java , ,python,java").unwrap(),
            vec![Language::Java, Language::Python]
        );
        assert!(parse_languages("").unwrap().is_empty());
        assert!(parse_languages("python,cobol").is_err());
    }
}
