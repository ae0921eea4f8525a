use anyhow::{Context as AnyhowContext, Result};
use clap::Args;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use wordminer_miner::{parse_languages, GithubConfig, MinerConfig};
use wordminer_store::RedisConfig;

const DEFAULT_GITHUB_API: &str = "https://api.github.com";
const MAX_PAUSE_SECS: u64 = 24 * 60 * 60;

#[derive(Args, Debug, Clone)]
pub struct RedisArgs {
    /// Redis host holding the counters and the token stream
    #[arg(long, env = "REDIS_HOST", default_value = "localhost")]
    pub redis_host: String,

    /// Redis port
    #[arg(long, env = "REDIS_PORT", default_value_t = 6379)]
    pub redis_port: u16,
}

impl RedisArgs {
    pub fn config(&self) -> RedisConfig {
        RedisConfig {
            host: self.redis_host.clone(),
            port: self.redis_port,
            ..RedisConfig::default()
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct MineArgs {
    /// Comma separated languages mined each cycle, in order
    #[arg(long, env = "MINER_LANGUAGES", default_value = "python,java")]
    pub languages: String,

    /// Repositories per language per cycle (default 5)
    #[arg(long, env = "REPO_LIMIT")]
    pub repo_limit: Option<String>,

    /// Files per repository (default 5)
    #[arg(long, env = "FILE_LIMIT")]
    pub file_limit: Option<String>,

    /// Wall-clock budget per repository in seconds (default 120)
    #[arg(long, env = "REPO_TIMEOUT_SECS")]
    pub repo_timeout_secs: Option<String>,

    /// Files above this size are skipped (default 1048576)
    #[arg(long, env = "MAX_FILE_BYTES")]
    pub max_file_bytes: Option<String>,

    /// Pause between repositories in seconds (default 2)
    #[arg(long, env = "REPO_PAUSE_SECS")]
    pub repo_pause_secs: Option<String>,

    /// Pause between languages in seconds (default 10)
    #[arg(long, env = "LANGUAGE_PAUSE_SECS")]
    pub language_pause_secs: Option<String>,

    /// Pause between cycles in seconds (default 60)
    #[arg(long, env = "CYCLE_PAUSE_SECS")]
    pub cycle_pause_secs: Option<String>,

    /// Pause after a crashed cycle in seconds (default 30)
    #[arg(long, env = "ERROR_BACKOFF_SECS")]
    pub error_backoff_secs: Option<String>,

    /// GitHub token; without it the anonymous quota applies
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitHub REST API base URL
    #[arg(long, default_value = DEFAULT_GITHUB_API)]
    pub github_api: String,

    #[command(flatten)]
    pub redis: RedisArgs,
}

impl MineArgs {
    pub fn miner_config(&self) -> Result<MinerConfig> {
        let defaults = MinerConfig::default();
        let config = MinerConfig {
            languages: parse_languages(&self.languages).context("Invalid MINER_LANGUAGES")?,
            repo_limit: bounded(
                "REPO_LIMIT",
                self.repo_limit.as_deref(),
                defaults.repo_limit,
                1,
                100,
            ),
            file_limit: bounded(
                "FILE_LIMIT",
                self.file_limit.as_deref(),
                defaults.file_limit,
                1,
                1_000,
            ),
            repo_timeout: seconds(
                "REPO_TIMEOUT_SECS",
                self.repo_timeout_secs.as_deref(),
                defaults.repo_timeout,
                1,
            ),
            max_file_bytes: bounded(
                "MAX_FILE_BYTES",
                self.max_file_bytes.as_deref(),
                defaults.max_file_bytes,
                1,
                64 * 1024 * 1024,
            ),
            repo_pause: seconds(
                "REPO_PAUSE_SECS",
                self.repo_pause_secs.as_deref(),
                defaults.repo_pause,
                0,
            ),
            language_pause: seconds(
                "LANGUAGE_PAUSE_SECS",
                self.language_pause_secs.as_deref(),
                defaults.language_pause,
                0,
            ),
            cycle_pause: seconds(
                "CYCLE_PAUSE_SECS",
                self.cycle_pause_secs.as_deref(),
                defaults.cycle_pause,
                0,
            ),
            error_backoff: seconds(
                "ERROR_BACKOFF_SECS",
                self.error_backoff_secs.as_deref(),
                defaults.error_backoff,
                0,
            ),
        };
        config.validate().context("Invalid miner configuration")?;
        Ok(config)
    }

    pub fn github_config(&self) -> GithubConfig {
        GithubConfig {
            token: self
                .github_token
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            api_base: self.github_api.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Dashboard listen address
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "0.0.0.0:5050")]
    pub addr: String,

    #[command(flatten)]
    pub redis: RedisArgs,
}

/// How a raw setting turned into the value used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolved<T> {
    Value(T),
    Clamped { given: T, used: T },
    Unparsable(T),
}

/// Trimmed, parsed and clamped; blank or unparsable input falls back to `default`.
fn resolve<T>(raw: Option<&str>, default: T, min: T, max: T) -> Resolved<T>
where
    T: FromStr + Ord + Copy,
{
    let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Resolved::Value(default.clamp(min, max));
    };
    match value.parse::<T>() {
        Ok(given) => {
            let used = given.clamp(min, max);
            if used == given {
                Resolved::Value(used)
            } else {
                Resolved::Clamped { given, used }
            }
        }
        Err(_) => Resolved::Unparsable(default.clamp(min, max)),
    }
}

fn bounded<T>(name: &str, raw: Option<&str>, default: T, min: T, max: T) -> T
where
    T: FromStr + Ord + Copy + Display,
{
    match resolve(raw, default, min, max) {
        Resolved::Value(value) => value,
        Resolved::Clamped { given, used } => {
            log::warn!("Clamping {name}={given} to {used} (allowed {min}..={max})");
            used
        }
        Resolved::Unparsable(used) => {
            log::warn!(
                "Ignoring {name}={:?}: not a number, using {used}",
                raw.unwrap_or_default().trim()
            );
            used
        }
    }
}

fn seconds(name: &str, raw: Option<&str>, default: Duration, min: u64) -> Duration {
    Duration::from_secs(bounded(name, raw, default.as_secs(), min, MAX_PAUSE_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use wordminer_protocol::Language;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        mine: MineArgs,
    }

    fn mine_args(argv: &[&str]) -> MineArgs {
        let mut full = vec!["word-miner"];
        full.extend_from_slice(argv);
        Harness::parse_from(full).mine
    }

    #[test]
    fn bounded_trims_parses_and_clamps() {
        assert_eq!(bounded("X", Some(" 7 "), 5usize, 1, 100), 7);
        assert_eq!(bounded("X", Some(""), 5usize, 1, 100), 5);
        assert_eq!(bounded("X", Some("lots"), 5usize, 1, 100), 5);
        assert_eq!(bounded("X", Some("0"), 5usize, 1, 100), 1);
        assert_eq!(bounded("X", Some("1000"), 5usize, 1, 100), 100);
        assert_eq!(bounded::<usize>("X", None, 5, 1, 100), 5);
    }

    #[test]
    fn out_of_range_values_are_reported_as_clamped() {
        assert_eq!(
            resolve(Some("0"), 5usize, 1, 100),
            Resolved::Clamped { given: 0, used: 1 }
        );
        assert_eq!(
            resolve(Some("5000"), 5usize, 1, 1_000),
            Resolved::Clamped { given: 5000, used: 1000 }
        );
        assert_eq!(resolve(Some("lots"), 5usize, 1, 100), Resolved::Unparsable(5));
        assert_eq!(resolve(Some("7"), 5usize, 1, 100), Resolved::Value(7));
        assert_eq!(resolve::<usize>(None, 5, 1, 100), Resolved::Value(5));

        let args = mine_args(&["--repo-limit", "0", "--file-limit", "0"]);
        let config = args.miner_config().unwrap();
        assert_eq!(config.repo_limit, 1);
        assert_eq!(config.file_limit, 1);
    }

    #[test]
    fn flags_override_defaults() {
        let args = mine_args(&[
            "--languages",
            "java",
            "--repo-limit",
            "3",
            "--repo-timeout-secs",
            "45",
            "--cycle-pause-secs",
            "0",
        ]);
        let config = args.miner_config().unwrap();
        assert_eq!(config.languages, vec![Language::Java]);
        assert_eq!(config.repo_limit, 3);
        assert_eq!(config.file_limit, 5);
        assert_eq!(config.repo_timeout, Duration::from_secs(45));
        assert_eq!(config.cycle_pause, Duration::ZERO);
    }

    #[test]
    fn unknown_language_is_rejected() {
        let args = mine_args(&["--languages", "python,cobol"]);
        let err = args.miner_config().unwrap_err();
        assert!(format!("{err:#}").contains("cobol"));
    }

    #[test]
    fn blank_token_counts_as_missing() {
        let args = mine_args(&["--github-token", "  "]);
        assert!(args.github_config().token.is_none());
        assert_eq!(args.redis.config().port, 6379);
    }
}
