use std::{env, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::cache::RefreshSettings;

const ENV_PREFIX: &str = "PHRASEWALL_";

/// Runtime configuration, read once at startup from `PHRASEWALL_*` variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub bind: SocketAddr,
    pub refresh: RefreshSettings,
    /// Longest phrase accepted on submission, in Unicode code points.
    pub max_text_chars: usize,
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("phrasewall.sqlite3"),
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            refresh: RefreshSettings::default(),
            max_text_chars: 10,
            debug: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source. Missing or
    /// out-of-range values fall back to the defaults with a warning; only an
    /// unparsable bind address is fatal.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        let bind = match var("BIND") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("invalid {ENV_PREFIX}BIND value '{raw}'"))?,
            None => defaults.bind,
        };

        let refresh = RefreshSettings {
            interval: millis_in_range(
                &var,
                "REFRESH_INTERVAL_MS",
                100..=600_000,
                defaults.refresh.interval,
            ),
            cache_limit: parse_in_range(
                &var,
                "CACHE_LIMIT",
                1..=10_000,
                defaults.refresh.cache_limit,
            ),
            enrich_timeout: millis_in_range(
                &var,
                "ENRICH_TIMEOUT_MS",
                10..=60_000,
                defaults.refresh.enrich_timeout,
            ),
            enrich_concurrency: parse_in_range(
                &var,
                "ENRICH_CONCURRENCY",
                1..=256,
                defaults.refresh.enrich_concurrency,
            ),
            cycle_timeout: millis_in_range(
                &var,
                "CYCLE_TIMEOUT_MS",
                100..=600_000,
                defaults.refresh.cycle_timeout,
            ),
        };

        Ok(Self {
            db_path: var("DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            bind,
            refresh,
            max_text_chars: parse_in_range(
                &var,
                "MAX_TEXT_CHARS",
                1..=280,
                defaults.max_text_chars,
            ),
            debug: var("DEBUG").map_or(defaults.debug, |value| is_truthy(&value)),
        })
    }
}

/// Read ahead of [`AppConfig::from_env`] so logging is configured before the
/// rest of the config starts reporting fallbacks.
pub fn debug_from_env() -> bool {
    env::var(format!("{ENV_PREFIX}DEBUG")).is_ok_and(|value| is_truthy(&value))
}

fn is_truthy(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn parse_in_range<T, F>(var: &F, name: &str, range: std::ops::RangeInclusive<T>, default: T) -> T
where
    T: FromStr + PartialOrd + Copy + std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = var(name) else {
        return default;
    };

    match raw.trim().parse::<T>() {
        Ok(value) if range.contains(&value) => {
            info!("{ENV_PREFIX}{name} set to {value}");
            value
        }
        Ok(value) => {
            warn!(
                "{ENV_PREFIX}{name}={value} outside {}..={}, using default {default}",
                range.start(),
                range.end()
            );
            default
        }
        Err(_) => {
            warn!("Invalid {ENV_PREFIX}{name} value '{raw}', using default {default}");
            default
        }
    }
}

fn millis_in_range<F>(
    var: &F,
    name: &str,
    range: std::ops::RangeInclusive<u64>,
    default: Duration,
) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(parse_in_range(var, name, range, default_ms))
}
