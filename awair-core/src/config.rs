use crate::error::AwairError;
use figment::{
    Figment, Provider,
    providers::{Env, Format, Serialized, Yaml},
    value::Dict,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Per-request timeout for the device call.
pub const SENSOR_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// How long the metrics server may drain in-flight scrapes on shutdown.
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Prefix for environment overrides, e.g. `AWAIR_EXPORTER_PORT=9101`.
pub const ENV_PREFIX: &str = "AWAIR_EXPORTER_";

/// Top-level exporter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Metrics server bind address.
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Metrics server bind port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Device JSON endpoint.
    #[serde(default = "default_awair_address")]
    pub awair_address: String,
    /// Interval between polls.
    #[serde(default = "default_poll_frequency", with = "go_duration")]
    pub poll_frequency: Duration,
    #[serde(default)]
    pub log: LogConfig,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_listen() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 2112 }
fn default_awair_address() -> String { "http://localhost/air-data/latest".into() }
fn default_poll_frequency() -> Duration { Duration::from_secs(30) }
fn default_log_level() -> String { "info".into() }

// ── Impls ─────────────────────────────────────────────────────

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            awair_address: default_awair_address(),
            poll_frequency: default_poll_frequency(),
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl ExporterConfig {
    /// Layered sources: defaults, optional YAML file, `AWAIR_EXPORTER_*` env.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(ExporterConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load configuration from file + env.
    pub fn load(path: Option<&Path>) -> Result<Self, AwairError> {
        Self::load_with(path, Serialized::defaults(Dict::new()))
    }

    /// Like [`ExporterConfig::load`], with `overrides` (CLI flags) on top.
    ///
    /// A `path` that does not exist is an error rather than an empty layer.
    pub fn load_with<P: Provider>(path: Option<&Path>, overrides: P) -> Result<Self, AwairError> {
        if let Some(path) = path {
            if !path.is_file() {
                return Err(AwairError::ConfigError(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
        }
        let config: ExporterConfig = Self::figment(path).merge(overrides).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AwairError> {
        if self.poll_frequency.is_zero() {
            return Err(AwairError::ConfigError(
                "poll_frequency must be greater than zero".into(),
            ));
        }
        if self.awair_address.trim().is_empty() {
            return Err(AwairError::ConfigError("awair_address must not be empty".into()));
        }
        if self.listen.trim().is_empty() {
            return Err(AwairError::ConfigError("listen must not be empty".into()));
        }
        Ok(())
    }

    /// `host:port` for logging; IPv6 literals are bracketed.
    pub fn listen_string(&self) -> String {
        if self.listen.contains(':') {
            format!("[{}]:{}", self.listen, self.port)
        } else {
            format!("{}:{}", self.listen, self.port)
        }
    }
}

/// Parse a Go-style duration such as `30s`, `1m30s`, `1.5h` or `250ms`.
///
/// A lone `0` is accepted. Signs are rejected: an interval can't be negative.
pub fn parse_duration(input: &str) -> Result<Duration, AwairError> {
    let invalid = |reason| AwairError::InvalidDuration {
        input: input.to_string(),
        reason,
    };

    let s = input.trim();
    if s.is_empty() {
        return Err(invalid("empty duration"));
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.starts_with('-') || s.starts_with('+') {
        return Err(invalid("signed durations are not allowed"));
    }

    let mut total = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return Err(invalid("expected a number"));
        }
        let value: f64 = rest[..num_len].parse().map_err(|_| invalid("malformed number"))?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(invalid("missing unit")),
            _ => return Err(invalid("unknown unit")),
        };
        rest = &rest[unit_len..];
        total += value * nanos_per_unit;
    }

    if !total.is_finite() || total > u64::MAX as f64 {
        return Err(invalid("duration out of range"));
    }
    Ok(Duration::from_nanos(total.round() as u64))
}

/// Render a duration the way `parse_duration` reads it back.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".into();
    }
    if nanos % 1_000_000_000 != 0 {
        return if nanos % 1_000_000 == 0 {
            format!("{}ms", nanos / 1_000_000)
        } else {
            format!("{nanos}ns")
        };
    }
    let mut secs = d.as_secs();
    let mut out = String::new();
    for (unit, size) in [("h", 3600), ("m", 60)] {
        if secs >= size {
            out.push_str(&format!("{}{unit}", secs / size));
            secs %= size;
        }
    }
    if secs > 0 {
        out.push_str(&format!("{secs}s"));
    }
    out
}

/// Serde adapter: durations as Go-style strings, bare numbers as seconds.
pub mod go_duration {
    use super::{format_duration, parse_duration};
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        deserializer.deserialize_any(DurationVisitor)
    }

    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a duration like \"30s\" or a number of seconds")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
            parse_duration(v).map_err(E::custom)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
            u64::try_from(v)
                .map(Duration::from_secs)
                .map_err(|_| E::custom("negative duration"))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Duration, E> {
            Duration::try_from_secs_f64(v).map_err(E::custom)
        }
    }
}
