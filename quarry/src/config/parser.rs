//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct
//! fields. Values are validated here so that a loaded `ConfigFile` can
//! always be turned into a running manager.

use ini::{Ini, Properties};
use std::path::PathBuf;
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [rate] section
    if let Some(section) = ini.section(Some("rate")) {
        for (key, slot) in [
            ("submit", &mut config.rate.submit),
            ("poll", &mut config.rate.poll),
            ("cancel", &mut config.rate.cancel),
        ] {
            if let Some(v) = rate(section, "rate", key)? {
                *slot = v;
            }
        }
    }

    // [workers] section
    if let Some(section) = ini.section(Some("workers")) {
        for (key, slot) in [
            ("submit", &mut config.workers.submit),
            ("poll", &mut config.workers.poll),
            ("cancel", &mut config.workers.cancel),
        ] {
            if let Some(v) = at_least_one(section, "workers", key)? {
                *slot = v;
            }
        }
    }

    // [retry] section
    if let Some(section) = ini.section(Some("retry")) {
        for (key, slot) in [
            ("submit", &mut config.retry.submit),
            ("poll", &mut config.retry.poll),
            ("cancel", &mut config.retry.cancel),
        ] {
            if let Some(v) = at_least_one(section, "retry", key)? {
                *slot = v;
            }
        }
        if let Some(v) = number(section, "retry", "backoff_base_ms")? {
            config.retry.backoff_base_ms = v;
        }
        if let Some(v) = number(section, "retry", "backoff_max_ms")? {
            config.retry.backoff_max_ms = v;
        }
        if config.retry.backoff_max_ms < config.retry.backoff_base_ms {
            return Err(ConfigFileError::InvalidValue {
                section: "retry".to_string(),
                key: "backoff_max_ms".to_string(),
                value: config.retry.backoff_max_ms.to_string(),
                reason: "must not be smaller than backoff_base_ms".to_string(),
            });
        }
    }

    // [poll] section
    if let Some(section) = ini.section(Some("poll")) {
        if let Some(v) = number(section, "poll", "not_ready_delay_ms")? {
            config.poll.not_ready_delay_ms = v;
        }
    }

    // [queue] section
    if let Some(section) = ini.section(Some("queue")) {
        if let Some(v) = number(section, "queue", "capacity")? {
            config.queue.capacity = v;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section, "directory") {
            config.logging.directory = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "file") {
            config.logging.file = v.to_string();
        }
        if let Some(v) = non_empty(section, "level") {
            config.logging.level = v.to_string();
        }
    }

    Ok(config)
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn number<T: FromStr>(
    props: &Properties,
    section: &str,
    key: &str,
) -> Result<Option<T>, ConfigFileError> {
    let Some(v) = non_empty(props, key) else {
        return Ok(None);
    };
    v.parse()
        .map(Some)
        .map_err(|_| invalid(section, key, v, "must be a non-negative integer"))
}

fn at_least_one<T: FromStr + PartialOrd + From<u8>>(
    props: &Properties,
    section: &str,
    key: &str,
) -> Result<Option<T>, ConfigFileError> {
    let Some(v) = non_empty(props, key) else {
        return Ok(None);
    };
    match v.parse::<T>() {
        Ok(n) if n >= T::from(1) => Ok(Some(n)),
        _ => Err(invalid(section, key, v, "must be an integer of at least 1")),
    }
}

fn rate(props: &Properties, section: &str, key: &str) -> Result<Option<f64>, ConfigFileError> {
    let Some(v) = non_empty(props, key) else {
        return Ok(None);
    };
    match v.parse::<f64>() {
        Ok(rps) if rps.is_finite() && rps > 0.0 => Ok(Some(rps)),
        _ => Err(invalid(
            section,
            key,
            v,
            "must be a positive number of requests per second",
        )),
    }
}

/// Expands a leading `~/` to the user's home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
