//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented representation written to `config.ini`. The
//! output parses back to an equal `ConfigFile`.

use std::path::Path;

use super::defaults::*;
use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[rate]
; Requests per second the log-search service allows for each call type.
; Successive calls of one type are spaced at least 1/rate seconds apart,
; shared across all workers. Must be greater than 0 (default: {default_rps}).
submit = {submit_rps}
poll = {poll_rps}
cancel = {cancel_rps}

[workers]
; Concurrent workers per stage (minimum 1)
submit = {submit_workers}
poll = {poll_workers}
cancel = {cancel_workers}

[retry]
; Maximum attempts per chunk in each stage before giving up (minimum 1)
submit = {submit_try}
poll = {poll_try}
cancel = {cancel_try}
; Backoff between transient failures: base * 2^retry, capped at max
backoff_base_ms = {backoff_base}
backoff_max_ms = {backoff_max}

[poll]
; Delay before a query that is still running is polled again
not_ready_delay_ms = {not_ready}

[queue]
; Capacity of the queues between stages (0 = unbounded)
capacity = {capacity}

[logging]
; Log directory and file name. RUST_LOG overrides level when set.
directory = {log_dir}
file = {log_file}
level = {log_level}
"#,
        default_rps = DEFAULT_SUBMIT_RPS,
        submit_rps = config.rate.submit,
        poll_rps = config.rate.poll,
        cancel_rps = config.rate.cancel,
        submit_workers = config.workers.submit,
        poll_workers = config.workers.poll,
        cancel_workers = config.workers.cancel,
        submit_try = config.retry.submit,
        poll_try = config.retry.poll,
        cancel_try = config.retry.cancel,
        backoff_base = config.retry.backoff_base_ms,
        backoff_max = config.retry.backoff_max_ms,
        not_ready = config.poll.not_ready_delay_ms,
        capacity = config.queue.capacity,
        log_dir = path_to_string(&config.logging.directory),
        log_file = config.logging.file,
        log_level = config.logging.level,
    )
}

/// Formats a path for the config file, abbreviating the home directory.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_mentions_every_section() {
        let content = to_config_string(&ConfigFile::default());
        for section in ["[rate]", "[workers]", "[retry]", "[poll]", "[queue]", "[logging]"] {
            assert!(content.contains(section), "missing {section}");
        }
        assert!(content.contains("not_ready_delay_ms = 1000"));
    }

    #[test]
    fn test_saved_config_loads_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.rate.poll = 0.5;
        config.workers.cancel = 1;
        config.retry.poll = 30;
        config.queue.capacity = 128;
        config.logging.directory = temp_dir.path().join("logs");

        config.save_to(&path).unwrap();
        let loaded = ConfigFile::load_from(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_path_outside_home_is_verbatim() {
        assert_eq!(path_to_string(Path::new("/var/log/quarry")), "/var/log/quarry");
    }
}
