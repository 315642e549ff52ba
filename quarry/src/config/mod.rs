//! Configuration for quarry.
//!
//! Settings are read from an INI file (`~/.quarry/config.ini` by default)
//! and overlaid on built-in defaults. Each concern lives in its own file:
//!
//! - `settings`: one plain struct per `[section]`
//! - `defaults`: `DEFAULT_*` constants and `ConfigFile::default()`
//! - `parser`: INI → `ConfigFile`, with validation
//! - `writer`: `ConfigFile` → commented INI
//!
//! # Example
//!
//! ```
//! use quarry::config::{ConfigFile, DEFAULT_POLL_WORKERS};
//!
//! let config = ConfigFile::default();
//! assert_eq!(config.workers.poll, DEFAULT_POLL_WORKERS);
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::*;
