//! KDL configuration for agentbuild.
//!
//! This crate handles:
//! - Parsing configuration files with context-scoped overrides
//! - Resolving values against a context stack
//! - Variable interpolation
//! - Validation of typed (semantic) keys

pub mod error;
pub mod keys;
pub mod parse;
pub mod schema;
pub mod table;
pub mod variables;

pub use error::{ConfigError, ConfigResult};
pub use parse::{load_config, parse_config};
pub use schema::{TYPED_KEYS, TypedKey, ValueType, validate_config};
pub use table::{ConfigSnapshot, ConfigTable};
