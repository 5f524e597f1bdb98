//! Core domain types and traits for agentbuild.
//!
//! This crate contains:
//! - Context tags and the ordered context stack
//! - Target variants and the variant to flavor binding
//! - The configuration resolver contract
//! - Validated semantic values (regex, email addresses)
//! - Artifact files and the template manifest

pub mod artifact;
pub mod binding;
pub mod context;
pub mod error;
pub mod resolver;
pub mod semantic;
pub mod variant;

pub use binding::{Binding, Flavor, bind};
pub use context::{ContextStack, ContextTag};
pub use error::{Error, Result};
pub use resolver::{ConfigResolver, ConfigValue};
pub use variant::{Arch, PackageFormat, Platform, Variant};
