//! Client template builders.
//!
//! A [`ClientBuilder`] is selected from a [`Variant`](agentbuild_core::Variant)
//! and compiles the client on a matching host, then packages the build output
//! into a template archive that deployers later turn into installers.

pub mod builder;
pub mod command;
pub mod template;

pub use builder::ClientBuilder;
