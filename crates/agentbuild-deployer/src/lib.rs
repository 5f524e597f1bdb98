//! Installer repacking and deployment.
//!
//! A [`ClientDeployer`] takes a template produced by a builder and lays it
//! out as an installer for its flavor, optionally embedding the resolved
//! configuration and plugin files.

pub mod deployer;
pub mod installer;
pub mod layout;

pub use deployer::ClientDeployer;
pub use installer::{InstallerManifest, Template};
pub use layout::Layout;
