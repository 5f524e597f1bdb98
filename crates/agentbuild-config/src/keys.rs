//! Well-known configuration keys.

/// Client name, used for install directories and artifact names.
pub const CLIENT_NAME: &str = "Client.name";
/// Extra files embedded into deployed installers.
pub const CLIENT_PLUGINS: &str = "Client.plugins";

/// Prefix of the build-host settings, which never ship inside installers.
pub const BUILDER_SECTION: &str = "ClientBuilder.";

pub const BUILDER_SOURCE_DIR: &str = "ClientBuilder.source_dir";
/// Directory whose contents become the template payload. Defaults to the source dir.
pub const BUILDER_BUILD_DIR: &str = "ClientBuilder.build_dir";
/// Command (program followed by arguments) run in the source dir before packaging.
pub const BUILDER_BUILD_COMMAND: &str = "ClientBuilder.build_command";
/// Payload paths matching this pattern are left out of the template.
pub const BUILDER_EXCLUDE_PATTERN: &str = "ClientBuilder.exclude_pattern";
pub const BUILDER_TEMPLATE_PATH: &str = "ClientBuilder.template_path";
/// Fallback output path for `repack` and `deploy`.
pub const BUILDER_OUTPUT_PATH: &str = "ClientBuilder.output_path";

pub use agentbuild_core::semantic::LOGGING_DOMAIN_KEY as LOGGING_DOMAIN;
pub const LOGGING_NOTIFICATION_EMAIL: &str = "Logging.notification_email";
pub const MONITORING_ALERT_EMAIL: &str = "Monitoring.alert_email";

/// Default client name when none is configured.
pub const DEFAULT_CLIENT_NAME: &str = "agent";
