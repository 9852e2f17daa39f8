//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! environment variables where applicable (see [`crate::config`]).

/// API group of the Certificate custom resource
pub const CERTIFICATE_GROUP: &str = "development.io";

/// API version of the Certificate custom resource
pub const CERTIFICATE_VERSION: &str = "v1alpha1";

/// Plural name of the Certificate custom resource
pub const CERTIFICATE_PLURAL: &str = "certificates";

/// Field manager / component name used in logs and API calls
pub const CONTROLLER_NAME: &str = "certificate-controller";

/// Secret type for TLS material
pub const TLS_SECRET_TYPE: &str = "kubernetes.io/tls";

/// Secret data key holding the full certificate chain
pub const TLS_CERT_KEY: &str = "tls.crt";

/// Secret data key holding the private key
pub const TLS_KEY_KEY: &str = "tls.key";

/// Label carrying the certificate domain (wildcard prefix stripped)
pub const DOMAIN_LABEL: &str = "domain";

/// Timestamp format appended to archived secret names (minute granularity)
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";

/// How many disambiguating suffixes to try when an archive name is taken
pub const MAX_BACKUP_NAME_ATTEMPTS: u32 = 10;

/// Suffix format for the archive name used once the numbered suffixes are taken
pub const BACKUP_FALLBACK_SUFFIX_FORMAT: &str = "%S%9f";

/// Length of the random suffix tried when the fallback archive name is taken too
pub const BACKUP_RANDOM_SUFFIX_LEN: usize = 8;

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default watch timeout sent to the API server (seconds)
pub const DEFAULT_WATCH_TIMEOUT_SECS: u32 = 30;

/// The API server rejects watch timeouts of 295s or more
pub const MAX_WATCH_TIMEOUT_SECS: u32 = 290;

/// Default Fibonacci backoff starting value for watch reconnects (milliseconds)
pub const DEFAULT_BACKOFF_START_MS: u64 = 1000;

/// Default Fibonacci backoff maximum value for watch reconnects (milliseconds)
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 30_000;

/// Default delay before reopening the watch after it ends cleanly (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS: u64 = 1;

/// Default certbot configuration directory
pub const DEFAULT_LETSENCRYPT_DIR: &str = "/letsencrypt";

/// Default Google Cloud credentials file for the certbot DNS plugin
pub const DEFAULT_GOOGLE_CREDENTIALS: &str = "/secrets/gcp.json";

/// Default DNS propagation wait passed to the certbot DNS plugin (seconds)
pub const DEFAULT_DNS_PROPAGATION_SECONDS: u32 = 90;

/// Default certbot executable
pub const DEFAULT_CERTBOT_BIN: &str = "certbot";

/// Length of the random strings returned by a dry-run issuance
pub const DRY_RUN_MATERIAL_LEN: usize = 128;
