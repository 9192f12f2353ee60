pub(crate) const DEFAULT_USER_AGENT: &str = concat!("surge/", env!("CARGO_PKG_VERSION"));

/// Paths requested in `default` URL mode when none are configured.
pub(crate) const DEFAULT_PATHS: [&str; 3] = ["/", "/about", "/contact"];

/// Config filenames checked in the working directory when `--config` is absent.
pub(crate) const DEFAULT_CONFIG_FILES: [&str; 2] = ["surge.toml", "surge.json"];

pub(crate) const DEFAULT_CONTENT_TYPE: &str = "application/json";
