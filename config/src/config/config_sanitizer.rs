// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::config::{Error, StressConfig};

/// A trait for validating a section of the stress config before any
/// pipeline starts.
pub trait ConfigSanitizer {
    /// Get the name of the sanitizer (e.g., for logging and error strings)
    fn get_sanitizer_name() -> String {
        let config_name = std::any::type_name::<Self>();
        config_name
            .rsplit("::")
            .next()
            .unwrap_or(config_name)
            .to_string()
    }

    /// Validate and process the config, returning an error on failure
    fn sanitize(stress_config: &StressConfig) -> Result<(), Error>;
}

/// Checks that `value` parses as a URL, reporting failures against `sanitizer_name`.
pub(crate) fn sanitize_url(sanitizer_name: &str, field: &str, value: &str) -> Result<(), Error> {
    url::Url::parse(value).map(|_| ()).map_err(|error| {
        Error::ConfigSanitizerFailed(
            sanitizer_name.to_string(),
            format!("{} is not a valid URL ({}): {}", field, value, error),
        )
    })
}
