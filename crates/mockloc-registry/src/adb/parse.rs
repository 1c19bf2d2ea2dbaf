//! Parsers for adb command output.

use crate::error::{RegistryError, RegistryResult};

/// Parse `getprop ro.build.version.sdk`.
pub(crate) fn parse_api_level(output: &str) -> RegistryResult<u32> {
    let trimmed = output.trim();
    trimmed.parse().map_err(|_| RegistryError::Parse {
        path: "ro.build.version.sdk".to_string(),
        message: format!("not an API level: {:?}", trimmed),
    })
}

/// Parse `pm list packages` output.
///
/// Lines look like `package:com.example.app`, or with `-f`
/// `package:/data/app/.../base.apk=com.example.app`.
pub(crate) fn parse_package_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("package:")?;
            let id = match rest.rfind('=') {
                Some(pos) => &rest[pos + 1..],
                None => rest,
            };
            let id = id.trim();
            (!id.is_empty()).then(|| id.to_string())
        })
        .collect()
}

/// Parse `settings get secure location_providers_allowed` (`gps,network`).
pub(crate) fn parse_location_providers(output: &str) -> Vec<String> {
    let trimmed = output.trim();
    if trimmed == "null" {
        return Vec::new();
    }
    trimmed
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// Quote one argument for the device shell.
pub(crate) fn shell_quote(arg: &str) -> String {
    if !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/' | ':'))
    {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}
