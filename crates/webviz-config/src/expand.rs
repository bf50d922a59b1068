//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// Only braced references are expanded. A bare `$` (as in `reports/$draft`)
/// is kept literally, as is an unterminated `${`.
///
/// `field` names the configuration key being expanded and is only used to
/// build the error message.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    let mut expanded = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}').map(|offset| start + offset) else {
            break;
        };
        expanded.push_str(&rest[..start]);
        let reference = &rest[start..=end];
        let resolved = shellexpand::env(reference).map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })?;
        expanded.push_str(&resolved);
        rest = &rest[end + 1..];
    }
    expanded.push_str(rest);
    Ok(expanded)
}
