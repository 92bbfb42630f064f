//! Service URL templates and path-parameter substitution.

use std::collections::HashMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::error::Error;

/// Characters left untouched when encoding a single path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Build a service URL from a parameterized template.
///
/// Starts from `defaults`, overlays `provided`, and substitutes every
/// `{name}` placeholder in `template`. A provided variable that has no
/// default is rejected, as is a placeholder left without a value.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use scc_core::construct_service_url;
///
/// let defaults = HashMap::from([("environment", "us-south.compliance")]);
/// let url = construct_service_url(
///     "https://{environment}.cloud.ibm.com",
///     &defaults,
///     &HashMap::new(),
/// )
/// .unwrap();
/// assert_eq!(url, "https://us-south.compliance.cloud.ibm.com");
/// ```
pub fn construct_service_url(
    template: &str,
    defaults: &HashMap<&str, &str>,
    provided: &HashMap<String, String>,
) -> Result<String, Error> {
    let mut values: HashMap<&str, &str> = defaults.clone();
    for (name, value) in provided {
        let Some((known, _)) = defaults.get_key_value(name.as_str()) else {
            let mut allowed: Vec<&str> = defaults.keys().copied().collect();
            allowed.sort_unstable();
            return Err(Error::validation(format!(
                "'{name}' is an invalid variable name; valid variable names are [{}]",
                allowed.join(", ")
            )));
        };
        values.insert(known, value.as_str());
    }

    substitute(template, |name| values.get(name).map(|v| (*v).to_owned()))
}

/// Join `base_url` and a path template, replacing each `{name}` segment with
/// the percent-encoded value from `params`.
///
/// A missing or empty parameter is a validation error, so a required
/// parameter can never produce an empty path segment.
pub fn resolve_request_url(
    base_url: &str,
    path: &str,
    params: &HashMap<&str, &str>,
) -> Result<String, Error> {
    if base_url.is_empty() {
        return Err(Error::UrlMissing);
    }
    let resolved = substitute(path, |name| match params.get(name) {
        Some(value) if !value.is_empty() => {
            Some(utf8_percent_encode(value, PATH_SEGMENT).to_string())
        }
        _ => None,
    })
    .map_err(|_| {
        let missing = placeholders(path)
            .into_iter()
            .find(|name| params.get(name).is_none_or(|v| v.is_empty()))
            .unwrap_or_default();
        Error::validation(format!("path parameter '{missing}' is empty or missing"))
    })?;

    let base = base_url.trim_end_matches('/');
    if resolved.is_empty() {
        return Ok(base.to_owned());
    }
    if resolved.starts_with('/') {
        Ok(format!("{base}{resolved}"))
    } else {
        Ok(format!("{base}/{resolved}"))
    }
}

fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else { break };
        names.push(&after[..close]);
        rest = &after[close + 1..];
    }
    names
}

fn substitute<F>(template: &str, mut lookup: F) -> Result<String, Error>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| Error::validation(format!("unterminated placeholder in '{template}'")))?;
        let name = &after[..close];
        let value = lookup(name)
            .ok_or_else(|| Error::validation(format!("no value for URL variable '{name}'")))?;
        out.push_str(&value);
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
