//! Versioned request URI composition.
//!
//! Two shapes are supported:
//! - flat: `base + suffix`, where the suffix template already carries `api-version`
//! - structured: `base/type1/id1/type2/id2?api-version=V&k=v...`
//!
//! Path segments are inserted verbatim. Values that may contain reserved
//! characters go through [`escape`] first.

use url::Url;

use crate::{resources::API_VERSION_PARAMETER, GatewayError, Result};

/// Ordered query parameters appended after `api-version`.
pub type QueryParams = Vec<(String, String)>;

/// Joins a base endpoint with a suffix template.
///
/// The boundary is normalised to exactly one `/`.
pub fn compose_flat(base: &str, suffix: &str) -> Result<String> {
    let base = base.trim_end_matches('/');
    let suffix = suffix.trim_start_matches('/');
    validate(format!("{base}/{suffix}"))
}

/// Builds `base/type1/id1/.../typeN[/idN]?api-version=V&k=v...`.
///
/// `resource_ids` may be shorter than `resource_types`; trailing types are
/// emitted without an id.
pub fn compose_structured<T, I>(
    base: &str,
    resource_types: &[T],
    resource_ids: &[I],
    api_version: &str,
    query: &[(String, String)],
) -> Result<String>
where
    T: AsRef<str>,
    I: AsRef<str>,
{
    if resource_ids.len() > resource_types.len() {
        return Err(GatewayError::InvalidArgument(format!(
            "{} resource ids supplied for {} resource types",
            resource_ids.len(),
            resource_types.len()
        )));
    }

    let mut uri = base.trim_end_matches('/').to_owned();
    for (index, resource_type) in resource_types.iter().enumerate() {
        uri.push('/');
        uri.push_str(resource_type.as_ref());
        if let Some(id) = resource_ids.get(index) {
            uri.push('/');
            uri.push_str(id.as_ref());
        }
    }

    uri.push('?');
    uri.push_str(API_VERSION_PARAMETER);
    uri.push('=');
    uri.push_str(api_version);
    append_query(&mut uri, query);

    validate(uri)
}

/// Appends `k=v` pairs in order, starting the query string if needed.
pub fn append_query(uri: &mut String, query: &[(String, String)]) {
    for (key, value) in query {
        uri.push(if uri.contains('?') { '&' } else { '?' });
        uri.push_str(key);
        uri.push('=');
        uri.push_str(value);
    }
}

/// Converts a logical name such as `fabric:/app/svc` into the path-safe id `app/svc`.
pub fn fabric_name_to_id(name: &str) -> Result<String> {
    let parsed = Url::parse(name)
        .map_err(|err| GatewayError::InvalidArgument(format!("invalid name '{name}': {err}")))?;
    Ok(parsed.path().trim_start_matches('/').to_owned())
}

/// Percent-encodes a single query or path component.
pub fn escape(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn validate(uri: String) -> Result<String> {
    Url::parse(&uri)
        .map(String::from)
        .map_err(|err| GatewayError::InvalidArgument(format!("invalid request URI '{uri}': {err}")))
}
