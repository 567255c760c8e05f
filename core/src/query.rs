//! Query string encoding.

/// Render `params` as `key=value` pairs joined with `&`.
///
/// Values are percent-encoded, keys are emitted as given. Iteration order of
/// the input decides pair order, so a `HashMap` yields an unspecified order.
pub fn encode<I, K, V>(params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    params
        .into_iter()
        .map(|(k, v)| format!("{}={}", k.as_ref(), urlencoding::encode(v.as_ref())))
        .collect::<Vec<_>>()
        .join("&")
}

/// Append an encoded query string to `uri`. An empty query leaves it unchanged.
pub fn append(uri: &str, query: &str) -> String {
    if query.is_empty() {
        return uri.to_string();
    }
    let sep = if uri.contains('?') { '&' } else { '?' };
    format!("{uri}{sep}{query}")
}
