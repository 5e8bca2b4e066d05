use url::Url;

/// Normalize a configured server endpoint so it ends with exactly one `/`.
///
/// Returns `None` for a missing or blank endpoint; that is offline mode, not an error.
pub fn normalize_server_base(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    Some(format!("{}/", raw.trim_end_matches('/')))
}

/// Resolve `segments` below a normalized base url. Each segment is
/// percent-encoded, so batch ids cannot escape their path position.
pub fn endpoint_url(base: &str, segments: &[&str]) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
