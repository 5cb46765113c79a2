/// Reduce a configured instance string to a bare host.
///
/// Strips an `https://` or `http://` scheme and everything from the first `/`
/// onwards. Requests are always issued over `https://`.
///
/// ```
/// use tagrank_social::mastodon::sanitize_instance;
///
/// assert_eq!(sanitize_instance("https://example.social/foo"), "example.social");
/// assert_eq!(sanitize_instance("http://example.social"), "example.social");
/// assert_eq!(sanitize_instance("example.social"), "example.social");
/// ```
pub fn sanitize_instance(instance: &str) -> String {
    let trimmed = instance.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    match without_scheme.split_once('/') {
        Some((host, _)) => host.to_string(),
        None => without_scheme.to_string(),
    }
}

/// `https://{host}` for a sanitised host.
pub fn base_url(host: &str) -> String {
    format!("https://{host}")
}
