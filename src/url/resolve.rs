use crate::{UrlError, UrlResult};
use url::Url;

/// Joins path segments into one normalized path
///
/// All segments are concatenated with `/`, repeated slashes collapse into one,
/// `/./` collapses into `/`, and a leading `./` or trailing `/.` is stripped.
/// Each `..` then removes the piece before it. A `..` with nothing left to
/// remove is kept literally, so the result may begin with `..`.
///
/// The result is rooted (starts with `/`) when the first non-blank segment
/// starts with `/` and the result does not begin with `..`.
///
/// # Examples
///
/// ```
/// use driftnet::url::normalized_join;
///
/// assert_eq!(normalized_join(&["/foo", "/bar"]), "/foo/bar");
/// assert_eq!(normalized_join(&["example.com", "/foo", "/bar"]), "example.com/foo/bar");
/// assert_eq!(normalized_join(&["/a/b", "../../../test"]), "../test");
/// ```
pub fn normalized_join<S: AsRef<str>>(segments: &[S]) -> String {
    let rooted = segments
        .iter()
        .map(|s| s.as_ref().trim())
        .find(|s| !s.is_empty())
        .is_some_and(|s| s.starts_with('/'));

    let mut joined = segments
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join("/")
        .trim()
        .to_string();

    while joined.contains("//") {
        joined = joined.replace("//", "/");
    }

    while joined.contains("/./") {
        joined = joined.replace("/./", "/");
    }

    if let Some(rest) = joined.strip_prefix("./") {
        joined = rest.to_string();
    }

    if let Some(rest) = joined.strip_suffix("/.") {
        joined = rest.to_string();
    }

    let mut pieces: Vec<&str> = Vec::new();

    for piece in joined.split('/').map(str::trim).filter(|p| !p.is_empty()) {
        if piece == ".." && !pieces.is_empty() {
            pieces.pop();
        } else {
            pieces.push(piece);
        }
    }

    let out = pieces.join("/");

    if rooted && !out.starts_with("..") {
        format!("/{}", out)
    } else {
        out
    }
}

/// Resolves a possibly-relative URL reference against a base URL
///
/// # Resolution Rules
///
/// | Reference              | Result                                          |
/// |------------------------|-------------------------------------------------|
/// | contains `://`         | returned unchanged                              |
/// | starts with `//`       | base scheme + `://` + normalized reference      |
/// | starts with `/`        | base scheme + `://` + join(base host, reference)|
/// | anything else          | base scheme + `://` + join(base host, base path, reference) |
///
/// The last path segment of the base is never stripped, even if it looks like
/// a file name: `resolve("https://a.com/x/y.html", "z")` yields
/// `https://a.com/x/y.html/z`.
///
/// # Errors
///
/// Returns `UrlError` if the base URL must be consulted and is malformed.
///
/// # Examples
///
/// ```
/// use driftnet::url::resolve;
///
/// assert_eq!(
///     resolve("https://example.com/foo/bar", "../hello/world").unwrap(),
///     "https://example.com/foo/hello/world"
/// );
/// assert_eq!(
///     resolve("http://example.com/foo/bar.html", "//just-a-test.com/temp.png").unwrap(),
///     "http://just-a-test.com/temp.png"
/// );
/// ```
pub fn resolve(base: &str, reference: &str) -> UrlResult<String> {
    if reference.contains("://") {
        return Ok(reference.to_string());
    }

    let base_url = Url::parse(base).map_err(|e| UrlError::Parse(format!("{}: {}", base, e)))?;
    let scheme = base_url.scheme();

    if let Some(network_path) = reference.strip_prefix("//") {
        return Ok(format!("{}://{}", scheme, normalized_join(&[network_path])));
    }

    let authority = base_authority(&base_url)?;

    if reference.starts_with('/') {
        return Ok(format!(
            "{}://{}",
            scheme,
            normalized_join(&[authority.as_str(), reference])
        ));
    }

    Ok(format!(
        "{}://{}",
        scheme,
        normalized_join(&[authority.as_str(), base_url.path(), reference])
    ))
}

/// Host of the base URL, with its port when one is given explicitly
fn base_authority(base: &Url) -> UrlResult<String> {
    let host = base.host_str().ok_or(UrlError::MissingHost)?;
    Ok(match base.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}
