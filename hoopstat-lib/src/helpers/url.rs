use url::Url;

use crate::{ErrorKind, QueryParams, Result};

/// Build the URL for `endpoint` below `base`.
///
/// The endpoint path is joined onto the base path like a POSIX path join
/// (duplicate slashes collapse, `.` and `..` are resolved, no trailing slash),
/// and the query string is produced by [`QueryParams::encode`], so the result
/// does not depend on the order in which parameters were added.
///
/// # Errors
///
/// Returns [`ErrorKind::InvalidBase`] if `base` cannot carry a path
/// (e.g. `mailto:` URLs).
pub(crate) fn build_url(base: &Url, endpoint: &str, params: &QueryParams) -> Result<Url> {
    if base.cannot_be_a_base() {
        return Err(ErrorKind::InvalidBase(
            base.to_string(),
            "URL cannot be a base".to_string(),
        ));
    }

    let mut url = base.clone();
    url.set_path(&join_path(base.path(), endpoint));
    url.set_query(params.encode().as_deref());
    url.set_fragment(None);
    Ok(url)
}

/// Join two slash-separated paths and clean the result lexically.
fn join_path(base: &str, endpoint: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(endpoint.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}
