use url::Url;

/// Normalises a URI per §6: lowercase scheme/host, default port stripped, no trailing slash
/// except on the root path.
#[must_use]
pub fn normalise(uri: &str) -> Option<Url> {
    let mut url = Url::parse(uri).ok()?;
    let _ = url.set_scheme(&url.scheme().to_ascii_lowercase());
    if let Some(host) = url.host_str() {
        let host = host.to_ascii_lowercase();
        let _ = url.set_host(Some(&host));
    }
    url.set_fragment(None);

    if url.path().len() > 1 && url.path().ends_with('/') {
        let trimmed = url.path().trim_end_matches('/').to_string();
        url.set_path(&trimmed);
    }
    Some(url)
}

#[must_use]
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme() && a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
}

/// Audience-containment check (§4.6 step 7): `resource` must share origin with `aud` and its
/// path must equal or descend from `aud`'s path.
#[must_use]
pub fn audience_contains(aud: &str, resource: &str) -> bool {
    let Some(a) = normalise(aud) else {
        return false;
    };
    let Some(r) = normalise(resource) else {
        return false;
    };
    if !same_origin(&a, &r) {
        return false;
    }
    let a_path = a.path();
    let r_path = r.path();
    r_path == a_path || r_path.starts_with(&format!("{a_path}/"))
}
