//! Outbound fetch safety for the identifier resolver (§4.1).
//!
//! Policy-only: callers choose `https_only` based on deployment config and apply the result
//! before issuing the request.

use lws_core::ResolverError;
use std::net::IpAddr;
use url::Url;

/// Validates a resolver target URI per §4.1: scheme must be `http`/`https`; in HTTPS-only mode,
/// only `https` is accepted except for loopback hosts (development convenience).
pub fn check_resolver_url(url: &Url, https_only: bool) -> Result<(), ResolverError> {
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(ResolverError::InvalidUri(format!(
            "unsupported scheme '{scheme}'"
        )));
    }

    if https_only && scheme != "https" && !is_loopback_host(url) {
        return Err(ResolverError::HttpsRequired);
    }

    Ok(())
}

fn is_loopback_host(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.parse::<IpAddr>()
        .map(|ip| ip.is_loopback())
        .unwrap_or(false)
}
