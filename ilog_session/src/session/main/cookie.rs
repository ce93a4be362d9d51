use http::HeaderMap;
use http::header::{COOKIE, SET_COOKIE};

use crate::session::config::SessionConfig;
use crate::session::errors::SessionError;

/// Pick the `Domain` attribute for cookies set in response to a request for `host`.
///
/// `None` means no attribute, restricting the cookie to the request host.
/// Hosts are matched case-insensitively. A host that is not a DNS name (an IP
/// literal, stray characters) never ends up in the attribute.
pub fn cookie_domain_for_request(
    host: Option<&str>,
    enable_subdomains: bool,
    domains: &[String],
) -> Option<String> {
    let host = host?;
    let host = host.split(':').next().unwrap_or(host).to_ascii_lowercase();
    if !is_plausible_hostname(&host) {
        tracing::debug!("Not scoping cookie to host {:?}", host);
        return None;
    }

    for domain in domains {
        let domain = domain.trim().to_ascii_lowercase();
        let suffix = format!(".{domain}");
        if host == domain {
            return enable_subdomains.then_some(suffix);
        }
        if enable_subdomains && host.ends_with(&suffix) {
            return Some(suffix);
        }
    }

    enable_subdomains.then(|| format!(".{host}"))
}

/// Dot separated labels of letters, digits and hyphens, not ending in a
/// numeric label.
fn is_plausible_hostname(host: &str) -> bool {
    if host.is_empty() || host.len() > 253 {
        return false;
    }
    let labels: Vec<&str> = host.split('.').collect();
    let valid_labels = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    });
    let numeric_tld = labels
        .last()
        .is_some_and(|tld| tld.bytes().all(|b| b.is_ascii_digit()));
    valid_labels && !numeric_tld
}

/// Render a `Set-Cookie` value for session `uid`.
pub fn session_cookie(name: &str, uid: &str, max_age: u64, domain: Option<&str>) -> String {
    let mut cookie = format!("{name}={uid}; Path=/; Max-Age={max_age}");
    if let Some(domain) = domain {
        cookie.push_str("; Domain=");
        cookie.push_str(domain);
    }
    cookie.push_str("; HttpOnly; SameSite=Lax");
    cookie
}

/// Cookie that makes the browser forget the session.
pub fn expired_session_cookie(name: &str, domain: Option<&str>) -> String {
    session_cookie(name, "", 0, domain)
}

/// Make the session cookie for `uid` last as long as the persistent session.
pub fn savor_session_cookie(
    config: &SessionConfig,
    host: Option<&str>,
    uid: &str,
) -> Result<HeaderMap, SessionError> {
    tracing::debug!("Making the session cookie last as long as the persistent session");
    let domain = cookie_domain_for_request(host, config.enable_subdomains, &config.domains);
    let mut headers = HeaderMap::new();
    header_set_cookie(
        &mut headers,
        session_cookie(
            &config.cookie_name,
            uid,
            config.persistent_lifetime,
            domain.as_deref(),
        ),
    )?;
    Ok(headers)
}

/// Cookie for a session that only lives as long as its transient lifetime.
pub fn transient_session_cookie(
    config: &SessionConfig,
    host: Option<&str>,
    uid: &str,
) -> Result<HeaderMap, SessionError> {
    let domain = cookie_domain_for_request(host, config.enable_subdomains, &config.domains);
    let mut headers = HeaderMap::new();
    header_set_cookie(
        &mut headers,
        session_cookie(
            &config.cookie_name,
            uid,
            config.transient_lifetime,
            domain.as_deref(),
        ),
    )?;
    Ok(headers)
}

pub fn logout_cookie(config: &SessionConfig, host: Option<&str>) -> Result<HeaderMap, SessionError> {
    let domain = cookie_domain_for_request(host, config.enable_subdomains, &config.domains);
    let mut headers = HeaderMap::new();
    header_set_cookie(
        &mut headers,
        expired_session_cookie(&config.cookie_name, domain.as_deref()),
    )?;
    Ok(headers)
}

pub(crate) fn header_set_cookie(headers: &mut HeaderMap, cookie: String) -> Result<(), SessionError> {
    headers.append(
        SET_COOKIE,
        cookie
            .parse()
            .map_err(|_| SessionError::Cookie("Failed to parse cookie".to_string()))?,
    );
    Ok(())
}

/// The value of cookie `name` in the request headers, if any.
pub fn session_id_from_headers<'a>(
    headers: &'a HeaderMap,
    name: &str,
) -> Result<Option<&'a str>, SessionError> {
    let Some(cookie_header) = headers.get(COOKIE) else {
        tracing::debug!("No cookie header found");
        return Ok(None);
    };

    let cookie_str = cookie_header.to_str().map_err(|e| {
        tracing::error!("Invalid cookie header: {}", e);
        SessionError::Cookie("Invalid cookie header".to_string())
    })?;

    let session_id = cookie_str.split(';').map(str::trim).find_map(|s| {
        let mut parts = s.splitn(2, '=');
        match (parts.next(), parts.next()) {
            (Some(k), Some(v)) if k == name && !v.is_empty() => Some(v),
            _ => None,
        }
    });

    if session_id.is_none() {
        tracing::debug!("No session cookie '{}' found in cookies", name);
    }

    Ok(session_id)
}
