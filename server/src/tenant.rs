//! Tags each request with the tenant named by its subdomain.

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use optitalent_api::TenantTag;

pub const TENANT_HEADER: HeaderName = HeaderName::from_static("x-tenant-slug");

/// `acme.example.com` under `example.com` yields `acme`. The bare domain,
/// `www` and unrelated hosts yield `None`. Ports, case and a trailing root
/// dot are ignored on both sides.
pub fn tenant_from_host(host: &str, base_domain: &str) -> Option<String> {
    let host = host.trim().to_ascii_lowercase();
    let host = host.split(':').next().unwrap_or_default().trim_end_matches('.');
    let base = base_domain.trim().trim_end_matches('.').to_ascii_lowercase();
    if base.is_empty() {
        return None;
    }
    let prefix = host.strip_suffix(base.as_str())?.strip_suffix('.')?;
    let slug = prefix.rsplit('.').next()?;
    if slug.is_empty() || slug == "www" {
        return None;
    }
    Some(slug.to_string())
}

pub async fn tag_tenant(
    State(base_domain): State<std::sync::Arc<str>>,
    mut request: Request,
    next: Next,
) -> Response {
    // never trust a caller-supplied tag
    request.headers_mut().remove(&TENANT_HEADER);
    let slug = request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .and_then(|host| tenant_from_host(host, &base_domain));
    if let Some(slug) = slug {
        if let Ok(value) = HeaderValue::from_str(&slug) {
            request.headers_mut().insert(TENANT_HEADER, value);
        }
        request.extensions_mut().insert(TenantTag(slug));
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subdomains_name_tenants() {
        assert_eq!(tenant_from_host("acme.localhost:8080", "localhost").as_deref(), Some("acme"));
        assert_eq!(
            tenant_from_host("Globex.optitalent.io", "optitalent.io").as_deref(),
            Some("globex")
        );
        assert_eq!(
            tenant_from_host("eu.acme.optitalent.io", "optitalent.io").as_deref(),
            Some("acme")
        );
    }

    #[test]
    fn host_and_base_domain_are_normalised() {
        assert_eq!(
            tenant_from_host("acme.example.com.", "example.com").as_deref(),
            Some("acme")
        );
        assert_eq!(
            tenant_from_host("acme.example.com:443", "Example.COM.").as_deref(),
            Some("acme")
        );
        assert_eq!(tenant_from_host("example.com.", "example.com"), None);
        assert_eq!(tenant_from_host("acme.example.com", ""), None);
    }

    #[test]
    fn bare_and_foreign_hosts_have_no_tenant() {
        assert_eq!(tenant_from_host("localhost:8080", "localhost"), None);
        assert_eq!(tenant_from_host("www.optitalent.io", "optitalent.io"), None);
        assert_eq!(tenant_from_host("acme.example.com", "optitalent.io"), None);
        assert_eq!(tenant_from_host("notoptitalent.io", "optitalent.io"), None);
    }
}
