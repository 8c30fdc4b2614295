//! Resolving call paths against a handle's endpoint

use crate::error::{ClientError, ClientResult};
use url::{Host, Url};

/// Joins endpoint and call paths with base-URL semantics
pub struct UrlBuilder;

impl UrlBuilder {
    /// Resolve `path` against `endpoint`
    ///
    /// - `join("https://api.example.com/v1", "users")` -> `https://api.example.com/v1/users`
    /// - `join("https://api.example.com/v1/", "users")` -> `https://api.example.com/v1/users`
    /// - `join("https://api.example.com/v1", "/users")` -> `https://api.example.com/users`
    /// - `join("https://api.example.com", "https://cdn.example.com/a")` -> `https://cdn.example.com/a`
    pub fn join(endpoint: &str, path: &str) -> ClientResult<Url> {
        let mut base = Url::parse(endpoint)
            .map_err(|e| ClientError::InvalidUrl(format!("'{}': {}", endpoint, e)))?;

        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(format!(
                "'{}' cannot be used as an endpoint",
                endpoint
            )));
        }

        if path.is_empty() {
            return Ok(base);
        }

        if !path.starts_with('/') && !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }

        base.join(path).map_err(|e| {
            ClientError::InvalidUrl(format!("cannot join '{}' with '{}': {}", endpoint, path, e))
        })
    }

    /// Host and port the call will connect to, used by reachability probes
    ///
    /// IPv6 literals come back without brackets so they parse as addresses.
    pub fn authority(url: &Url) -> ClientResult<(String, u16)> {
        let host = match url.host() {
            Some(Host::Ipv6(addr)) => addr.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Domain(domain)) => domain.to_string(),
            None => return Err(ClientError::InvalidUrl(format!("'{}' has no host", url))),
        };
        let port = url
            .port_or_known_default()
            .ok_or_else(|| ClientError::InvalidUrl(format!("'{}' has no known port", url)))?;
        Ok((host, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_paths_append() {
        assert_eq!(
            UrlBuilder::join("https://api.example.com/v1", "users").unwrap().as_str(),
            "https://api.example.com/v1/users"
        );
        assert_eq!(
            UrlBuilder::join("https://api.example.com/v1/", "users/7").unwrap().as_str(),
            "https://api.example.com/v1/users/7"
        );
        assert_eq!(
            UrlBuilder::join("https://api.example.com", "users").unwrap().as_str(),
            "https://api.example.com/users"
        );
    }

    #[test]
    fn test_absolute_path_replaces_base_path() {
        assert_eq!(
            UrlBuilder::join("https://api.example.com/v1", "/health").unwrap().as_str(),
            "https://api.example.com/health"
        );
    }

    #[test]
    fn test_full_url_overrides_endpoint() {
        assert_eq!(
            UrlBuilder::join("https://api.example.com/v1", "https://cdn.example.com/a.json")
                .unwrap()
                .as_str(),
            "https://cdn.example.com/a.json"
        );
    }

    #[test]
    fn test_query_is_kept() {
        assert_eq!(
            UrlBuilder::join("https://api.example.com", "search?q=rust&page=2")
                .unwrap()
                .as_str(),
            "https://api.example.com/search?q=rust&page=2"
        );
    }

    #[test]
    fn test_malformed_endpoint() {
        assert!(matches!(
            UrlBuilder::join("not a url", "users"),
            Err(ClientError::InvalidUrl(_))
        ));
        assert!(matches!(
            UrlBuilder::join("mailto:someone@example.com", "x"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_authority_defaults_port() {
        let url = Url::parse("https://api.example.com/v1").unwrap();
        assert_eq!(
            UrlBuilder::authority(&url).unwrap(),
            ("api.example.com".to_string(), 443)
        );
        let url = Url::parse("http://localhost:8081/").unwrap();
        assert_eq!(UrlBuilder::authority(&url).unwrap(), ("localhost".to_string(), 8081));
    }

    #[test]
    fn test_authority_strips_ipv6_brackets() {
        let url = Url::parse("http://[::1]:8080/v1").unwrap();
        assert_eq!(UrlBuilder::authority(&url).unwrap(), ("::1".to_string(), 8080));

        let url = Url::parse("https://[2001:db8::7]/").unwrap();
        assert_eq!(
            UrlBuilder::authority(&url).unwrap(),
            ("2001:db8::7".to_string(), 443)
        );
    }
}
