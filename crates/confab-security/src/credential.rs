/// Cookie names consulted after the configured one.
pub const FALLBACK_COOKIE_NAMES: [&str; 2] = ["access_token_cookie", "access_token"];

/// Extract a bearer token from the `Authorization` header or the cookies.
///
/// `Authorization: Bearer <token>` wins. Otherwise the cookies `cookie_name`,
/// `access_token_cookie` and `access_token` are tried in that order; a cookie
/// may hold `"Bearer <token>"` (quoted), `Bearer <token>` or the bare token.
pub fn extract_credential(
    authorization: Option<&str>,
    cookie_header: Option<&str>,
    cookie_name: &str,
) -> Option<String> {
    if let Some(token) = authorization.and_then(bearer_param) {
        return Some(token.to_string());
    }

    let cookie_header = cookie_header?;
    std::iter::once(cookie_name)
        .chain(FALLBACK_COOKIE_NAMES)
        .find_map(|name| cookie_value(cookie_header, name))
        .map(token_from_cookie)
}

fn bearer_param(value: &str) -> Option<&str> {
    let (scheme, param) = split_scheme(value);
    (scheme.eq_ignore_ascii_case("bearer") && !param.is_empty()).then_some(param)
}

fn split_scheme(value: &str) -> (&str, &str) {
    match value.trim().split_once(' ') {
        Some((scheme, param)) => (scheme, param.trim()),
        None => (value.trim(), ""),
    }
}

fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value)
}

fn token_from_cookie(value: &str) -> String {
    if let Some(quoted) = value
        .strip_prefix("\"Bearer ")
        .and_then(|rest| rest.strip_suffix('"'))
    {
        return quoted.to_string();
    }
    bearer_param(value).unwrap_or(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_bearer_wins_over_cookie() {
        let token = extract_credential(
            Some("Bearer header-token"),
            Some("access-token=cookie-token"),
            "access-token",
        );
        assert_eq!(token.as_deref(), Some("header-token"));
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let token = extract_credential(Some("bearer abc"), None, "access-token");
        assert_eq!(token.as_deref(), Some("abc"));
    }

    #[test]
    fn non_bearer_header_falls_back_to_cookie() {
        let token = extract_credential(
            Some("Basic dXNlcjpwYXNz"),
            Some("access-token=Bearer xyz"),
            "access-token",
        );
        assert_eq!(token.as_deref(), Some("xyz"));
    }

    #[test]
    fn quoted_bearer_cookie_is_unwrapped() {
        let token = extract_credential(
            None,
            Some("theme=dark; access-token=\"Bearer q.w.e\""),
            "access-token",
        );
        assert_eq!(token.as_deref(), Some("q.w.e"));
    }

    #[test]
    fn bare_cookie_value_is_the_token() {
        let token = extract_credential(None, Some("access_token=raw"), "access-token");
        assert_eq!(token.as_deref(), Some("raw"));
    }

    #[test]
    fn configured_cookie_is_tried_first() {
        let token = extract_credential(
            None,
            Some("access_token=fallback; session=primary"),
            "session",
        );
        assert_eq!(token.as_deref(), Some("primary"));
    }

    #[test]
    fn empty_cookie_values_are_skipped() {
        let token = extract_credential(
            None,
            Some("access-token=; access_token_cookie=second"),
            "access-token",
        );
        assert_eq!(token.as_deref(), Some("second"));
    }

    #[test]
    fn nothing_found() {
        assert_eq!(extract_credential(None, None, "access-token"), None);
        assert_eq!(
            extract_credential(Some("Bearer"), Some("other=1"), "access-token"),
            None
        );
    }
}
