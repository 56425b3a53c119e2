//! Parsing of OAuth implicit-flow redirect URLs.

use std::collections::HashMap;

const TOKEN_MARKER: &str = "access_token=";
const ERROR_MARKER: &str = "error=";

/// What a redirect URL says about the login
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    Token(String),
    Error(String),
    Unrecognized,
}

/// Whether `url` is the final redirect of the login flow.
pub fn has_marker(url: &str) -> bool {
    marker_after_start(url, TOKEN_MARKER) || marker_after_start(url, ERROR_MARKER)
}

fn marker_after_start(url: &str, marker: &str) -> bool {
    url.find(marker).is_some_and(|index| index > 0)
}

/// Extracts the token from the fragment or the error from the query component.
pub fn parse_redirect(url: &str) -> RedirectOutcome {
    if marker_after_start(url, TOKEN_MARKER) {
        let fragment = url.split_once('#').map_or(url, |(_, fragment)| fragment);
        return match parse_query_string(fragment).remove("access_token") {
            Some(token) if !token.is_empty() => RedirectOutcome::Token(token),
            _ => RedirectOutcome::Unrecognized,
        };
    }

    if marker_after_start(url, ERROR_MARKER) {
        let before_fragment = url.split_once('#').map_or(url, |(head, _)| head);
        let query = before_fragment
            .split_once('?')
            .map_or("", |(_, query)| query);
        let fragment = url.split_once('#').map_or("", |(_, fragment)| fragment);

        let error = parse_query_string(query)
            .remove("error")
            .or_else(|| parse_query_string(fragment).remove("error"));
        return match error {
            Some(error) => RedirectOutcome::Error(error),
            None => RedirectOutcome::Unrecognized,
        };
    }

    RedirectOutcome::Unrecognized
}

/// Decodes the whole string, then splits on `&` and `=`.
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    let decoded = urlencoding::decode(query)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| query.to_string());

    decoded
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

/// Percent-encodes key/value pairs into `k=v&k=v`.
pub fn to_query_string<K: AsRef<str>, V: AsRef<str>>(params: &[(K, V)]) -> String {
    params
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                urlencoding::encode(k.as_ref()),
                urlencoding::encode(v.as_ref())
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}
