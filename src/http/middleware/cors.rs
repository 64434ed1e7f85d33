//! CORS headers and preflight handling.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::server::AppState;
use crate::security::cors::{ALLOW_HEADERS, ALLOW_METHODS};
use crate::security::{CorsPolicy, OriginDecision};

/// Answer preflights and decorate every other response.
///
/// The policy is rebuilt from the live config so a reload changes the
/// allow-list without restarting the listener.
pub async fn cors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let policy = CorsPolicy::from_config(&state.config.load().cors);
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok());
    let decision = policy.decide(origin);

    if request.method() == Method::OPTIONS {
        if decision == OriginDecision::Denied {
            tracing::debug!(origin = ?origin, "Preflight refused");
            return (StatusCode::FORBIDDEN, "Forbidden").into_response();
        }
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_cors_headers(response.headers_mut(), &decision);
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut(), &decision);
    response
}

pub fn apply_cors_headers(headers: &mut HeaderMap, decision: &OriginDecision) {
    match decision {
        OriginDecision::Wildcard => {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        }
        OriginDecision::Echo(origin) => {
            if let Ok(value) = HeaderValue::from_str(origin) {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
                headers.append(header::VARY, HeaderValue::from_static("Origin"));
            }
        }
        OriginDecision::Denied | OriginDecision::Absent => {}
    }
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_sets_vary() {
        let mut headers = HeaderMap::new();
        apply_cors_headers(&mut headers, &OriginDecision::Echo("https://a.example".into()));
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://a.example");
        assert_eq!(headers[header::VARY], "Origin");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], ALLOW_METHODS);
    }

    #[test]
    fn test_denied_has_no_origin_header() {
        let mut headers = HeaderMap::new();
        apply_cors_headers(&mut headers, &OriginDecision::Denied);
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert!(headers.get(header::VARY).is_none());
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], ALLOW_HEADERS);
    }

    #[test]
    fn test_wildcard() {
        let mut headers = HeaderMap::new();
        apply_cors_headers(&mut headers, &OriginDecision::Wildcard);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
