//! Decoding of the platform's response envelope.
//!
//! Every endpoint answers with `{"code": 1 | 0, "data": ..., "messages": ...}`.
//! The checks run in a fixed order so callers can branch on the failure kind:
//! HTTP status, then JSON syntax, then `code`, then the expected payload.

use serde_json::Value;

use super::OAuthError;
use crate::transport::HttpResponse;

/// Check status, JSON syntax and `code`; return the `data` value on success.
pub fn decode_envelope(response: &HttpResponse) -> Result<Value, OAuthError> {
    if !response.is_success() {
        return Err(OAuthError::HttpStatus {
            status: response.status,
        });
    }

    let body: Value = serde_json::from_str(&response.body).map_err(|e| OAuthError::Decode {
        message: e.to_string(),
    })?;

    if response_code(&body) == Some(1) {
        return Ok(body.get("data").cloned().unwrap_or(Value::Null));
    }

    let messages = body.get("messages").map(messages_from).unwrap_or_default();
    Err(OAuthError::Api { messages })
}

/// Decode a token exchange response into the access token string.
pub fn decode_token_response(response: &HttpResponse) -> Result<String, OAuthError> {
    let data = decode_envelope(response)?;

    ["access_token", "accessToken"]
        .iter()
        .find_map(|key| data.get(*key).and_then(Value::as_str))
        .filter(|token| !token.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| OAuthError::Protocol {
            message: "successful response is missing data.access_token".to_string(),
        })
}

/// `code` as an integer; the platform sends it as a number or numeric string.
fn response_code(body: &Value) -> Option<i64> {
    match body.get("code")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Flatten `messages`, which arrives as an array, an object or a string.
fn messages_from(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(messages_from).collect(),
        Value::Object(map) => map.values().flat_map(messages_from).collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_success_returns_token() {
        let token =
            decode_token_response(&response(200, r#"{"code":1,"data":{"access_token":"T"}}"#))
                .unwrap();
        assert_eq!(token, "T");
    }

    #[test]
    fn test_string_code_and_camel_case_token() {
        let token =
            decode_token_response(&response(200, r#"{"code":"1","data":{"accessToken":"T2"}}"#))
                .unwrap();
        assert_eq!(token, "T2");
    }

    #[test]
    fn test_status_checked_before_body() {
        let result = decode_token_response(&response(500, "not json"));
        assert!(matches!(result, Err(OAuthError::HttpStatus { status: 500 })));
    }

    #[test]
    fn test_non_json_body() {
        let result = decode_token_response(&response(200, "<html>oops</html>"));
        assert!(matches!(result, Err(OAuthError::Decode { .. })));
    }

    #[test]
    fn test_success_without_token_is_protocol_error() {
        for body in [
            r#"{"code":1}"#,
            r#"{"code":1,"data":{}}"#,
            r#"{"code":1,"data":{"access_token":""}}"#,
        ] {
            let result = decode_token_response(&response(200, body));
            assert!(matches!(result, Err(OAuthError::Protocol { .. })), "{}", body);
        }
    }

    #[test]
    fn test_api_error_carries_messages() {
        let result = decode_token_response(&response(200, r#"{"code":0,"messages":["bad code"]}"#));
        match result {
            Err(OAuthError::Api { messages }) => assert_eq!(messages, vec!["bad code"]),
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_messages_shapes() {
        assert_eq!(
            messages_from(&serde_json::json!({"accessCode": "expired", "appId": ["unknown"]})),
            vec!["expired", "unknown"]
        );
        assert_eq!(messages_from(&serde_json::json!("single")), vec!["single"]);
        assert!(messages_from(&Value::Null).is_empty());
    }

    #[test]
    fn test_missing_code_is_api_error() {
        let result = decode_envelope(&response(200, r#"{"data":{}}"#));
        assert!(matches!(result, Err(OAuthError::Api { messages }) if messages.is_empty()));
    }

    #[test]
    fn test_envelope_returns_data() {
        let data = decode_envelope(&response(200, r#"{"code":1,"data":{"products":[]}}"#)).unwrap();
        assert_eq!(data, serde_json::json!({"products": []}));
    }
}
