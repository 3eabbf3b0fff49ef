use super::error::{DecodeError, SessionError};
use super::traits::Claims;
use base64::{
    Engine, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use chrono::Utc;

/// Default number of seconds before `exp` at which a token counts as expired.
pub const DEFAULT_REFRESH_BUFFER_SECS: i64 = 60;

// JWTs are unpadded, but some issuers pad anyway
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode the claims of a `header.payload.signature` token.
///
/// The signature is NOT verified here. The authorization server checks it on
/// every API call and on refresh; the gateway only uses the claims to route.
pub fn decode(token: &str) -> Result<Claims, DecodeError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::SegmentCount(segments.len()));
    }

    let payload = URL_SAFE_LENIENT
        .decode(segments[1])
        .map_err(|_| DecodeError::Base64)?;

    serde_json::from_slice::<Claims>(&payload).map_err(|e| DecodeError::Payload(e.to_string()))
}

/// Unreadable tokens count as expired.
pub fn is_expired(token: &str, buffer_secs: i64) -> bool {
    is_expired_at(token, buffer_secs, Utc::now().timestamp())
}

pub fn is_expired_at(token: &str, buffer_secs: i64, now: i64) -> bool {
    match decode(token) {
        Ok(claims) => claims.exp <= now.saturating_add(buffer_secs),
        Err(_) => true,
    }
}

/// Seconds until `exp`, clamped at zero. Zero for unreadable tokens.
pub fn time_until_expiry(token: &str) -> u64 {
    time_until_expiry_at(token, Utc::now().timestamp())
}

pub fn time_until_expiry_at(token: &str, now: i64) -> u64 {
    match decode(token) {
        Ok(claims) => claims.exp.saturating_sub(now).max(0) as u64,
        Err(_) => 0,
    }
}

/// Decode and check freshness in one go, keeping the reason on failure.
pub fn decode_fresh(token: &str, buffer_secs: i64, now: i64) -> Result<Claims, SessionError> {
    let claims = decode(token)?;
    if claims.exp <= now.saturating_add(buffer_secs) {
        return Err(SessionError::ExpiredToken);
    }
    Ok(claims)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    pub(crate) fn make_token(payload: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{}.{}.c2lnbmF0dXJl", header, body)
    }

    fn token_expiring_at(exp: i64) -> String {
        make_token(json!({ "sub": "jane@example.com", "exp": exp }))
    }

    #[test]
    fn test_decode_full_claims() {
        let token = make_token(json!({
            "sub": "jane@example.com",
            "first_name": "Jane",
            "last_name": "Doe",
            "authority": "ROLE_ADMIN",
            "permissions": ["READ_DASHBOARD", "WRITE_DASHBOARD"],
            "teams": ["ops"],
            "last_login": NOW - 100,
            "created": NOW - 1000,
            "enabled": true,
            "validated": true,
            "iat": NOW,
            "exp": NOW + 300,
            "iss": "https://api.eventify.test"
        }));

        let claims = decode(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("jane@example.com"));
        assert_eq!(claims.first_name.as_deref(), Some("Jane"));
        assert_eq!(claims.authority.as_deref(), Some("ROLE_ADMIN"));
        assert_eq!(claims.permissions.len(), 2);
        assert_eq!(claims.teams, vec!["ops".to_string()]);
        assert_eq!(claims.exp, NOW + 300);
        assert_eq!(claims.enabled, Some(true));
    }

    #[test]
    fn test_decode_camel_case_names() {
        let token = make_token(json!({ "firstName": "Jo", "lastLogin": 5, "exp": NOW }));
        let claims = decode(&token).unwrap();
        assert_eq!(claims.first_name.as_deref(), Some("Jo"));
        assert_eq!(claims.last_login, Some(5));
    }

    #[test]
    fn test_decode_ignores_signature() {
        let token = token_expiring_at(NOW + 10);
        let (head, _) = token.rsplit_once('.').unwrap();
        assert!(decode(&format!("{}.not-a-real-signature", head)).is_ok());
    }

    #[test]
    fn test_decode_wrong_segment_count() {
        assert_eq!(decode("abc.def"), Err(DecodeError::SegmentCount(2)));
        assert_eq!(decode("a.b.c.d"), Err(DecodeError::SegmentCount(4)));
        assert_eq!(decode(""), Err(DecodeError::SegmentCount(1)));
    }

    #[test]
    fn test_decode_bad_payload() {
        assert_eq!(decode("a.!!!.c"), Err(DecodeError::Base64));

        let not_json = format!("a.{}.c", URL_SAFE_NO_PAD.encode("hello"));
        assert!(matches!(decode(&not_json), Err(DecodeError::Payload(_))));

        let no_exp = make_token(json!({ "sub": "x" }));
        assert!(matches!(decode(&no_exp), Err(DecodeError::Payload(_))));

        let array = format!("a.{}.c", URL_SAFE_NO_PAD.encode("[1,2]"));
        assert!(matches!(decode(&array), Err(DecodeError::Payload(_))));
    }

    #[test]
    fn test_decode_accepts_padding() {
        let body = base64::engine::general_purpose::URL_SAFE.encode(r#"{"exp":12}"#);
        assert!(body.ends_with('='));
        assert_eq!(decode(&format!("h.{}.s", body)).unwrap().exp, 12);
    }

    #[test]
    fn test_is_expired_boundaries() {
        // exp <= now is expired even without a buffer
        assert!(is_expired_at(&token_expiring_at(NOW), 0, NOW));
        assert!(is_expired_at(&token_expiring_at(NOW - 1), 0, NOW));
        assert!(!is_expired_at(&token_expiring_at(NOW + 1), 0, NOW));

        // inside the buffer window counts as expired
        assert!(is_expired_at(&token_expiring_at(NOW + 60), 60, NOW));
        assert!(!is_expired_at(&token_expiring_at(NOW + 61), 60, NOW));
    }

    #[test]
    fn test_is_expired_monotonic_in_buffer() {
        for offset in [-100, -1, 0, 1, 30, 59, 60, 61, 500] {
            let token = token_expiring_at(NOW + offset);
            let mut was_expired = false;
            for buffer in [0, 1, 30, 60, 120, 1000] {
                let expired = is_expired_at(&token, buffer, NOW);
                assert!(
                    !was_expired || expired,
                    "offset {} became fresh again at buffer {}",
                    offset,
                    buffer
                );
                was_expired = expired;
            }
        }
    }

    #[test]
    fn test_malformed_is_expired() {
        assert!(is_expired_at("abc.def", 0, NOW));
        assert!(is_expired_at("garbage", -1_000_000, NOW));
    }

    #[test]
    fn test_time_until_expiry() {
        assert_eq!(time_until_expiry_at(&token_expiring_at(NOW + 300), NOW), 300);
        assert_eq!(time_until_expiry_at(&token_expiring_at(NOW - 300), NOW), 0);
        assert_eq!(time_until_expiry_at("abc.def", NOW), 0);
    }

    #[test]
    fn test_decode_fresh_reasons() {
        assert!(decode_fresh(&token_expiring_at(NOW + 120), 60, NOW).is_ok());
        assert!(matches!(
            decode_fresh(&token_expiring_at(NOW + 30), 60, NOW),
            Err(SessionError::ExpiredToken)
        ));
        assert!(matches!(
            decode_fresh("abc.def", 60, NOW),
            Err(SessionError::MalformedToken(_))
        ));
    }
}
