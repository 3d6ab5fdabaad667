//! Pre-verification header inspection
//!
//! The header is decoded by hand so the algorithm can be checked before any
//! key lookup, including values such as `none` that the decoder cannot
//! represent.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::config::SigningAlgorithm;
use crate::error::{TokenError, TokenResult};

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
    #[serde(default)]
    kid: Option<String>,
}

/// Algorithm and key id of an unverified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TokenHeader {
    pub(crate) algorithm: SigningAlgorithm,
    pub(crate) kid: String,
}

/// Read the header of a compact JWT without verifying it
pub(crate) fn inspect(token: &str) -> TokenResult<TokenHeader> {
    let mut segments = token.split('.');
    let (Some(header), Some(_payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(TokenError::malformed("expected three dot-separated segments"));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|e| TokenError::malformed(format!("header is not base64url: {e}")))?;
    let raw: RawHeader = serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::malformed(format!("header is not valid JSON: {e}")))?;

    let algorithm = raw.alg.parse()?;
    let kid = raw
        .kid
        .filter(|kid| !kid.is_empty())
        .ok_or_else(|| TokenError::malformed("missing 'kid' header"))?;

    Ok(TokenHeader { algorithm, kid })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn encode_header(json: &str) -> String {
        format!("{}.e30.c2ln", URL_SAFE_NO_PAD.encode(json))
    }

    #[test]
    fn test_inspect_valid_header() {
        let token = encode_header(r#"{"alg":"HS256","typ":"JWT","kid":"a1b2c3d4e5f6"}"#);
        let header = inspect(&token).unwrap();
        assert_eq!(header.algorithm, SigningAlgorithm::HS256);
        assert_eq!(header.kid, "a1b2c3d4e5f6");
    }

    #[rstest]
    #[case(r#"{"alg":"none","kid":"a1b2c3d4e5f6"}"#, "none")]
    #[case(r#"{"alg":"RS256","kid":"a1b2c3d4e5f6"}"#, "RS256")]
    #[case(r#"{"alg":"ES256"}"#, "ES256")]
    fn test_inspect_rejects_non_hmac_before_kid(#[case] json: &str, #[case] expected: &str) {
        let err = inspect(&encode_header(json)).unwrap_err();
        assert!(matches!(err, TokenError::UnsupportedAlgorithm { ref alg } if alg == expected));
    }

    #[rstest]
    #[case("")]
    #[case("only-one-segment")]
    #[case("two.segments")]
    #[case("a.b.c.d")]
    #[case("!!!.e30.c2ln")]
    fn test_inspect_rejects_malformed(#[case] token: &str) {
        assert!(matches!(
            inspect(token),
            Err(TokenError::MalformedToken { .. })
        ));
    }

    #[rstest]
    #[case(r#"{"alg":"HS256"}"#)]
    #[case(r#"{"alg":"HS256","kid":""}"#)]
    #[case(r#"{"alg":"HS256","kid":42}"#)]
    #[case(r#"not json"#)]
    fn test_inspect_requires_kid(#[case] json: &str) {
        assert!(matches!(
            inspect(&encode_header(json)),
            Err(TokenError::MalformedToken { .. })
        ));
    }
}
