//! Tests for the shared harness helpers.

#[cfg(test)]
mod tests {
    use s3lite_core::ClientConfig;

    use crate::{fallback_filter, parse_authorization};

    #[test]
    fn test_should_build_filter_from_configured_log_level() {
        let config = ClientConfig::builder()
            .endpoint("s3.amazonaws.com".into())
            .log_level("debug".into())
            .build();
        assert_eq!(fallback_filter(&config).to_string(), "debug");
    }

    #[test]
    fn test_should_fall_back_to_warn_for_unparseable_level() {
        let config = ClientConfig::builder()
            .endpoint("s3.amazonaws.com".into())
            .log_level("s3lite=loud".into())
            .build();
        assert_eq!(fallback_filter(&config).to_string(), "warn");
    }

    #[test]
    fn test_should_parse_authorization_header() {
        let (akid, sig) = parse_authorization("AWS mykey:mysignature").expect("parse");
        assert_eq!(akid, "mykey");
        assert_eq!(sig, "mysignature");

        assert!(parse_authorization("AWS :sig").is_err());
        assert!(parse_authorization("AWS key:").is_err());
        assert!(parse_authorization("AWS noseparator").is_err());
        assert!(parse_authorization("AWS4-HMAC-SHA256 Credential=x").is_err());
    }
}
