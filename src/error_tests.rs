//! Tests for error types

#[cfg(test)]
mod tests {
    use super::super::error::StreamError;

    #[test]
    fn test_validation_error() {
        let err = StreamError::Validation("jobId must not be empty".to_string());
        assert!(err.to_string().contains("Validation error"));
        assert!(err.to_string().contains("jobId"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_config_error() {
        let err = StreamError::Config("bad listen address".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_rate_limited() {
        let err = StreamError::RateLimited { retry_after_ms: 1500 };
        let msg = err.to_string();
        assert!(msg.contains("Rate limited"));
        assert!(msg.contains("1500"));
    }

    #[test]
    fn test_delivery_error() {
        let err = StreamError::Delivery {
            status: 404,
            body: "Unknown Webhook".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("404"));
        assert!(msg.contains("Unknown Webhook"));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: StreamError = json_err.into();
        assert!(err.to_string().contains("JSON parsing error"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_internal_error() {
        let err = StreamError::Internal("lock poisoned".to_string());
        assert!(err.to_string().contains("Internal error"));
    }
}
