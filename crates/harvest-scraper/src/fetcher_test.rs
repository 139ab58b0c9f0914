use super::*;

#[test]
fn browser_headers_look_like_a_navigation() {
    let headers = browser_headers();
    assert!(headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html")));
    assert_eq!(
        headers.get(header::ACCEPT_ENCODING).unwrap(),
        "gzip, deflate"
    );
    assert_eq!(headers.get(header::CONNECTION).unwrap(), "keep-alive");
    assert_eq!(headers.get(header::UPGRADE_INSECURE_REQUESTS).unwrap(), "1");
}

#[test]
fn zero_attempts_is_clamped_to_one() {
    let fetcher = Fetcher::new(5, "harvest-test/0.1", 0, BackoffPolicy::immediate()).unwrap();
    assert_eq!(fetcher.max_attempts(), 1);
}

#[test]
fn from_config_uses_configured_attempts() {
    let config = AppConfig {
        search_url: "https://www.olx.in/items/q-car-cover".to_string(),
        search_query: "car cover".to_string(),
        log_level: "info".to_string(),
        output_path: "results/out.json".into(),
        selectors_path: None,
        request_delay_ms: 0,
        max_attempts: 4,
        request_timeout_secs: 5,
        max_backoff_ms: 0,
        jitter_max_ms: 0,
        user_agent: "harvest-test/0.1".to_string(),
        max_pages: 1,
        expected_per_page: 40,
        browser_enabled: false,
        chrome_path: None,
        browser_timeout_secs: 5,
        browser_settle_ms: 0,
    };
    let fetcher = Fetcher::from_config(&config).unwrap();
    assert_eq!(fetcher.max_attempts(), 4);
}

#[tokio::test]
async fn fetch_rejects_relative_target_without_network() {
    let fetcher = Fetcher::new(5, "harvest-test/0.1", 3, BackoffPolicy::immediate()).unwrap();
    let err = fetcher.fetch("/items/q-car-cover").await.unwrap_err();
    assert!(
        matches!(err, AcquisitionError::InvalidTarget { .. }),
        "expected InvalidTarget, got: {err:?}"
    );
}
