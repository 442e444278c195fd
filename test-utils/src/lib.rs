//! `test-utils` is used for testing in both `hoopstat-lib` and `hoopstat-bin`.
//! This crate does not depend on `hoopstat-lib` or `hoopstat-bin`, else we would get
//! dependency cycles.
//! Macros are used instead, so that the importer is responsible for providing the dependencies.

/// Create a mock web server, which responds with a predefined status when
/// handling a matching request
#[macro_export]
macro_rules! mock_server {
    ($status:expr $(, $func:tt ($($arg:expr),*))*) => {{
        let mock_server = wiremock::MockServer::start().await;
        let response_template = wiremock::ResponseTemplate::new(http::StatusCode::from($status));
        let template = response_template$(.$func($($arg),*))*;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(template)
            .mount(&mock_server)
            .await;
        mock_server
    }};
}

/// Create a mock web server answering every `GET` with the given status
/// first, and with `200 OK` and the given JSON body afterwards.
///
/// The failing response is served `$failures` times.
#[macro_export]
macro_rules! flaky_mock_server {
    ($status:expr, $failures:expr, $body:expr $(,)?) => {{
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(http::StatusCode::from($status)))
            .up_to_n_times($failures)
            .with_priority(1)
            .mount(&mock_server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(
                wiremock::ResponseTemplate::new(http::StatusCode::OK).set_body_json($body),
            )
            .with_priority(2)
            .mount(&mock_server)
            .await;
        mock_server
    }};
}
