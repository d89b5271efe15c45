//! `test-utils` is used for testing in both `netverse-lib` and `netverse-bin`.
//! This crate does not depend on `netverse-lib` or `netverse-bin`, else we would get dependency cycles.
//! Macros are used instead, so that the importer is responsible for providing the dependencies.

/// Create a mock web server, which responds with a predefined status when
/// handling a matching request
#[macro_export]
macro_rules! mock_server {
    ($status:expr $(, $func:tt ($($arg:expr),*))*) => {{
        let mock_server = wiremock::MockServer::start().await;
        let response_template = wiremock::ResponseTemplate::new(http::StatusCode::from($status));
        let template = response_template$(.$func($($arg),*))*;
        wiremock::Mock::given(wiremock::matchers::method("GET")).respond_with(template).mount(&mock_server).await;
        mock_server
    }};
}

/// Build a minimal HTML document with the given title and body markup
#[macro_export]
macro_rules! html_page {
    ($title:expr, $body:expr $(,)?) => {
        format!(
            "<!DOCTYPE html><html><head><title>{}</title></head><body>{}</body></html>",
            $title, $body
        )
    };
}

/// Serve HTML pages from a mock server, one `path => html` pair per page.
/// Every page expects to be requested exactly once.
///
/// Paths not listed answer with `404 Not Found`.
#[macro_export]
macro_rules! mock_site {
    ($server:expr, $($path:expr => $html:expr),+ $(,)?) => {{
        $(
            wiremock::Mock::given(wiremock::matchers::method("GET"))
                .and(wiremock::matchers::path($path))
                .respond_with(
                    wiremock::ResponseTemplate::new(200)
                        .insert_header("content-type", "text/html; charset=utf-8")
                        .set_body_string($html),
                )
                .expect(1)
                .mount(&$server)
                .await;
        )+
    }};
}

/// Answer requests to one search endpoint (`web`, `images`, `videos` or
/// `news`) of a mock search API with the given JSON body
#[macro_export]
macro_rules! mock_search_endpoint {
    ($server:expr, $kind:expr, $body:expr $(,)?) => {{
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path(format!("/res/v1/{}/search", $kind)))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json($body))
            .mount(&$server)
            .await;
    }};
}

/// Path to the root of the workspace
#[macro_export]
macro_rules! root_path {
    () => {
        std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .unwrap()
            .to_path_buf()
    };
}
