#[cfg(test)]
mod cli {
    use assert_cmd::cargo::cargo_bin_cmd;
    use predicates::{prelude::PredicateBooleanExt, str::contains};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::{error::Error, io::Write};
    use tempfile::NamedTempFile;
    use test_utils::{html_page, mock_search_endpoint, mock_site, root_path};
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers::method};

    type Result<T> = std::result::Result<T, Box<dyn Error>>;

    /// A search API where every index returns the same two hits
    async fn search_api() -> MockServer {
        let server = MockServer::start().await;
        mock_search_endpoint!(
            server,
            "web",
            json!({ "web": { "results": [
                { "title": "Tokio", "url": "https://tokio.rs/", "description": "An async runtime" },
                { "title": "Rust", "url": "https://www.rust-lang.org/" }
            ]}})
        );
        for kind in ["images", "videos", "news"] {
            mock_search_endpoint!(
                server,
                kind,
                json!({ "results": [
                    { "title": format!("{kind} 1"), "url": "https://example.com/1" },
                    { "title": format!("{kind} 2"), "url": "https://example.com/2" }
                ]})
            );
        }
        server
    }

    fn config_file(contents: &str) -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        file.write_all(contents.as_bytes())?;
        Ok(file)
    }

    #[test]
    fn test_help() {
        cargo_bin_cmd!()
            .arg("--help")
            .assert()
            .success()
            .stdout(contains("search"))
            .stdout(contains("crawl"));
    }

    #[test]
    fn test_missing_subcommand() {
        cargo_bin_cmd!().assert().failure().code(2);
    }

    #[tokio::test]
    async fn test_search_json() -> Result<()> {
        let server = search_api().await;

        let output = cargo_bin_cmd!()
            .env_remove("RUST_LOG")
            .arg("search")
            .arg("tokio")
            .arg("--api-key")
            .arg("test-key")
            .arg("--base-url")
            .arg(server.uri())
            .arg("--format")
            .arg("json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let output: Value = serde_json::from_slice(&output)?;
        let sections = output["search"]["sections"].as_array().unwrap();
        let kinds: Vec<_> = sections.iter().map(|s| s["kind"].clone()).collect();
        assert_eq!(kinds, vec!["web", "images", "videos", "news"]);
        assert_eq!(sections[0]["hits"][0]["title"], "Tokio");
        assert_eq!(sections[0]["hits"][0]["description"], "An async runtime");
        assert_eq!(output["search"]["query"], "tokio");
        assert!(output.get("governor").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_search_plain_single_kind() {
        let server = search_api().await;

        cargo_bin_cmd!()
            .arg("search")
            .arg("rust")
            .arg("--kind")
            .arg("web")
            .arg("--base-url")
            .arg(server.uri())
            .env("BRAVE_API_KEY", "test-key")
            .assert()
            .success()
            .stdout(contains("Results for \"rust\" (2 hits)"))
            .stdout(contains("Web (2)"))
            .stdout(contains("https://tokio.rs/"))
            .stdout(contains("News").not());
    }

    #[tokio::test]
    async fn test_search_all_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        cargo_bin_cmd!()
            .arg("search")
            .arg("rust")
            .arg("--api-key")
            .arg("test-key")
            .arg("--base-url")
            .arg(server.uri())
            .assert()
            .failure()
            .code(2)
            .stdout(contains("Web: failed"))
            .stdout(contains("News: failed"));
    }

    #[test]
    fn test_search_missing_api_key() {
        cargo_bin_cmd!()
            .env_remove("BRAVE_API_KEY")
            .arg("search")
            .arg("rust")
            .assert()
            .failure()
            .code(3)
            .stderr(contains("Brave API key not specified"));
    }

    #[test]
    fn test_search_empty_query() {
        cargo_bin_cmd!()
            .arg("search")
            .arg("   ")
            .arg("--api-key")
            .arg("test-key")
            .assert()
            .failure()
            .code(1)
            .stderr(contains("Search query must not be empty"));
    }

    #[tokio::test]
    async fn test_crawl() {
        let server = MockServer::start().await;
        mock_site!(server,
            "/" => html_page!("Home", r#"<p>Start here</p><a href="/docs">Docs</a>"#),
            "/docs" => html_page!("Docs", r#"<a href="/">Home</a>"#),
        );

        cargo_bin_cmd!()
            .arg("crawl")
            .arg(server.uri())
            .arg("--delay")
            .arg("0s")
            .assert()
            .success()
            .stdout(contains("Crawled 2 pages"))
            .stdout(contains("[0] Home"))
            .stdout(contains("Start here"))
            .stdout(contains("[1] Docs"));
    }

    #[tokio::test]
    async fn test_crawl_json_with_governor_stats() -> Result<()> {
        let server = MockServer::start().await;
        mock_site!(server,
            "/" => html_page!("Home", r#"<a href="/a">A</a><a href="/b">B</a>"#),
            "/a" => html_page!("A", ""),
        );

        let output = cargo_bin_cmd!()
            .arg("crawl")
            .arg(server.uri())
            .arg("--max-pages")
            .arg("2")
            .arg("--delay")
            .arg("0s")
            .arg("--format")
            .arg("json")
            .arg("--governor-stats")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let output: Value = serde_json::from_slice(&output)?;
        let pages = output["crawl"].as_array().unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0]["depth"], 0);
        assert_eq!(pages[1]["title"], "A");
        assert_eq!(output["governor"]["crawler"]["admitted"], 2);
        Ok(())
    }

    #[test]
    fn test_crawl_unsupported_scheme() {
        cargo_bin_cmd!()
            .arg("crawl")
            .arg("ftp://example.com")
            .assert()
            .failure()
            .code(1)
            .stderr(contains("Unsupported URL scheme"));
    }

    #[test]
    fn test_logs_version_and_limits() {
        cargo_bin_cmd!()
            .env_remove("RUST_LOG")
            .arg("crawl")
            .arg("ftp://example.com")
            .arg("--max-requests")
            .arg("7")
            .assert()
            .failure()
            .stderr(contains(concat!(
                "netverse ",
                env!("CARGO_PKG_VERSION"),
                ": 7 requests per 30s"
            )));
    }

    #[tokio::test]
    async fn test_crawl_nothing_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        cargo_bin_cmd!()
            .arg("crawl")
            .arg(server.uri())
            .assert()
            .failure()
            .code(2)
            .stdout(contains("Crawled 0 pages"));
    }

    #[test]
    fn test_invalid_limits() {
        cargo_bin_cmd!()
            .arg("crawl")
            .arg("https://example.com")
            .arg("--max-requests")
            .arg("0")
            .assert()
            .failure()
            .code(3)
            .stderr(contains("Invalid rate limit configuration"));
    }

    #[test]
    fn test_invalid_config_file() -> Result<()> {
        let config = config_file("max_request = 3\n")?;

        cargo_bin_cmd!()
            .arg("--config")
            .arg(config.path())
            .arg("crawl")
            .arg("https://example.com")
            .assert()
            .failure()
            .code(3)
            .stderr(contains("Cannot load configuration file"));
        Ok(())
    }

    #[tokio::test]
    async fn test_config_example() {
        let server = MockServer::start().await;
        mock_site!(server, "/" => html_page!("Home", "<p>Example</p>"));
        let config = root_path!().join("netverse.example.toml");

        cargo_bin_cmd!()
            .arg("--config")
            .arg(config)
            .arg("crawl")
            .arg(server.uri())
            .env_clear()
            .assert()
            .success()
            .stdout(contains("[0] Home"));
    }

    #[tokio::test]
    async fn test_config_file_key_limits() -> Result<()> {
        let server = MockServer::start().await;
        mock_site!(server,
            "/" => html_page!("Home", r#"<a href="/a">A</a>"#),
            "/a" => html_page!("A", ""),
        );
        let config = config_file(
            r#"
            format = "json"
            governor_stats = true

            [keys.crawler]
            max_requests = 1
            window = "200ms"
            "#,
        )?;

        let output = cargo_bin_cmd!()
            .arg("--config")
            .arg(config.path())
            .arg("crawl")
            .arg(server.uri())
            .arg("--delay")
            .arg("0s")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let output: Value = serde_json::from_slice(&output)?;
        assert_eq!(output["crawl"].as_array().unwrap().len(), 2);
        // The second page had to wait for the one-request window to roll over
        assert_eq!(output["governor"]["crawler"]["admitted"], 2);
        assert_eq!(output["governor"]["crawler"]["throttled"], 1);
        Ok(())
    }
}
