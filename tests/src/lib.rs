#[cfg(test)]
mod tests {
    use env_logger::Env;
    use httpmock::prelude::*;
    use httpstress::{RunController, RunOutcome};
    use log::info;
    use rstest::rstest;
    use std::path::PathBuf;
    use std::str::FromStr;
    use std::sync::Once;
    use std::time::Duration;
    use stress_config::ConfigDocument;
    use stress_types::{RequestTemplate, RunConfig};

    static ONCE: Once = Once::new();
    fn init_logger() {
        ONCE.call_once(|| {
            env_logger::Builder::from_env(Env::default().default_filter_or("info"))
                .format_timestamp_millis()
                .is_test(true)
                .init();
        });
    }

    fn run_config(total_requests: usize, concurrency: usize, url: String) -> RunConfig {
        RunConfig {
            total_requests,
            concurrency,
            timeout: Duration::from_secs(5),
            templates: vec![RequestTemplate::single_url(
                url,
                String::new(),
                "text/plain".to_string(),
            )],
            ..Default::default()
        }
    }

    async fn run(config: RunConfig) -> (RunOutcome, String) {
        let mut controller = RunController::new(config);
        let outcome = controller.run().await.unwrap();
        let mut out = vec![];
        let status = controller.finish(&outcome, &mut out);
        assert_eq!(status, 0);
        (outcome, String::from_utf8(out).unwrap())
    }

    #[rstest]
    #[case(100, 10, 100)]
    #[case(105, 10, 100)]
    #[case(10, 1, 10)]
    #[case(4, 8, 0)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn single_url_run(
        #[case] total: usize,
        #[case] concurrency: usize,
        #[case] expected: usize,
    ) {
        init_logger();
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/get");
                then.status(200).body("ok");
            })
            .await;

        let (outcome, summary) = run(run_config(total, concurrency, server.url("/get"))).await;
        info!("{}", summary);

        mock.assert_hits_async(expected).await;
        let report = outcome.report;
        assert_eq!(report.total_received(), expected as u64);
        assert_eq!(report.succeeded(), expected as u64);
        assert_eq!(report.failed(), 0);
        if expected == 0 {
            assert!(summary.is_empty());
        } else {
            assert!(summary.contains(&format!(" Complete requests:\t{}\n", expected)));
            assert!(summary.contains(" Failed requests:\t0\n"));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn weighted_templates() {
        init_logger();
        let server = MockServer::start_async().await;
        let search = server
            .mock_async(|when, then| {
                when.method(GET).path("/search");
                then.status(200);
            })
            .await;
        let submit = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/submit")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body("name=value");
                then.status(200);
            })
            .await;

        let mut config = run_config(30, 3, server.url("/unused"));
        config.templates = vec![
            RequestTemplate {
                weight: 2,
                method: "get".to_string(),
                url: server.url("/search"),
                ..Default::default()
            },
            RequestTemplate {
                weight: 1,
                method: "POST".to_string(),
                url: server.url("/submit"),
                content_type: "application/x-www-form-urlencoded".to_string(),
                body: "name=value".to_string(),
            },
            RequestTemplate {
                weight: 5,
                method: String::new(),
                url: server.url("/disabled"),
                ..Default::default()
            },
        ];

        let (outcome, _) = run(config).await;
        search.assert_hits_async(20).await;
        submit.assert_hits_async(10).await;
        assert_eq!(outcome.report.succeeded(), 30);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn non_200_counted_as_failed() {
        init_logger();
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.path("/missing");
                then.status(404);
            })
            .await;

        let (outcome, summary) = run(run_config(20, 5, server.url("/missing"))).await;
        mock.assert_hits_async(20).await;
        assert_eq!(outcome.report.total_received(), 20);
        assert_eq!(outcome.report.failed(), 20);
        assert!(summary.contains(" Failed requests:\t20\n"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn connection_refused_counted_as_failed() {
        init_logger();
        let port = portpicker::pick_unused_port().unwrap();
        let mut config = run_config(12, 3, format!("http://127.0.0.1:{}/get", port));
        config.timeout = Duration::from_secs(2);

        let (outcome, _) = run(config).await;
        assert_eq!(outcome.report.total_received(), 12);
        assert_eq!(outcome.report.failed(), 12);
        assert_eq!(outcome.report.succeeded(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn custom_headers_and_keep_alive() {
        init_logger();
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/get")
                    .header("accept", "text/html")
                    .header("x-run", "42");
                then.status(200).body("a body to drain before reuse");
            })
            .await;

        let mut config = run_config(50, 5, server.url("/get"));
        config.keep_alive = true;
        config.headers = vec!["Accept: text/html".to_string(), "X-Run:42".to_string()];

        let (outcome, _) = run(config).await;
        mock.assert_hits_async(50).await;
        assert_eq!(outcome.report.succeeded(), 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn run_from_config_file() {
        init_logger();
        let server = MockServer::start_async().await;
        let search = server
            .mock_async(|when, then| {
                when.method(GET).path("/search").header("x-source", "it");
                then.status(200);
            })
            .await;
        let submit = server
            .mock_async(|when, then| {
                when.method(POST).path("/submit").body("a=1");
                then.status(200);
            })
            .await;

        let content = format!(
            "# generated\nkeepalive = 1\ntimeout = 5\nheader = X-Source: it\n\n\
             [search]\nweight = 3\nmethod = GET\nurl = {}\n\n\
             [submit]\nweight = 1\nmethod = post\nurl = {}\npostdata = a=1\n",
            server.url("/search"),
            server.url("/submit")
        );
        let path = std::env::temp_dir().join(format!("httpstress-{}.conf", server.port()));
        std::fs::write(&path, content).unwrap();

        let base = RunConfig {
            total_requests: 40,
            concurrency: 4,
            ..Default::default()
        };
        let config = stress_config::load_run_config(&path, base).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(config.keep_alive);

        let (outcome, _) = run(config).await;
        search.assert_hits_async(30).await;
        submit.assert_hits_async(10).await;
        assert_eq!(outcome.report.succeeded(), 40);
    }

    #[test]
    fn sample_config_file_parses() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../stress-config/src/resources/httpconfig");
        let content = std::fs::read_to_string(path).unwrap();
        let document = ConfigDocument::from_str(&content).unwrap();
        let config = document.apply_to(RunConfig::default());
        assert_eq!(config.templates.len(), 2);
        assert_eq!(config.total_requests, 200);
    }
}
