//! End-to-end orchestration tests against a mocked vendor API.

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

use quark_transfer::{transfer_share, Config, QuarkClient, QuarkError, TransferOptions};

fn test_client(server: &ServerGuard) -> QuarkClient {
    let config = Config {
        base_url: server.url(),
        portal_url: server.url(),
        timeout_ms: 5_000,
        retry_count: 1,
        retry_delay_ms: 20,
        ..Config::default()
    };
    QuarkClient::new("session=test-cookie", config).unwrap()
}

async fn mock_share_token(server: &mut ServerGuard, stoken: &str) {
    server
        .mock("POST", "/1/clouddrive/share/sharepage/token")
        .match_query(Matcher::Any)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"status":200,"code":0,"data":{{"stoken":"{stoken}"}}}}"#
        ))
        .create_async()
        .await;
}

mod single_file {
    use super::*;

    async fn mock_one_file_listing(server: &mut ServerGuard) {
        server
            .mock("GET", "/1/clouddrive/share/sharepage/detail")
            .match_query(Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "status": 200,
                    "code": 0,
                    "data": {"list": [{
                        "fid": "f-1",
                        "file_name": "report.pdf",
                        "size": 2048,
                        "share_fid_token": "ft-1",
                        "obj_category": "document"
                    }]},
                    "metadata": {"_total": 1}
                })
                .to_string(),
            )
            .create_async()
            .await;
    }

    async fn mock_save_and_task(server: &mut ServerGuard) {
        server
            .mock("POST", "/1/clouddrive/share/sharepage/save")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(json!({
                "fid_list": ["f-1"],
                "fid_token_list": ["ft-1"],
                "to_pdir_fid": "0"
            })))
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":200,"code":0,"data":{"task_id":"t-1"}}"#)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/1/clouddrive/task")
            .match_query(Matcher::UrlEncoded("task_id".into(), "t-1".into()))
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":200,"code":0,"data":{"status":2,"save_as":{"save_as_top_fids":["saved-1"]}}}"#,
            )
            .create_async()
            .await;
    }

    async fn mock_recent_files(server: &mut ServerGuard, fid: &str, name: &str) {
        server
            .mock("GET", "/1/clouddrive/file/sort")
            .match_query(Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "status": 200,
                    "code": 0,
                    "data": {"list": [
                        {"fid": "other", "file_name": "older.txt"},
                        {"fid": fid, "file_name": name}
                    ]},
                    "metadata": {"_total": 2}
                })
                .to_string(),
            )
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn saves_one_file_to_the_root() {
        let mut server = Server::new_async().await;
        mock_share_token(&mut server, "st-1").await;
        mock_one_file_listing(&mut server).await;
        mock_save_and_task(&mut server).await;
        mock_recent_files(&mut server, "saved-1", "report.pdf").await;

        let client = test_client(&server);
        let options = TransferOptions::new("/");
        let summary = transfer_share(&client, "https://pan.quark.cn/s/abc123", &options)
            .await
            .unwrap();

        assert_eq!(summary.file_count, 1);
        assert_eq!(summary.task_results.len(), 1);
        assert_eq!(summary.saved_files.len(), 1);

        let saved = &summary.saved_files[0];
        assert_eq!(saved.name, "report.pdf");
        assert_eq!(saved.size, 2048);
        assert_eq!(saved.category, "document");
        assert_eq!(saved.fid.as_deref(), Some("saved-1"));

        assert!(summary.share_links.is_empty());
        assert!(summary.share_failures.is_empty());
    }

    #[tokio::test]
    async fn post_save_lookup_recovers_renamed_files() {
        let mut server = Server::new_async().await;
        mock_share_token(&mut server, "st-1").await;
        mock_one_file_listing(&mut server).await;
        mock_save_and_task(&mut server).await;
        // The vendor renamed the file on collision at the destination.
        mock_recent_files(&mut server, "saved-1", "report(1).pdf").await;

        let client = test_client(&server);
        let options = TransferOptions::new("/");
        let summary = transfer_share(&client, "https://pan.quark.cn/s/abc123", &options)
            .await
            .unwrap();

        assert_eq!(summary.saved_files[0].name, "report(1).pdf");
        assert_eq!(summary.saved_files[0].fid.as_deref(), Some("saved-1"));
    }

    #[tokio::test]
    async fn reshare_produces_one_link() {
        let mut server = Server::new_async().await;
        mock_share_token(&mut server, "st-1").await;
        mock_one_file_listing(&mut server).await;
        mock_save_and_task(&mut server).await;
        mock_recent_files(&mut server, "saved-1", "report.pdf").await;

        server
            .mock("POST", "/1/clouddrive/file/info/path_list")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(json!({"file_path": ["/report.pdf"]})))
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":200,"code":0,"data":[{"file_path":"/report.pdf","fid":"saved-1"}]}"#,
            )
            .create_async()
            .await;
        server
            .mock("POST", "/1/clouddrive/share")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(json!({
                "fid_list": ["saved-1"],
                "title": "report.pdf"
            })))
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":200,"code":0,"data":{"share_id":"s-1"}}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/1/clouddrive/share/password")
            .match_query(Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":200,"code":0,"data":{"share_url":"https://pan.quark.cn/s/s-1"}}"#,
            )
            .create_async()
            .await;

        let client = test_client(&server);
        let options = TransferOptions::new("/").with_share_links(true);
        let summary = transfer_share(&client, "https://pan.quark.cn/s/abc123", &options)
            .await
            .unwrap();

        assert_eq!(summary.share_links.len(), 1);
        let link = &summary.share_links[0];
        assert_eq!(link.name, "report.pdf");
        assert_eq!(link.share_id, "s-1");
        assert_eq!(link.share_url, "https://pan.quark.cn/s/s-1");
        assert!(summary.share_failures.is_empty());
    }

    #[tokio::test]
    async fn reshare_failures_do_not_abort_the_run() {
        let mut server = Server::new_async().await;
        mock_share_token(&mut server, "st-1").await;
        mock_one_file_listing(&mut server).await;
        mock_save_and_task(&mut server).await;
        mock_recent_files(&mut server, "saved-1", "report.pdf").await;

        server
            .mock("POST", "/1/clouddrive/file/info/path_list")
            .match_query(Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":200,"code":0,"data":[{"file_path":"/report.pdf","fid":"saved-1"}]}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/1/clouddrive/share")
            .match_query(Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":200,"code":31001,"message":"sharing disabled"}"#)
            .create_async()
            .await;

        let client = test_client(&server);
        let options = TransferOptions::new("/").with_share_links(true);
        let summary = transfer_share(&client, "https://pan.quark.cn/s/abc123", &options)
            .await
            .unwrap();

        assert!(summary.share_links.is_empty());
        assert_eq!(summary.share_failures.len(), 1);
        assert_eq!(summary.share_failures[0].name, "report.pdf");
        assert!(summary.share_failures[0].error.contains("sharing disabled"));
    }
}

mod empty_share {
    use super::*;

    #[tokio::test]
    async fn empty_listing_is_no_files_found() {
        let mut server = Server::new_async().await;
        mock_share_token(&mut server, "st-1").await;
        server
            .mock("GET", "/1/clouddrive/share/sharepage/detail")
            .match_query(Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":200,"code":0,"data":{"list":[]},"metadata":{"_total":0}}"#)
            .create_async()
            .await;

        let client = test_client(&server);
        let options = TransferOptions::new("/");
        let err = transfer_share(&client, "https://pan.quark.cn/s/abc123", &options)
            .await
            .unwrap_err();

        assert!(matches!(err, QuarkError::NoFilesFound));
    }
}

mod invalid_link {
    use super::*;

    #[tokio::test]
    async fn foreign_host_fails_before_any_request() {
        let server = Server::new_async().await;
        let client = test_client(&server);
        let options = TransferOptions::new("/");

        let err = transfer_share(&client, "https://example.com/s/abc123", &options)
            .await
            .unwrap_err();

        assert!(matches!(err, QuarkError::InvalidLink(_)));
    }
}

mod batching {
    use super::*;

    fn listing_page(page: u64, total: u64) -> String {
        let start = (page - 1) * 50;
        let list: Vec<_> = (start..start + 50)
            .map(|i| {
                json!({
                    "fid": format!("f-{i}"),
                    "file_name": format!("file-{i}.bin"),
                    "size": 10,
                    "share_fid_token": format!("ft-{i}"),
                })
            })
            .collect();
        json!({
            "status": 200,
            "code": 0,
            "data": {"list": list},
            "metadata": {"_total": total}
        })
        .to_string()
    }

    #[tokio::test]
    async fn large_share_is_saved_in_sequential_batches_of_100() {
        let mut server = Server::new_async().await;
        mock_share_token(&mut server, "st-1").await;

        for page in 1..=5u64 {
            server
                .mock("GET", "/1/clouddrive/share/sharepage/detail")
                .match_query(Matcher::UrlEncoded("_page".into(), page.to_string()))
                .with_header("content-type", "application/json")
                .with_body(listing_page(page, 250))
                .expect(1)
                .create_async()
                .await;
        }

        // Batch boundaries: the first save carries f-99 but not f-100, and
        // so on; each batch gets its own task id.
        let batches = [
            ("\"f-99\"", "t-1"),
            ("\"f-199\"", "t-2"),
            ("\"f-249\"", "t-3"),
        ];
        let mut save_mocks = Vec::new();
        for (marker, task_id) in batches {
            let mock = server
                .mock("POST", "/1/clouddrive/share/sharepage/save")
                .match_query(Matcher::Any)
                .match_body(Matcher::Regex(marker.to_string()))
                .with_header("content-type", "application/json")
                .with_body(format!(
                    r#"{{"status":200,"code":0,"data":{{"task_id":"{task_id}"}}}}"#
                ))
                .expect(1)
                .create_async()
                .await;
            save_mocks.push(mock);
        }
        for task_id in ["t-1", "t-2", "t-3"] {
            server
                .mock("GET", "/1/clouddrive/task")
                .match_query(Matcher::UrlEncoded("task_id".into(), task_id.into()))
                .with_header("content-type", "application/json")
                .with_body(r#"{"status":200,"code":0,"data":{"status":2}}"#)
                .expect(1)
                .create_async()
                .await;
        }

        let client = test_client(&server);
        let options = TransferOptions::new("/");
        let summary = transfer_share(&client, "https://pan.quark.cn/s/abc123", &options)
            .await
            .unwrap();

        assert_eq!(summary.file_count, 250);
        assert_eq!(
            summary.task_results.len(),
            3,
            "250 files split into batches of 100, 100, 50"
        );
        assert_eq!(summary.saved_files.len(), 250);

        for mock in save_mocks {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn failed_batch_aborts_the_run() {
        let mut server = Server::new_async().await;
        mock_share_token(&mut server, "st-1").await;

        for page in 1..=3u64 {
            server
                .mock("GET", "/1/clouddrive/share/sharepage/detail")
                .match_query(Matcher::UrlEncoded("_page".into(), page.to_string()))
                .with_header("content-type", "application/json")
                .with_body(listing_page(page, 150))
                .expect(1)
                .create_async()
                .await;
        }

        server
            .mock("POST", "/1/clouddrive/share/sharepage/save")
            .match_query(Matcher::Any)
            .match_body(Matcher::Regex("\"f-99\"".to_string()))
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":200,"code":0,"data":{"task_id":"t-1"}}"#)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/1/clouddrive/task")
            .match_query(Matcher::UrlEncoded("task_id".into(), "t-1".into()))
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":200,"code":32003,"message":"capacity exceeded","data":{"status":2}}"#)
            .create_async()
            .await;
        // The second batch must never be submitted.
        let second_save = server
            .mock("POST", "/1/clouddrive/share/sharepage/save")
            .match_query(Matcher::Any)
            .match_body(Matcher::Regex("\"f-149\"".to_string()))
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":200,"code":0,"data":{"task_id":"t-2"}}"#)
            .expect(0)
            .create_async()
            .await;

        let client = test_client(&server);
        let options = TransferOptions::new("/");
        let err = transfer_share(&client, "https://pan.quark.cn/s/abc123", &options)
            .await
            .unwrap_err();

        assert!(matches!(err, QuarkError::JobFailed { .. }));
        second_save.assert_async().await;
    }
}
