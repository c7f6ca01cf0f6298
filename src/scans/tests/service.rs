//! Scan service facade tests
//!
//! Status lookups, paged listings, cancellation and the preset catalogue as
//! the transport layer sees them.

#[cfg(test)]
mod tests {
    use crate::client::api::{FailPoint, InMemoryScanClient, ScanStatus, SeedScan};
    use crate::scans::api::{ListScansRequest, ScanService, ScanServiceError};
    use crate::scans::tests::support::{config, service, RecordingTransport};
    use std::sync::Arc;

    fn seeded() -> (Arc<InMemoryScanClient>, ScanService, Vec<String>) {
        let client = Arc::new(InMemoryScanClient::new());
        let alpha = client.insert_project("alpha");
        let beta = client.insert_project("beta");
        let mut ids = Vec::new();
        for (project_id, commit) in [
            (&alpha.project_id, "c1"),
            (&alpha.project_id, "c2"),
            (&beta.project_id, "c1"),
            (&alpha.project_id, "c1"),
            (&beta.project_id, "c3"),
        ] {
            ids.push(
                client
                    .seed_scan(SeedScan::completed(project_id, commit, false))
                    .scan_id,
            );
        }
        let service = service(&client, RecordingTransport::new());
        (client, service, ids)
    }

    #[tokio::test]
    async fn test_status_is_newest_scan_for_commit() {
        let (client, service, ids) = seeded();
        client.seed_scan(
            SeedScan::completed(&client.projects()[0].project_id, "c1", false)
                .with_status(ScanStatus::Running),
        );

        let status = service.get_status("c1", None).await.unwrap();
        assert_eq!(status.status, "Running");
        assert_ne!(status.scan_id, ids[3]);

        let status = service.get_status("c1", Some("beta")).await.unwrap();
        assert_eq!(status.scan_id, ids[2]);
        assert_eq!(status.status, "Completed");
    }

    #[tokio::test]
    async fn test_status_errors() {
        let (_client, service, _ids) = seeded();

        let err = service.get_status("", None).await.unwrap_err();
        assert!(matches!(err, ScanServiceError::InvalidRequest { .. }));

        let err = service.get_status("c9", None).await.unwrap_err();
        assert_eq!(err.http_status(), 404);

        let err = service.get_status("c1", Some("gamma")).await.unwrap_err();
        assert_eq!(err.to_string(), "project 'gamma' not found");
    }

    #[tokio::test]
    async fn test_list_scans_filters_and_pages() {
        let (_client, service, ids) = seeded();

        let all = service.list_scans(ListScansRequest::default()).await.unwrap();
        assert_eq!(all.total, 5);
        assert_eq!(all.limit, 20);
        let listed: Vec<&str> = all.scans.iter().map(|s| s.scan_id.as_str()).collect();
        let newest_first: Vec<&str> = ids.iter().rev().map(String::as_str).collect();
        assert_eq!(listed, newest_first);

        let page = service
            .list_scans(ListScansRequest {
                project_name: Some("alpha".to_string()),
                commit_id: Some("c1".to_string()),
                ..ListScansRequest::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        let listed: Vec<&str> = page.scans.iter().map(|s| s.scan_id.as_str()).collect();
        assert_eq!(listed, vec![ids[3].as_str(), ids[0].as_str()]);

        let page = service
            .list_scans(ListScansRequest {
                limit: 2,
                offset: 4,
                ..ListScansRequest::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.scans.len(), 1);
        assert_eq!(page.offset, 4);

        let page = service
            .list_scans(ListScansRequest {
                limit: 2,
                offset: 9,
                ..ListScansRequest::default()
            })
            .await
            .unwrap();
        assert!(page.scans.is_empty());
        assert_eq!(page.total, 5);
    }

    #[tokio::test]
    async fn test_list_scans_zero_limit_uses_configured_default() {
        let client = Arc::new(InMemoryScanClient::new());
        for i in 0..4 {
            client.seed_scan(SeedScan::completed("p-1", &format!("c{}", i), false));
        }
        let mut config = config(None);
        config.default_list_limit = 3;
        let service =
            ScanService::with_transport(client.clone(), config, RecordingTransport::new());

        let page = service
            .list_scans(ListScansRequest {
                limit: 0,
                ..ListScansRequest::default()
            })
            .await
            .unwrap();
        assert_eq!(page.limit, 3);
        assert_eq!(page.scans.len(), 3);
        assert_eq!(page.total, 4);
    }

    #[tokio::test]
    async fn test_list_scans_unknown_project() {
        let (_client, service, _ids) = seeded();
        let err = service
            .list_scans(ListScansRequest {
                project_name: Some("gamma".to_string()),
                ..ListScansRequest::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ScanServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_cancel_newest_scan_for_commit() {
        let client = Arc::new(InMemoryScanClient::new());
        let alpha = client.insert_project("alpha");
        let beta = client.insert_project("beta");
        let in_alpha = client.seed_scan(
            SeedScan::completed(&alpha.project_id, "c1", false).with_status(ScanStatus::Running),
        );
        let in_beta = client.seed_scan(
            SeedScan::completed(&beta.project_id, "c1", false).with_status(ScanStatus::Queued),
        );
        let service = service(&client, RecordingTransport::new());

        let ack = service.cancel_scan("c1", Some("alpha")).await.unwrap();
        assert_eq!(ack.scan_id, in_alpha.scan_id);
        assert_eq!(ack.status, "cancelled");
        assert_eq!(ack.message, "SUCCESS");
        assert_eq!(ack.project_name.as_deref(), Some("alpha"));

        let ack = service.cancel_scan("c1", None).await.unwrap();
        assert_eq!(ack.scan_id, in_beta.scan_id);
        let json = serde_json::to_value(&ack).unwrap();
        assert!(json.get("project_name").is_none());

        assert_eq!(client.cancelled(), vec![in_alpha.scan_id, in_beta.scan_id]);
        let status = service.get_status("c1", Some("alpha")).await.unwrap();
        assert_eq!(status.status, "Canceled");
    }

    #[tokio::test]
    async fn test_cancel_errors() {
        let (client, service, _ids) = seeded();

        let err = service.cancel_scan("c9", None).await.unwrap_err();
        assert_eq!(err.to_string(), "no scans found for commit_id: c9");

        let err = service.cancel_scan("c3", Some("alpha")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "no scans found for commit_id: c3 and project_name: alpha"
        );

        client.fail_on(FailPoint::Cancel);
        let err = service.cancel_scan("c1", None).await.unwrap_err();
        assert_eq!(err.http_status(), 502);
        assert!(client.cancelled().is_empty());
    }

    #[tokio::test]
    async fn test_presets_from_configuration() {
        let client = Arc::new(InMemoryScanClient::new());
        let service = service(&client, RecordingTransport::new());
        assert_eq!(service.presets(), ["K-Web", "K-API", "K-Mobile"]);

        let mut config = config(None);
        config.presets = vec!["Custom".to_string()];
        let service =
            ScanService::with_transport(client.clone(), config, RecordingTransport::new());
        assert_eq!(service.presets(), ["Custom"]);
    }

    #[tokio::test]
    async fn test_result_links_use_portal_base_without_trailing_slash() {
        let client = Arc::new(InMemoryScanClient::new());
        let project = client.insert_project("alpha");
        let scan = client.seed_scan(SeedScan::completed(&project.project_id, "c1", false));
        let mut config = config(None);
        config.portal_url = "https://portal.example.com/".to_string();
        let service =
            ScanService::with_transport(client.clone(), config, RecordingTransport::new());

        let projection = service.get_scan_result(&scan.scan_id).await.unwrap();
        assert_eq!(
            projection.link,
            format!(
                "https://portal.example.com/projects/{}/scans?branch=main&id={}",
                project.project_id, scan.scan_id
            )
        );
    }
}
