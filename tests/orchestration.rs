//! Scan orchestration integration tests
//!
//! Drive the public service facade end to end over the in-memory platform:
//! launch, completion webhook, categorized results and cancellation.

mod common;

use common::{launch_request, service_with_webhook, PORTAL_URL};
use scanwrap::client::api::{
    ConfigurationSetting, FailPoint, InMemoryScanClient, ScanStatus, SeedScan,
};
use scanwrap::scans::api::{
    merge_configurations, parse_scan_types, MergeRequest, ScanServiceError, TrackerOutcome,
};
use std::sync::Arc;

#[tokio::test]
async fn test_launch_for_unknown_application_and_project() {
    let client = Arc::new(InMemoryScanClient::new());
    let (service, transport) = service_with_webhook(&client);

    let started = service
        .launch_scan(launch_request("app-X", "proj-Y", "c123"))
        .await
        .unwrap();

    assert_eq!(started.status, "started");
    assert!(!started.scan_id.is_empty());
    assert_eq!(client.projects()[0].name, "proj-Y");
    assert_eq!(client.applications()[0].name, "app-X");
    assert_eq!(
        client.applications()[0].project_ids,
        vec![client.projects()[0].project_id.clone()]
    );

    let outcome = service.join_tracker(&started.scan_id).await.unwrap();
    assert!(matches!(
        outcome,
        TrackerOutcome::Delivered {
            http_status: 204,
            ..
        }
    ));
    let bodies = transport.bodies();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["scan_id"], started.scan_id.as_str());
    assert_eq!(bodies[0]["tags"]["commit_id"], "c123");
}

#[test]
fn test_fast_scan_merge_without_defaults_or_preset() {
    let scan_types = parse_scan_types("sast,sca").unwrap();
    let merged = merge_configurations(
        &[],
        &MergeRequest {
            scan_types: &scan_types,
            is_fast_scan: true,
            preset: None,
        },
    );

    let categories: Vec<&str> = merged.iter().map(|c| c.scan_type.as_str()).collect();
    assert_eq!(categories, vec!["sast", "sca"]);
    assert_eq!(merged[0].values.len(), 1);
    assert_eq!(merged[0].values["fastScanMode"], "true");
    assert!(merged[1].values.is_empty());
}

#[tokio::test]
async fn test_results_pair_later_fast_with_earlier_full() {
    let client = Arc::new(InMemoryScanClient::new());
    let project = client.insert_project("proj-Y");
    let full = client.seed_scan(SeedScan::completed(&project.project_id, "c123", false));
    let fast = client.seed_scan(SeedScan::completed(&project.project_id, "c123", true));
    let (service, _transport) = service_with_webhook(&client);

    let response = service.get_results("c123", None).await.unwrap();

    assert_eq!(response.total_scans, 2);
    assert_eq!(response.scans.fast.as_ref().unwrap().scan_id, fast.scan_id);
    assert_eq!(response.scans.full.as_ref().unwrap().scan_id, full.scan_id);

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["scans"]["fast"]["is_fast_scan"], true);
    assert_eq!(json["scans"]["full"]["is_fast_scan"], false);
    assert_eq!(
        json["scans"]["fast"]["link"],
        format!(
            "{}/projects/{}/scans?branch=main&id={}",
            PORTAL_URL, project.project_id, fast.scan_id
        )
    );
}

#[tokio::test]
async fn test_results_for_unknown_commit_is_not_found() {
    let client = Arc::new(InMemoryScanClient::new());
    let (service, _transport) = service_with_webhook(&client);

    let err = service.get_results("c404", None).await.unwrap_err();

    assert!(matches!(err, ScanServiceError::NotFound { .. }));
    assert_eq!(err.http_status(), 404);
}

#[tokio::test]
async fn test_policy_lookup_failure_still_reports_completion() {
    let client = Arc::new(InMemoryScanClient::new());
    client.fail_on(FailPoint::PolicyViolation);
    let (service, transport) = service_with_webhook(&client);

    let started = service
        .launch_scan(launch_request("app-X", "proj-Y", "c123"))
        .await
        .unwrap();
    let outcome = service.join_tracker(&started.scan_id).await.unwrap();

    assert!(matches!(outcome, TrackerOutcome::Delivered { .. }));
    let body = &transport.bodies()[0];
    assert_eq!(body["is_policy_blocked"], false);
    assert!(!body["policy_warning"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_project_defaults_and_preset_reach_the_trigger() {
    let client = Arc::new(
        InMemoryScanClient::new().with_default_settings(vec![
            ConfigurationSetting::new("sast", "incremental", "false"),
            ConfigurationSetting::new("sca", "exploitablePath", "true"),
            ConfigurationSetting::new("apisec", "swaggerFolder", "api"),
        ]),
    );
    let (service, _transport) = service_with_webhook(&client);

    let mut request = launch_request("app-X", "proj-Y", "c123");
    request.scan_types = parse_scan_types("SAST, sca").unwrap();
    service.launch_scan(request).await.unwrap();

    let trigger = &client.triggers()[0];
    let categories: Vec<&str> = trigger
        .configurations
        .iter()
        .map(|c| c.scan_type.as_str())
        .collect();
    assert_eq!(categories, vec!["sast", "sca"]);
    assert_eq!(trigger.configurations[0].values["incremental"], "false");
    assert_eq!(trigger.configurations[0].values["presetName"], "K-API");
    assert!(!trigger.configurations[0].values.contains_key("fastScanMode"));
    assert_eq!(trigger.configurations[1].values["exploitablePath"], "true");

    service.shutdown().await;
}

#[tokio::test]
async fn test_cancelled_scan_is_reported_as_not_completed() {
    let client =
        Arc::new(InMemoryScanClient::new().with_progression(vec![ScanStatus::Running; 5]));
    let (service, transport) = service_with_webhook(&client);

    let started = service
        .launch_scan(launch_request("app-X", "proj-Y", "c123"))
        .await
        .unwrap();
    let ack = service.cancel_scan("c123", Some("proj-Y")).await.unwrap();
    assert_eq!(ack.scan_id, started.scan_id);

    let outcomes = service.shutdown().await;
    assert_eq!(outcomes.len(), 1);
    let body = &transport.bodies()[0];
    assert_eq!(body["status"], "Canceled");
    assert!(body["results"].is_null());

    let status = service.get_status("c123", None).await.unwrap();
    assert_eq!(status.status, "Canceled");
}
