use chrono::NaiveDate;
use httpmock::prelude::*;
use iteration_sync::{AzureDevOpsClient, ProjectDriver, Settings, SyncError};
use serde_json::json;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn settings(server: &MockServer, iterations_to_create: u32) -> Settings {
    Settings {
        endpoint_uri: server.base_url(),
        credential_token: "test-pat".to_string(),
        request_timeout_seconds: 5,
        iterations_to_create,
        iteration_name_prefix: "Sprint".to_string(),
        iteration_length: 14,
        bootstrap_start_date: date(2024, 1, 1),
        projects: vec!["Phoenix".to_string()],
        continue_on_error: false,
    }
}

fn driver(server: &MockServer, iterations_to_create: u32, today: NaiveDate) -> ProjectDriver<AzureDevOpsClient, Settings> {
    let settings = settings(server, iterations_to_create);
    let client = AzureDevOpsClient::from_config(&settings).unwrap();
    ProjectDriver::new(client, settings, today)
}

fn dated(name: &str, start: &str, finish: &str) -> serde_json::Value {
    json!({
        "id": 100,
        "identifier": format!("guid-{}", name),
        "name": name,
        "structureType": "iteration",
        "hasChildren": false,
        "attributes": {
            "startDate": format!("{}T00:00:00Z", start),
            "finishDate": format!("{}T00:00:00Z", finish)
        }
    })
}

async fn mock_teams<'a>(server: &'a MockServer, teams: &[&str]) -> httpmock::Mock<'a> {
    let value: Vec<serde_json::Value> = teams
        .iter()
        .map(|name| json!({ "id": format!("team-{}", name), "name": name }))
        .collect();
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/_apis/projects/Phoenix/teams")
                .header_exists("authorization");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({ "count": value.len(), "value": value }));
        })
        .await
}

async fn mock_root<'a>(server: &'a MockServer, children: Vec<serde_json::Value>) -> httpmock::Mock<'a> {
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/Phoenix/_apis/wit/classificationnodes/Iterations")
                .query_param("$depth", "1");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "id": 1,
                    "identifier": "guid-root",
                    "name": "Phoenix",
                    "structureType": "iteration",
                    "hasChildren": !children.is_empty(),
                    "children": children
                }));
        })
        .await
}

async fn mock_create<'a>(
    server: &'a MockServer,
    name: &str,
    start: &str,
    finish: &str,
) -> httpmock::Mock<'a> {
    let expected_body = format!(
        r#"{{"name":"{}","attributes":{{"startDate":"{}T00:00:00Z","finishDate":"{}T00:00:00Z"}}}}"#,
        name, start, finish
    );
    let response = dated(name, start, finish);
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/Phoenix/_apis/wit/classificationnodes/Iterations")
                .body(expected_body);
            then.status(201)
                .header("Content-Type", "application/json")
                .json_body(response);
        })
        .await
}

async fn mock_assign<'a>(server: &'a MockServer, team: &str, status: u16) -> httpmock::Mock<'a> {
    let path = format!("/Phoenix/{}/_apis/work/teamsettings/iterations", team);
    server
        .mock_async(|when, then| {
            when.method(POST).path(path);
            then.status(status)
                .header("Content-Type", "application/json")
                .json_body(json!({ "id": "assigned" }));
        })
        .await
}

#[tokio::test]
async fn test_bootstrap_empty_project() {
    let server = MockServer::start_async().await;
    mock_teams(&server, &["Alpha", "Bravo"]).await;
    mock_root(&server, vec![]).await;
    let sprint_1 = mock_create(&server, "Sprint 1", "2024-01-01", "2024-01-14").await;
    let sprint_2 = mock_create(&server, "Sprint 2", "2024-01-15", "2024-01-28").await;
    let alpha = mock_assign(&server, "Alpha", 200).await;
    let bravo = mock_assign(&server, "Bravo", 200).await;

    let summary = driver(&server, 2, date(2024, 6, 1)).run().await.unwrap();

    sprint_1.assert_async().await;
    sprint_2.assert_async().await;
    alpha.assert_hits_async(2).await;
    bravo.assert_hits_async(2).await;

    let report = &summary.projects[0];
    assert!(report.backfilled.is_empty());
    assert_eq!(report.created, vec!["Sprint 1", "Sprint 2"]);
    assert!(report.failed_assignments.is_empty());
}

#[tokio::test]
async fn test_backfill_then_extend() {
    let server = MockServer::start_async().await;
    mock_teams(&server, &["Alpha"]).await;
    // The tree never shows the new nodes; the driver must still move forward.
    let root = mock_root(&server, vec![dated("Sprint 5", "2024-03-01", "2024-03-14")]).await;
    let sprint_6 = mock_create(&server, "Sprint 6", "2024-03-15", "2024-03-28").await;
    let sprint_7 = mock_create(&server, "Sprint 7", "2024-03-29", "2024-04-11").await;
    let sprint_8 = mock_create(&server, "Sprint 8", "2024-04-12", "2024-04-25").await;
    let alpha = mock_assign(&server, "Alpha", 200).await;

    let summary = driver(&server, 1, date(2024, 4, 10)).run().await.unwrap();

    sprint_6.assert_async().await;
    sprint_7.assert_async().await;
    sprint_8.assert_async().await;
    alpha.assert_hits_async(3).await;
    // Initial read plus one re-read per backfilled iteration.
    root.assert_hits_async(3).await;

    let report = &summary.projects[0];
    assert_eq!(report.backfilled, vec!["Sprint 6", "Sprint 7"]);
    assert_eq!(report.created, vec!["Sprint 8"]);
}

#[tokio::test]
async fn test_existing_iterations_are_not_recreated() {
    let server = MockServer::start_async().await;
    mock_teams(&server, &["Alpha"]).await;
    mock_root(
        &server,
        vec![
            dated("Sprint 1", "2024-01-01", "2024-01-14"),
            dated("Sprint 2", "2024-01-15", "2024-01-28"),
        ],
    )
    .await;
    let sprint_2 = mock_create(&server, "Sprint 2", "2024-01-15", "2024-01-28").await;
    let sprint_3 = mock_create(&server, "Sprint 3", "2024-01-29", "2024-02-11").await;
    mock_assign(&server, "Alpha", 200).await;

    let summary = driver(&server, 2, date(2024, 1, 5)).run().await.unwrap();

    sprint_2.assert_hits_async(0).await;
    sprint_3.assert_async().await;

    let report = &summary.projects[0];
    assert_eq!(report.skipped, vec!["Sprint 2"]);
    assert_eq!(report.created, vec!["Sprint 3"]);
}

#[tokio::test]
async fn test_partially_dated_project_is_rejected() {
    let server = MockServer::start_async().await;
    mock_teams(&server, &["Alpha"]).await;
    mock_root(
        &server,
        vec![
            dated("Sprint 1", "2024-01-01", "2024-01-14"),
            json!({ "id": 7, "identifier": "guid-2", "name": "Sprint 2", "hasChildren": false }),
        ],
    )
    .await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(201);
        })
        .await;

    let err = driver(&server, 2, date(2024, 1, 5)).run().await.unwrap_err();

    create.assert_hits_async(0).await;
    match err {
        SyncError::UnsupportedCalendarState { project, undated } => {
            assert_eq!(project, "Phoenix");
            assert_eq!(undated, vec!["Sprint 2".to_string()]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_null_create_response_is_creation_failure() {
    let server = MockServer::start_async().await;
    mock_teams(&server, &["Alpha"]).await;
    mock_root(&server, vec![]).await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/Phoenix/_apis/wit/classificationnodes/Iterations");
            then.status(200)
                .header("Content-Type", "application/json")
                .body("null");
        })
        .await;
    let alpha = mock_assign(&server, "Alpha", 200).await;

    let err = driver(&server, 2, date(2024, 1, 5)).run().await.unwrap_err();

    alpha.assert_hits_async(0).await;
    assert!(matches!(err, SyncError::IterationCreationFailed { ref name, .. } if name == "Sprint 1"));
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn test_team_assignment_failure_is_reported() {
    let server = MockServer::start_async().await;
    mock_teams(&server, &["Alpha", "Bravo"]).await;
    mock_root(&server, vec![]).await;
    mock_create(&server, "Sprint 1", "2024-01-01", "2024-01-14").await;
    let alpha = mock_assign(&server, "Alpha", 200).await;
    let bravo = mock_assign(&server, "Bravo", 500).await;

    let summary = driver(&server, 1, date(2024, 1, 5)).run().await.unwrap();

    alpha.assert_async().await;
    bravo.assert_async().await;

    let report = &summary.projects[0];
    assert_eq!(report.created, vec!["Sprint 1"]);
    assert_eq!(report.failed_assignments.len(), 1);
    assert_eq!(report.failed_assignments[0].team, "Bravo");
    assert_eq!(report.failed_assignments[0].iteration, "Sprint 1");
}

#[tokio::test]
async fn test_dry_run_only_reads() {
    let server = MockServer::start_async().await;
    mock_teams(&server, &["Alpha"]).await;
    let root = mock_root(&server, vec![dated("Sprint 5", "2024-03-01", "2024-03-14")]).await;
    let writes = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(201);
        })
        .await;

    let summary = driver(&server, 1, date(2024, 4, 10))
        .with_dry_run(true)
        .run()
        .await
        .unwrap();

    writes.assert_hits_async(0).await;
    root.assert_hits_async(1).await;
    assert!(summary.dry_run);
    assert_eq!(summary.projects[0].backfilled, vec!["Sprint 6", "Sprint 7"]);
    assert_eq!(summary.projects[0].created, vec!["Sprint 8"]);
}

#[tokio::test]
async fn test_unauthorized_request_fails_run() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/_apis/projects/Phoenix/teams");
            then.status(401).body("TF400813: not authorized");
        })
        .await;

    let err = driver(&server, 1, date(2024, 1, 5)).run().await.unwrap_err();

    match err {
        SyncError::ApiStatusError { status, body, .. } => {
            assert_eq!(status, 401);
            assert!(body.contains("TF400813"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
