//! Integration tests for the Device Farm sweepers using wiremock

use serde_json::json;
use tdfarm::aws::DeviceFarmClient;
use tdfarm::sweep::{
    InstanceProfileSweeper, ProjectSweeper, SweepError, SweepOptions, Sweeper, SweeperRegistry,
};
use wiremock::matchers::{body_partial_json, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn target(operation: &str) -> String {
    format!("DeviceFarm_20150623.{}", operation)
}

fn project_arn(id: &str) -> String {
    format!("arn:aws:devicefarm:us-west-2:123456789012:project:{}", id)
}

fn operation(name: &str) -> wiremock::MockBuilder {
    Mock::given(method("POST")).and(header("x-amz-target", target(name).as_str()))
}

fn ok(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

fn error_body(code: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({
        "__type": code,
        "message": message
    }))
}

fn client_for(server: &MockServer) -> DeviceFarmClient {
    DeviceFarmClient::with_static_credentials(&server.uri(), "us-west-2", "AKIDEXAMPLE", "wJalrXUtnFEMI")
        .expect("static client should build")
}

async fn mock_delete_project(server: &MockServer, id: &str, response: ResponseTemplate, times: u64) {
    operation("DeleteProject")
        .and(body_partial_json(json!({ "arn": project_arn(id) })))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

/// Tests for the project sweeper
mod project_tests {
    use super::*;

    /// Every page is listed and every project deleted, vanished ones counted apart
    #[tokio::test]
    async fn test_sweeps_all_pages() {
        let server = MockServer::start().await;

        operation("ListProjects")
            .and(body_partial_json(json!({ "nextToken": "page-2" })))
            .respond_with(ok(json!({
                "projects": [{ "arn": project_arn("c"), "name": "tf-acc-test-c" }]
            })))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        operation("ListProjects")
            .respond_with(ok(json!({
                "projects": [
                    { "arn": project_arn("a"), "name": "tf-acc-test-a" },
                    { "arn": project_arn("b"), "name": "tf-acc-test-b" }
                ],
                "nextToken": "page-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        mock_delete_project(&server, "a", ok(json!({})), 1).await;
        mock_delete_project(&server, "b", ok(json!({})), 1).await;
        mock_delete_project(
            &server,
            "c",
            error_body("NotFoundException", "No project was found"),
            1,
        )
        .await;

        let client = client_for(&server);
        let report = ProjectSweeper.sweep(&client, &SweepOptions::default()).await;

        assert_eq!(report.sweeper, "aws_devicefarm_project");
        assert_eq!(report.region, "us-west-2");
        assert_eq!(report.found, 3);
        assert_eq!(report.deleted, 2);
        assert_eq!(report.already_gone, 1);
        assert!(!report.skipped);
        assert!(!report.failed(), "unexpected errors: {:?}", report.errors);
    }

    /// Projects outside the name prefix are left alone
    #[tokio::test]
    async fn test_name_prefix_filters_targets() {
        let server = MockServer::start().await;

        operation("ListProjects")
            .respond_with(ok(json!({
                "projects": [
                    { "arn": project_arn("test"), "name": "tf-acc-test-1" },
                    { "arn": project_arn("prod"), "name": "production" }
                ]
            })))
            .mount(&server)
            .await;
        mock_delete_project(&server, "test", ok(json!({})), 1).await;
        mock_delete_project(&server, "prod", ok(json!({})), 0).await;

        let options = SweepOptions {
            name_prefix: Some("tf-acc-test".to_string()),
            ..SweepOptions::default()
        };
        let client = client_for(&server);
        let report = ProjectSweeper.sweep(&client, &options).await;

        assert_eq!(report.found, 2);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.filtered, 1);
    }

    /// A failed deletion is collected and the rest still run
    #[tokio::test]
    async fn test_delete_failure_is_collected() {
        let server = MockServer::start().await;

        operation("ListProjects")
            .respond_with(ok(json!({
                "projects": [
                    { "arn": project_arn("busy"), "name": "busy" },
                    { "arn": project_arn("idle"), "name": "idle" }
                ]
            })))
            .mount(&server)
            .await;
        mock_delete_project(
            &server,
            "busy",
            error_body("ArgumentException", "Project has running jobs"),
            1,
        )
        .await;
        mock_delete_project(&server, "idle", ok(json!({})), 1).await;

        let client = client_for(&server);
        let report = ProjectSweeper.sweep(&client, &SweepOptions::default()).await;

        assert_eq!(report.deleted, 1);
        assert_eq!(report.errors.len(), 1);
        match &report.errors[0] {
            SweepError::Delete { id, code, .. } => {
                assert_eq!(id, &project_arn("busy"));
                assert_eq!(code.as_deref(), Some("ArgumentException"));
            }
            other => panic!("expected a delete error, got {other:?}"),
        }
    }

    /// An account that can't call Device Farm is skipped, not failed
    #[tokio::test]
    async fn test_auth_failure_skips_region() {
        let server = MockServer::start().await;

        operation("ListProjects")
            .respond_with(error_body(
                "UnrecognizedClientException",
                "The security token included in the request is invalid.",
            ))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let report = ProjectSweeper.sweep(&client, &SweepOptions::default()).await;

        assert!(report.skipped);
        assert!(!report.failed());
        assert_eq!(report.summary_line(), "aws_devicefarm_project [us-west-2]: skipped");
    }

    /// Throttled listings are real failures
    #[tokio::test]
    async fn test_throttled_listing_is_an_error() {
        let server = MockServer::start().await;

        operation("ListProjects")
            .respond_with(error_body("ThrottlingException", "Rate exceeded"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let report = ProjectSweeper.sweep(&client, &SweepOptions::default()).await;

        assert!(!report.skipped);
        assert!(matches!(
            &report.errors[..],
            [SweepError::List { code: Some(code), region, .. }]
                if code == "ThrottlingException" && region == "us-west-2"
        ));
    }
}

/// Tests for the instance profile sweeper and the registry
mod registry_tests {
    use super::*;

    fn instance_profile_arn(id: &str) -> String {
        format!("arn:aws:devicefarm:us-west-2:123456789012:instanceprofile:{}", id)
    }

    #[tokio::test]
    async fn test_instance_profiles_are_deleted() {
        let server = MockServer::start().await;

        operation("ListInstanceProfiles")
            .respond_with(ok(json!({
                "instanceProfiles": [{ "arn": instance_profile_arn("1"), "name": "tf-acc-test-profile" }]
            })))
            .expect(1)
            .mount(&server)
            .await;
        operation("DeleteInstanceProfile")
            .and(body_partial_json(json!({ "arn": instance_profile_arn("1") })))
            .respond_with(ok(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let report = InstanceProfileSweeper
            .sweep(&client, &SweepOptions::default())
            .await;

        assert_eq!(report.sweeper, "aws_devicefarm_instance_profile");
        assert_eq!(report.deleted, 1);
    }

    /// Selecting one sweeper leaves the others untouched
    #[tokio::test]
    async fn test_run_selected_sweeper_only() {
        let server = MockServer::start().await;

        operation("ListInstanceProfiles")
            .respond_with(ok(json!({ "instanceProfiles": [] })))
            .expect(1)
            .mount(&server)
            .await;
        operation("ListProjects")
            .respond_with(ok(json!({ "projects": [] })))
            .expect(0)
            .mount(&server)
            .await;

        let options = SweepOptions {
            run: vec!["aws_devicefarm_instance_profile".to_string()],
            ..SweepOptions::default()
        };
        let client = client_for(&server);
        let reports = SweeperRegistry::with_defaults()
            .run(&client, &options)
            .await
            .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].found, 0);
    }

    /// A failing sweeper stops the run unless failures are allowed
    #[tokio::test]
    async fn test_failure_stops_run() {
        let server = MockServer::start().await;

        operation("ListProjects")
            .respond_with(error_body("ThrottlingException", "Rate exceeded"))
            .mount(&server)
            .await;
        operation("ListInstanceProfiles")
            .respond_with(ok(json!({ "instanceProfiles": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let registry = SweeperRegistry::with_defaults();

        let err = registry
            .run(&client, &SweepOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SweepError::Failed { ref report } if report.sweeper == "aws_devicefarm_project"));

        let options = SweepOptions {
            allow_failures: true,
            ..SweepOptions::default()
        };
        let reports = registry.run(&client, &options).await.unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports[0].failed());
        assert!(!reports[1].failed());
    }
}
