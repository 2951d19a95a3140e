mod common;

use std::sync::Arc;

use common::{MockFactory, MockGitHub, decode};
use ghbulk::{
    ItemStatus, Method, Repo,
    codeowners::{self, CodeownersOptions},
    contents::Committer,
    coverage::{
        CoverageOptions, generate_report, languages::Unscanned,
        scanning::{CodeqlStatus, ScanningInfo, fetch_scanning_info},
    },
    dependabot::{self, DependabotOptions},
    dismiss::{self, DismissOptions, DismissReason, DismissStatus},
    mappings::{self, Mapping},
};
use serde_json::json;

fn repo(full: &str) -> Repo {
    Repo::parse(full).unwrap()
}

fn coverage_options(org: &str) -> CoverageOptions {
    CoverageOptions {
        org: org.to_string(),
        output: None,
        repo: None,
        sample: false,
        check_workflow_status: false,
        check_unscanned_actions: false,
        fetch_alerts: true,
        concurrency: 2,
        stale_days: 90,
        max_retries: 3,
    }
}

fn org_inventory(api: &MockGitHub) {
    api.on_graphql(
        "organization(login",
        json!({
            "organization": { "repositories": {
                "pageInfo": { "hasNextPage": false, "endCursor": null },
                "nodes": [
                    {
                        "name": "app",
                        "updatedAt": "2024-06-01T08:00:00Z",
                        "isArchived": false,
                        "defaultBranchRef": { "name": "main" },
                        "languages": { "nodes": [{ "name": "Python" }, { "name": "JavaScript" }] }
                    },
                    {
                        "name": "legacy",
                        "updatedAt": "2019-01-01T00:00:00Z",
                        "isArchived": true,
                        "defaultBranchRef": null,
                        "languages": { "nodes": [] }
                    }
                ]
            }}
        }),
    );
}

#[tokio::test]
async fn test_coverage_report_for_org() {
    let api = MockGitHub::new();
    org_inventory(&api);
    api.on_get(
        "/repos/octo-org/app/code-scanning/analyses",
        json!([{
            "created_at": "2024-05-01T10:00:00Z",
            "category": "/language:python",
            "error": "",
            "warning": ""
        }]),
    )
    .on_get_error("/repos/octo-org/legacy/code-scanning/analyses", 404, "Not Found")
    .on_get(
        "/repos/octo-org/app/code-scanning/alerts",
        json!([
            { "rule": { "security_severity_level": "critical" } },
            { "rule": { "security_severity_level": "high" } }
        ]),
    );

    let report = generate_report(&api, &coverage_options("octo-org")).await.unwrap();

    assert_eq!(report.rows.len(), 2);
    let app = &report.rows[0];
    assert_eq!(app.repository, "app");
    assert_eq!(app.codeql, CodeqlStatus::Yes);
    assert_eq!(app.last_scan_date.as_deref(), Some("2024-05-01"));
    assert_eq!(app.scanned_languages, vec!["python"]);
    assert_eq!(
        app.unscanned,
        Unscanned::Languages(vec!["javascript-typescript".to_string()])
    );
    assert_eq!(app.alerts.map(|a| (a.open, a.critical)), Some((2, 1)));
    assert!(app.analysis_error.is_none());

    let legacy = &report.rows[1];
    assert_eq!(legacy.default_branch, "main");
    assert_eq!(legacy.codeql, CodeqlStatus::NotApplicable);
    assert_eq!(legacy.unscanned, Unscanned::NotApplicable);
    assert!(legacy.alerts.is_none());

    let mut lines = report.csv.lines();
    assert!(
        lines
            .next()
            .unwrap()
            .starts_with("Repository,Default Branch,Last Updated,Archived,Languages")
    );
    assert_eq!(
        lines.next().unwrap(),
        "app,main,2024-06-01,No,Python;JavaScript,Yes,2024-05-01,python,javascript-typescript,2,1,None,None"
    );
    assert_eq!(
        lines.next().unwrap(),
        "legacy,main,2019-01-01,Yes,,N/A,Never,,N/A,N/A,N/A,None,None"
    );
    assert!(!report.csv.ends_with('\n'));

    assert_eq!(report.summary.enabled, 1);
    assert_eq!(report.summary.archived, 1);
    assert_eq!(report.summary.missing_languages, 1);
    assert_eq!(report.summary.critical_alerts, 1);
    assert!(report.sub_reports.is_empty());
}

#[tokio::test]
async fn test_coverage_classifies_scanning_errors() {
    let api = MockGitHub::new();
    api.on_graphql(
        "organization(login",
        json!({
            "organization": { "repositories": {
                "pageInfo": { "hasNextPage": false, "endCursor": null },
                "nodes": [
                    { "name": "ghas", "updatedAt": "2024-01-01T00:00:00Z", "isArchived": false,
                      "defaultBranchRef": { "name": "main" }, "languages": { "nodes": [] } },
                    { "name": "off", "updatedAt": "2024-01-01T00:00:00Z", "isArchived": false,
                      "defaultBranchRef": { "name": "main" }, "languages": { "nodes": [] } },
                    { "name": "empty", "updatedAt": "2024-01-01T00:00:00Z", "isArchived": false,
                      "defaultBranchRef": { "name": "main" }, "languages": { "nodes": [] } },
                    { "name": "broken", "updatedAt": "2024-01-01T00:00:00Z", "isArchived": false,
                      "defaultBranchRef": { "name": "main" }, "languages": { "nodes": [] } }
                ]
            }}
        }),
    )
    .on_get_error(
        "/repos/octo-org/ghas/code-scanning/analyses",
        403,
        "Advanced Security must be enabled for this repository to use code scanning.",
    )
    .on_get_error("/repos/octo-org/off/code-scanning/analyses", 404, "Not Found")
    .on_get("/repos/octo-org/empty/code-scanning/analyses", json!([]))
    .on_get_error("/repos/octo-org/broken/code-scanning/analyses", 500, "Server Error");

    let mut options = coverage_options("octo-org");
    options.fetch_alerts = false;
    let report = generate_report(&api, &options).await.unwrap();

    let statuses: Vec<CodeqlStatus> = report.rows.iter().map(|r| r.codeql).collect();
    assert_eq!(
        statuses,
        vec![
            CodeqlStatus::RequiresGhas,
            CodeqlStatus::Disabled,
            CodeqlStatus::NoScans,
            CodeqlStatus::Unknown,
        ]
    );
    assert_eq!(
        report.summary.render(),
        "1 no scans, 1 disabled, 1 requires GHAS, 1 unknown"
    );
}

#[tokio::test]
async fn test_coverage_single_repository_not_found() {
    let api = MockGitHub::new();
    api.on_graphql("repository(owner", json!({ "repository": null }));

    let mut options = coverage_options("octo-org");
    options.repo = Some("missing".to_string());
    let err = generate_report(&api, &options).await.unwrap_err();
    assert_eq!(err.to_string(), "Repository octo-org/missing not found");
}

#[tokio::test]
async fn test_scanning_info_treats_malformed_analyses_as_unscanned() {
    let api = MockGitHub::new();
    api.on_get(
        "/repos/octo-org/app/code-scanning/analyses",
        json!({ "analyses": "unexpected shape" }),
    )
    .on_get(
        "/repos/octo-org/lib/code-scanning/analyses",
        json!([{ "created_at": "2024-05-01T10:00:00Z", "category": "/language:python" }]),
    );

    let malformed = fetch_scanning_info(&api, "octo-org", "app", "main").await;
    assert_eq!(malformed, ScanningInfo::default());

    let scanned = fetch_scanning_info(&api, "octo-org", "lib", "main").await;
    assert_eq!(scanned.last_scan_date.as_deref(), Some("2024-05-01T10:00:00Z"));
    assert_eq!(scanned.scanned_languages, vec!["python"]);
}

#[tokio::test]
async fn test_coverage_writes_report_and_sub_reports() {
    let api = MockGitHub::new();
    org_inventory(&api);
    api.on_get(
        "/repos/octo-org/app/code-scanning/analyses",
        json!([{ "created_at": "2024-05-01T10:00:00Z", "category": "/language:python" }]),
    )
    .on_get(
        "/repos/octo-org/app/code-scanning/alerts",
        json!([{ "rule": { "security_severity_level": "critical" } }]),
    );

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("report.csv");
    let mut options = coverage_options("octo-org");
    options.output = Some(output.clone());

    let report = generate_report(&api, &options).await.unwrap();

    assert_eq!(std::fs::read_to_string(&output).unwrap(), report.csv);
    let critical = dir.path().join("report-critical-alerts.csv");
    assert!(report.sub_reports.contains(&critical));
    assert!(dir.path().join("report-missing-languages.csv").exists());
    assert!(!dir.path().join("report-disabled.csv").exists());

    let critical_csv = std::fs::read_to_string(critical).unwrap();
    assert_eq!(critical_csv.lines().count(), 2);
    assert!(critical_csv.lines().nth(1).unwrap().starts_with("app,"));
}

fn dismiss_options(dry_run: bool) -> DismissOptions {
    DismissOptions {
        rule: "js/stack-trace-exposure".to_string(),
        reason: DismissReason::FalsePositive,
        comment: Some("expected".to_string()),
        dry_run,
        concurrency: 2,
    }
}

fn org_alert(number: u64, repo: &str, rule: &str) -> serde_json::Value {
    json!({
        "number": number,
        "rule": { "id": rule, "severity": "warning" },
        "most_recent_instance": { "location": { "path": "src/server.js" } },
        "html_url": format!("https://github.com/octo-org/{repo}/security/code-scanning/{number}"),
        "repository": { "name": repo }
    })
}

#[tokio::test]
async fn test_dismiss_org_alerts() {
    let api = Arc::new(MockGitHub::new());
    api.on_get(
        "/orgs/octo-org/code-scanning/alerts",
        json!([
            org_alert(1, "api", "js/stack-trace-exposure"),
            org_alert(2, "web", "js/stack-trace-exposure"),
            org_alert(3, "api", "js/xss"),
            org_alert(4, "api", "js/stack-trace-exposure"),
        ]),
    )
    .on_send_error(
        Method::Patch,
        "/repos/octo-org/web/code-scanning/alerts/2",
        403,
        "Resource not accessible by integration",
    );
    let factory = MockFactory::default().with_org("octo-org", Arc::clone(&api));

    let results = dismiss::run(&factory, &["octo-org".to_string()], None, &dismiss_options(false))
        .await
        .unwrap();

    let summary: Vec<(String, u64, bool)> = results
        .iter()
        .map(|r| {
            (
                r.repository.clone(),
                r.alert.number,
                r.status == DismissStatus::Dismissed,
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("api".to_string(), 1, true),
            ("api".to_string(), 4, true),
            ("web".to_string(), 2, false),
        ]
    );
    assert!(results[2].status.to_string().starts_with("error: "));

    let patches = api.sent_to(Method::Patch, "/repos/octo-org/api/code-scanning/alerts/1");
    assert_eq!(patches.len(), 1);
    assert_eq!(
        patches[0].body,
        json!({
            "state": "dismissed",
            "dismissed_reason": "false positive",
            "dismissed_comment": "expected"
        })
    );

    let table = dismiss::results_table(&results).render();
    assert!(table.starts_with(
        "Organization,Repository,Alert Number,Rule ID,Severity,Path,URL,Status\n"
    ));
    assert!(table.contains("octo-org,api,1,js/stack-trace-exposure,warning,src/server.js,"));
}

#[tokio::test]
async fn test_dismiss_dry_run_single_repository() {
    let api = Arc::new(MockGitHub::new());
    api.on_get(
        "/repos/octo-org/api/code-scanning/alerts",
        json!([
            {
                "number": 9,
                "rule": { "id": "js/stack-trace-exposure", "security_severity_level": "medium" },
                "html_url": "https://github.com/octo-org/api/security/code-scanning/9"
            },
            { "number": 10, "rule": { "id": "js/xss" } }
        ]),
    );
    let factory = MockFactory::default().with_org("octo-org", Arc::clone(&api));

    let results = dismiss::run(
        &factory,
        &["octo-org".to_string()],
        Some("api"),
        &dismiss_options(true),
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, DismissStatus::WouldDismiss);
    assert_eq!(results[0].alert.severity, "medium");
    assert_eq!(results[0].alert.path, "unknown");
    assert!(api.sent().is_empty());
}

#[tokio::test]
async fn test_dismiss_skips_unavailable_org_when_processing_many() {
    let api = Arc::new(MockGitHub::new());
    api.on_get(
        "/orgs/octo-org/code-scanning/alerts",
        json!([org_alert(1, "api", "js/stack-trace-exposure")]),
    );
    let no_ghas = Arc::new(MockGitHub::new());
    no_ghas.on_get_error(
        "/orgs/plain-org/code-scanning/alerts",
        403,
        "Advanced Security must be enabled for this organization",
    );
    let factory = MockFactory::default()
        .with_org("octo-org", Arc::clone(&api))
        .with_org("plain-org", no_ghas);

    let orgs = vec![
        "ghost-org".to_string(),
        "plain-org".to_string(),
        "octo-org".to_string(),
    ];
    let results = dismiss::run(&factory, &orgs, None, &dismiss_options(true))
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].organization, "octo-org");

    let err = dismiss::run(&factory, &["ghost-org".to_string()], None, &dismiss_options(true))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("GitHub App is not installed on organization: ghost-org"));
}

#[tokio::test]
async fn test_dismiss_single_org_listing_failure_is_fatal() {
    let api = Arc::new(MockGitHub::new());
    api.on_get_error("/orgs/octo-org/code-scanning/alerts", 500, "Server Error");
    let factory = MockFactory::default().with_org("octo-org", api);

    let err = dismiss::run(&factory, &["octo-org".to_string()], None, &dismiss_options(false))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Failed to fetch alerts for octo-org"));
}

const OWNERS: &str = "* @octo-org/admins";

#[tokio::test]
async fn test_codeowners_created_when_missing() {
    let api = MockGitHub::new();
    api.on_send(
        Method::Put,
        "/repos/octo-org/app/contents/CODEOWNERS",
        json!({ "content": { "path": "CODEOWNERS", "sha": "new-sha" } }),
    );

    let counts = codeowners::run(
        &api,
        &[repo("octo-org/app")],
        OWNERS,
        &CodeownersOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(counts.get(ItemStatus::Success), 1);

    let puts = api.sent_to(Method::Put, "/repos/octo-org/app/contents/CODEOWNERS");
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].body["message"], "Adding CODEOWNERS file");
    assert_eq!(decode(&puts[0].body["content"]), OWNERS);
    assert!(puts[0].body.get("sha").is_none());
}

#[tokio::test]
async fn test_codeowners_appends_to_existing_file() {
    let api = MockGitHub::new();
    api.with_file("octo-org/app", ".github/CODEOWNERS", "/docs @octo-org/docs", "old-sha");

    let results = codeowners::process_repositories(
        &api,
        &[repo("octo-org/app")],
        OWNERS,
        &CodeownersOptions::default(),
    )
    .await;

    assert_eq!(results[0].status, ItemStatus::Success);
    assert_eq!(results[0].message, "Appended to existing CODEOWNERS");
    assert_eq!(results[0].path.as_deref(), Some(".github/CODEOWNERS"));

    let puts = api.sent_to(Method::Put, "/repos/octo-org/app/contents/.github/CODEOWNERS");
    assert_eq!(puts[0].body["message"], "Updating CODEOWNERS file");
    assert_eq!(puts[0].body["sha"], "old-sha");
    assert_eq!(
        decode(&puts[0].body["content"]),
        "/docs @octo-org/docs\n* @octo-org/admins"
    );
}

#[tokio::test]
async fn test_codeowners_dry_run_commits_nothing() {
    let api = MockGitHub::new();
    api.with_file("octo-org/app", "CODEOWNERS", "* @someone", "sha");
    let options = CodeownersOptions {
        overwrite: true,
        create_pr: true,
        dry_run: true,
        ..CodeownersOptions::default()
    };

    let results =
        codeowners::process_repositories(&api, &[repo("octo-org/app")], OWNERS, &options).await;

    assert_eq!(results[0].status, ItemStatus::DryRun);
    assert_eq!(
        results[0].message,
        "Replaced existing CODEOWNERS (dry-run, would create PR)"
    );
    assert!(api.sent().is_empty());
}

fn default_branch(api: &MockGitHub, full: &str) {
    api.on_get(&format!("/repos/{full}"), json!({ "default_branch": "main" }))
        .on_get(
            &format!("/repos/{full}/git/ref/heads/main"),
            json!({ "object": { "sha": "head-sha" } }),
        );
}

#[tokio::test]
async fn test_codeowners_pull_request_mode() {
    let api = MockGitHub::new();
    default_branch(&api, "octo-org/app");
    api.on_send(
        Method::Put,
        "/repos/octo-org/app/contents/CODEOWNERS",
        json!({ "content": { "path": "CODEOWNERS", "sha": "blob" } }),
    )
    .on_send(
        Method::Post,
        "/repos/octo-org/app/pulls",
        json!({ "number": 7, "html_url": "https://github.com/octo-org/app/pull/7" }),
    );
    let options = CodeownersOptions {
        create_pr: true,
        ..CodeownersOptions::default()
    };

    let results =
        codeowners::process_repositories(&api, &[repo("octo-org/app")], OWNERS, &options).await;

    let result = &results[0];
    assert_eq!(result.status, ItemStatus::Success);
    assert_eq!(result.message, "Created new CODEOWNERS file (PR #7)");
    assert_eq!(
        result.line(),
        "✓ octo-org/app: Created new CODEOWNERS file (PR #7) - https://github.com/octo-org/app/pull/7"
    );

    let refs = api.sent_to(Method::Post, "/repos/octo-org/app/git/refs");
    assert_eq!(
        refs[0].body,
        json!({ "ref": "refs/heads/add-codeowners", "sha": "head-sha" })
    );
    let puts = api.sent_to(Method::Put, "/repos/octo-org/app/contents/CODEOWNERS");
    assert_eq!(puts[0].body["branch"], "add-codeowners");
    let pulls = api.sent_to(Method::Post, "/repos/octo-org/app/pulls");
    assert_eq!(pulls[0].body["head"], "add-codeowners");
    assert_eq!(pulls[0].body["base"], "main");
    assert_eq!(pulls[0].body["title"], "Add CODEOWNERS file");
    assert_eq!(
        pulls[0].body["body"],
        "This PR adds a CODEOWNERS file to the repository."
    );
}

#[tokio::test]
async fn test_codeowners_existing_branch_is_an_error() {
    let api = MockGitHub::new();
    default_branch(&api, "octo-org/app");
    api.on_send_error(
        Method::Post,
        "/repos/octo-org/app/git/refs",
        422,
        "Reference already exists",
    );
    let options = CodeownersOptions {
        create_pr: true,
        ..CodeownersOptions::default()
    };

    let counts = codeowners::run(&api, &[repo("octo-org/app")], OWNERS, &options)
        .await
        .unwrap();
    assert!(counts.has_errors());

    let results =
        codeowners::process_repositories(&api, &[repo("octo-org/app")], OWNERS, &options).await;
    assert_eq!(
        results[0].message,
        "Branch 'add-codeowners' already exists. Delete it or use a different branch name."
    );
    assert!(
        api.sent_to(Method::Put, "/repos/octo-org/app/contents/CODEOWNERS")
            .is_empty()
    );
}

#[tokio::test]
async fn test_codeowners_lookup_failure_fails_only_that_repository() {
    let api = MockGitHub::new();
    api.on_get_error(
        "/repos/octo-org/locked/contents/CODEOWNERS",
        403,
        "Resource not accessible",
    );

    let results = codeowners::process_repositories(
        &api,
        &[repo("octo-org/locked"), repo("octo-org/app")],
        OWNERS,
        &CodeownersOptions::default(),
    )
    .await;

    assert_eq!(results[0].repository, "octo-org/locked");
    assert_eq!(results[0].status, ItemStatus::Error);
    assert!(results[0].message.contains("Resource not accessible"));
    assert_eq!(results[1].status, ItemStatus::Success);
}

#[tokio::test]
async fn test_dependabot_skips_existing_and_creates_missing() {
    let api = MockGitHub::new();
    api.with_file("octo-org/old", ".github/dependabot.yml", "version: 2", "sha1");
    let options = DependabotOptions {
        overwrite: false,
        dry_run: false,
        committer: Some(Committer {
            name: "bot[bot]".to_string(),
            email: "bot@users.noreply.github.com".to_string(),
        }),
        concurrency: 4,
    };

    let (results, counts) = dependabot::run(
        &api,
        &[repo("octo-org/old"), repo("octo-org/new")],
        "version: 2\nupdates: []\n",
        &options,
    )
    .await;

    assert_eq!(results[0].status, ItemStatus::Skipped);
    assert_eq!(results[0].message, ".github/dependabot.yml already exists");
    assert_eq!(results[1].status, ItemStatus::Success);
    assert_eq!(results[1].message, "Successful: Adding dependabot.yml file");
    assert_eq!(counts.get(ItemStatus::Success), 1);
    assert_eq!(counts.get(ItemStatus::Skipped), 1);

    let puts = api.sent_to(Method::Put, "/repos/octo-org/new/contents/.github/dependabot.yml");
    assert_eq!(puts[0].body["committer"]["name"], "bot[bot]");
    assert!(puts[0].body.get("sha").is_none());
}

#[tokio::test]
async fn test_dependabot_overwrite_sends_sha() {
    let api = MockGitHub::new();
    api.with_file("octo-org/old", ".github/dependabot.yml", "version: 2", "sha1");
    let options = DependabotOptions {
        overwrite: true,
        concurrency: 1,
        ..DependabotOptions::default()
    };

    let (results, _) = dependabot::run(&api, &[repo("octo-org/old")], "version: 2", &options).await;

    assert_eq!(results[0].message, "Successful: Updating dependabot.yml file");
    let puts = api.sent_to(Method::Put, "/repos/octo-org/old/contents/.github/dependabot.yml");
    assert_eq!(puts[0].body["sha"], "sha1");
    assert!(puts[0].body.get("committer").is_none());
}

#[tokio::test]
async fn test_mappings_rewrite_last_codeowners_location() {
    let api = MockGitHub::new();
    api.with_file("octo-org/app", "CODEOWNERS", "* @old-org/team", "root-sha")
        .with_file(
            "octo-org/app",
            "docs/CODEOWNERS",
            "* @old-org/team\n/docs @old-org/team @old-user",
            "docs-sha",
        )
        .with_file("octo-org/plain", "CODEOWNERS", "* @someone-else", "sha");
    let table = vec![
        Mapping {
            old_value: "@old-org/team".to_string(),
            new_value: "@new-org/team".to_string(),
        },
        Mapping {
            old_value: "@old-user".to_string(),
            new_value: "@new-user".to_string(),
        },
    ];

    let (results, counts) = mappings::run(
        &api,
        &[
            repo("octo-org/app"),
            repo("octo-org/plain"),
            repo("octo-org/none"),
        ],
        &table,
        false,
        2,
    )
    .await;

    assert_eq!(results[0].status, ItemStatus::Success);
    assert_eq!(results[1].status, ItemStatus::Skipped);
    assert_eq!(results[2].status, ItemStatus::Skipped);
    assert_eq!(
        results[2].message,
        "Could not find CODEOWNERS file in octo-org/none"
    );
    assert_eq!(counts.get(ItemStatus::Success), 1);

    assert!(
        api.sent_to(Method::Put, "/repos/octo-org/app/contents/CODEOWNERS")
            .is_empty()
    );
    let puts = api.sent_to(Method::Put, "/repos/octo-org/app/contents/docs/CODEOWNERS");
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].body["message"], "Updating codeowners file");
    assert_eq!(puts[0].body["sha"], "docs-sha");
    assert_eq!(
        puts[0].body["committer"],
        json!({
            "name": "github-actions[bot]",
            "email": "github-actions[bot]@users.noreply.github.com"
        })
    );
    assert_eq!(
        decode(&puts[0].body["content"]),
        "* @new-org/team\n/docs @old-org/team @new-user"
    );
    assert_eq!(api.sent().len(), 1);
}

#[tokio::test]
async fn test_mappings_dry_run() {
    let api = MockGitHub::new();
    api.with_file("octo-org/app", ".github/CODEOWNERS", "* @old", "sha");
    let table = mappings::parse_mappings("oldValue,newValue\n@old,@new\n").unwrap();

    let (results, _) = mappings::run(&api, &[repo("octo-org/app")], &table, true, 1).await;

    assert_eq!(results[0].status, ItemStatus::DryRun);
    assert!(api.sent().is_empty());
}
