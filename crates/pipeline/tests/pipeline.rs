use crate::common::{Fixture, PROJECT, key, service, source};
use ferry_extract::models::TypedValue;
use ferry_pipeline::error::ErrorKind;
use ferry_pipeline::upload::UploadOutcome;
use ferry_pipeline::{Canceller, manifest_header, run};
use ferry_remote::Call;
use std::time::Duration;

mod common;

#[tokio::test]
async fn test_upload_end_to_end() {
    let mut fixture = Fixture::new();
    fixture.file("empty.txt", "");
    let notes = fixture.file("notes.txt", "notes");
    let first = fixture.image("a/scan-1.dcm", &[("PatientID", "P-1"), ("StudyDate", "20200101"), ("Modality", "CT")]);
    let second = fixture.image("b/scan-1.dcm", &[("PatientID", "P-1"), ("StudyDate", "20200101")]);
    let other = fixture.image("b/scan-2.dcm", &[("PatientID", "P-2"), ("StudyDate", "20210304")]);
    let service = service();

    let summary = run(&fixture.context(), &service, &fixture.extractor(), &Canceller::new()).await.unwrap();

    assert_eq!(summary.total, 4);
    assert_eq!(summary.uploaded(), 4);
    assert!(summary.failed().is_empty());
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(
        service.file_keys().await,
        vec![
            key(PROJECT, "1_P_1_20200101_scan_1.dcm"),
            key(PROJECT, "2_P_1_20200101_scan_1.dcm"),
            key(PROJECT, "P_2_20210304_scan_2.dcm"),
            key(PROJECT, "notes.txt"),
        ]
    );
    assert_eq!(source(&summary, &first).remote, "syn1/1_P_1_20200101_scan_1.dcm");
    assert_eq!(source(&summary, &second).remote, "syn1/2_P_1_20200101_scan_1.dcm");
    assert_eq!(source(&summary, &other).outcome.attempts(), 1);
    assert_eq!(source(&summary, &notes).remote, "syn1/notes.txt");

    let stored = service.file(PROJECT, "1_P_1_20200101_scan_1.dcm").await.unwrap();
    assert_eq!(stored.content, b"a/scan-1.dcm");
    assert_eq!(stored.annotations.get("Modality"), Some(&TypedValue::String("CT".into())));
    assert!(service.file(PROJECT, "notes.txt").await.unwrap().annotations.is_empty());
    // Uploads never force a new version.
    assert!(service.calls().await.iter().all(|call| !matches!(call, Call::StoreFile { force_version: true, .. })));
    assert!(fixture.staged().is_empty());
}

#[tokio::test]
async fn test_shards_created_once_under_prefix() {
    let mut fixture = Fixture::new();
    for name in ["a", "b", "c", "d", "e"] {
        fixture.file(&format!("{name}.txt"), name);
    }
    let mut ctx = fixture.context();
    ctx.max_capacity = 2;
    ctx.remote_prefix = vec!["batch".to_string()];
    let service = service();

    let summary = run(&ctx, &service, &fixture.extractor(), &Canceller::new()).await.unwrap();
    assert_eq!(summary.uploaded(), 5);

    let folders: Vec<_> = service
        .mutating_calls()
        .await
        .into_iter()
        .filter(|call| matches!(call, Call::StoreFolder { .. }))
        .collect();
    assert_eq!(
        folders,
        vec![
            Call::StoreFolder { parent: "syn1".into(), name: "batch".into() },
            Call::StoreFolder { parent: "syn1/batch".into(), name: "01".into() },
            Call::StoreFolder { parent: "syn1/batch".into(), name: "02".into() },
            Call::StoreFolder { parent: "syn1/batch".into(), name: "03".into() },
        ]
    );
    assert_eq!(
        service.file_keys().await,
        vec![
            key("syn1/batch/01", "a.txt"),
            key("syn1/batch/01", "b.txt"),
            key("syn1/batch/02", "c.txt"),
            key("syn1/batch/02", "d.txt"),
            key("syn1/batch/03", "e.txt"),
        ]
    );
}

#[tokio::test]
async fn test_dry_run_makes_no_changes() {
    let mut fixture = Fixture::new();
    for name in ["a", "b", "c"] {
        fixture.file(&format!("{name}.txt"), name);
    }
    let mut ctx = fixture.context();
    ctx.dry_run = true;
    ctx.max_capacity = 2;
    let service = service();

    let summary = run(&ctx, &service, &fixture.extractor(), &Canceller::new()).await.unwrap();

    assert_eq!(summary.simulated(), 3);
    assert_eq!(summary.uploaded(), 0);
    assert_eq!(summary.exit_code(), 0);
    assert!(service.mutating_calls().await.is_empty());
    assert!(service.calls().await.contains(&Call::GetProject(PROJECT.into())));
    // Same logical layout as a real run.
    let mut remotes: Vec<_> = summary.reports.iter().map(|report| report.remote.as_str()).collect();
    remotes.sort_unstable();
    assert_eq!(remotes, vec!["syn1/01/a.txt", "syn1/01/b.txt", "syn1/02/c.txt"]);
    assert!(fixture.staged().is_empty());
}

#[tokio::test]
async fn test_manifest_mode() {
    let mut fixture = Fixture::new();
    fixture.image("scan.dcm", &[("PatientID", "P"), ("StudyDate", "20200101"), ("SeriesNumber", "7")]);
    fixture.file("x.txt", "x");
    fixture.file("y.txt", "y");
    let mut ctx = fixture.context();
    ctx.manifest_only = true;
    ctx.max_capacity = 2;
    let service = service();

    let summary = run(&ctx, &service, &fixture.extractor(), &Canceller::new()).await.unwrap();
    assert_eq!(summary.manifest_rows, Some(3));
    assert_eq!(summary.skipped(), 0);
    assert_eq!(summary.exit_code(), 0);

    // Containers are real, files are not uploaded.
    let calls = service.mutating_calls().await;
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|call| matches!(call, Call::StoreFolder { .. })));

    let text = std::fs::read_to_string(&ctx.manifest_path).unwrap();
    let rows: Vec<Vec<&str>> = text.lines().map(|line| line.split('\t').collect()).collect();
    assert_eq!(rows[0], manifest_header());
    let series = rows[0].iter().position(|column| *column == "SeriesNumber").unwrap();
    let body: Vec<_> = rows[1..].iter().map(|row| (row[1], row[2], row[3], row[series])).collect();
    assert_eq!(
        body,
        vec![
            ("syn1/01", "P_20200101_scan.dcm", "True", "7"),
            ("syn1/01", "x.txt", "True", ""),
            ("syn1/02", "y.txt", "True", ""),
        ]
    );
}

#[tokio::test]
async fn test_dry_run_manifest_uses_placeholders() {
    let mut fixture = Fixture::new();
    fixture.image("scan.dcm", &[("PatientID", "P"), ("StudyDate", "20200101"), ("SeriesNumber", "7")]);
    fixture.file("x.txt", "x");
    fixture.file("y.txt", "y");
    let mut ctx = fixture.context();
    ctx.manifest_only = true;
    ctx.dry_run = true;
    ctx.max_capacity = 2;
    let service = service();

    let summary = run(&ctx, &service, &fixture.extractor(), &Canceller::new()).await.unwrap();
    assert_eq!(summary.manifest_rows, Some(3));
    assert_eq!(summary.exit_code(), 0);
    assert!(service.mutating_calls().await.is_empty());

    let text = std::fs::read_to_string(&ctx.manifest_path).unwrap();
    let rows: Vec<Vec<&str>> = text.lines().map(|line| line.split('\t').collect()).collect();
    assert_eq!(rows[0], manifest_header());
    let series = rows[0].iter().position(|column| *column == "SeriesNumber").unwrap();
    let body: Vec<_> = rows[1..].iter().map(|row| (row[1], row[2], row[3], row[series])).collect();
    assert_eq!(
        body,
        vec![
            ("dry-run", "P_20200101_scan.dcm", "True", "7"),
            ("dry-run", "x.txt", "True", ""),
            ("dry-run", "y.txt", "True", ""),
        ]
    );
}

#[tokio::test]
async fn test_separator_in_name_component_is_replaced() {
    let mut fixture = Fixture::new();
    let scan = fixture.image("scan.dcm", &[("PatientID", "AB/12"), ("StudyDate", "20200101")]);
    let service = service();

    let summary = run(&fixture.context(), &service, &fixture.extractor(), &Canceller::new()).await.unwrap();

    assert_eq!(summary.uploaded(), 1);
    assert_eq!(source(&summary, &scan).remote, "syn1/AB_12_20200101_scan.dcm");
    assert_eq!(service.file_keys().await, vec![key(PROJECT, "AB_12_20200101_scan.dcm")]);
    assert!(fixture.staged().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_retried_upload_succeeds_once() {
    let mut fixture = Fixture::new();
    let flaky = fixture.file("flaky.txt", "flaky");
    let steady = fixture.file("steady.txt", "steady");
    let service = service().fail_store("flaky.txt", 2);

    let summary = run(&fixture.context(), &service, &fixture.extractor(), &Canceller::new()).await.unwrap();

    assert_eq!(summary.uploaded(), 2);
    assert_eq!(summary.exit_code(), 0);
    let report = source(&summary, &flaky);
    // Two retries after the first attempt.
    assert!(matches!(report.outcome, UploadOutcome::Uploaded { attempts: 3, .. }));
    assert_eq!(summary.reports.iter().filter(|r| r.source == flaky).count(), 1);
    assert_eq!(source(&summary, &steady).outcome.attempts(), 1);

    let times = service.store_times("flaky.txt").await;
    assert_eq!(times.len(), 3);
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(3));
    }
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_do_not_block_others() {
    let mut fixture = Fixture::new();
    let broken = fixture.file("broken.txt", "broken");
    for name in ["a", "b", "c"] {
        fixture.file(&format!("{name}.txt"), name);
    }
    let mut ctx = fixture.context();
    ctx.threads = 1;
    let service = service().fail_store("broken.txt", 100);

    let summary = run(&ctx, &service, &fixture.extractor(), &Canceller::new()).await.unwrap();

    assert_eq!(summary.uploaded(), 3);
    assert_eq!(summary.failed(), vec![&broken]);
    assert!(matches!(source(&summary, &broken).outcome, UploadOutcome::Failed { attempts: 5, .. }));
    assert_eq!(service.store_times("broken.txt").await.len(), 5);
    assert_eq!(summary.exit_code(), 2);
    assert!(fixture.staged().is_empty());
}

#[tokio::test]
async fn test_permanent_failure_is_not_retried() {
    let mut fixture = Fixture::new();
    let denied = fixture.file("denied.txt", "denied");
    let service = service().deny_store("denied.txt");

    let summary = run(&fixture.context(), &service, &fixture.extractor(), &Canceller::new()).await.unwrap();

    assert!(matches!(source(&summary, &denied).outcome, UploadOutcome::Failed { attempts: 1, .. }));
    assert_eq!(summary.exit_code(), 2);
}

#[tokio::test]
async fn test_folder_creation_failure_is_fatal() {
    let mut fixture = Fixture::new();
    for name in ["a", "b", "c"] {
        fixture.file(&format!("{name}.txt"), name);
    }
    let mut ctx = fixture.context();
    ctx.max_capacity = 1;
    let service = service().deny_store("02");

    let err = run(&ctx, &service, &fixture.extractor(), &Canceller::new()).await.unwrap_err();

    assert!(matches!(&*err, ErrorKind::FolderCreation(path) if path == "syn1/02"));
    assert!(service.folder(PROJECT, "03").await.is_none());
    assert!(fixture.staged().is_empty());
}

#[tokio::test]
async fn test_unknown_project() {
    let fixture = Fixture::new();
    let mut ctx = fixture.context();
    ctx.project = "syn404".to_string();

    let err = run(&ctx, &service(), &fixture.extractor(), &Canceller::new()).await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::Project(id) if id == "syn404"));
}

#[tokio::test]
async fn test_empty_tree() {
    let fixture = Fixture::new();
    let service = service();

    let summary = run(&fixture.context(), &service, &fixture.extractor(), &Canceller::new()).await.unwrap();

    assert_eq!(summary.total, 0);
    assert_eq!(summary.exit_code(), 0);
    // Only the coordinator's own session.
    assert_eq!(service.sessions().await, 1);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let mut fixture = Fixture::new();
    fixture.file("a.txt", "a");
    let service = service();
    let canceller = Canceller::new();
    canceller.request();

    let err = run(&fixture.context(), &service, &fixture.extractor(), &canceller).await.unwrap_err();

    assert!(matches!(&*err, ErrorKind::Cancelled));
    assert!(service.mutating_calls().await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_during_upload() {
    let mut fixture = Fixture::new();
    for i in 0..6 {
        fixture.file(&format!("{i}.txt"), "data");
    }
    let mut ctx = fixture.context();
    ctx.threads = 1;
    let service = service().with_latency(Duration::from_millis(50));
    let canceller = Canceller::new();

    let watcher = {
        let service = service.clone();
        let canceller = canceller.clone();
        tokio::spawn(async move {
            while service.file_keys().await.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            canceller.request();
        })
    };
    let summary = run(&ctx, &service, &fixture.extractor(), &canceller).await.unwrap();
    watcher.await.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.exit_code(), 130);
    assert!(summary.uploaded() >= 1);
    assert!(summary.uploaded() < 6);
    assert_eq!(summary.uploaded() + summary.skipped(), 6);
    assert!(summary.failed().is_empty());
    assert!(fixture.staged().is_empty());
}
