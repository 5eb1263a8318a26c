// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::worker::FakeLauncher;
use capd_adapters::{CoordinatorCall, CoordinatorError, FakeCoordinator};
use capd_core::{JobId, Progress, TermSet};
use capd_wire::WorkerMessage;

fn job(status: CaptureStatus, terms: &str) -> Job {
    Job::new(1, "coll", status).with_terms(terms).with_total(40)
}

fn supervisor(
    coordinator: &FakeCoordinator,
    launcher: &FakeLauncher,
) -> Supervisor<FakeCoordinator> {
    Supervisor::new(
        coordinator.clone(),
        Box::new(launcher.clone()),
        SupervisorSettings::default(),
        CancellationToken::new(),
    )
}

fn tracker(terms: &str) -> TermTracker {
    let mut tracker = TermTracker::new();
    tracker.check(&job(CaptureStatus::STARTED, terms));
    tracker.reset_changed();
    tracker
}

#[tokio::test(start_paused = true)]
async fn reconcile_starts_exactly_one_worker() {
    let coordinator = FakeCoordinator::new();
    let launcher = FakeLauncher::new().silent();
    let mut sup = supervisor(&coordinator, &launcher);
    sup.on_status(CaptureStatus::STOPPED).await;
    let snapshot = job(CaptureStatus::STARTED, "a,b");
    let terms = tracker("a,b");

    assert!(!sup.reconcile(&snapshot, &terms).await);
    assert_eq!(launcher.launch_count(), 1);
    assert!(sup.worker_active());

    // Local status is still STOPPED, but the active worker blocks a second launch
    assert!(!sup.reconcile(&snapshot, &terms).await);
    assert_eq!(launcher.launch_count(), 1);

    let spec = &launcher.launches()[0].spec;
    assert_eq!(spec.name, "coll");
    assert_eq!(spec.terms, TermSet::parse(Some("a,b")));
    assert_eq!(spec.total, 40);
}

#[tokio::test(start_paused = true)]
async fn reconcile_is_quiet_once_worker_reports_started() {
    let coordinator = FakeCoordinator::new();
    let launcher = FakeLauncher::new();
    let mut sup = supervisor(&coordinator, &launcher);
    let snapshot = job(CaptureStatus::STARTED, "a");
    let terms = tracker("a");

    sup.reconcile(&snapshot, &terms).await;
    sup.drain().await;
    assert_eq!(sup.client_status(), CaptureStatus::STARTED);

    sup.reconcile(&snapshot, &terms).await;
    assert_eq!(launcher.launch_count(), 1);
    assert!(coordinator.status_updates().is_empty());
}

#[tokio::test(start_paused = true)]
async fn coordinator_stopping_stops_worker_and_reports_stopped() {
    let coordinator = FakeCoordinator::new();
    let launcher = FakeLauncher::new();
    let mut sup = supervisor(&coordinator, &launcher);
    let terms = tracker("a");
    sup.reconcile(&job(CaptureStatus::STARTED, "a"), &terms).await;
    sup.drain().await;

    assert!(sup.reconcile(&job(CaptureStatus::STOPPING, "a"), &terms).await);

    assert!(!sup.worker_active());
    assert!(launcher.launches()[0].cancelled);
    assert_eq!(sup.client_status(), CaptureStatus::STOPPED);
    assert_eq!(coordinator.status_updates(), vec![CaptureStatus::STOPPED]);
}

#[tokio::test(start_paused = true)]
async fn coordinator_stopped_stops_worker_without_report() {
    let coordinator = FakeCoordinator::new();
    let launcher = FakeLauncher::new();
    let mut sup = supervisor(&coordinator, &launcher);
    let terms = tracker("a");
    sup.reconcile(&job(CaptureStatus::STARTED, "a"), &terms).await;
    sup.drain().await;

    assert!(sup.reconcile(&job(CaptureStatus::STOPPED, "a"), &terms).await);
    assert!(!sup.worker_active());
    assert!(coordinator.status_updates().is_empty());
}

#[tokio::test(start_paused = true)]
async fn worker_ahead_of_coordinator_reports_started() {
    let coordinator = FakeCoordinator::new();
    let launcher = FakeLauncher::new();
    let mut sup = supervisor(&coordinator, &launcher);
    sup.on_status(CaptureStatus::STARTED).await;

    assert!(!sup.reconcile(&job(CaptureStatus::STARTING, "a"), &tracker("a")).await);

    assert_eq!(launcher.launch_count(), 0);
    assert_eq!(coordinator.status_updates(), vec![CaptureStatus::STARTED]);
}

#[tokio::test(start_paused = true)]
async fn stop_worker_without_worker_is_noop() {
    let coordinator = FakeCoordinator::new();
    let launcher = FakeLauncher::new();
    let mut sup = supervisor(&coordinator, &launcher);

    sup.stop_worker().await;
    sup.stop_worker().await;

    assert!(!sup.worker_active());
    assert_eq!(sup.client_status(), CaptureStatus::UNKNOWN);
}

#[tokio::test(start_paused = true)]
async fn stop_worker_kills_after_timeout() {
    let coordinator = FakeCoordinator::new();
    let launcher = FakeLauncher::new().silent().ignore_cancel();
    let mut sup = supervisor(&coordinator, &launcher);
    sup.start_worker(WorkerSpec { name: "coll".into(), terms: TermSet::default(), total: 0 })
        .await;

    let started = Instant::now();
    sup.stop_worker().await;

    let launch = &launcher.launches()[0];
    assert!(launch.cancelled);
    assert!(launch.killed);
    assert!(started.elapsed() >= SupervisorSettings::default().stop_timeout);
    assert!(!sup.worker_active());
}

#[tokio::test(start_paused = true)]
async fn killed_worker_does_not_block_the_next_start() {
    let coordinator = FakeCoordinator::new();
    let launcher = FakeLauncher::new().ignore_cancel();
    let mut sup = supervisor(&coordinator, &launcher);
    let terms = tracker("a");
    sup.reconcile(&job(CaptureStatus::STARTED, "a"), &terms).await;
    sup.drain().await;
    assert_eq!(sup.client_status(), CaptureStatus::STARTED);

    assert!(sup.reconcile(&job(CaptureStatus::STOPPED, "a"), &terms).await);
    assert!(launcher.launches()[0].killed);
    assert_eq!(sup.client_status(), CaptureStatus::STOPPED);

    assert!(!sup.reconcile(&job(CaptureStatus::STARTED, "a"), &terms).await);
    assert_eq!(launcher.launch_count(), 2);
    assert!(sup.worker_active());
}

#[tokio::test(start_paused = true)]
async fn launch_failure_leaves_no_worker() {
    let coordinator = FakeCoordinator::new();
    let launcher = FakeLauncher::new();
    launcher.fail_launches(true);
    let mut sup = supervisor(&coordinator, &launcher);

    let launched = sup
        .start_worker(WorkerSpec { name: "coll".into(), terms: TermSet::default(), total: 0 })
        .await;

    assert!(!launched);
    assert!(!sup.worker_active());
}

#[tokio::test(start_paused = true)]
async fn crashed_worker_is_reaped_and_restarted() {
    let coordinator = FakeCoordinator::new();
    let launcher = FakeLauncher::new();
    let mut sup = supervisor(&coordinator, &launcher);
    let snapshot = job(CaptureStatus::STARTED, "a");
    let terms = tracker("a");
    sup.reconcile(&snapshot, &terms).await;
    sup.drain().await;

    launcher.crash(0);
    sup.drain().await;
    assert!(!sup.worker_active());
    assert_eq!(sup.client_status(), CaptureStatus::STOPPED);

    sup.reconcile(&snapshot, &terms).await;
    assert_eq!(launcher.launch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn updates_are_forwarded_as_progress() {
    let coordinator = FakeCoordinator::new();
    let launcher = FakeLauncher::new().silent();
    let mut sup = supervisor(&coordinator, &launcher);
    sup.start_worker(WorkerSpec { name: "coll".into(), terms: TermSet::default(), total: 0 })
        .await;

    launcher.send(0, WorkerMessage::Update(UpdateData { time: 9, received: 5, rate: 1.25, total: 45 }));
    sup.drain().await;

    assert_eq!(
        coordinator.progress_updates(),
        vec![Progress { received: 5, total: 45, rate: 1.25 }]
    );
}

#[tokio::test(start_paused = true)]
async fn do_job_restarts_on_term_change_and_ends_on_stop() {
    let coordinator = FakeCoordinator::new();
    coordinator.push_status_result(Ok(job(CaptureStatus::STARTED, "a")));
    coordinator.push_status_result(Err(CoordinatorError::Status(502)));
    coordinator.push_status_result(Ok(job(CaptureStatus::STARTED, "a, b")));
    // re-read after the settle pause
    coordinator.push_status_result(Ok(job(CaptureStatus::STARTED, "a,b")));
    coordinator.set_status(job(CaptureStatus::STOPPING, "a,b"));
    let launcher = FakeLauncher::new();
    let mut sup = supervisor(&coordinator, &launcher);

    sup.do_job(job(CaptureStatus::STARTED, "a")).await;

    let launches = launcher.launches();
    assert_eq!(launches.len(), 2);
    assert_eq!(launches[0].spec.terms, TermSet::parse(Some("a")));
    assert_eq!(launches[1].spec.terms, TermSet::parse(Some("a,b")));
    assert!(launches.iter().all(|l| l.cancelled && l.exited));
    assert_eq!(coordinator.status_updates(), vec![CaptureStatus::STOPPED]);
    assert_eq!(coordinator.count(&CoordinatorCall::JobStatus), 5);
}

#[tokio::test(start_paused = true)]
async fn archived_job_stops_worker_and_ends() {
    let coordinator = FakeCoordinator::new();
    coordinator.push_status_result(Ok(job(CaptureStatus::STARTED, "a")));
    coordinator.set_status(job(CaptureStatus::STARTED, "a").with_archived_date("2026-01-01"));
    let launcher = FakeLauncher::new();
    let mut sup = supervisor(&coordinator, &launcher);

    sup.do_job(job(CaptureStatus::STARTED, "a")).await;

    assert_eq!(launcher.launch_count(), 1);
    assert!(launcher.launches()[0].cancelled);
    assert!(!sup.worker_active());
}

#[tokio::test(start_paused = true)]
async fn run_claims_job_and_releases_it_on_shutdown() {
    let coordinator = FakeCoordinator::new();
    coordinator.set_active_jobs(vec![job(CaptureStatus::STARTED, "a")]);
    coordinator.set_status(job(CaptureStatus::STARTED, "a"));
    let launcher = FakeLauncher::new();
    let shutdown = CancellationToken::new();
    let mut sup = Supervisor::new(
        coordinator.clone(),
        Box::new(launcher.clone()),
        SupervisorSettings::default(),
        shutdown.clone(),
    );

    let task = tokio::spawn(async move {
        sup.run().await;
        sup
    });
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(coordinator.active_job(), Some(JobId(1)));
    assert_eq!(launcher.running(), 1);

    shutdown.cancel();
    let sup = task.await.unwrap();

    assert!(!sup.worker_active());
    assert_eq!(launcher.launch_count(), 1);
    assert!(launcher.launches()[0].cancelled);
    assert_eq!(coordinator.active_job(), None);
}
