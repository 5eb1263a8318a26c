// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::channel::WorkerChannel;
use capd_core::{CaptureStatus, TermSet};

fn spec() -> WorkerSpec {
    WorkerSpec { name: "coll".to_string(), terms: TermSet::parse(Some("a,b")), total: 12 }
}

async fn wait_exited(handle: &mut Box<dyn WorkerHandle>) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while !handle.has_exited() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("worker did not exit");
}

#[test]
fn command_carries_spec_arguments() {
    let launcher = ProcessLauncher::new("/usr/bin/capd", Path::new("/etc/capd.toml"));
    let cmd = launcher.command(&spec());
    let args: Vec<_> = cmd.as_std().get_args().map(|a| a.to_string_lossy().into_owned()).collect();

    assert_eq!(cmd.as_std().get_program(), "/usr/bin/capd");
    assert_eq!(
        args,
        vec!["worker", "--config=/etc/capd.toml", "--name=coll", "--terms=a,b", "--total=12"]
    );
}

#[test]
fn leading_hyphen_terms_stay_one_argument() {
    let launcher = ProcessLauncher::new("/usr/bin/capd", Path::new("/etc/capd.toml"));
    let spec = WorkerSpec {
        name: "-coll".to_string(),
        terms: TermSet::parse(Some("-rust, tokio")),
        total: 0,
    };
    let cmd = launcher.command(&spec);
    let args: Vec<_> = cmd.as_std().get_args().map(|a| a.to_string_lossy().into_owned()).collect();

    assert_eq!(args[2..4], ["--name=-coll", "--terms=-rust,tokio"]);
}

#[tokio::test]
async fn spawn_failure_is_reported() {
    let launcher = ProcessLauncher::with_args("/nonexistent/capd", Vec::<String>::new());
    let channel = WorkerChannel::new();

    let err = launcher.launch(spec(), channel.sender()).err().unwrap();
    assert!(matches!(err, LaunchError::Spawn(_)));
}

// Emits STARTING, waits for stdin to close, emits STOPPED.
#[cfg(unix)]
const FRAMED_WORKER: &str = r#"printf '\000\000\000\032{"type":"status","data":2}'
cat > /dev/null
printf '\000\000\000\032{"type":"status","data":5}'"#;

#[cfg(unix)]
#[tokio::test]
async fn closing_stdin_cancels_and_frames_reach_channel() {
    let launcher = ProcessLauncher::with_args("sh", ["-c", FRAMED_WORKER, "sh"]);
    let mut channel = WorkerChannel::new();
    let mut handle = launcher.launch(spec(), channel.sender()).unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!handle.has_exited());

    handle.cancel();
    wait_exited(&mut handle).await;
    handle.reap().await;

    assert_eq!(channel.try_recv(), Some(WorkerMessage::Status(CaptureStatus::STARTING)));
    assert_eq!(channel.try_recv(), Some(WorkerMessage::Status(CaptureStatus::STOPPED)));
    assert_eq!(channel.try_recv(), None);
}

#[cfg(unix)]
#[tokio::test]
async fn kill_stops_a_worker_that_ignores_cancel() {
    let launcher = ProcessLauncher::with_args("sh", ["-c", "exec sleep 30", "sh"]);
    let channel = WorkerChannel::new();
    let mut handle = launcher.launch(spec(), channel.sender()).unwrap();

    handle.cancel();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!handle.has_exited());

    handle.kill();
    wait_exited(&mut handle).await;
    handle.reap().await;
}

#[tokio::test]
async fn forward_frames_writes_until_senders_drop() {
    let (tx, rx) = mpsc::unbounded_channel();
    let (writer, mut reader) = tokio::io::duplex(4096);
    let forward = tokio::spawn(forward_frames(rx, writer));

    tx.send(WorkerMessage::Status(CaptureStatus::STARTING)).unwrap();
    tx.send(WorkerMessage::Status(CaptureStatus::STARTED)).unwrap();
    drop(tx);
    forward.await.unwrap();

    assert_eq!(
        capd_wire::read_worker_message(&mut reader).await.unwrap(),
        WorkerMessage::Status(CaptureStatus::STARTING)
    );
    assert_eq!(
        capd_wire::read_worker_message(&mut reader).await.unwrap(),
        WorkerMessage::Status(CaptureStatus::STARTED)
    );
    assert!(matches!(
        capd_wire::read_worker_message(&mut reader).await,
        Err(capd_wire::ProtocolError::ConnectionClosed)
    ));
}

#[tokio::test]
async fn eof_on_input_cancels() {
    let cancel = CancellationToken::new();
    cancel_on_close(std::io::Cursor::new(b"ignored".to_vec()), cancel.clone());

    tokio::time::timeout(Duration::from_secs(5), cancel.cancelled()).await.unwrap();
}
