// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use shine_adapters::{FakeShell, ScriptedRun};
use shine_core::disk::FLAG_WRITECONF;
use shine_core::test_support::ProcfsFixture;
use shine_proto::EventMessage;
use std::sync::{Arc, Mutex};

fn local_server() -> Server {
    Server::with_default_nid(Server::hostname_short())
}

fn remote(host: &str) -> Server {
    Server::with_default_nid(host)
}

fn fs_with(fx: &ProcfsFixture) -> FileSystem {
    let mut fs = FileSystem::new("lustre", Settings::default());
    fs.procfs = fx.procfs.clone();
    fs
}

/// A backing "device" that passes the regular-file device check.
fn fake_dev(fx: &ProcfsFixture, name: &str) -> String {
    let dev = fx.dir.path().join(name);
    std::fs::write(&dev, vec![0u8; 1024]).unwrap();
    dev.display().to_string()
}

fn never_mountdata() -> OpOptions {
    OpOptions {
        mountdata: MountdataPolicy::Never,
        ..OpOptions::default()
    }
}

/// Frame one event line the way a distant invocation would.
fn framed(compname: &str, action: &str, status: &str, comp: ComponentSnapshot) -> String {
    let mut msg = EventMessage::new(compname, action, status);
    msg.comp = Some(comp);
    shine_proto::pack(&msg).unwrap()
}

/// Fabricate the snapshot a distant peer would report for a target.
fn remote_target_snapshot(
    kind: TargetKind,
    index: u32,
    host: &str,
    state: State,
    flags: u32,
) -> ComponentSnapshot {
    let mut target = Target::new("lustre", kind, index, "/dev/remote", remote(host));
    target.state = Some(state);
    target.disk.fsname = Some("lustre".to_string());
    target.disk.svname = Some(target.label());
    target.disk.flags = flags;
    target.snapshot()
}

#[derive(Clone, Default)]
struct RecordingHandler {
    events: Arc<Mutex<Vec<FsEvent>>>,
}

impl EventHandler for RecordingHandler {
    fn event_callback(&mut self, event: &FsEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ── structure ───────────────────────────────────────────────────────────

#[test]
fn second_management_target_is_refused() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    fs.new_target(remote("mgs1"), "mgt", 0, "/dev/sdb", TargetOpts::default())
        .unwrap();
    let err = fs
        .new_target(remote("mgs2"), "mgt", 0, "/dev/sdc", TargetOpts::default())
        .unwrap_err();
    assert!(matches!(err, FsError::Structure(_)));
}

#[test]
fn unknown_target_type_is_refused() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    let err = fs
        .new_target(remote("n1"), "widget", 0, "/dev/sdb", TargetOpts::default())
        .unwrap_err();
    assert!(matches!(err, FsError::BadTargetType(name) if name == "widget"));
}

#[test]
fn external_target_starts_external_and_is_not_managed() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    let id = fs
        .new_target(
            remote("oss1"),
            "ost",
            1,
            "/dev/sdc",
            TargetOpts {
                mode: Mode::External,
                ..TargetOpts::default()
            },
        )
        .unwrap();
    let comp = fs.components.get(&id).unwrap();
    assert_eq!(comp.state(), Some(State::External));
    assert!(!fs.components.managed(Some("start")).contains(&id));
}

// ── aggregation ─────────────────────────────────────────────────────────

#[test]
fn check_errors_returns_worst_unexpected_state() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    let a = fs
        .new_target(remote("n1"), "ost", 1, "/dev/sda", TargetOpts::default())
        .unwrap();
    let b = fs
        .new_target(remote("n2"), "ost", 2, "/dev/sdb", TargetOpts::default())
        .unwrap();
    let c = fs
        .new_target(remote("n3"), "ost", 3, "/dev/sdc", TargetOpts::default())
        .unwrap();
    fs.set_comp_state(&a, Some(State::Mounted));
    fs.set_comp_state(&b, Some(State::TargetError));
    fs.set_comp_state(&c, Some(State::Offline));

    let ids = vec![a, b, c];
    assert_eq!(fs.check_errors(&[State::Mounted], &ids), State::TargetError);
}

#[test]
fn check_errors_coerces_unresolved_states() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    let id = fs
        .new_target(remote("n1"), "ost", 1, "/dev/sda", TargetOpts::default())
        .unwrap();

    let ids = vec![id.clone()];
    assert_eq!(fs.check_errors(&[State::Mounted], &ids), State::RuntimeError);
    assert_eq!(
        fs.components.get(&id).unwrap().state(),
        Some(State::RuntimeError)
    );
}

#[test]
fn check_errors_with_all_expected_returns_first_expected() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    let id = fs
        .new_target(remote("n1"), "ost", 1, "/dev/sda", TargetOpts::default())
        .unwrap();
    fs.set_comp_state(&id, Some(State::Recovering));
    let ids = vec![id];
    assert_eq!(
        fs.check_errors(&[State::Mounted, State::Recovering], &ids),
        State::Mounted
    );
}

// ── local operations ────────────────────────────────────────────────────

#[tokio::test]
async fn status_reports_offline_target() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    let dev = fake_dev(&fx, "ost1.img");
    let id = fs
        .new_target(local_server(), "ost", 1, &dev, TargetOpts::default())
        .unwrap();

    let shell = FakeShell::new();
    let result = fs
        .status(&shell, None, &never_mountdata())
        .await
        .unwrap();
    assert_eq!(result, State::Offline);
    assert_eq!(fs.components.get(&id).unwrap().state(), Some(State::Offline));
}

#[tokio::test]
async fn format_refused_on_started_target() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    let dev = fake_dev(&fx, "ost1.img");
    fx.add_started_target("lustre-OST0001", &dev, Some("status: COMPLETE\n"))
        .unwrap();
    fx.add_mount(&dev, "/mnt/lustre/lustre-OST0001", "lustre")
        .unwrap();

    let id = fs
        .new_target(local_server(), "ost", 1, &dev, TargetOpts::default())
        .unwrap();
    let handler = RecordingHandler::default();
    fs.set_event_handler(Box::new(handler.clone()));

    let shell = FakeShell::new();
    let result = fs.format(&shell, None, &never_mountdata()).await.unwrap();
    assert_eq!(result, State::TargetError);
    assert_eq!(
        fs.components.get(&id).unwrap().state(),
        Some(State::TargetError)
    );

    let events = handler.events.lock().unwrap();
    let failed = events
        .iter()
        .find(|ev| ev.action == "format" && ev.status == "failed")
        .expect("a failed format event");
    let message = failed.result.as_ref().unwrap().message.as_deref().unwrap();
    assert!(
        message.contains("Cannot format: target lustre-OST0001")
            && message.contains("is started"),
        "unexpected message: {message}"
    );
    // No tool was launched for the refused target.
    assert!(shell.calls().iter().all(|(cmd, _)| !cmd.contains("mkfs")));
}

#[tokio::test]
async fn format_runs_tool_on_offline_target() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    let dev = fake_dev(&fx, "ost1.img");
    let id = fs
        .new_target(local_server(), "ost", 1, &dev, TargetOpts::default())
        .unwrap();

    let shell = FakeShell::new();
    let result = fs.format(&shell, None, &never_mountdata()).await.unwrap();
    assert_eq!(result, State::Offline);
    assert_eq!(fs.components.get(&id).unwrap().state(), Some(State::Offline));

    let calls = shell.calls();
    let mkfs = calls
        .iter()
        .find(|(cmd, _)| cmd.starts_with("mkfs.lustre"))
        .expect("a mkfs call");
    assert!(mkfs.0.contains("--fsname=lustre"));
    assert!(mkfs.0.contains("--ost"));
    assert!(mkfs.0.contains("--index=1"));
}

#[tokio::test]
async fn local_start_loads_modules_first() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    let dev = fake_dev(&fx, "mgt.img");
    fs.new_target(local_server(), "mgt", 0, &dev, TargetOpts::default())
        .unwrap();

    let shell = FakeShell::new();
    // The fake mount tool exits 0 but does not touch the fixture, so the
    // follow-up probe still reports the target stopped.
    let result = fs.start(&shell, None, &never_mountdata()).await.unwrap();
    assert_eq!(result, State::Offline);

    let calls = shell.calls();
    let modprobe = calls
        .iter()
        .position(|(cmd, _)| cmd.contains("modprobe lustre"))
        .expect("a modprobe call");
    let mount = calls
        .iter()
        .position(|(cmd, _)| cmd.contains("mount -t lustre"))
        .expect("a mount call");
    assert!(modprobe < mount, "modules must load before targets start");
}

#[tokio::test]
async fn local_stop_unloads_modules_last() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    let dev = fake_dev(&fx, "ost1.img");
    fx.add_started_target("lustre-OST0001", &dev, Some("status: COMPLETE\n"))
        .unwrap();
    fx.add_mount(&dev, "/mnt/lustre/lustre-OST0001", "lustre")
        .unwrap();
    fs.new_target(local_server(), "ost", 1, &dev, TargetOpts::default())
        .unwrap();

    let shell = FakeShell::new();
    let result = fs.stop(&shell, None, &never_mountdata()).await.unwrap();
    // The umount tool "succeeded" but the fixture still shows the target
    // started, so the follow-up probe reports it mounted.
    assert_eq!(result, State::Mounted);

    let calls = shell.calls();
    let umount = calls
        .iter()
        .position(|(cmd, _)| cmd.starts_with("umount"))
        .expect("an umount call");
    let rmmod = calls
        .iter()
        .position(|(cmd, _)| cmd.contains("lustre_rmmod"))
        .expect("a module unload call");
    assert!(umount < rmmod, "module unload must wait for local stops");
}

#[tokio::test]
async fn client_mount_roundtrip() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    fs.new_target(remote("mgs1"), "mgt", 0, "/dev/sdb", TargetOpts::default())
        .unwrap();
    let id = fs
        .new_client(local_server(), "/lustre", None, true, Mode::Managed)
        .unwrap();

    let shell = FakeShell::new();
    let result = fs.mount(&shell, None, &OpOptions::default()).await.unwrap();
    assert_eq!(result, State::Mounted);
    assert_eq!(fs.components.get(&id).unwrap().state(), Some(State::Mounted));

    let calls = shell.calls();
    let mount = calls
        .iter()
        .find(|(cmd, _)| cmd.contains("mount -t lustre"))
        .expect("a client mount call");
    assert!(mount.0.contains("mgs1@tcp:/lustre"));
}

// ── proxy runs ──────────────────────────────────────────────────────────

#[tokio::test]
async fn proxy_run_merges_remote_states() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    let ost1 = fs
        .new_target(remote("n1"), "ost", 1, "/dev/sdc", TargetOpts::default())
        .unwrap();
    let ost2 = fs
        .new_target(remote("n2"), "ost", 2, "/dev/sdd", TargetOpts::default())
        .unwrap();

    let shell = FakeShell::new();
    shell.on_command(
        " status -f lustre",
        "n1",
        ScriptedRun::ok(vec![framed(
            "target",
            "status",
            "done",
            remote_target_snapshot(TargetKind::Ost, 1, "n1", State::Mounted, 0),
        )]),
    );
    shell.on_command(
        " status -f lustre",
        "n2",
        ScriptedRun::ok(vec![framed(
            "target",
            "status",
            "done",
            remote_target_snapshot(TargetKind::Ost, 2, "n2", State::Mounted, 0),
        )]),
    );

    let result = fs.status(&shell, None, &OpOptions::default()).await.unwrap();
    assert_eq!(result, State::Mounted);
    assert_eq!(fs.components.get(&ost1).unwrap().state(), Some(State::Mounted));
    assert_eq!(fs.components.get(&ost2).unwrap().state(), Some(State::Mounted));
    // Disk fields were merged from the snapshots.
    let disk = &fs
        .components
        .get(&ost1)
        .unwrap()
        .as_target()
        .unwrap()
        .disk;
    assert_eq!(disk.fsname.as_deref(), Some("lustre"));
    // The proxy bookkeeping action is gone.
    assert!(fs
        .components
        .get(&ost1)
        .unwrap()
        .running_actions()
        .is_empty());
}

#[tokio::test]
async fn proxy_partial_failure_buckets_bad_node() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    let ost1 = fs
        .new_target(remote("n1"), "ost", 1, "/dev/sdc", TargetOpts::default())
        .unwrap();
    let ost2 = fs
        .new_target(remote("n2"), "ost", 2, "/dev/sdd", TargetOpts::default())
        .unwrap();

    let shell = FakeShell::new();
    shell.on_command(
        " start -f lustre",
        "n1",
        ScriptedRun::ok(vec![framed(
            "target",
            "start",
            "done",
            remote_target_snapshot(TargetKind::Ost, 1, "n1", State::Mounted, 0),
        )]),
    );
    shell.on_command(
        " start -f lustre",
        "n2",
        ScriptedRun::failed(1, vec!["mkfs: cannot open /dev/sdd".to_string()]),
    );

    let result = fs.start(&shell, None, &OpOptions::default()).await.unwrap();

    assert_eq!(fs.proxy_errors.len(), 1);
    let (nodes, message) = &fs.proxy_errors[0];
    assert_eq!(nodes.to_string(), "n2");
    assert_eq!(
        message,
        "Remote action start failed: mkfs: cannot open /dev/sdd"
    );

    // n1's target merged fine; n2's never reported and was coerced.
    assert_eq!(fs.components.get(&ost1).unwrap().state(), Some(State::Mounted));
    assert_eq!(
        fs.components.get(&ost2).unwrap().state(),
        Some(State::RuntimeError)
    );
    assert_eq!(result, State::RuntimeError);
}

#[tokio::test]
async fn silent_node_is_reported() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    fs.new_target(remote("n1"), "ost", 1, "/dev/sdc", TargetOpts::default())
        .unwrap();

    let shell = FakeShell::new();
    shell.on_command(" status -f lustre", "n1", ScriptedRun::failed(1, vec![]));

    fs.status(&shell, None, &OpOptions::default()).await.unwrap();

    assert_eq!(fs.proxy_errors.len(), 1);
    let (nodes, message) = &fs.proxy_errors[0];
    assert_eq!(nodes.to_string(), "n1");
    assert_eq!(message, "Remote action status failed: No response");
}

#[tokio::test]
async fn undecodable_event_goes_to_error_bucket() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    fs.new_target(remote("n1"), "ost", 1, "/dev/sdc", TargetOpts::default())
        .unwrap();

    let shell = FakeShell::new();
    // A framed message with an unknown version; the node still exits 0.
    shell.on_command(
        " status -f lustre",
        "n1",
        ScriptedRun::ok(vec!["SHINE:99:AAAA".to_string()]),
    );

    fs.status(&shell, None, &OpOptions::default()).await.unwrap();

    assert_eq!(fs.proxy_errors.len(), 1);
    let (nodes, message) = &fs.proxy_errors[0];
    assert_eq!(nodes.to_string(), "n1");
    assert!(message.contains("version mismatch"), "got: {message}");
}

#[tokio::test]
async fn leaked_in_progress_becomes_runtime_error() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    let id = fs
        .new_target(remote("n1"), "ost", 1, "/dev/sdc", TargetOpts::default())
        .unwrap();

    let shell = FakeShell::new();
    shell.on_command(
        " status -f lustre",
        "n1",
        ScriptedRun::ok(vec![framed(
            "target",
            "status",
            "start",
            remote_target_snapshot(TargetKind::Ost, 1, "n1", State::InProgress, 0),
        )]),
    );

    let result = fs.status(&shell, None, &OpOptions::default()).await.unwrap();
    assert_eq!(
        fs.components.get(&id).unwrap().state(),
        Some(State::RuntimeError)
    );
    assert_eq!(result, State::RuntimeError);
}

#[tokio::test]
async fn writeconf_metadata_swaps_start_order() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    fs.new_target(remote("n1"), "mdt", 0, "/dev/sdd", TargetOpts::default())
        .unwrap();
    fs.new_target(remote("n2"), "ost", 1, "/dev/sdc", TargetOpts::default())
        .unwrap();

    let shell = FakeShell::new();
    // The pre-check reports a writeconf-flagged, stopped metadata target.
    shell.on_command(
        " status -f lustre",
        "n1",
        ScriptedRun::ok(vec![framed(
            "target",
            "status",
            "done",
            remote_target_snapshot(TargetKind::Mdt, 0, "n1", State::Offline, FLAG_WRITECONF),
        )]),
    );
    shell.on_command(
        " start -f lustre",
        "n1",
        ScriptedRun::ok(vec![framed(
            "target",
            "start",
            "done",
            remote_target_snapshot(TargetKind::Mdt, 0, "n1", State::Mounted, 0),
        )]),
    );
    shell.on_command(
        " start -f lustre",
        "n2",
        ScriptedRun::ok(vec![framed(
            "target",
            "start",
            "done",
            remote_target_snapshot(TargetKind::Ost, 1, "n2", State::Mounted, 0),
        )]),
    );

    let result = fs.start(&shell, None, &OpOptions::default()).await.unwrap();
    assert_eq!(result, State::Mounted);

    let calls = shell.calls();
    let mdt_start = calls
        .iter()
        .position(|(cmd, _)| cmd.contains(" start -f") && cmd.contains("-l lustre-MDT0000"))
        .expect("a metadata start phase");
    let ost_start = calls
        .iter()
        .position(|(cmd, _)| cmd.contains(" start -f") && cmd.contains("-l lustre-OST0001"))
        .expect("an object-storage start phase");
    assert!(
        mdt_start < ost_start,
        "writeconf must start metadata before object storage"
    );
}

#[tokio::test]
async fn default_order_starts_object_storage_first() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    fs.new_target(remote("n1"), "mdt", 0, "/dev/sdd", TargetOpts::default())
        .unwrap();
    fs.new_target(remote("n2"), "ost", 1, "/dev/sdc", TargetOpts::default())
        .unwrap();

    let shell = FakeShell::new();
    shell.on_command(
        " status -f lustre",
        "n1",
        ScriptedRun::ok(vec![framed(
            "target",
            "status",
            "done",
            remote_target_snapshot(TargetKind::Mdt, 0, "n1", State::Offline, 0),
        )]),
    );
    shell.on_command(
        " start -f lustre",
        "n1",
        ScriptedRun::ok(vec![framed(
            "target",
            "start",
            "done",
            remote_target_snapshot(TargetKind::Mdt, 0, "n1", State::Mounted, 0),
        )]),
    );
    shell.on_command(
        " start -f lustre",
        "n2",
        ScriptedRun::ok(vec![framed(
            "target",
            "start",
            "done",
            remote_target_snapshot(TargetKind::Ost, 1, "n2", State::Mounted, 0),
        )]),
    );

    fs.start(&shell, None, &OpOptions::default()).await.unwrap();

    let calls = shell.calls();
    let ost_start = calls
        .iter()
        .position(|(cmd, _)| cmd.contains(" start -f") && cmd.contains("-l lustre-OST0001"))
        .expect("an object-storage start phase");
    let mdt_start = calls
        .iter()
        .position(|(cmd, _)| cmd.contains(" start -f") && cmd.contains("-l lustre-MDT0000"))
        .expect("a metadata start phase");
    assert!(ost_start < mdt_start);
}

#[tokio::test]
async fn broken_phase_stops_cascading_starts() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    fs.new_target(remote("n1"), "mgt", 0, "/dev/sdb", TargetOpts::default())
        .unwrap();
    fs.new_target(remote("n2"), "ost", 1, "/dev/sdc", TargetOpts::default())
        .unwrap();

    let shell = FakeShell::new();
    // The management phase fails: non-zero exit, no events.
    shell.on_command(" start -f lustre", "n1", ScriptedRun::failed(1, vec![]));

    let result = fs.start(&shell, None, &OpOptions::default()).await.unwrap();
    assert_eq!(result, State::RuntimeError);

    // The object-storage phase never launched.
    assert!(shell
        .calls()
        .iter()
        .all(|(cmd, _)| !cmd.contains("-l lustre-OST0001")));
}

#[tokio::test]
async fn proxy_command_shape() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    fs.debug = true;
    fs.settings.command_path = Some("/usr/sbin/shine".into());
    fs.new_target(remote("n1"), "ost", 1, "/dev/sdc", TargetOpts::default())
        .unwrap();

    let opts = OpOptions {
        addopts: Some("-v".to_string()),
        failover: Some("n9".to_string()),
        mountdata: MountdataPolicy::Never,
    };
    let shell = FakeShell::new();
    fs.status(&shell, None, &opts).await.unwrap();

    let calls = shell.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].0,
        "/usr/sbin/shine status -f lustre -R -d -l lustre-OST0001 -o '-v' -F 'n9' --mountdata=never"
    );
    assert_eq!(calls[0].1.to_string(), "n1");
}

#[tokio::test]
async fn proxy_command_omits_default_mountdata() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    fs.settings.command_path = Some("/usr/sbin/shine".into());
    fs.new_target(remote("n1"), "ost", 1, "/dev/sdc", TargetOpts::default())
        .unwrap();

    let shell = FakeShell::new();
    fs.status(&shell, None, &OpOptions::default()).await.unwrap();
    assert!(!shell.calls()[0].0.contains("--mountdata"));
}

// ── distant event reconciliation ────────────────────────────────────────

#[test]
fn distant_event_merges_journal_through_owner() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    let id = fs
        .new_target(
            remote("n1"),
            "ost",
            1,
            "/dev/sdc",
            TargetOpts {
                jdev: Some("/dev/sdj".into()),
                ..TargetOpts::default()
            },
        )
        .unwrap();

    let mut journal_disk = shine_core::Disk::new("/dev/sdj");
    journal_disk.fsname = Some("lustre".to_string());
    journal_disk.size = 512;
    let snap = ComponentSnapshot {
        compname: "journal".to_string(),
        uniqueid: id.clone(),
        label: "lustre-OST0001_jdev".to_string(),
        state: None,
        status_info: None,
        index: None,
        disk: Some(journal_disk),
    };
    fs.distant_event("journal", "status", "done", "n1", Some(snap), None);

    let journal = fs
        .components
        .get(&id)
        .unwrap()
        .as_target()
        .unwrap()
        .journal
        .clone()
        .unwrap();
    assert_eq!(journal.fsname.as_deref(), Some("lustre"));
    assert_eq!(journal.size, 512);
    // The journal keeps its locally configured device path.
    assert_eq!(journal.dev, std::path::PathBuf::from("/dev/sdj"));
}

#[test]
fn distant_event_for_unknown_component_is_dropped() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    let handler = RecordingHandler::default();
    fs.set_event_handler(Box::new(handler.clone()));

    let snap = remote_target_snapshot(TargetKind::Ost, 0xff, "n1", State::Mounted, 0);
    fs.distant_event("target", "status", "done", "n1", Some(snap), None);

    assert!(handler.events.lock().unwrap().is_empty());
}

// ── install ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn install_pushes_config_to_distant_servers() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    fs.new_target(remote("n1"), "ost", 1, "/dev/sdc", TargetOpts::default())
        .unwrap();

    let shell = FakeShell::new();
    fs.install(&shell, std::path::Path::new("/etc/shine/lustre.xmf"))
        .await
        .unwrap();

    let copies = shell.copies();
    assert_eq!(copies.len(), 1);
    assert_eq!(copies[0].0, "/etc/shine/lustre.xmf");
    assert_eq!(copies[0].1.to_string(), "n1");
}

#[tokio::test]
async fn install_surfaces_failing_nodes() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    fs.new_target(remote("n1"), "ost", 1, "/dev/sdc", TargetOpts::default())
        .unwrap();
    fs.new_target(remote("n2"), "ost", 2, "/dev/sdd", TargetOpts::default())
        .unwrap();

    let shell = FakeShell::new();
    shell.on_command("copy:/etc/shine/lustre.xmf", "n2", ScriptedRun::failed(1, vec![]));

    let err = fs
        .install(&shell, std::path::Path::new("/etc/shine/lustre.xmf"))
        .await
        .unwrap_err();
    match err {
        FsError::Remote { nodes, rc, .. } => {
            assert_eq!(nodes.to_string(), "n2");
            assert_eq!(rc, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn install_surfaces_timed_out_nodes() {
    let fx = ProcfsFixture::new().unwrap();
    let mut fs = fs_with(&fx);
    fs.new_target(remote("n1"), "ost", 1, "/dev/sdc", TargetOpts::default())
        .unwrap();

    let shell = FakeShell::new();
    shell.on_command("copy:/etc/shine/lustre.xmf", "n1", ScriptedRun::timed_out());

    let err = fs
        .install(&shell, std::path::Path::new("/etc/shine/lustre.xmf"))
        .await
        .unwrap_err();
    match err {
        FsError::Remote { nodes, rc, message } => {
            assert_eq!(nodes.to_string(), "n1");
            assert_eq!(rc, -1);
            assert_eq!(message, "Node timed out");
        }
        other => panic!("unexpected error: {other}"),
    }
}
