// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::ProcfsFixture;
use yare::parameterized;

fn target(kind: TargetKind, index: u32) -> Target {
    Target::new(
        "lustre",
        kind,
        index,
        "/dev/sdc",
        Server::with_default_nid("oss1"),
    )
}

#[parameterized(
    first = { 1, "lustre-OST0001" },
    ten = { 0x000a, "lustre-OST000a" },
    large = { 0xbeef, "lustre-OSTbeef" },
    max = { 0xffff, "lustre-OSTffff" },
)]
fn ost_label_formatting(index: u32, expected: &str) {
    assert_eq!(target(TargetKind::Ost, index).label(), expected);
}

#[test]
fn mdt_label_formatting() {
    assert_eq!(target(TargetKind::Mdt, 0).label(), "lustre-MDT0000");
}

#[test]
fn management_label_is_fixed() {
    assert_eq!(target(TargetKind::Mgt, 0).label(), "MGS");
    assert_eq!(target(TargetKind::Mgt, 7).label(), "MGS");
}

#[test]
fn get_id_prefers_tag() {
    let mut tgt = target(TargetKind::Ost, 1);
    assert_eq!(tgt.get_id(), "lustre-OST0001");
    tgt.tag = Some("home_ost".to_string());
    assert_eq!(tgt.get_id(), "home_ost");
}

#[test]
fn longtext_includes_device() {
    assert_eq!(
        target(TargetKind::Ost, 1).longtext(),
        "lustre-OST0001 (/dev/sdc)"
    );
}

#[test]
fn allservers_default_first() {
    let mut tgt = target(TargetKind::Ost, 1);
    tgt.add_server(Server::with_default_nid("oss2"));
    tgt.add_server(Server::with_default_nid("oss3"));
    let names: Vec<&str> = tgt
        .allservers()
        .iter()
        .map(|s| s.hostname.as_str())
        .collect();
    assert_eq!(names, ["oss1", "oss2", "oss3"]);
    assert_eq!(tgt.get_nids(), ["oss1@tcp", "oss2@tcp", "oss3@tcp"]);
}

#[test]
fn failover_single_match_reassigns() {
    let mut tgt = target(TargetKind::Ost, 1);
    tgt.add_server(Server::with_default_nid("oss2"));
    tgt.add_server(Server::with_default_nid("oss3"));

    let moved = tgt.failover(&NodeSet::from("oss2,unrelated")).unwrap();
    assert!(moved);
    assert_eq!(tgt.server.hostname, "oss2");
}

#[test]
fn failover_no_match_is_noop() {
    let mut tgt = target(TargetKind::Ost, 1);
    tgt.add_server(Server::with_default_nid("oss2"));

    let moved = tgt.failover(&NodeSet::from("elsewhere")).unwrap();
    assert!(!moved);
    assert_eq!(tgt.server.hostname, "oss1");
}

#[test]
fn failover_ambiguous_is_an_error() {
    let mut tgt = target(TargetKind::Ost, 1);
    tgt.add_server(Server::with_default_nid("oss2"));
    tgt.add_server(Server::with_default_nid("oss3"));

    let err = tgt.failover(&NodeSet::from("oss2,oss3")).unwrap_err();
    assert!(matches!(err, TargetError::AmbiguousFailover));
    assert_eq!(tgt.server.hostname, "oss1");
}

#[test]
fn start_orders_swap_exchanges_mdt_and_ost() {
    let default = StartOrders::default();
    assert!(default.ost < default.mdt);
    let swapped = StartOrders::swapped();
    assert!(swapped.mdt < swapped.ost);
    assert_eq!(swapped.mgt, default.mgt);
}

#[test]
fn check_offline_target() {
    let fx = ProcfsFixture::new().unwrap();
    let mut tgt = target(TargetKind::Ost, 1);
    tgt.lustre_check(&fx.procfs).unwrap();
    assert_eq!(tgt.state, Some(State::Offline));
}

#[test]
fn check_mounted_target() {
    let fx = ProcfsFixture::new().unwrap();
    fx.add_started_target("lustre-OST0001", "/dev/sdc", Some("status: COMPLETE\n"))
        .unwrap();
    fx.add_mount("/dev/sdc", "/mnt/lustre-OST0001", "lustre").unwrap();

    let mut tgt = target(TargetKind::Ost, 1);
    tgt.lustre_check(&fx.procfs).unwrap();
    assert_eq!(tgt.state, Some(State::Mounted));
    assert_eq!(tgt.mntdev.as_deref(), Some("/dev/sdc"));
}

#[test]
fn check_recovering_target() {
    let fx = ProcfsFixture::new().unwrap();
    fx.add_started_target(
        "lustre-OST0001",
        "/dev/sdc",
        Some("status: RECOVERING\ntime_remaining: 42\ncompleted_clients: 3/10\n"),
    )
    .unwrap();
    fx.add_mount("/dev/sdc", "/mnt/lustre-OST0001", "lustre").unwrap();

    let mut tgt = target(TargetKind::Ost, 1);
    tgt.lustre_check(&fx.procfs).unwrap();
    assert_eq!(tgt.state, Some(State::Recovering));
    assert_eq!(tgt.status_info.as_deref(), Some("42s (3/10)"));
}

#[test]
fn check_management_skips_recovery() {
    // No recovery_status file at all: fine for the management target.
    let fx = ProcfsFixture::new().unwrap();
    fx.add_started_target("MGS", "/dev/sdb", None).unwrap();
    fx.add_mount("/dev/sdb", "/mnt/MGS", "lustre").unwrap();

    let mut tgt = target(TargetKind::Mgt, 0);
    tgt.lustre_check(&fx.procfs).unwrap();
    assert_eq!(tgt.state, Some(State::Mounted));
}

#[test]
fn check_started_but_not_mounted_is_incoherent() {
    let fx = ProcfsFixture::new().unwrap();
    fx.add_started_target("lustre-OST0001", "/dev/sdc", Some("status: COMPLETE\n"))
        .unwrap();

    let mut tgt = target(TargetKind::Ost, 1);
    let err = tgt.lustre_check(&fx.procfs).unwrap_err();
    assert!(matches!(err, TargetError::StartedNotMounted(_)));
    assert_eq!(tgt.state, Some(State::TargetError));
}

#[test]
fn check_recovery_without_mntdev_is_incoherent() {
    let fx = ProcfsFixture::new().unwrap();
    let dir = fx.procfs.lustre.join("osd").join("lustre-OST0001");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("recovery_status"), "status: COMPLETE\n").unwrap();

    let mut tgt = target(TargetKind::Ost, 1);
    let err = tgt.lustre_check(&fx.procfs).unwrap_err();
    assert!(matches!(err, TargetError::Incoherent(_)));
    assert_eq!(tgt.state, Some(State::TargetError));
}

#[test]
fn check_multiple_mounts_detected() {
    let fx = ProcfsFixture::new().unwrap();
    fx.add_started_target("lustre-OST0001", "/dev/sdc", Some("status: COMPLETE\n"))
        .unwrap();
    fx.add_mount("/dev/sdc", "/mnt/a", "lustre").unwrap();
    fx.add_mount("/dev/sdc", "/mnt/b", "lustre").unwrap();

    let mut tgt = target(TargetKind::Ost, 1);
    let err = tgt.lustre_check(&fx.procfs).unwrap_err();
    assert!(matches!(err, TargetError::MultipleMounts(_)));
}

#[test]
fn update_from_snapshot_merges_state_and_disk() {
    let mut local = target(TargetKind::Ost, 1);
    let mut remote = target(TargetKind::Ost, 1);
    remote.state = Some(State::Mounted);
    remote.status_info = Some("12s (5/5)".to_string());
    remote.disk.fsname = Some("lustre".to_string());
    remote.disk.size = 42;

    local.update_from(&remote.snapshot());
    assert_eq!(local.state, Some(State::Mounted));
    assert_eq!(local.status_info.as_deref(), Some("12s (5/5)"));
    assert_eq!(local.disk.size, 42);
    assert_eq!(local.disk.dev, std::path::PathBuf::from("/dev/sdc"));
}

#[test]
fn text_status_shows_recovery_info() {
    let mut tgt = target(TargetKind::Ost, 1);
    tgt.state = Some(State::Recovering);
    tgt.status_info = Some("42s (3/10)".to_string());
    assert_eq!(tgt.text_status(), "recovering for 42s (3/10)");
}
