//! Integration tests for client decorators.
//!
//! These tests stack the locking and context-layer decorators over the
//! mock client and check what the mock observed: which context each call
//! saw and whether calls overlapped in time.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use lvmkit::client::mock::MockClient;
use lvmkit::client::{
    with_no_nsenter, Client, LayeredClient, LockRegistry, LockingClient, Overrides,
};
use lvmkit::core::options::{
    Activate, AddDevice, DelDevice, DevicesFile, LvCreateOptions, LvResizeOptions,
    NewVolumeGroupName, OptionList, PhysicalVolumeNames, PvMoveOptions, PvRemoveOptions,
    Size, VgChangeOptions, VgReduceOptions, VgRenameOptions, VgsOptions,
};
use lvmkit::core::types::{LogicalVolumeName, PhysicalVolumeName, VolumeGroupName};
use lvmkit::exec::ExecContext;
use tokio_util::sync::CancellationToken;

const CALL_DELAY: Duration = Duration::from_millis(150);

fn vg(name: &str) -> VolumeGroupName {
    VolumeGroupName::new(name).unwrap()
}

fn activate(name: &str) -> OptionList<VgChangeOptions> {
    OptionList::new().with(vg(name)).with(Activate::Yes)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_volume_group_calls_never_overlap() {
    let mock = MockClient::new().with_delay(CALL_DELAY);
    let client = LockingClient::new(mock.clone());
    let ctx = ExecContext::new();

    let (a, b, c) = tokio::join!(
        client.vg_change(&ctx, activate("vg1")),
        client.vg_change(&ctx, activate("vg1")),
        client.vg_change(&ctx, activate("vg2")),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();

    let ops = mock.operations();
    let on = |name: &str| -> Vec<_> {
        ops.iter()
            .filter(|op| op.args.iter().any(|arg| arg == name))
            .cloned()
            .collect()
    };
    let vg1 = on("vg1");
    let vg2 = on("vg2");
    assert_eq!(vg1.len(), 2);
    assert_eq!(vg2.len(), 1);

    assert!(!vg1[0].overlaps(&vg1[1]), "vg1 calls overlapped");
    assert!(
        vg1.iter().any(|op| op.overlaps(&vg2[0])),
        "vg2 call was serialized behind vg1"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn read_only_calls_bypass_locks() {
    let mock = MockClient::new().with_delay(CALL_DELAY);
    let client = LockingClient::new(mock.clone());
    let ctx = ExecContext::new();

    let (write, read) = tokio::join!(
        client.vg_change(&ctx, activate("vg1")),
        client.vgs(&ctx, OptionList::<VgsOptions>::new().with(vg("vg1"))),
    );
    write.unwrap();
    read.unwrap();

    let change = &mock.operations_for("vgchange")[0];
    let list = &mock.operations_for("vgs")[0];
    assert!(change.overlaps(list));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rename_locks_both_names() {
    let mock = MockClient::new().with_delay(CALL_DELAY);
    let client = LockingClient::new(mock.clone());
    let ctx = ExecContext::new();

    let rename = OptionList::<VgRenameOptions>::new()
        .with(vg("old"))
        .with(NewVolumeGroupName(vg("new")));

    let (a, b) = tokio::join!(
        client.vg_rename(&ctx, rename),
        client.vg_change(&ctx, activate("new")),
    );
    a.unwrap();
    b.unwrap();

    let renamed = &mock.operations_for("vgrename")[0];
    let changed = &mock.operations_for("vgchange")[0];
    assert!(!renamed.overlaps(changed));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shared_registry_serializes_across_clients() {
    let registry = Arc::new(LockRegistry::new());
    let mock = MockClient::new().with_delay(CALL_DELAY);
    let first = LockingClient::with_registry(mock.clone(), Arc::clone(&registry));
    let second = LockingClient::with_registry(mock.clone(), Arc::clone(&registry));
    let ctx = ExecContext::new();

    let pv = || {
        OptionList::<PvRemoveOptions>::new().with(PhysicalVolumeNames::from(
            PhysicalVolumeName::new("/dev/sdb").unwrap(),
        ))
    };
    let (a, b) = tokio::join!(first.pv_remove(&ctx, pv()), second.pv_remove(&ctx, pv()));
    a.unwrap();
    b.unwrap();

    let ops = mock.operations_for("pvremove");
    assert_eq!(ops.len(), 2);
    assert!(!ops[0].overlaps(&ops[1]));
}

#[tokio::test]
async fn lock_is_released_after_failure() {
    let mock = MockClient::new().fail_on("vgchange", "  Device or resource busy");
    let client = LockingClient::new(mock.clone());
    let ctx = ExecContext::new();

    assert!(client.vg_change(&ctx, activate("vg1")).await.is_err());

    mock.clear_fail_on();
    let retry = tokio::time::timeout(
        Duration::from_secs(1),
        client.vg_change(&ctx, activate("vg1")),
    )
    .await;
    assert!(retry.expect("lock was not released").is_ok());
}

#[tokio::test]
async fn cancellation_while_waiting_for_lock() {
    let mock = MockClient::new().with_delay(Duration::from_secs(5));
    let client = Arc::new(LockingClient::new(mock.clone()));

    let holder = {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            client
                .vg_change(&ExecContext::new(), activate("vg1"))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let token = CancellationToken::new();
    let ctx = ExecContext::new().with_cancellation(token.clone());
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    let err = client.vg_change(&ctx, activate("vg1")).await.unwrap_err();
    canceller.await.unwrap();
    assert!(err.is_cancelled());
    assert_eq!(mock.operations_for("vgchange").len(), 0);

    holder.abort();
}

#[tokio::test]
async fn no_nsenter_decorator_sets_bypass() {
    let mock = MockClient::new();
    let client = with_no_nsenter(mock.clone());

    client
        .vg_change(&ExecContext::new(), activate("vg0"))
        .await
        .unwrap();
    client
        .vgs(&ExecContext::new(), OptionList::new())
        .await
        .unwrap();

    let ops = mock.operations();
    assert_eq!(ops.len(), 2);
    assert!(ops.iter().all(|op| op.force_no_nsenter));
}

#[tokio::test]
async fn decorators_stack() {
    let mock = MockClient::new();
    let env = BTreeMap::from([("LVM_SYSTEM_DIR".to_string(), "/etc/lvm".to_string())]);
    let overrides = Overrides::new()
        .environment(env.clone())
        .wait_delay(Duration::from_secs(3))
        .default_volume_group(vg("vg0"));
    let client = LockingClient::new(LayeredClient::new(with_no_nsenter(mock.clone()), overrides));

    client
        .vg_change(&ExecContext::new(), activate("vg0"))
        .await
        .unwrap();

    let op = &mock.operations()[0];
    assert!(op.force_no_nsenter);
    assert_eq!(op.environment, env);
    assert_eq!(op.wait_delay, Duration::from_secs(3));
    assert_eq!(op.default_volume_group.as_deref(), Some("vg0"));
    assert_eq!(op.args, ["--activate=y", "vg0", "--yes"]);
}

#[tokio::test]
async fn decorators_preserve_errors() {
    let mock = MockClient::new().fail_on("vgchange", "  Volume group \"vg9\" not found");
    let client = LockingClient::new(with_no_nsenter(mock));

    let err = client
        .vg_change(&ExecContext::new(), activate("vg9"))
        .await
        .unwrap_err();
    assert!(err.is_volume_group_not_found());
    assert_eq!(err.stderr().map(str::trim), Some("Volume group \"vg9\" not found"));
}

#[tokio::test]
async fn validation_failures_do_not_lock_or_run() {
    let mock = MockClient::new();
    let client = LockingClient::new(mock.clone());

    let err = client
        .vg_change(&ExecContext::new(), OptionList::new().with(vg("vg0")))
        .await
        .unwrap_err();
    assert!(matches!(err, lvmkit::ClientError::Validation(_)));
    assert!(client.registry().is_empty());
    assert!(mock.operations().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn default_volume_group_is_locked() {
    let mock = MockClient::new().with_delay(CALL_DELAY);
    let client = LockingClient::new(mock.clone());
    let ctx = ExecContext::new().with_default_volume_group(vg("vg0"));

    let create = OptionList::<LvCreateOptions>::new()
        .with(LogicalVolumeName::new("data").unwrap())
        .with(Size::from_bytes(4 << 20));
    let plain_ctx = ExecContext::new();
    let (created, changed) = tokio::join!(
        client.lv_create(&ctx, create),
        client.vg_change(&plain_ctx, activate("vg0")),
    );
    created.unwrap();
    changed.unwrap();

    let create = &mock.operations_for("lvcreate")[0];
    let change = &mock.operations_for("vgchange")[0];
    assert_eq!(create.args, ["--name=data", "--size=4194304b", "vg0", "--yes"]);
    assert!(!create.overlaps(change));
    assert!(client.registry().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn resize_serializes_with_group_changes() {
    let mock = MockClient::new().with_delay(CALL_DELAY);
    let client = LockingClient::new(mock.clone());
    let ctx = ExecContext::new();

    let resize = OptionList::<LvResizeOptions>::new()
        .with(vg("vg1"))
        .with(LogicalVolumeName::new("data").unwrap())
        .with(Size::from_bytes(8 << 20));
    let (a, b) = tokio::join!(
        client.lv_resize(&ctx, resize),
        client.vg_change(&ctx, activate("vg1")),
    );
    a.unwrap();
    b.unwrap();

    let resized = &mock.operations_for("lvresize")[0];
    let changed = &mock.operations_for("vgchange")[0];
    assert!(!resized.overlaps(changed));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pvmove_and_vgreduce_share_device_locks() {
    let mock = MockClient::new().with_delay(CALL_DELAY);
    let client = LockingClient::new(mock.clone());
    let ctx = ExecContext::new();
    let sdb = || PhysicalVolumeNames::from(PhysicalVolumeName::new("/dev/sdb").unwrap());

    let (moved, reduced) = tokio::join!(
        client.pv_move(&ctx, OptionList::<PvMoveOptions>::new().with(sdb())),
        client.vg_reduce(
            &ctx,
            OptionList::<VgReduceOptions>::new().with(vg("vg1")).with(sdb()),
        ),
    );
    moved.unwrap();
    reduced.unwrap();

    let moved = &mock.operations_for("pvmove")[0];
    let reduced = &mock.operations_for("vgreduce")[0];
    assert!(!moved.overlaps(reduced));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn devices_file_edits_serialize_per_file() {
    let mock = MockClient::new().with_delay(CALL_DELAY);
    let client = with_no_nsenter(LockingClient::new(mock.clone()));
    let ctx = ExecContext::new();
    let loop0 = || PhysicalVolumeName::new("/dev/loop0").unwrap();

    let (added, removed, other) = tokio::join!(
        client.dev_modify(
            &ctx,
            OptionList::new()
                .with(AddDevice(loop0()))
                .with(DevicesFile("a".into())),
        ),
        client.dev_modify(
            &ctx,
            OptionList::new()
                .with(DelDevice(loop0()))
                .with(DevicesFile("a".into())),
        ),
        client.dev_modify(
            &ctx,
            OptionList::new()
                .with(AddDevice(loop0()))
                .with(DevicesFile("b".into())),
        ),
    );
    added.unwrap();
    removed.unwrap();
    other.unwrap();

    let ops = mock.operations_for("lvmdevices");
    assert!(ops.iter().all(|op| op.force_no_nsenter));
    let on = |file: &str| -> Vec<_> {
        let flag = format!("--devicesfile={file}");
        ops.iter().filter(|op| op.args.contains(&flag)).collect()
    };
    let (a, b) = (on("a"), on("b"));
    assert_eq!(a.len(), 2);
    assert!(!a[0].overlaps(a[1]));
    assert!(a.iter().any(|op| op.overlaps(b[0])));
}
