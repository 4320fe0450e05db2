//! End-to-end tests of the public Bridge API against fake Neovim instances.

use std::time::Duration;

use nvim_bridge_client::fake::{FakeNvim, default_reply};
use nvim_bridge_client::{Bridge, BridgeConfig, ErrorKind, NavigateRequest, connect_unix};

fn bridge_for(dir: &std::path::Path) -> Bridge {
    Bridge::new(BridgeConfig {
        call_timeout: Duration::from_secs(2),
        ..BridgeConfig::with_socket_dir(dir)
    })
}

#[tokio::test]
async fn test_discover_then_drive_each_instance() {
    let dir = tempfile::tempdir().unwrap();
    let first = FakeNvim::start(dir.path(), 1001, default_reply);
    let second = FakeNvim::start(dir.path(), 1002, default_reply);
    std::fs::write(dir.path().join("notes.txt"), b"not a socket").unwrap();

    let bridge = bridge_for(dir.path());
    let mut ids: Vec<u32> = bridge.discover().iter().map(|i| i.id).collect();
    ids.sort();
    assert_eq!(ids, [1001, 1002]);

    for fake in [&first, &second] {
        let located = bridge.locate(fake.pid()).unwrap();
        assert_eq!(located, fake.instance());

        let snap = bridge.snapshot(fake.pid()).await;
        assert!(snap.state().is_some());
    }

    let nav = bridge
        .navigate(1001, &NavigateRequest::new("src/lib.rs").at(5, Some(2)))
        .await;
    assert!(nav.success(), "{}", nav.message());

    let exec = bridge.execute(1002, ":wall", false).await;
    assert!(exec.success(), "{}", exec.message());

    // Only the targeted instance saw traffic from each operation.
    assert!(first.methods().iter().all(|m| m != "nvim_exec2"));
    assert!(second.methods().iter().all(|m| m != "nvim_command"));
}

#[tokio::test]
async fn test_every_operation_uses_its_own_connection() {
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeNvim::start(dir.path(), 2001, default_reply);
    let bridge = bridge_for(dir.path());

    let request = NavigateRequest::new("a.txt");
    let (snap, nav, exec) = tokio::join!(
        bridge.snapshot(2001),
        bridge.navigate(2001, &request),
        bridge.execute(2001, "ihello<Esc>", true),
    );

    assert!(snap.error().is_none());
    assert!(nav.success());
    assert!(exec.success());
    fake.wait_for_closed(3).await;
}

#[tokio::test]
async fn test_instance_gone_between_discovery_and_use() {
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeNvim::start(dir.path(), 3001, default_reply);
    let bridge = bridge_for(dir.path());
    assert_eq!(bridge.discover().len(), 1);

    let path = fake.instance().socket_path;
    drop(fake);
    std::fs::remove_file(&path).unwrap();

    let snap = bridge.snapshot(3001).await;
    assert_eq!(snap.error().map(|e| e.kind), Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_connect_unix_outside_session() {
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeNvim::start(dir.path(), 4001, default_reply);
    let config = BridgeConfig::with_socket_dir(dir.path());

    let mut client = connect_unix(&fake.instance().socket_path, &config).await.unwrap();
    assert_eq!(client.list_buffers().await.unwrap(), [1, 2, 3]);
    client.close().await.unwrap();

    fake.wait_for_closed(1).await;
}
