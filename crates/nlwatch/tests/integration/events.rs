//! Address monitoring integration tests.

use std::time::Duration;

use nlwatch::Result;
use nlwatch::netlink::events::{AddressWatcher, Operation, WatchConfig};
use nlwatch::util::AddressFamily;
use tokio::time::timeout;

use crate::common::{DummyLink, ip};

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_address_add_and_remove() -> Result<()> {
    require_root!();

    let dummy = DummyLink::new("nlw-ev0")?;
    let mut watcher =
        AddressWatcher::new(WatchConfig::new(dummy.name()).family(AddressFamily::Ipv4))?;

    ip(&["addr", "add", "192.0.2.77/24", "dev", dummy.name()])?;
    let event = timeout(WAIT, watcher.next_event())
        .await
        .expect("timed out waiting for NEW event")?;
    assert_eq!(event.operation, Operation::New);
    assert_eq!(
        event.env(),
        [
            ("OPTYPE", "NEW".to_string()),
            ("FAMILY", "AF_INET".to_string()),
            ("VALUE", "192.0.2.77".to_string()),
        ]
    );

    ip(&["addr", "del", "192.0.2.77/24", "dev", dummy.name()])?;
    let event = timeout(WAIT, watcher.next_event())
        .await
        .expect("timed out waiting for DEL event")?;
    assert_eq!(event.operation, Operation::Del);
    assert_eq!(event.value(), "192.0.2.77");

    Ok(())
}

#[tokio::test]
async fn test_other_interface_ignored() -> Result<()> {
    require_root!();

    let watched = DummyLink::new("nlw-ev1")?;
    let other = DummyLink::new("nlw-ev2")?;
    let mut watcher =
        AddressWatcher::new(WatchConfig::new(watched.name()).family(AddressFamily::Ipv4))?;

    ip(&["addr", "add", "198.51.100.77/24", "dev", other.name()])?;
    ip(&["addr", "add", "203.0.113.77/24", "dev", watched.name()])?;

    let event = timeout(WAIT, watcher.next_event())
        .await
        .expect("timed out waiting for event")?;
    assert_eq!(event.value(), "203.0.113.77");

    Ok(())
}

#[tokio::test]
async fn test_missing_interface_yields_nothing() -> Result<()> {
    require_root!();

    let other = DummyLink::new("nlw-ev3")?;
    let mut watcher = AddressWatcher::new(WatchConfig::new("nlw-absent0"))?;

    ip(&["addr", "add", "192.0.2.99/24", "dev", other.name()])?;
    let waited = timeout(Duration::from_millis(500), watcher.next_event()).await;
    assert!(waited.is_err(), "no event expected for a missing interface");

    Ok(())
}
