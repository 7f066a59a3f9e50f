//! Interface lookup integration tests.

use nlwatch::Result;
use nlwatch::netlink::Connection;

use crate::common::DummyLink;

#[tokio::test]
async fn test_loopback_listed() -> Result<()> {
    require_root!();

    let conn = Connection::new()?;
    let interfaces = conn.get_interfaces().await?;
    let lo = interfaces.iter().find(|i| i.name == "lo");
    assert!(lo.is_some(), "lo should be listed");
    assert_eq!(conn.resolve_interface("lo").await?, lo.map(|i| i.index));

    Ok(())
}

#[tokio::test]
async fn test_resolve_dummy_interface() -> Result<()> {
    require_root!();

    let dummy = DummyLink::new("nlw-link0")?;
    let conn = Connection::new()?;
    let index = conn.resolve_interface(dummy.name()).await?;
    assert!(index.is_some_and(|i| i > 1));

    drop(dummy);
    assert_eq!(conn.resolve_interface("nlw-link0").await?, None);

    Ok(())
}

#[tokio::test]
async fn test_unknown_interface() -> Result<()> {
    require_root!();

    let conn = Connection::new()?;
    assert_eq!(conn.resolve_interface("does-not-exist0").await?, None);

    Ok(())
}
