//! Neighbor query integration tests.

use nlwatch::netlink::neigh::NeighborQuery;
use nlwatch::util::{AddressFamily, LinkLayerAddress};
use nlwatch::{ErrorKind, Result};

use crate::common::DummyLink;

fn destinations(records: &[nlwatch::netlink::NeighborRecord]) -> Vec<String> {
    records.iter().map(|r| r.to_string()).collect()
}

#[tokio::test]
async fn test_query_by_interface_name() -> Result<()> {
    require_root!();

    let dummy = DummyLink::new("nlw-neigh0")?;
    dummy.add_neighbor("192.0.2.10", "52:54:00:00:00:0a")?;
    dummy.add_neighbor("192.0.2.20", "52:54:00:00:00:14")?;

    let records = NeighborQuery::new()
        .family(AddressFamily::Ipv4)
        .interface_name(dummy.name())
        .execute()
        .await?;

    let mut found = destinations(&records);
    found.sort();
    assert_eq!(found, ["192.0.2.10", "192.0.2.20"]);
    assert!(records.iter().all(|r| r.state_name() == "PERMANENT"));

    Ok(())
}

#[tokio::test]
async fn test_query_filters() -> Result<()> {
    require_root!();

    let dummy = DummyLink::new("nlw-neigh1")?;
    dummy.add_neighbor("198.51.100.1", "52:54:00:00:01:01")?;
    dummy.add_neighbor("203.0.113.1", "52:54:00:00:01:02")?;

    let base = NeighborQuery::new().interface_name(dummy.name());

    let records = base
        .clone()
        .cidr("198.51.100.0/24".parse()?)
        .execute()
        .await?;
    assert_eq!(destinations(&records), ["198.51.100.1"]);

    let records = base
        .clone()
        .lladdr("52:54:00:00:01:02".parse::<LinkLayerAddress>()?)
        .execute()
        .await?;
    assert_eq!(destinations(&records), ["203.0.113.1"]);

    let records = base.family(AddressFamily::Ipv6).execute().await?;
    assert!(records.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_unknown_interface_name() -> Result<()> {
    require_root!();

    let err = NeighborQuery::new()
        .interface_name("does-not-exist0")
        .execute()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    Ok(())
}
