//! Print neighbor table destinations that pass the given filters.
//!
//! Arguments are positional and may be empty strings:
//! `FAMILY INTERFACE LLADDR CIDR`, e.g. `4 eth0 "" 192.168.0.0/16`.
//!
//! Run with: cargo run -p nlwatch --example neighbors -- 4 eth0

use nlwatch::netlink::neigh::NeighborQuery;

#[tokio::main(flavor = "current_thread")]
async fn main() -> nlwatch::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let arg = |i: usize| args.get(i).map(String::as_str).unwrap_or("");

    let query = NeighborQuery::from_text(arg(0), arg(1), arg(2), arg(3))?;
    for neighbor in query.execute().await? {
        println!("{}", neighbor);
    }

    Ok(())
}
