//! Print OPTYPE/FAMILY/VALUE for every address change on one interface.
//!
//! Run with: cargo run -p nlwatch --example address_watch -- eth0

use nlwatch::netlink::events::{AddressWatcher, WatchConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> nlwatch::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let interface = std::env::args().nth(1).unwrap_or_else(|| "eth0".to_string());
    let mut watcher = AddressWatcher::new(WatchConfig::new(interface))?;

    loop {
        let event = watcher.next_event().await?;
        let line: Vec<String> = event
            .env()
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        println!("{}", line.join(" "));
    }
}
