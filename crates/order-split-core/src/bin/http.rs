#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use order_split::{AppConfig, OrderSession, SqliteCatalogStore, http_api, logging};
    use tracing::warn;

    logging::init();

    let config = AppConfig::load()?;
    let addr: SocketAddr = config.http_addr.parse()?;
    let store = Arc::new(SqliteCatalogStore::new(&config.database_path)?);

    let mut session = OrderSession::from_config(&config);
    if let Err(err) = session.reload_contracts(store.as_ref()) {
        warn!(error = %err, "starting with an empty contract list");
    }

    println!("order-split HTTP API listening on http://{addr}");
    http_api::serve(addr, session, store).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
