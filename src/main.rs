use anyhow::Context;
use fieldbot::bridge::BridgeServer;
use fieldbot::config::Config;
use fieldbot::console;
use fieldbot::kernel::reactor::{Reactor, ReactorConfig};
use fieldbot::persistence::JsonlEventStore;
use fieldbot::vision::PlantClassifier;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const EVENT_CAPACITY: usize = 16;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    fieldbot::logging::init();

    let config_path = std::env::args()
        .nth(1)
        .context("no configuration file given")?;
    let config = Config::load(&config_path).context("loading configuration")?;
    tracing::info!("Brain booting...");

    let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
    let cancel = CancellationToken::new();

    // Fatal if the transport cannot bind.
    let server = BridgeServer::bind(&config.brain_addr, tx.clone(), config.bridge_idle_timeout())
        .await
        .with_context(|| format!("binding {}", config.brain_addr))?;
    tokio::spawn(server.serve(cancel.clone()));

    // Console reads the terminal on its own thread.
    let console_tx = tx.clone();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        console::read_commands(stdin.lock(), console_tx);
    });

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received");
            ctrl_c.cancel();
        }
    });

    let store = JsonlEventStore::new(
        &config.store_dir,
        config.store_bucket_format.clone(),
        config.store_collection.clone(),
    );
    let classifier = PlantClassifier::new(config.classifier());

    let mut reactor = Reactor::new(
        rx,
        ReactorConfig::from(&config),
        Box::new(classifier),
        Box::new(store),
        cancel,
    );
    tracing::info!("Brain active. Type run, stop, reset, status or shutdown.");
    reactor.run().await;

    tracing::info!("Brain shut down");
    Ok(())
}
