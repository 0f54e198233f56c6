use anyhow::Context;
use fieldbot::config::Config;
use fieldbot::robot::{ActuatorLink, BrainClient, FileCamera, RobotRunner, RunnerConfig};
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    fieldbot::logging::init();

    let config_path = std::env::args()
        .nth(1)
        .context("no configuration file given")?;
    let config = Config::load(&config_path).context("loading configuration")?;

    // Hardware and the first connection are fatal at startup; later link
    // failures are retried by the runner.
    let actuator = ActuatorLink::open(
        &config.actuator_dev,
        config.actuator_baud,
        config.actuator_timeout(),
    )
    .with_context(|| format!("opening actuator {}", config.actuator_dev))?;
    let camera = FileCamera::open(config.camera_path())
        .with_context(|| format!("opening camera {}", config.camera_path().display()))?;
    let client = BrainClient::connect(&config.brain_addr, config.request_timeout())
        .await
        .with_context(|| format!("connecting to brain at {}", config.brain_addr))?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(target: "robot", "interrupt received");
            ctrl_c.cancel();
        }
    });

    let runner = RobotRunner::new(RunnerConfig::from(&config), Some(client), actuator, camera);
    let summary = runner.run(cancel).await.context("robot loop failed")?;
    tracing::info!(
        target: "robot",
        rounds = summary.rounds,
        failed = summary.failed_rounds,
        last = ?summary.last_action,
        "robot stopped"
    );
    Ok(())
}
