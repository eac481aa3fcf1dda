use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use ceno_client::driver::once_exit_code;
use ceno_client::{ClientConfig, ClientError, DriverSettings, SignalingDriver, Storage};
use ceno_fcp::FcpClient;

#[derive(Parser)]
#[command(name = "ceno-client", about = "CENO client signaling channel daemon")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "ceno-client.toml")]
    config: PathBuf,

    /// Run a single cycle and exit: 0 when the channel is up, 2 when still
    /// waiting on the bridge, 1 on failure
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load config from {}: {e}", cli.config.display());
            std::process::exit(1);
        }
    };

    ceno_client::logging::init_from_env(&config.logging.level);

    match run(&cli, &config).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!("failed to start client: {e}");
            std::process::exit(1);
        }
    }
}

/// Start the driver and run it to completion, returning the exit code.
async fn run(cli: &Cli, config: &ClientConfig) -> Result<i32, ClientError> {
    let storage = Storage::from_config(&config.storage)?;

    let node = Arc::new(FcpClient::new(config.fcp.to_fcp_config()));
    node.ensure_connected().await?;

    let settings = DriverSettings::from_config(config);
    let mut driver = SignalingDriver::new(Arc::clone(&node), settings, storage).await;

    let code = if cli.once {
        let status = driver.tick().await;
        tracing::info!(%status, "single cycle finished");
        once_exit_code(status)
    } else {
        let handle = driver.shutdown_handle();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("received SIGINT, shutting down");
            handle.shutdown();
        });
        let status = driver.run().await;
        // The loop only ends on its own when a failure is permanent.
        if status.is_fatal() && !config.signaling.regenerate_on_fatal {
            1
        } else {
            0
        }
    };

    node.close().await;
    Ok(code)
}
