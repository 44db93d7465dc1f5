//! Entry point: assemble configuration, install logging, then hand off to
//! the supervisor for the rest of the process lifetime.
use docgate::config::GatewayConfig;
use docgate::supervisor::Supervisor;

#[tokio::main]
async fn main() {
    docgate::logging::init();

    let config = match GatewayConfig::from_env_and_args() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "configuration error");
            std::process::exit(1);
        }
    };

    let supervisor = Supervisor::new(config);
    if let Err(e) = supervisor.run().await {
        tracing::error!(error = %e, "gateway exited with error");
        std::process::exit(1);
    }
}
