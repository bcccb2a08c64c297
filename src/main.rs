use std::sync::Arc;
use streaminit::{Config, InitError, PgStore, Provisioner};

async fn run() -> Result<(), InitError> {
    let config = Config::from_env()?;

    // Retries until the store accepts connections or the timeout elapses.
    let store = Arc::new(PgStore::connect(&config).await?);

    let provisioner = Provisioner::new(store, config);
    let report = provisioner.run().await?;
    print!("{report}");
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
