use gatt_router::{
    peripheral::{bluez::Peripheral, server::event_channel},
    service::{SdlService, SdlServiceConfig, Service},
    PeripheralConfig, PeripheralServer, Result,
};
use log::{error, info};

const NAME_VAR: &str = "BLE_SERVER_NAME";

#[tokio::main]
async fn main() {
    if let Err(err) = pretty_env_logger::try_init() {
        eprintln!("WARNING: failed to initialize logging framework: {}", err);
    }

    if let Err(err) = serve().await {
        error!("{}", err);
        std::process::exit(1);
    }
}

async fn serve() -> Result<()> {
    let mut config = PeripheralConfig::default();
    if let Ok(name) = std::env::var(NAME_VAR) {
        config = config.with_name(name);
    }

    let (sender_tx, receiver_rx) = event_channel(&config);
    let platform = Peripheral::new(sender_tx.clone()).await?;
    let mut server = PeripheralServer::new(platform, config, sender_tx, receiver_rx);

    let services: Vec<Box<dyn Service>> =
        vec![Box::new(SdlService::new(SdlServiceConfig::default()))];
    server.start(services).await?;
    info!("Peripheral started advertising");

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    server.shutdown().await?;
    info!("Peripheral stopped advertising");
    Ok(())
}
