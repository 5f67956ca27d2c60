use anyhow::Result;
use crates::infra::file_hosts::pixeldrain::PixeldrainClient;
use gateway::{
    axum_http::http_serve,
    config::config_loader,
    usecases::{pixeldrain::PixeldrainUseCase, retry::RetryPolicy},
};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Gateway exited with error: {:#}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    crates::observability::init_observability("gateway")?;

    let dotenvy_env = Arc::new(config_loader::load()?);
    info!("ENV has been loaded");

    let pixeldrain_client = Arc::new(PixeldrainClient::new(dotenvy_env.pixeldrain.clone())?);
    if dotenvy_env.pixeldrain.api_key.is_none() {
        info!("PIXELDRAIN_API_KEY is not set; uploads go out anonymously");
    }

    let retry_policy = RetryPolicy::from(&dotenvy_env.upload_retry);
    let usecase = Arc::new(PixeldrainUseCase::new(pixeldrain_client, retry_policy));

    http_serve::start(dotenvy_env, usecase).await?;

    Ok(())
}
