use std::net::IpAddr;

use crates::infra::file_hosts::pixeldrain::PixeldrainConfig;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub gateway_server: GatewayServer,
    pub access: Access,
    pub pixeldrain: PixeldrainConfig,
    pub upload_retry: UploadRetry,
}

#[derive(Debug, Clone)]
pub struct GatewayServer {
    pub host: IpAddr,
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

impl GatewayServer {
    /// `body_limit` is configured in MiB.
    pub fn body_limit_bytes(&self) -> Option<usize> {
        self.body_limit
            .checked_mul(1024 * 1024)
            .and_then(|bytes| usize::try_from(bytes).ok())
    }
}

#[derive(Debug, Clone)]
pub struct Access {
    pub allow_remote: bool,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UploadRetry {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}
