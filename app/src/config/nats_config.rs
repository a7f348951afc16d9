use serde::Deserialize;

use super::app_config::CertConfig;

#[derive(Deserialize, Default, Clone)]
pub struct NatsConfig {
    pub client: ClientConfig,
    pub channel: ChannelConfig,
    pub inbound: InboundConfig,
}

/// Key/value bucket devices and controller share.
#[derive(Deserialize, Default, Clone)]
pub struct ChannelConfig {
    pub bucket: String,
    #[serde(default)]
    pub create_bucket: bool,
}

#[derive(Deserialize, Default, Clone)]
pub struct InboundConfig {
    pub request_subject: String,
    pub queue_group: Option<String>,
}

#[derive(Deserialize, Default, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub cert: Option<CertConfig>,
    pub creds_path: Option<String>,
}
