use crate::config::{app_config::CertificateProvider, nats_config::ClientConfig as NatsClientConf};
use anyhow::{Context, Result};
use async_nats::ConnectOptions;
use log::info;
use rustls::{ClientConfig, RootCertStore};

pub struct NatsClient {
    pub client_config: NatsClientConf,
}
impl NatsClient {
    fn client_configuration(certificate_provider: &impl CertificateProvider) -> Result<ClientConfig> {
        let mut store = RootCertStore::empty();
        store
            .add(certificate_provider.root_ca()?)
            .context("Unable to add root CA")?;
        ClientConfig::builder()
            .with_root_certificates(store)
            .with_client_auth_cert(vec![certificate_provider.certificate()?], certificate_provider.private_key()?)
            .context("Unable to build client configuration!")
    }

    async fn options(&self) -> Result<ConnectOptions> {
        let options = match &self.client_config.creds_path {
            Some(path) => ConnectOptions::with_credentials_file(path)
                .await
                .with_context(|| format!("Unable to load credentials {path}"))?,
            None => ConnectOptions::new(),
        };
        let options = match &self.client_config.cert {
            Some(cert) => options
                .tls_client_config(NatsClient::client_configuration(cert)?)
                .require_tls(true),
            None => options,
        };
        Ok(options.name("farm-controller"))
    }

    pub async fn connect(&self) -> Result<async_nats::Client> {
        let scheme = if self.client_config.cert.is_some() { "tls" } else { "nats" };
        let address = format!("{}://{}:{}", scheme, self.client_config.host, self.client_config.port);
        let client = async_nats::connect_with_options(address.as_str(), self.options().await?)
            .await
            .context("Cannot connect to nats server")?;
        info!("Connected to {address}");
        Ok(client)
    }
}
