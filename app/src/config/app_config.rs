use anyhow::{Result, anyhow};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use serde::Deserialize;
use std::{
    fs::{self},
    path::{Path, PathBuf},
};

use crate::utils::{file::FileUtils, pem::PemUtils};

use super::{control_config::ControlConfig, nats_config::NatsConfig, postgres_config::PostgresConfig};

pub const CONFIG_PATH_ENV: &str = "FARM_CONTROLLER_CONFIG";

#[derive(Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub postgres: PostgresConfig,
    #[serde(default)]
    pub control: ControlConfig,
}

impl AppConfig {
    /// Reads `$FARM_CONTROLLER_CONFIG` when set, `file_name` next to the manifest otherwise.
    pub fn load(file_name: &str) -> anyhow::Result<AppConfig> {
        let file_path = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => PathBuf::from(path),
            Err(_) => Path::new(env!("CARGO_MANIFEST_DIR")).join(file_name),
        };
        Self::parse(&file_path)
    }

    fn parse(file_path: &Path) -> anyhow::Result<AppConfig> {
        let content = fs::read_to_string(file_path)
            .map_err(|err| anyhow!("Could not read config file {}: {:?}", file_path.display(), err))?;
        toml::from_str(&content).map_err(|err| anyhow!("Could not parse TOML config: {:?}", err))
    }
}

#[derive(Deserialize, Default, Clone)]
pub struct CertConfig {
    absolute_folder_path: String,
    key_file_name: String,
    cert_file_name: String,
    root_ca_file_name: String,
}

pub enum CertFileType {
    Key,
    Cert,
    Ca,
}

pub trait CertificateProvider {
    fn get_path_of(&self, cert_type: CertFileType) -> String;
    fn private_key(&self) -> Result<PrivateKeyDer<'static>>;
    fn certificate(&self) -> Result<CertificateDer<'static>>;
    fn root_ca(&self) -> Result<CertificateDer<'static>>;
}

#[cfg_attr(test, mockall::automock)]
impl CertificateProvider for CertConfig {
    fn get_path_of(&self, cert_type: CertFileType) -> String {
        let file_name = match cert_type {
            CertFileType::Ca => &self.root_ca_file_name,
            CertFileType::Cert => &self.cert_file_name,
            CertFileType::Key => &self.key_file_name,
        };
        format!("{}/{}", self.absolute_folder_path, file_name)
    }

    fn private_key(&self) -> Result<PrivateKeyDer<'static>> {
        PemUtils::parse_private_key(FileUtils::load(&self.get_path_of(CertFileType::Key))?)
    }

    fn certificate(&self) -> Result<CertificateDer<'static>> {
        PemUtils::parse_certificate(FileUtils::load(&self.get_path_of(CertFileType::Cert))?)
    }

    fn root_ca(&self) -> Result<CertificateDer<'static>> {
        PemUtils::parse_certificate(FileUtils::load(&self.get_path_of(CertFileType::Ca))?)
    }
}
