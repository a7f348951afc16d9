use super::app_config::CertificateProvider;
use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use super::app_config::{CertConfig, CertFileType};

#[derive(Deserialize, Default)]
pub struct PostgresConfig {
    pub database: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub cert: Option<CertConfig>,
    pub audit_table: String,
}

impl PostgresConfig {
    pub fn options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .database(&self.database)
            .host(&self.host)
            .port(self.port)
            .username(&self.username);
        let options = match &self.password {
            Some(password) => options.password(password),
            None => options,
        };
        match &self.cert {
            Some(cert) => options
                .ssl_mode(PgSslMode::VerifyFull)
                .ssl_root_cert(cert.get_path_of(CertFileType::Ca))
                .ssl_client_key(cert.get_path_of(CertFileType::Key))
                .ssl_client_cert(cert.get_path_of(CertFileType::Cert)),
            None => options.ssl_mode(PgSslMode::Prefer),
        }
    }
}
