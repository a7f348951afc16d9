use anyhow::{Context, Result, anyhow};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls_pemfile::{certs, private_key};

pub struct PemUtils {}

impl PemUtils {
    pub fn init_provider() -> Result<()> {
        rustls::crypto::ring::default_provider()
            .install_default()
            .map_err(|_| anyhow!("A rustls crypto provider is already installed"))
    }

    pub fn parse_certificate(data: Vec<u8>) -> Result<CertificateDer<'static>> {
        certs(&mut &data[..])
            .find_map(|cert| cert.ok())
            .context("Failed to parse certificate")
    }

    /// Accepts PKCS#1, PKCS#8 and SEC1 keys.
    pub fn parse_private_key(data: Vec<u8>) -> Result<PrivateKeyDer<'static>> {
        private_key(&mut &data[..])
            .context("Failed to read private key")?
            .context("No private key found")
    }
}

#[cfg(test)]
mod tests {
    use rcgen::generate_simple_self_signed;

    use super::PemUtils;

    #[test]
    fn should_parse_generated_pem() {
        let certified = generate_simple_self_signed(vec!["farm-controller".to_string()]).unwrap();
        let cert = PemUtils::parse_certificate(certified.cert.pem().into_bytes()).unwrap();
        assert_eq!(cert.as_ref(), certified.cert.der().as_ref());
        PemUtils::parse_private_key(certified.key_pair.serialize_pem().into_bytes()).unwrap();
    }

    #[test]
    fn should_fail_on_garbage() {
        assert!(PemUtils::parse_certificate(b"not a certificate".to_vec()).is_err());
        assert!(PemUtils::parse_private_key(b"not a key".to_vec()).is_err());
    }
}
