//! TLS configuration for PostgreSQL connections.
//!
//! `tokio-postgres` only understands `disable`, `prefer` and `require`. The
//! remaining libpq modes are mapped onto those, and certificate verification
//! is decided by the rustls config built here.

use std::sync::Arc;

use rustls::ClientConfig;
use tokio_postgres::config::SslMode as DriverSslMode;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{debug, warn};

use crate::error::{MigrateError, Result};

/// libpq `sslmode` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    /// No SSL/TLS (plain TCP connection).
    Disable,
    /// Plain first, TLS only if the server insists. Treated like `prefer`.
    Allow,
    /// TLS when the server offers it, plain otherwise. libpq's default.
    #[default]
    Prefer,
    /// TLS without certificate verification.
    Require,
    /// Verify server certificate against the web PKI roots.
    VerifyCa,
    /// Full certificate and hostname verification.
    VerifyFull,
}

impl SslMode {
    /// Parse an SSL mode from a string.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "allow" => Ok(SslMode::Allow),
            "prefer" | "" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            "verify-ca" => Ok(SslMode::VerifyCa),
            "verify-full" => Ok(SslMode::VerifyFull),
            other => Err(MigrateError::invalid_dsn(
                "postgres",
                format!(
                    "invalid sslmode '{}'. Valid values: disable, allow, prefer, require, verify-ca, verify-full",
                    other
                ),
            )),
        }
    }

    /// The libpq spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Allow => "allow",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
            SslMode::VerifyCa => "verify-ca",
            SslMode::VerifyFull => "verify-full",
        }
    }

    /// The closest mode `tokio-postgres` accepts.
    pub fn driver_mode(&self) -> DriverSslMode {
        match self {
            SslMode::Disable => DriverSslMode::Disable,
            SslMode::Allow | SslMode::Prefer => DriverSslMode::Prefer,
            SslMode::Require | SslMode::VerifyCa | SslMode::VerifyFull => DriverSslMode::Require,
        }
    }

    /// Whether a TLS connector has to be installed.
    pub fn uses_tls(&self) -> bool {
        !matches!(self, SslMode::Disable)
    }

    /// Whether the server certificate is checked.
    pub fn verifies_certificate(&self) -> bool {
        matches!(self, SslMode::VerifyCa | SslMode::VerifyFull)
    }
}

/// Builder for PostgreSQL TLS connectors.
pub struct TlsBuilder {
    ssl_mode: SslMode,
}

impl TlsBuilder {
    /// Create a new TLS builder with the given SSL mode.
    pub fn new(ssl_mode: SslMode) -> Self {
        Self { ssl_mode }
    }

    /// Build a connector for `tokio_postgres::Config::connect`.
    ///
    /// Returns None if TLS is disabled.
    pub fn build(&self) -> Result<Option<MakeRustlsConnect>> {
        if !self.ssl_mode.uses_tls() {
            return Ok(None);
        }

        let config = self.build_client_config();
        Ok(Some(MakeRustlsConnect::new(config)))
    }

    /// Build the underlying rustls ClientConfig.
    pub fn build_client_config(&self) -> ClientConfig {
        if self.ssl_mode.verifies_certificate() {
            if self.ssl_mode == SslMode::VerifyCa {
                debug!("sslmode=verify-ca: rustls also checks the hostname");
            }
            let mut root_store = rustls::RootCertStore::empty();
            root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            return ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth();
        }

        if self.ssl_mode == SslMode::Require {
            warn!(
                "sslmode=require enables TLS but does not verify the server certificate; \
                 use verify-full to authenticate the server"
            );
        }
        ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoVerifier))
            .with_no_client_auth()
    }
}

/// Certificate verifier that accepts any certificate.
///
/// Used for the modes that encrypt without authenticating the server.
#[derive(Debug)]
struct NoVerifier;

impl rustls::client::danger::ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssl_mode_parsing() {
        assert_eq!(SslMode::parse("disable").unwrap(), SslMode::Disable);
        assert_eq!(SslMode::parse("allow").unwrap(), SslMode::Allow);
        assert_eq!(SslMode::parse("prefer").unwrap(), SslMode::Prefer);
        assert_eq!(SslMode::parse("REQUIRE").unwrap(), SslMode::Require);
        assert_eq!(SslMode::parse("verify-ca").unwrap(), SslMode::VerifyCa);
        assert_eq!(SslMode::parse("verify-full").unwrap(), SslMode::VerifyFull);
        assert_eq!(SslMode::parse("").unwrap(), SslMode::Prefer);
        assert!(SslMode::parse("invalid").is_err());
    }

    #[test]
    fn test_driver_mode_mapping() {
        assert_eq!(SslMode::Disable.driver_mode(), DriverSslMode::Disable);
        assert_eq!(SslMode::Allow.driver_mode(), DriverSslMode::Prefer);
        assert_eq!(SslMode::VerifyFull.driver_mode(), DriverSslMode::Require);
    }

    #[test]
    fn test_tls_builder_disable_returns_none() {
        let builder = TlsBuilder::new(SslMode::Disable);
        assert!(builder.build().unwrap().is_none());
    }

    #[test]
    fn test_tls_builder_require_returns_some() {
        let builder = TlsBuilder::new(SslMode::Require);
        assert!(builder.build().unwrap().is_some());
    }

    #[test]
    fn test_tls_builder_verify_full_returns_some() {
        let builder = TlsBuilder::new(SslMode::VerifyFull);
        assert!(builder.build().unwrap().is_some());
    }
}
