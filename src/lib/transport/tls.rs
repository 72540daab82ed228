use anyhow::Context;
use axum_server::tls_rustls::RustlsConfig;

use crate::config::TlsConfig;

pub async fn configure_tls(tls: &TlsConfig) -> anyhow::Result<RustlsConfig> {
    RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .with_context(|| {
            format!(
                "failed to load TLS certificate {} / key {}",
                tls.cert_path.display(),
                tls.key_path.display()
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_files_are_reported_with_their_paths() {
        let dir = tempfile::tempdir().unwrap();
        let tls = TlsConfig {
            cert_path: dir.path().join("cert.pem"),
            key_path: dir.path().join("key.pem"),
        };
        let err = configure_tls(&tls).await.unwrap_err();
        assert!(err.to_string().contains("cert.pem"), "{err}");
        assert!(err.to_string().contains("key.pem"), "{err}");
    }

    #[tokio::test]
    async fn unparseable_pem_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let tls = TlsConfig {
            cert_path: dir.path().join("cert.pem"),
            key_path: dir.path().join("key.pem"),
        };
        std::fs::write(&tls.cert_path, "not a certificate").unwrap();
        std::fs::write(&tls.key_path, "not a key").unwrap();
        assert!(configure_tls(&tls).await.is_err());
    }
}
