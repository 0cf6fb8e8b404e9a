//! Kubernetes client configuration
//!
//! The runner needs a `kube::Config` for the target cluster. Building one is
//! left to kube's own kubeconfig handling; this module only maps provider
//! settings onto it.

use async_trait::async_trait;
use kube::config::{Config, KubeConfigOptions, Kubeconfig};

use crate::config::ProviderSettings;
use crate::error::Result;

/// Produces the Kubernetes client configuration for provider settings
#[async_trait]
pub trait ClusterConfigProvider: Send + Sync {
    async fn cluster_config(&self, settings: &ProviderSettings) -> Result<Config>;
}

/// Reads kubeconfig files, or infers in-cluster/default configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct KubeconfigProvider;

#[async_trait]
impl ClusterConfigProvider for KubeconfigProvider {
    async fn cluster_config(&self, settings: &ProviderSettings) -> Result<Config> {
        let kubernetes = &settings.kubernetes;

        let mut config = if kubernetes.config_path.is_none() && kubernetes.config_context.is_none() {
            Config::infer().await?
        } else {
            let kubeconfig = match &kubernetes.config_path {
                Some(path) => Kubeconfig::read_from(path)?,
                None => Kubeconfig::read()?,
            };
            let options = KubeConfigOptions {
                context: kubernetes.config_context.clone(),
                ..Default::default()
            };
            Config::from_custom_kubeconfig(kubeconfig, &options).await?
        };

        if kubernetes.insecure {
            config.accept_invalid_certs = true;
        }
        if let Some(namespace) = &settings.namespace {
            config.default_namespace = namespace.clone();
        }

        tracing::debug!(
            cluster = %config.cluster_url,
            namespace = %config.default_namespace,
            "resolved cluster configuration"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KubernetesSettings;
    use std::io::Write;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
  - name: dev
    cluster:
      server: https://dev.example.com:6443
  - name: prod
    cluster:
      server: https://prod.example.com:6443
contexts:
  - name: dev
    context:
      cluster: dev
      user: ci
  - name: prod
    context:
      cluster: prod
      user: ci
      namespace: prod-apps
current-context: dev
users:
  - name: ci
    user:
      token: abc123
"#;

    fn kubeconfig_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(KUBECONFIG.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_selects_context() {
        let file = kubeconfig_file();
        let settings = ProviderSettings {
            kubernetes: KubernetesSettings {
                config_path: Some(file.path().to_path_buf()),
                config_context: Some("prod".into()),
                insecure: false,
            },
            ..Default::default()
        };

        let config = KubeconfigProvider.cluster_config(&settings).await.unwrap();
        assert_eq!(config.cluster_url.host(), Some("prod.example.com"));
        assert_eq!(config.default_namespace, "prod-apps");
        assert!(!config.accept_invalid_certs);
    }

    #[tokio::test]
    async fn test_settings_override_namespace_and_tls() {
        let file = kubeconfig_file();
        let settings = ProviderSettings {
            kubernetes: KubernetesSettings {
                config_path: Some(file.path().to_path_buf()),
                config_context: None,
                insecure: true,
            },
            namespace: Some("platform".into()),
            ..Default::default()
        };

        let config = KubeconfigProvider.cluster_config(&settings).await.unwrap();
        assert_eq!(config.cluster_url.host(), Some("dev.example.com"));
        assert_eq!(config.default_namespace, "platform");
        assert!(config.accept_invalid_certs);
    }

    #[tokio::test]
    async fn test_missing_kubeconfig_is_error() {
        let settings = ProviderSettings {
            kubernetes: KubernetesSettings {
                config_path: Some("/nonexistent/kubeconfig".into()),
                ..Default::default()
            },
            ..Default::default()
        };

        let err = KubeconfigProvider.cluster_config(&settings).await.unwrap_err();
        assert!(matches!(err, crate::error::ReleaseError::ClusterConfig(_)));
    }
}
