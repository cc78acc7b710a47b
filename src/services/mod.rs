pub mod blob_store;
pub mod log_source;
pub mod memory;

use std::collections::HashMap;
use std::sync::Arc;

use aws_config::{BehaviorVersion, Region};
use tokio::sync::RwLock;

use self::blob_store::{BlobStore, S3BlobStore};
use self::log_source::{CloudWatchLogSource, LogSource};
use self::memory::{InMemoryBlobStore, InMemoryLogSource};
use crate::config::ExportConfig;

/// Upper bound on cached per-region client pairs. Past it, clients are built per run.
const MAX_CACHED_REGIONS: usize = 32;

/// The pair of collaborators one export run talks to.
#[derive(Clone)]
pub struct Backends {
    pub source: Arc<dyn LogSource>,
    pub store: Arc<dyn BlobStore>,
}

/// Hands out backends per region.
///
/// AWS clients are region bound, so they are built on first use for a region and cached.
pub enum BackendRegistry {
    Aws {
        endpoint: Option<String>,
        clients: RwLock<HashMap<String, Backends>>,
    },
    Memory {
        source: Arc<InMemoryLogSource>,
        store: Arc<InMemoryBlobStore>,
    },
}

impl BackendRegistry {
    pub fn aws(endpoint: Option<String>) -> Self {
        Self::Aws {
            endpoint,
            clients: RwLock::new(HashMap::new()),
        }
    }

    pub fn memory(source: Arc<InMemoryLogSource>, store: Arc<InMemoryBlobStore>) -> Self {
        Self::Memory { source, store }
    }

    /// Memory backends seeded with every configured group, so local dry runs of the default
    /// request resolve instead of failing with unknown groups.
    pub fn local(export: &ExportConfig) -> Self {
        let groups = std::iter::once(&export.log_group).chain(export.fixed_groups.iter());
        Self::memory(
            Arc::new(InMemoryLogSource::with_groups(groups)),
            Arc::new(InMemoryBlobStore::new()),
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Aws { .. } => "aws",
            Self::Memory { .. } => "memory",
        }
    }

    /// Number of regions with cached AWS clients. Always zero for memory backends.
    pub async fn cached_regions(&self) -> usize {
        match self {
            Self::Aws { clients, .. } => clients.read().await.len(),
            Self::Memory { .. } => 0,
        }
    }

    pub async fn for_region(&self, region: &str) -> Backends {
        match self {
            Self::Memory { source, store } => Backends {
                source: source.clone(),
                store: store.clone(),
            },
            Self::Aws { endpoint, clients } => {
                if let Some(backends) = clients.read().await.get(region) {
                    return backends.clone();
                }

                let mut clients = clients.write().await;
                if let Some(backends) = clients.get(region) {
                    return backends.clone();
                }

                let backends = build_aws_backends(region, endpoint.as_deref()).await;
                if clients.len() < MAX_CACHED_REGIONS {
                    tracing::info!(region, endpoint = ?endpoint, "Created AWS clients");
                    clients.insert(region.to_string(), backends.clone());
                } else {
                    tracing::warn!(region, cached = clients.len(), "AWS client cache full");
                }
                backends
            }
        }
    }
}

async fn build_aws_backends(region: &str, endpoint: Option<&str>) -> Backends {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
    if let Some(endpoint) = endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let sdk_config = loader.load().await;

    Backends {
        source: Arc::new(CloudWatchLogSource::from_conf(&sdk_config)),
        store: Arc::new(S3BlobStore::from_conf(&sdk_config, endpoint.is_some())),
    }
}
