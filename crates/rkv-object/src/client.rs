use std::fmt;
use std::sync::Arc;

use rkv_types::{Link, Quorum};
use serde_json::Value;

use crate::bucket::Bucket;
use crate::config::ClientConfig;
use crate::error::ObjectResult;
use crate::object::DataObject;
use crate::transport::Transport;

/// Entry point: a transport plus client-wide configuration.
///
/// Cloning is cheap; every bucket and object keeps a clone.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    config: Arc<ClientConfig>,
}

impl Client {
    /// A client with the default configuration.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    pub fn with_config(transport: impl Transport + 'static, config: ClientConfig) -> Self {
        Self::from_shared(Arc::new(transport), config)
    }

    /// A client over a transport the caller keeps a handle to.
    pub fn from_shared(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self {
            transport,
            config: Arc::new(config),
        }
    }

    /// A bucket handle with quorums taken from the configuration.
    pub fn bucket(&self, name: impl Into<String>) -> Bucket {
        Bucket::new(self.clone(), name)
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch the object a link points to.
    pub fn resolve_link(&self, link: &Link, r: Option<Quorum>) -> ObjectResult<DataObject> {
        self.bucket(link.bucket.clone()).get(&link.key, r)
    }

    /// Send a rendered map/reduce job through the transport.
    pub fn map_reduce(&self, job: &Value) -> ObjectResult<Value> {
        Ok(self.transport.map_reduce(job)?)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Link resolution with the client passed explicitly.
pub trait ResolveLink {
    /// Fetch the target object with the default read quorum.
    fn resolve(&self, client: &Client) -> ObjectResult<DataObject>;
}

impl ResolveLink for Link {
    fn resolve(&self, client: &Client) -> ObjectResult<DataObject> {
        client.resolve_link(self, None)
    }
}
