use crate::client::FtpSession;
use crate::error::DeployResult;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// The single connection of a deployment, shared by the tree walkers.
pub type SharedSession = Arc<Mutex<Box<dyn FtpSession>>>;

/// Owns the session for the whole run and releases it at the end.
pub struct ConnectionManager {
    address: String,
    client: SharedSession,
    connected: bool,
}

impl ConnectionManager {
    pub fn new(address: String, client: Box<dyn FtpSession>) -> Self {
        Self {
            address,
            client: Arc::new(Mutex::new(client)),
            connected: false,
        }
    }

    pub async fn connect(&mut self) -> DeployResult<SharedSession> {
        if self.connected {
            return Ok(self.client.clone());
        }

        self.client.lock().await.connect().await?;
        self.connected = true;
        Ok(self.client.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Best effort: a logout failure is logged, the deployment outcome is
    /// already known at this point.
    pub async fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;

        let mut client = self.client.lock().await;
        match client.disconnect().await {
            Ok(()) => debug!("Disconnected from {}", self.address),
            Err(e) => warn!("Error while disconnecting from {} : {}", self.address, e),
        }
    }
}
