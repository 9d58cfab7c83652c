use ledger_core::{Channel, Publisher};
use reqwest::header::CONTENT_TYPE;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::constants::{RELAY_BLOCK_PATH, RELAY_TRANSACTION_PATH};

/// Publishes by POSTing each payload to the relay inbox of every configured
/// peer. Sends are fire-and-forget; failures are logged.
pub struct HttpRelay {
    client: reqwest::Client,
    peers: Vec<String>,
    runtime: Handle,
}

impl HttpRelay {
    pub fn new(peers: Vec<String>, runtime: Handle) -> Self {
        Self {
            client: reqwest::Client::new(),
            peers,
            runtime,
        }
    }
}

pub(crate) fn inbox_url(peer: &str, channel: Channel) -> String {
    let path = match channel {
        Channel::Block => RELAY_BLOCK_PATH,
        Channel::Transaction => RELAY_TRANSACTION_PATH,
    };
    format!("{}{}", peer.trim_end_matches('/'), path)
}

impl Publisher for HttpRelay {
    fn publish(&self, channel: Channel, payload: &str) -> anyhow::Result<()> {
        for peer in &self.peers {
            let url = inbox_url(peer, channel);
            let request = self
                .client
                .post(url.clone())
                .header(CONTENT_TYPE, "application/json")
                .body(payload.to_string());

            self.runtime.spawn(async move {
                match request.send().await {
                    Ok(res) if res.status().is_success() => {
                        debug!("Relayed {} to {}", channel, url);
                    }
                    Ok(res) => warn!("Peer {} refused {}: {}", url, channel, res.status()),
                    Err(err) => warn!("Relay of {} to {} failed: {}", channel, url, err),
                }
            });
        }
        Ok(())
    }
}
