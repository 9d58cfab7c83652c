use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::{Block, MessageHandler, Node, NodeError, Transaction, WalletInfo};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::constants::{MAX_RANGE, RELAY_BLOCK_PATH, RELAY_TRANSACTION_PATH};

pub type AppState = Arc<Node>;

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    start: usize,
    end: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactRequest {
    recipient: String,
    amount: u64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DeliveryAck {
    accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl DeliveryAck {
    fn from_result<E: std::fmt::Display>(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self {
                accepted: true,
                reason: None,
            },
            Err(err) => Self {
                accepted: false,
                reason: Some(err.to_string()),
            },
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<NodeError> for ApiError {
    fn from(err: NodeError) -> Self {
        let status = match &err {
            NodeError::Transaction(_) => StatusCode::BAD_REQUEST,
            NodeError::Validation(_) | NodeError::Replication(_) | NodeError::Superseded => {
                StatusCode::CONFLICT
            }
            NodeError::Publish(_) | NodeError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Welcome to the blockchain" }))
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/blockchain", get(get_chain))
        .route("/blockchain/range", get(get_range))
        .route("/blockchain/length", get(get_length))
        .route("/blockchain/mine", post(post_mine))
        .route("/wallet/transact", post(post_transact))
        .route("/wallet/info", get(get_wallet_info))
        .route("/known-addresses", get(get_known_addresses))
        .route("/transactions", get(get_transactions))
        .route(RELAY_BLOCK_PATH, post(post_relay_block))
        .route(RELAY_TRANSACTION_PATH, post(post_relay_transaction))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn get_chain(State(node): State<AppState>) -> Json<Vec<Block>> {
    Json(node.chain())
}

async fn get_range(
    State(node): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> Json<Vec<Block>> {
    let end = range.end.min(range.start.saturating_add(MAX_RANGE));
    Json(node.chain_range(range.start, end))
}

async fn get_length(State(node): State<AppState>) -> Json<usize> {
    Json(node.chain_length())
}

async fn post_mine(State(node): State<AppState>) -> Result<Json<Block>, ApiError> {
    let block = tokio::task::spawn_blocking(move || node.mine())
        .await
        .map_err(|err| ApiError::internal(format!("mining task failed: {err}")))??;
    Ok(Json(block))
}

async fn post_transact(
    State(node): State<AppState>,
    Json(req): Json<TransactRequest>,
) -> Result<Json<Transaction>, ApiError> {
    let tx = node.transact(&req.recipient, req.amount)?;
    info!("Issued transaction {} to {}", tx.id, req.recipient);
    Ok(Json(tx))
}

async fn get_wallet_info(State(node): State<AppState>) -> Json<WalletInfo> {
    Json(node.wallet_info())
}

async fn get_known_addresses(State(node): State<AppState>) -> Json<Vec<String>> {
    Json(node.known_addresses())
}

async fn get_transactions(State(node): State<AppState>) -> Json<Vec<Transaction>> {
    Json(node.pool_transactions())
}

async fn post_relay_block(State(node): State<AppState>, body: String) -> Json<DeliveryAck> {
    let ack = match Block::from_json(&body) {
        Ok(block) => {
            let hash = block.hash.clone();
            let result =
                tokio::task::spawn_blocking(move || node.on_block_delivered(block)).await;
            match result {
                Ok(result) => {
                    if let Err(err) = &result {
                        warn!("Delivered block {} rejected: {}", hash, err);
                    } else {
                        info!("Delivered block {} extended the chain", hash);
                    }
                    DeliveryAck::from_result(result)
                }
                Err(err) => DeliveryAck::from_result(Err(err)),
            }
        }
        Err(err) => {
            warn!("Undecodable block delivery: {}", err);
            DeliveryAck::from_result(Err(err))
        }
    };
    Json(ack)
}

async fn post_relay_transaction(
    State(node): State<AppState>,
    body: String,
) -> Json<DeliveryAck> {
    let result = Transaction::from_json(&body)
        .map_err(|err| err.to_string())
        .and_then(|tx| {
            node.on_transaction_delivered(tx)
                .map_err(|err| err.to_string())
        });
    if let Err(err) = &result {
        warn!("Delivered transaction rejected: {}", err);
    }
    Json(DeliveryAck::from_result(result))
}
