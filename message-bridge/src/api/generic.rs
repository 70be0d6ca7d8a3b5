//! Generic API structures and handlers
//!
//! This module contains the response envelope, filter helpers, CORS and rejection
//! handling, and the `ApiServer` that wires the per-bridge handlers into routes.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use warp::{
    http::{Method, StatusCode},
    Filter, Rejection, Reply,
};

use super::bridges;
use crate::adapter::SharedBridge;
use crate::config::ApiConfig;
use crate::network::AttestationNetwork;

/// Bridges served by the API, keyed by chain id.
pub type BridgeMap = Arc<HashMap<u16, SharedBridge>>;

// ============================================================================
// SHARED REQUEST/RESPONSE STRUCTURES
// ============================================================================

/// Standardized response structure for all API endpoints.
///
/// This structure provides a consistent response format for all API endpoints,
/// including success/error status and relevant data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data (if successful)
    pub data: Option<T>,
    /// Error message (if failed)
    pub error: Option<String>,
}

/// Health endpoint payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    /// Chain ids of the bridges served, ascending
    pub chains: Vec<u16>,
}

// ============================================================================
// WARP FILTER HELPERS
// ============================================================================

/// Creates a warp filter that provides access to the bridge map.
pub fn with_bridges(
    bridges: BridgeMap,
) -> impl Filter<Extract = (BridgeMap,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || bridges.clone())
}

/// Creates a warp filter that provides access to the attestation network.
pub fn with_network(
    network: Arc<dyn AttestationNetwork>,
) -> impl Filter<Extract = (Arc<dyn AttestationNetwork>,), Error = std::convert::Infallible> + Clone
{
    warp::any().map(move || network.clone())
}

// ============================================================================
// CUSTOM REJECTION TYPES
// ============================================================================

/// Custom rejection for malformed request fields (bad hex, wrong widths)
#[derive(Debug)]
pub struct InvalidRequest(pub String);

impl warp::reject::Reject for InvalidRequest {}

// ============================================================================
// CORS CONFIGURATION
// ============================================================================

/// Creates a CORS filter based on the configured allowed origins.
fn create_cors_filter(allowed_origins: &[String]) -> warp::cors::Builder {
    let methods = vec![Method::GET, Method::POST, Method::OPTIONS];

    if allowed_origins.contains(&"*".to_string()) {
        warp::cors()
            .allow_any_origin()
            .allow_methods(methods.clone())
            .allow_headers(vec!["content-type"])
    } else {
        let origins: Vec<&str> = allowed_origins.iter().map(|s| s.as_str()).collect();
        warp::cors()
            .allow_origins(origins)
            .allow_methods(methods)
            .allow_headers(vec!["content-type"])
    }
}

// ============================================================================
// REJECTION HANDLER
// ============================================================================

/// Global rejection handler for all API routes.
///
/// # Arguments
///
/// * `rej` - The warp rejection to handle
///
/// # Returns
///
/// A warp reply with an error response
pub async fn handle_rejection(rej: Rejection) -> Result<impl Reply, std::convert::Infallible> {
    let (status, message) = if let Some(err) = rej.find::<InvalidRequest>() {
        (StatusCode::BAD_REQUEST, err.0.clone())
    } else if let Some(err) = rej.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid JSON: {}", err))
    } else if rej.is_not_found() {
        (StatusCode::NOT_FOUND, "Endpoint not found".to_string())
    } else if rej.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        error!("Unhandled rejection: {:?}", rej);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message),
        }),
        status,
    ))
}

// ============================================================================
// API SERVER IMPLEMENTATION
// ============================================================================

/// REST API server for the message bridge service.
///
/// Exposes the current value, emitter registry, and send/receive operations of
/// every configured bridge.
pub struct ApiServer {
    /// API settings (host, port, CORS)
    config: Arc<ApiConfig>,
    /// Bridges by chain id
    bridges: BridgeMap,
    /// Network used to post VAAs before submitting them
    network: Arc<dyn AttestationNetwork>,
}

impl ApiServer {
    /// Creates a new API server.
    ///
    /// # Arguments
    ///
    /// * `config` - API settings
    /// * `bridges` - Bridges to serve, keyed by chain id
    /// * `network` - Attestation network for VAA posting
    pub fn new(
        config: ApiConfig,
        bridges: HashMap<u16, SharedBridge>,
        network: Arc<dyn AttestationNetwork>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            bridges: Arc::new(bridges),
            network,
        }
    }

    /// Starts the API server and begins handling HTTP requests.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Server stopped
    /// * `Err(anyhow::Error)` - Failed to parse the bind address
    pub async fn run(&self) -> Result<()> {
        info!(
            "Starting API server on {}:{}",
            self.config.host, self.config.port
        );

        let routes = self.create_routes();

        let addr: std::net::SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Failed to parse API server address")?;

        warp::serve(routes).run(addr).await;

        Ok(())
    }

    /// Creates all API routes for the server.
    pub(crate) fn create_routes(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone {
        let bridges = self.bridges.clone();
        let network = self.network.clone();

        // Health check endpoint - returns service status and served chains
        let mut chains: Vec<u16> = bridges.keys().copied().collect();
        chains.sort_unstable();
        let health = warp::path("health")
            .and(warp::path::end())
            .and(warp::get())
            .map(move || {
                warp::reply::json(&ApiResponse {
                    success: true,
                    data: Some(HealthStatus {
                        status: "Message bridge service is running".to_string(),
                        chains: chains.clone(),
                    }),
                    error: None,
                })
            });

        // Current value of one bridge
        let value = warp::path!("bridges" / u16 / "value")
            .and(warp::get())
            .and(with_bridges(bridges.clone()))
            .and_then(bridges::get_value_handler);

        // Registry lookup for one emitter
        let emitter_status = warp::path!("bridges" / u16 / "emitters" / u16 / String)
            .and(warp::get())
            .and(with_bridges(bridges.clone()))
            .and_then(bridges::get_emitter_status_handler);

        // Owner-only batch registration
        let register = warp::path!("bridges" / u16 / "emitters")
            .and(warp::post())
            .and(warp::body::json())
            .and(with_bridges(bridges.clone()))
            .and_then(bridges::register_emitters_handler);

        let send = warp::path!("bridges" / u16 / "send")
            .and(warp::post())
            .and(warp::body::json())
            .and(with_bridges(bridges.clone()))
            .and_then(bridges::send_value_handler);

        let receive = warp::path!("bridges" / u16 / "receive")
            .and(warp::post())
            .and(warp::body::json())
            .and(with_bridges(bridges))
            .and(with_network(network))
            .and_then(bridges::receive_value_handler);

        health
            .or(value)
            .or(emitter_status)
            .or(register)
            .or(send)
            .or(receive)
            .with(create_cors_filter(&self.config.cors_origins))
            .recover(handle_rejection)
    }

    /// Public method for testing - exposes routes for integration tests
    pub fn test_routes(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone {
        self.create_routes()
    }
}
