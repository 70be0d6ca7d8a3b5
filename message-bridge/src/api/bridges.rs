//! Per-bridge API handlers.
//!
//! Every handler resolves the bridge from the `:chain` path segment, takes its lock
//! for the duration of one operation, and reports bridge errors in the response
//! envelope together with their class.

use std::sync::Arc;

use bridge_common::{parse_hex_address, PayloadFormat};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::generic::{ApiResponse, BridgeMap, InvalidRequest};
use crate::adapter::SharedBridge;
use crate::error::BridgeError;
use crate::network::AttestationNetwork;
use crate::registry::EmitterRegistration;
use crate::relay;
use crate::state::ReceivedMessage;

// ============================================================================
// REQUEST/RESPONSE STRUCTURES
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct EmitterEntry {
    pub chain_id: u16,
    /// Hex address, native width for `chain_id` or 32-byte canonical
    pub address: String,
    pub payload_format: PayloadFormat,
}

#[derive(Debug, Deserialize)]
pub struct RegisterEmittersRequest {
    /// Caller identity, hex in the host's native width
    pub caller: String,
    pub emitters: Vec<EmitterEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SendValueRequest {
    pub caller: String,
    pub destination_chain_id: u16,
    pub value: u128,
    #[serde(default)]
    pub fee: u128,
}

#[derive(Debug, Deserialize)]
pub struct ReceiveValueRequest {
    /// Raw VAA, hex encoded
    pub vaa: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValueResponse {
    pub chain_id: u16,
    pub value: u128,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmitterStatusResponse {
    pub chain_id: u16,
    pub emitter_chain: u16,
    pub address: String,
    pub registered: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendValueResponse {
    pub nonce: u32,
    pub sequence: u64,
    pub destination_chain_id: u16,
    /// Encoded payload, hex
    pub payload: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReceiveValueResponse {
    /// False when the message had already been applied; the fields then come from
    /// the stored replay record.
    pub applied: bool,
    pub emitter_chain: u16,
    pub sequence: u64,
    pub value: u128,
    pub batch_id: u32,
}

// ============================================================================
// HELPERS
// ============================================================================

fn failure<T: Serialize>(message: String) -> warp::reply::Json {
    warp::reply::json(&ApiResponse::<T> {
        success: false,
        data: None,
        error: Some(message),
    })
}

fn success<T: Serialize>(data: T) -> warp::reply::Json {
    warp::reply::json(&ApiResponse {
        success: true,
        data: Some(data),
        error: None,
    })
}

fn bridge_failure<T: Serialize>(chain_id: u16, e: &BridgeError) -> warp::reply::Json {
    warn!("Bridge {} rejected request: {}", chain_id, e);
    failure::<T>(format!("{:?}: {}", e.class(), e))
}

fn lookup(bridges: &BridgeMap, chain_id: u16) -> Option<SharedBridge> {
    bridges.get(&chain_id).cloned()
}

fn unknown_chain<T: Serialize>(chain_id: u16) -> warp::reply::Json {
    failure::<T>(format!("No bridge configured for chain {}", chain_id))
}

fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>, warp::Rejection> {
    hex::decode(value.strip_prefix("0x").unwrap_or(value)).map_err(|e| {
        warp::reject::custom(InvalidRequest(format!("Invalid hex in '{}': {}", field, e)))
    })
}

// ============================================================================
// HANDLERS
// ============================================================================

/// Handler for `GET /bridges/:chain/value`.
pub async fn get_value_handler(
    chain_id: u16,
    bridges: BridgeMap,
) -> Result<impl warp::Reply, warp::Rejection> {
    let Some(bridge) = lookup(&bridges, chain_id) else {
        return Ok(unknown_chain::<ValueResponse>(chain_id));
    };
    let bridge = bridge.lock().await;
    Ok(match bridge.get_current_value() {
        Ok(value) => success(ValueResponse { chain_id, value }),
        Err(e) => bridge_failure::<ValueResponse>(chain_id, &e),
    })
}

/// Handler for `GET /bridges/:chain/emitters/:emitter_chain/:address`.
pub async fn get_emitter_status_handler(
    chain_id: u16,
    emitter_chain: u16,
    address: String,
    bridges: BridgeMap,
) -> Result<impl warp::Reply, warp::Rejection> {
    let Some(bridge) = lookup(&bridges, chain_id) else {
        return Ok(unknown_chain::<EmitterStatusResponse>(chain_id));
    };
    let native = decode_hex("address", &address)?;
    let bridge = bridge.lock().await;
    Ok(match bridge.is_emitter_registered(emitter_chain, &native) {
        Ok(registered) => success(EmitterStatusResponse {
            chain_id,
            emitter_chain,
            address,
            registered,
        }),
        Err(e) => bridge_failure::<EmitterStatusResponse>(chain_id, &e),
    })
}

/// Handler for `POST /bridges/:chain/emitters`.
///
/// The whole batch is applied or none of it is.
pub async fn register_emitters_handler(
    chain_id: u16,
    request: RegisterEmittersRequest,
    bridges: BridgeMap,
) -> Result<impl warp::Reply, warp::Rejection> {
    let Some(bridge) = lookup(&bridges, chain_id) else {
        return Ok(unknown_chain::<usize>(chain_id));
    };

    let registrations = request
        .emitters
        .iter()
        .map(|entry| {
            decode_hex("address", &entry.address).map(|address| {
                EmitterRegistration::new(entry.chain_id, address, entry.payload_format)
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut bridge = bridge.lock().await;
    let caller = match parse_hex_address(&request.caller, bridge.kind().address_kind()) {
        Ok(caller) => caller,
        Err(e) => return Ok(bridge_failure::<usize>(chain_id, &BridgeError::from(e))),
    };

    Ok(match bridge.register_emitters(&caller, &registrations) {
        Ok(()) => {
            info!(
                "Registered {} emitters on chain {} via API",
                registrations.len(),
                chain_id
            );
            success(registrations.len())
        }
        Err(e) => bridge_failure::<usize>(chain_id, &e),
    })
}

/// Handler for `POST /bridges/:chain/send`.
pub async fn send_value_handler(
    chain_id: u16,
    request: SendValueRequest,
    bridges: BridgeMap,
) -> Result<impl warp::Reply, warp::Rejection> {
    let Some(bridge) = lookup(&bridges, chain_id) else {
        return Ok(unknown_chain::<SendValueResponse>(chain_id));
    };

    let mut bridge = bridge.lock().await;
    let caller = match parse_hex_address(&request.caller, bridge.kind().address_kind()) {
        Ok(caller) => caller,
        Err(e) => return Ok(bridge_failure::<SendValueResponse>(chain_id, &BridgeError::from(e))),
    };

    Ok(
        match bridge.send_value(
            &caller,
            request.destination_chain_id,
            request.value,
            request.fee,
        ) {
            Ok(outbound) => success(SendValueResponse {
                nonce: outbound.nonce,
                sequence: outbound.sequence,
                destination_chain_id: outbound.destination_chain_id,
                payload: format!("0x{}", hex::encode(&outbound.payload)),
            }),
            Err(e) => bridge_failure::<SendValueResponse>(chain_id, &e),
        },
    )
}

/// Handler for `POST /bridges/:chain/receive`.
///
/// Posts the VAA first when the host requires it, like the relay does. A replayed
/// VAA is reported as a success with `applied: false`.
pub async fn receive_value_handler(
    chain_id: u16,
    request: ReceiveValueRequest,
    bridges: BridgeMap,
    network: Arc<dyn AttestationNetwork>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let Some(bridge) = lookup(&bridges, chain_id) else {
        return Ok(unknown_chain::<ReceiveValueResponse>(chain_id));
    };
    let raw = decode_hex("vaa", &request.vaa)?;

    Ok(match relay::deliver(&bridge, network.as_ref(), &raw).await {
        Ok(message) => success(receive_response(true, &message)),
        Err(BridgeError::AlreadyProcessed {
            chain_id: emitter_chain,
            sequence,
        }) => {
            let record = bridge.lock().await.received_message(emitter_chain, sequence);
            match record {
                Ok(Some(message)) => {
                    info!(
                        "Chain {} already applied message {} from chain {}",
                        chain_id, sequence, emitter_chain
                    );
                    success(receive_response(false, &message))
                }
                Ok(None) => bridge_failure::<ReceiveValueResponse>(
                    chain_id,
                    &BridgeError::AlreadyProcessed {
                        chain_id: emitter_chain,
                        sequence,
                    },
                ),
                Err(e) => bridge_failure::<ReceiveValueResponse>(chain_id, &e),
            }
        }
        Err(e) => bridge_failure::<ReceiveValueResponse>(chain_id, &e),
    })
}

fn receive_response(applied: bool, message: &ReceivedMessage) -> ReceiveValueResponse {
    ReceiveValueResponse {
        applied,
        emitter_chain: message.emitter_chain,
        sequence: message.sequence,
        value: message.value,
        batch_id: message.batch_id,
    }
}
