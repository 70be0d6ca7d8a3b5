//! Test module organization
//!
//! This module re-exports test helpers for use in test files.

mod helpers;

#[allow(unused_imports)]
pub use helpers::{
    aztec_bridge, build_vaa, default18_payload, evm_bridge, initialized, register_remote,
    svm_bridge, test_network, vector_vaa, DUMMY_AZTEC_CONTRACT, DUMMY_EVM_CONTRACT,
    DUMMY_OWNER, DUMMY_REMOTE_EMITTER, DUMMY_SVM_PROGRAM_ID, DUMMY_TIMESTAMP, DUMMY_VALUE,
    OTHER_CALLER, VECTOR_BODY_HASH_HEX, VECTOR_SEQUENCE,
};
