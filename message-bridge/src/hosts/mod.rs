//! Host storage models.
//!
//! - [`evm`]: word slots and keccak mapping keys
//! - [`svm`]: Borsh accounts at program-derived addresses
//! - [`aztec`]: public storage plus a nullifier set

pub mod aztec;
pub mod evm;
pub mod svm;

pub use aztec::AztecStorage;
pub use evm::EvmStorage;
pub use svm::SvmStorage;
