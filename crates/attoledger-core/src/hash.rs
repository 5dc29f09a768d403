use crate::Hash32;
use sha2::{Digest, Sha256};

/// Compute a deterministic SHA-256 hash of a byte slice.
pub fn sha256(data: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&result);
    Hash32(bytes)
}

/// Compute a domain-separated SHA-256 hash: `H(domain || data)`.
pub fn sha256_domain(domain: &[u8], data: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(data);
    let result = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&result);
    Hash32(bytes)
}

// =============================================================================
// Domain separation (v1)
// =============================================================================

/// Domain separation tag for deriving escrow order addresses.
pub const ORDER_ADDRESS_DOMAIN_V1: &[u8] = b"ATTOLEDGER_ORDER_ADDRESS_V1";

/// Domain separation tag for deriving addresses from labels.
pub const ADDRESS_LABEL_DOMAIN_V1: &[u8] = b"ATTOLEDGER_ADDRESS_LABEL_V1";

/// Domain separation tag for hash-chained event log records.
pub const EVENT_RECORD_DOMAIN_V1: &[u8] = b"ATTOLEDGER_EVENT_RECORD_V1";
