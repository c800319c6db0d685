//! Fuzz target for session key storage under injected failures
//!
//! Drives a ChaoticKeyStore over MemoryKeyStore with arbitrary operations.
//!
//! # Invariants
//!
//! - Storage errors surface as Result::Err, never panics
//! - A failed insert never writes
//! - The first successful insert for a peer is the key every later read sees

#![no_main]

use std::collections::HashMap;

use arbitrary::Arbitrary;
use hushwire_core::{
    PeerId, SessionKeyStore,
    storage::{ChaoticKeyStore, MemoryKeyStore},
};
use hushwire_crypto::SessionKey;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Scenario {
    /// Seed for deterministic failures
    chaos_seed: u64,
    /// Failure rate 0-9 maps to 0%-90%
    failure_rate_tenth: u8,
    operations: Vec<Operation>,
}

#[derive(Debug, Arbitrary)]
enum Operation {
    Put { peer: i8, fill: u8 },
    Get { peer: i8 },
    Peers,
}

fuzz_target!(|scenario: Scenario| {
    let failure_rate = f64::from(scenario.failure_rate_tenth % 10) / 10.0;
    let store =
        ChaoticKeyStore::with_seed(MemoryKeyStore::new(), failure_rate, scenario.chaos_seed);
    let mut model: HashMap<i64, u8> = HashMap::new();

    for op in scenario.operations {
        match op {
            Operation::Put { peer, fill } => {
                let peer = i64::from(peer);
                match store.put_if_absent(PeerId::new(peer), &SessionKey::new([fill; 32])) {
                    Ok(true) => assert!(model.insert(peer, fill).is_none()),
                    Ok(false) => assert!(model.contains_key(&peer)),
                    Err(_) => {},
                }
            },
            Operation::Get { peer } => {
                let peer = i64::from(peer);
                if let Ok(stored) = store.get(PeerId::new(peer)) {
                    let expected = model.get(&peer).map(|fill| SessionKey::new([*fill; 32]));
                    assert_eq!(stored, expected);
                }
            },
            Operation::Peers => {
                if let Ok(peers) = store.peers() {
                    assert_eq!(peers.len(), model.len());
                }
            },
        }
    }

    assert_eq!(store.inner().len(), model.len());
});
