//! Test fixtures and helpers.
//!
//! A fixture is one controller (an Ed25519 key) with its own temporary
//! event store. It builds small signed events and files them the way a
//! verifier would: body, first-seen datetime, signatures, KEL and FEL.

use std::sync::atomic::{AtomicU64, Ordering};

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use keri_db::{dg_key, now_iso8601, sn_key, Baser, EnvConfig, Ordinal};
use serde_json::json;

static SEEDS: AtomicU64 = AtomicU64::new(1);

/// A signed event ready to be stored.
#[derive(Debug, Clone)]
pub struct TestEvent {
    pub sn: Ordinal,
    /// Serialized body.
    pub raw: Vec<u8>,
    /// Digest of `raw`.
    pub dig: String,
    /// Hex signature over `raw`.
    pub sig: String,
}

/// A controller with a temporary store.
pub struct TestFixture {
    pub signer: SigningKey,
    pub pre: String,
    pub db: Baser,
}

impl TestFixture {
    /// Create a fixture with a fresh key and an LMDB store.
    pub fn new() -> Self {
        let n = SEEDS.fetch_add(1, Ordering::Relaxed);
        Self::with_seed(*blake3::hash(&n.to_le_bytes()).as_bytes())
    }

    /// Create with a deterministic key from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::with_config(seed, EnvConfig::default())
    }

    /// Create with a deterministic key and a specific store configuration.
    pub fn with_config(seed: [u8; 32], config: EnvConfig) -> Self {
        let signer = SigningKey::from_bytes(&seed);
        let pre = prefix(&signer.verifying_key());
        let db = Baser::open(format!("fixture_{}", &pre[1..9]), true, config)
            .unwrap_or_else(|e| panic!("temporary store: {e}"));
        Self { signer, pre, db }
    }

    /// Build event `sn`, chained to `prior` by digest.
    pub fn make_event(&self, sn: Ordinal, prior: Option<&str>) -> TestEvent {
        let ilk = if sn == 0 { "icp" } else { "rot" };
        let body = json!({
            "v": "KERI10JSON000000_",
            "t": ilk,
            "i": self.pre,
            "s": format!("{:x}", sn),
            "p": prior.unwrap_or(""),
            "k": [hex::encode(self.signer.verifying_key().to_bytes())],
        });
        let raw = serde_json::to_vec(&body).unwrap_or_default();
        let dig = digest(&raw);
        let sig = hex::encode(self.signer.sign(&raw).to_bytes());
        TestEvent { sn, raw, dig, sig }
    }

    /// Build a chain of `count` events starting at sn 0.
    pub fn make_chain(&self, count: usize) -> Vec<TestEvent> {
        let mut events: Vec<TestEvent> = Vec::with_capacity(count);
        for sn in 0..count as Ordinal {
            let prior = events.last().map(|e| e.dig.clone());
            events.push(self.make_event(sn, prior.as_deref()));
        }
        events
    }

    /// File an accepted event. Returns its first-seen ordinal.
    pub fn store_event(&self, event: &TestEvent) -> keri_db::Result<Ordinal> {
        let key = dg_key(&self.pre, &event.dig);
        self.db.evts().put(&key, &event.raw)?;
        self.db.dtss().put(&key, now_iso8601())?;
        self.db.sigs().add(&key, &event.sig)?;
        self.db.kels().add(sn_key(&self.pre, event.sn), &event.dig)?;
        self.db.append_fe(&self.pre, &event.dig)
    }

    /// Check a stored signature against the stored body.
    pub fn verify_stored(&self, event: &TestEvent) -> bool {
        let key = dg_key(&self.pre, &event.dig);
        let Ok(Some(raw)) = self.db.evts().get(&key) else {
            return false;
        };
        let Ok(sigs) = self.db.sigs().get(&key) else {
            return false;
        };
        let vk = self.signer.verifying_key();
        sigs.iter().any(|sig| verify_hex(&vk, &raw, sig))
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier prefix for a key: `B` plus the hex public key.
pub fn prefix(vk: &VerifyingKey) -> String {
    format!("B{}", hex::encode(vk.to_bytes()))
}

/// Digest of serialized bytes: `E` plus the hex Blake3 hash.
pub fn digest(raw: &[u8]) -> String {
    format!("E{}", blake3::hash(raw).to_hex())
}

fn verify_hex(vk: &VerifyingKey, msg: &[u8], sig: &[u8]) -> bool {
    let Ok(bytes) = hex::decode(sig) else {
        return false;
    };
    let Ok(bytes) = <[u8; 64]>::try_from(bytes.as_slice()) else {
        return false;
    };
    vk.verify(msg, &Signature::from_bytes(&bytes)).is_ok()
}

/// Create multiple fixtures with distinct deterministic keys.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[31] = 0xa5;
            TestFixture::with_seed(seed)
        })
        .collect()
}
