//! Stable hashing of key tuples.
//!
//! Bucket assignment must not depend on the process (std's `RandomState`
//! does), so callers that fan work out across threads get the same
//! partitions on every run.

use blake3::Hasher;

use crate::value::Value;

/// Hash a key tuple to a stable 64-bit value.
pub fn hash_key(values: &[Value]) -> u64 {
    let mut h = Hasher::new();
    for v in values {
        hash_value(v, &mut h);
    }
    let out = h.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&out.as_bytes()[..8]);
    u64::from_le_bytes(head)
}

fn hash_value(value: &Value, hasher: &mut Hasher) {
    // Type tag first so 1 and "1" land apart.
    match value {
        Value::Absent => {
            hasher.update(&[0]);
        }
        Value::Bool(b) => {
            hasher.update(&[1, *b as u8]);
        }
        Value::Int(i) => {
            hasher.update(&[2]);
            hasher.update(&i.to_le_bytes());
        }
        Value::Real(r) => {
            let r = if *r == 0.0 { 0.0f64 } else { *r };
            hasher.update(&[3]);
            hasher.update(&r.to_bits().to_le_bytes());
        }
        Value::Text(s) => {
            hasher.update(&[4]);
            hasher.update(&(s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }
        Value::Code(c) => {
            hasher.update(&[5]);
            hasher.update(&c.to_le_bytes());
        }
    }
}
