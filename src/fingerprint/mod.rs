//! 请求指纹：对请求描述进行规范化并生成稳定标识。
//!
//! # Request Fingerprinting
//!
//! Every lifecycle registry keys its state by a request *fingerprint*: the
//! HMAC-SHA256 of a canonical JSON projection of the descriptor's identity
//! fields.
//!
//! The projection always contains `url`, `method`, `data` and `params`, plus
//! any configured extra field names whose value in
//! [`RequestDescriptor::extra`] is set. `null`, `false`, `0` and `""` count
//! as unset, so they fingerprint like an absent field. The fixed fields win
//! over extra fields of the same name.
//!
//! ```rust
//! use http_lifecycle::fingerprint::FingerprintGenerator;
//! use http_lifecycle::types::RequestDescriptor;
//! use serde_json::json;
//!
//! let fp = FingerprintGenerator::new();
//! let a = RequestDescriptor::post("/report").with_body(json!({"a": 1, "b": 2}));
//! let b = RequestDescriptor::post("/report").with_body(json!("{\"b\":2,\"a\":1}"));
//! assert_eq!(fp.fingerprint(&a), fp.fingerprint(&b));
//! ```

mod canonical;

pub use canonical::{normalize_body, to_canonical_json};

use crate::types::RequestDescriptor;
use crate::{Error, ErrorContext, Result};
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;
use std::sync::RwLock;

type HmacSha256 = Hmac<Sha256>;

/// Built-in HMAC key. Fingerprints are identities, not secrets; override it with
/// [`FingerprintGenerator::with_secret`] to keep fingerprints unlinkable across
/// deployments.
const DEFAULT_SECRET: &str = "e4f5b8c2f6c2c9931f8e6a22267b9b5a";

pub struct FingerprintGenerator {
    mac: HmacSha256,
    identity_fields: RwLock<Vec<String>>,
}

impl FingerprintGenerator {
    pub fn new() -> Self {
        let mac = HmacSha256::new_from_slice(DEFAULT_SECRET.as_bytes())
            .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts keys of any length"));
        Self {
            mac,
            identity_fields: RwLock::new(Vec::new()),
        }
    }

    pub fn with_secret(secret: impl AsRef<[u8]>) -> Result<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(Error::configuration_with_context(
                "fingerprint secret must not be empty",
                ErrorContext::new()
                    .with_field_path("fingerprint.secret")
                    .with_source("fingerprint_generator"),
            ));
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|e| {
            Error::configuration_with_context(
                "invalid fingerprint secret",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("fingerprint_generator"),
            )
        })?;
        Ok(Self {
            mac,
            identity_fields: RwLock::new(Vec::new()),
        })
    }

    pub fn with_identity_fields(self, fields: Vec<String>) -> Self {
        self.set_identity_fields(fields);
        self
    }

    /// Replace the list of extra descriptor fields that participate in identity.
    pub fn set_identity_fields(&self, fields: Vec<String>) {
        let mut guard = self
            .identity_fields
            .write()
            .unwrap_or_else(|e| e.into_inner());
        *guard = fields;
    }

    pub fn identity_fields(&self) -> Vec<String> {
        self.identity_fields
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Canonical identity projection of a descriptor, before hashing.
    pub fn identity(&self, desc: &RequestDescriptor) -> Value {
        let mut key = Map::new();
        {
            let fields = self
                .identity_fields
                .read()
                .unwrap_or_else(|e| e.into_inner());
            for name in fields.iter() {
                if let Some(v) = desc.extra.get(name).filter(|v| is_set(v)) {
                    key.insert(name.clone(), v.clone());
                }
            }
        }
        key.insert("url".into(), Value::String(desc.url.clone()));
        key.insert("method".into(), Value::String(desc.method.to_lowercase()));
        key.insert("data".into(), normalize_body(desc.data.as_ref()));
        let params = match &desc.params {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(p) => p.clone(),
        };
        key.insert("params".into(), params);
        Value::Object(key)
    }

    /// Compute the fingerprint of a descriptor. Pure; never fails.
    pub fn fingerprint(&self, desc: &RequestDescriptor) -> String {
        let canonical = to_canonical_json(&self.identity(desc));
        let mut mac = self.mac.clone();
        mac.update(canonical.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Fingerprint attached by the pipeline when present, computed otherwise.
    pub fn identify(&self, desc: &RequestDescriptor) -> String {
        match desc.fingerprint() {
            Some(fp) => fp.to_string(),
            None => self.fingerprint(desc),
        }
    }
}

impl Default for FingerprintGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether an extra field value takes part in identity.
fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let fp = FingerprintGenerator::new();
        let id = fp.fingerprint(&RequestDescriptor::get("/users"));
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let fp = FingerprintGenerator::new();
        let a = RequestDescriptor::get("/users")
            .with_params(json!({"id": 1, "page": {"size": 10, "n": 2}}));
        let b = RequestDescriptor::get("/users")
            .with_params(json!({"page": {"n": 2, "size": 10}, "id": 1}));
        assert_eq!(fp.fingerprint(&a), fp.fingerprint(&b));
    }

    #[test]
    fn test_string_body_equals_structured_body() {
        let fp = FingerprintGenerator::new();
        let a = RequestDescriptor::post("/report").with_body(json!({"from": "2024", "to": "2025"}));
        let b = RequestDescriptor::post("/report").with_body(json!("{\"to\":\"2025\",\"from\":\"2024\"}"));
        assert_eq!(fp.fingerprint(&a), fp.fingerprint(&b));
    }

    #[test]
    fn test_method_case_and_missing_fields() {
        let fp = FingerprintGenerator::new();
        let upper = RequestDescriptor::new("GET", "/users");
        let lower = RequestDescriptor::get("/users")
            .with_params(json!({}))
            .with_body(json!(""));
        assert_eq!(fp.fingerprint(&upper), fp.fingerprint(&lower));
    }

    #[test]
    fn test_different_requests_differ() {
        let fp = FingerprintGenerator::new();
        let a = RequestDescriptor::get("/users").with_params(json!({"id": 1}));
        let b = RequestDescriptor::get("/users").with_params(json!({"id": 2}));
        let c = RequestDescriptor::post("/users").with_params(json!({"id": 1}));
        assert_ne!(fp.fingerprint(&a), fp.fingerprint(&b));
        assert_ne!(fp.fingerprint(&a), fp.fingerprint(&c));
    }

    #[test]
    fn test_array_order_is_significant() {
        let fp = FingerprintGenerator::new();
        let a = RequestDescriptor::post("/batch").with_body(json!([1, 2]));
        let b = RequestDescriptor::post("/batch").with_body(json!([2, 1]));
        assert_ne!(fp.fingerprint(&a), fp.fingerprint(&b));
    }

    #[test]
    fn test_identity_fields() {
        let fp = FingerprintGenerator::new();
        let a = RequestDescriptor::get("/users").with_field("tenant", json!("acme"));
        let b = RequestDescriptor::get("/users").with_field("tenant", json!("globex"));
        // not configured yet: extra fields are ignored
        assert_eq!(fp.fingerprint(&a), fp.fingerprint(&b));

        fp.set_identity_fields(vec!["tenant".into()]);
        assert_ne!(fp.fingerprint(&a), fp.fingerprint(&b));

        // unset or missing configured fields do not participate
        let d = RequestDescriptor::get("/users");
        for unset in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            let c = RequestDescriptor::get("/users").with_field("tenant", unset);
            assert_eq!(fp.fingerprint(&c), fp.fingerprint(&d));
        }

        // empty containers and `true` are values
        for set in [json!(true), json!(1), json!([]), json!({})] {
            let c = RequestDescriptor::get("/users").with_field("tenant", set);
            assert_ne!(fp.fingerprint(&c), fp.fingerprint(&d));
        }
    }

    #[test]
    fn test_fixed_fields_win_over_extra() {
        let fp = FingerprintGenerator::new().with_identity_fields(vec!["url".into()]);
        let a = RequestDescriptor::get("/users").with_field("url", json!("/other"));
        let b = RequestDescriptor::get("/users");
        assert_eq!(fp.fingerprint(&a), fp.fingerprint(&b));
    }

    #[test]
    fn test_secret_changes_fingerprint() {
        let default = FingerprintGenerator::new();
        let custom = FingerprintGenerator::with_secret("another-secret").unwrap();
        let desc = RequestDescriptor::get("/users");
        assert_ne!(default.fingerprint(&desc), custom.fingerprint(&desc));
        assert!(FingerprintGenerator::with_secret("").is_err());
    }
}
