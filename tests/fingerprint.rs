use http_lifecycle::fingerprint::FingerprintGenerator;
use http_lifecycle::RequestDescriptor;
use serde_json::json;

#[test]
fn test_fingerprint_is_hex_sha256() {
    let fp = FingerprintGenerator::new().fingerprint(&RequestDescriptor::get("/users"));
    assert_eq!(fp.len(), 64);
    assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_key_order_does_not_matter() {
    let gen = FingerprintGenerator::new();
    let a = RequestDescriptor::post("/report")
        .with_params(json!({"page": 1, "size": 20}))
        .with_body(json!({"filter": {"x": 1, "y": [1, 2]}, "sort": "asc"}));
    let b = RequestDescriptor::post("/report")
        .with_params(json!({"size": 20, "page": 1}))
        .with_body(json!({"sort": "asc", "filter": {"y": [1, 2], "x": 1}}));
    assert_eq!(gen.fingerprint(&a), gen.fingerprint(&b));
}

#[test]
fn test_array_order_matters() {
    let gen = FingerprintGenerator::new();
    let a = RequestDescriptor::post("/x").with_body(json!({"ids": [1, 2]}));
    let b = RequestDescriptor::post("/x").with_body(json!({"ids": [2, 1]}));
    assert_ne!(gen.fingerprint(&a), gen.fingerprint(&b));
}

#[test]
fn test_empty_shapes_are_equivalent() {
    let gen = FingerprintGenerator::new();
    let bare = gen.fingerprint(&RequestDescriptor::get("/x"));
    assert_eq!(
        bare,
        gen.fingerprint(&RequestDescriptor::get("/x").with_params(json!({})))
    );
    assert_eq!(
        bare,
        gen.fingerprint(&RequestDescriptor::get("/x").with_body(json!("")))
    );
    assert_eq!(
        bare,
        gen.fingerprint(&RequestDescriptor::get("/x").with_body(json!(null)))
    );
}

#[test]
fn test_url_method_and_secret_distinguish() {
    let gen = FingerprintGenerator::new();
    let base = gen.fingerprint(&RequestDescriptor::get("/x"));
    assert_ne!(base, gen.fingerprint(&RequestDescriptor::get("/y")));
    assert_ne!(base, gen.fingerprint(&RequestDescriptor::delete("/x")));
    assert_eq!(base, gen.fingerprint(&RequestDescriptor::new("GET", "/x")));

    let other = FingerprintGenerator::with_secret("another-secret").unwrap();
    assert_ne!(base, other.fingerprint(&RequestDescriptor::get("/x")));
}

#[test]
fn test_extra_fields_only_count_when_configured() {
    let gen = FingerprintGenerator::new();
    let a = RequestDescriptor::get("/x").with_field("tenant", json!("acme"));
    let b = RequestDescriptor::get("/x").with_field("tenant", json!("globex"));
    assert_eq!(gen.fingerprint(&a), gen.fingerprint(&b));

    gen.set_identity_fields(vec!["tenant".into()]);
    assert_ne!(gen.fingerprint(&a), gen.fingerprint(&b));
}
