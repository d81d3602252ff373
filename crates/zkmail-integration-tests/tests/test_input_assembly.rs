//! # Input Assembly Against Signed Fixtures
//!
//! Runs the DKIM parser and the input assembler over real signed messages
//! under `data/` and checks the record the circuit would receive: digest
//! commitments, located fields, limb encoding, and every failure path that
//! surfaces before proving.

use std::path::PathBuf;

use proptest::prelude::*;
use zkmail_core::{
    weighted_digest_str, CircuitProfile, CommitmentMode, ExtractionError, FieldDigest,
    ProfileRegistry,
};
use zkmail_inputs::{
    AssemblyError, DkimParser, EmailParser, InputAssembler, KeyStore, ParseError, UsernameSource,
};

const TO_ADDRESS: &str = "deneme.test581@gmail.com";
const USERNAME: &str = "denemedeneme581";

fn data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data").join(name)
}

fn fixture(name: &str) -> Vec<u8> {
    std::fs::read(data(name)).unwrap()
}

fn keys() -> KeyStore {
    KeyStore::from_file(&data("keys.yaml")).unwrap()
}

fn assembler() -> InputAssembler<DkimParser<KeyStore>> {
    InputAssembler::new(ProfileRegistry::builtin(), DkimParser::new(keys()))
}

// -- Digest commitments ------------------------------------------------------

#[test]
fn matching_username_hash_equals_digest_of_embedded_username() {
    let record = assembler()
        .assemble(
            &fixture("instagram-valid.eml"),
            "instagram",
            TO_ADDRESS,
            &UsernameSource::DeriveFromMessage,
        )
        .unwrap();

    assert_eq!(
        record.expected_username_hash(),
        Some(&weighted_digest_str(USERNAME))
    );
    assert_eq!(record.expected_username_hash().unwrap().to_hex(), "0x284a");
    assert_eq!(record.expected_to_hash(), Some(&weighted_digest_str(TO_ADDRESS)));
    assert_eq!(record.expected_to_hash().unwrap().to_hex(), "0x6b69");
}

#[test]
fn supplied_username_matching_message_gives_same_record() {
    let asm = assembler();
    let raw = fixture("instagram-valid.eml");
    let derived = asm
        .assemble(&raw, "instagram", TO_ADDRESS, &UsernameSource::DeriveFromMessage)
        .unwrap();
    let supplied = asm
        .assemble(
            &raw,
            "instagram",
            TO_ADDRESS,
            &UsernameSource::Supplied(USERNAME.to_string()),
        )
        .unwrap();
    assert_eq!(derived, supplied);
}

#[test]
fn wrong_supplied_username_is_committed_verbatim() {
    let record = assembler()
        .assemble(
            &fixture("instagram-valid.eml"),
            "instagram",
            TO_ADDRESS,
            &UsernameSource::Supplied("wrongusername123".to_string()),
        )
        .unwrap();
    assert_eq!(
        record.expected_username_hash(),
        Some(&weighted_digest_str("wrongusername123"))
    );
}

#[test]
fn footer_rule_derives_username_when_greeting_absent() {
    let asm = assembler();
    let raw = fixture("instagram-footer-only.eml");
    let (username, rule) = asm.derive_username(&raw).unwrap();
    assert_eq!(username, USERNAME);
    assert_eq!(rule.to_string(), "footer");

    let record = asm
        .assemble(&raw, "instagram", TO_ADDRESS, &UsernameSource::DeriveFromMessage)
        .unwrap();
    assert_eq!(
        record.expected_username_hash(),
        Some(&weighted_digest_str(USERNAME))
    );
}

#[test]
fn greeting_wins_over_footer_after_quoted_printable_decoding() {
    let (username, rule) = assembler()
        .derive_username(&fixture("instagram-valid.eml"))
        .unwrap();
    assert_eq!(username, USERNAME);
    assert_eq!(rule.to_string(), "greeting");
}

#[test]
fn no_pattern_and_no_supplied_username_is_extraction_error() {
    let err = assembler()
        .assemble(
            &fixture("instagram-no-username.eml"),
            "instagram",
            TO_ADDRESS,
            &UsernameSource::DeriveFromMessage,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        AssemblyError::Extraction(ExtractionError::NoPatternMatched { .. })
    ));
}

#[test]
fn supplied_username_bypasses_extraction() {
    let record = assembler()
        .assemble(
            &fixture("instagram-no-username.eml"),
            "instagram",
            TO_ADDRESS,
            &UsernameSource::Supplied(USERNAME.to_string()),
        )
        .unwrap();
    assert!(record.expected_username_hash().is_some());
}

#[test]
fn to_hash_is_computed_from_caller_address_not_message() {
    let record = assembler()
        .assemble(
            &fixture("instagram-valid.eml"),
            "instagram",
            "someone.else@example.com",
            &UsernameSource::DeriveFromMessage,
        )
        .unwrap();
    let expected: &FieldDigest = record.expected_to_hash().unwrap();
    assert_eq!(expected, &weighted_digest_str("someone.else@example.com"));
    assert_ne!(expected, &weighted_digest_str(TO_ADDRESS));
}

// -- Parser output -----------------------------------------------------------

#[test]
fn parser_locates_fields_in_signed_header() {
    let parser = DkimParser::new(keys());
    let base = parser
        .parse(&fixture("instagram-valid.eml"), &CircuitProfile::instagram())
        .unwrap();

    let header = base.header.as_slice();
    assert!(header.len() <= 576);
    assert_eq!(base.header.capacity(), 576);
    assert_eq!(base.body.capacity(), 16384);
    assert!(base.header.storage[header.len()..].iter().all(|&b| b == 0));

    assert_eq!(base.to_address().unwrap(), TO_ADDRESS.as_bytes());
    assert_eq!(
        base.from_address().unwrap(),
        b"security@mail.instagram.com".as_slice()
    );

    let dkim = base.dkim_header_sequence.slice(header).unwrap();
    assert!(dkim.starts_with(b"dkim-signature:"));
    assert_eq!(base.dkim_header_sequence.end(), header.len());
    assert!(header[..base.body_hash_index].ends_with(b"bh="));

    assert_eq!(base.pubkey.modulus.len(), 18);
    assert_eq!(base.pubkey.redc.len(), 18);
    assert_eq!(base.signature.len(), 18);
    assert!(base.pubkey.modulus.iter().all(|l| l.starts_with("0x")));
}

#[test]
fn bare_lf_message_parses_to_same_record() {
    let crlf = fixture("instagram-valid.eml");
    let lf: Vec<u8> = String::from_utf8(crlf.clone())
        .unwrap()
        .replace("\r\n", "\n")
        .into_bytes();
    let asm = assembler();
    let a = asm
        .assemble(&crlf, "instagram", TO_ADDRESS, &UsernameSource::DeriveFromMessage)
        .unwrap();
    let b = asm
        .assemble(&lf, "instagram", TO_ADDRESS, &UsernameSource::DeriveFromMessage)
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn tampered_body_is_parse_error() {
    let raw = String::from_utf8(fixture("instagram-valid.eml"))
        .unwrap()
        .replace("Merhaba denemedeneme581,", "Merhaba denemedeneme582,");
    let err = assembler()
        .assemble(
            raw.as_bytes(),
            "instagram",
            TO_ADDRESS,
            &UsernameSource::DeriveFromMessage,
        )
        .unwrap_err();
    assert!(matches!(err, AssemblyError::Parse(ParseError::BodyHashMismatch)));
}

#[test]
fn unknown_signing_key_is_parse_error() {
    let asm = InputAssembler::new(ProfileRegistry::builtin(), DkimParser::new(KeyStore::new()));
    let err = asm
        .assemble(
            &fixture("instagram-valid.eml"),
            "instagram",
            TO_ADDRESS,
            &UsernameSource::DeriveFromMessage,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        AssemblyError::Parse(ParseError::UnknownPublicKey { ref domain, ref selector })
            if domain == "mail.instagram.com" && selector == "jan2023"
    ));
}

#[test]
fn signing_domain_filter_rejects_other_domains() {
    let parser = DkimParser::new(keys()).with_signing_domain("example.com");
    let err = parser
        .parse(&fixture("instagram-valid.eml"), &CircuitProfile::instagram())
        .unwrap_err();
    assert!(matches!(err, ParseError::MissingDkimSignature { domain: Some(_) }));
}

fn with_leading_header(header: &str) -> Vec<u8> {
    let mut raw = header.as_bytes().to_vec();
    raw.extend_from_slice(&fixture("instagram-valid.eml"));
    raw
}

#[test]
fn malformed_foreign_signature_is_skipped_under_domain_filter() {
    let raw = with_leading_header(
        "DKIM-Signature: v=1; a=rsa-sha256; d=esp.example; s=k; h=From; b=AAAA\r\n",
    );
    let parser = DkimParser::new(keys()).with_signing_domain("mail.instagram.com");
    let profile = CircuitProfile::instagram();
    let expected = parser.parse(&fixture("instagram-valid.eml"), &profile).unwrap();
    assert_eq!(parser.parse(&raw, &profile).unwrap(), expected);
}

#[test]
fn ed25519_signature_ahead_of_rsa_is_skipped() {
    let raw = with_leading_header(
        "DKIM-Signature: v=1; a=ed25519-sha256; c=relaxed/relaxed; d=esp.example;\r\n s=ed; h=From:To; bh=AAAA; b=AAAA\r\n",
    );
    let asm = assembler();
    let record = asm
        .assemble(&raw, "instagram", TO_ADDRESS, &UsernameSource::DeriveFromMessage)
        .unwrap();
    let plain = asm
        .assemble(
            &fixture("instagram-valid.eml"),
            "instagram",
            TO_ADDRESS,
            &UsernameSource::DeriveFromMessage,
        )
        .unwrap();
    assert_eq!(record, plain);
}

#[test]
fn header_block_over_profile_limit_is_parse_error() {
    let registry = ProfileRegistry::empty()
        .with_profile(
            "tiny",
            CircuitProfile {
                max_headers_length: 128,
                ..CircuitProfile::instagram()
            },
        )
        .unwrap();
    let asm = InputAssembler::new(registry, DkimParser::new(keys()));
    let err = asm
        .assemble(
            &fixture("instagram-valid.eml"),
            "tiny",
            TO_ADDRESS,
            &UsernameSource::DeriveFromMessage,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        AssemblyError::Parse(ParseError::HeaderTooLong { max: 128, .. })
    ));
}

#[test]
fn missing_blank_line_is_malformed_message() {
    let err = DkimParser::new(keys())
        .parse(b"From: a@b.c\r\nTo: d@e.f", &CircuitProfile::instagram())
        .unwrap_err();
    assert!(matches!(err, ParseError::MalformedMessage(_)));
}

// -- Profiles ----------------------------------------------------------------

#[test]
fn profile_file_can_switch_commitment_mode() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(
        &mut file,
        b"profiles:\n  instagram-to-only:\n    max_headers_length: 576\n    max_body_length: 16384\n    extract_from: true\n    extract_to: true\n    commitment_mode: to_address\n",
    )
    .unwrap();
    let registry = ProfileRegistry::builtin().extend_from_file(file.path()).unwrap();
    assert_eq!(registry.len(), 2);

    let asm = InputAssembler::new(registry, DkimParser::new(keys()));
    let record = asm
        .assemble(
            &fixture("instagram-no-username.eml"),
            "instagram-to-only",
            TO_ADDRESS,
            &UsernameSource::DeriveFromMessage,
        )
        .unwrap();
    assert_eq!(record.commitments().mode(), CommitmentMode::ToAddress);
    assert!(record.expected_username_hash().is_none());
    assert!(!record.input_names().contains(&"expected_username_hash"));
}

#[test]
fn unknown_profile_is_profile_error() {
    let err = assembler()
        .assemble(
            &fixture("instagram-valid.eml"),
            "twitter",
            TO_ADDRESS,
            &UsernameSource::DeriveFromMessage,
        )
        .unwrap_err();
    assert!(matches!(err, AssemblyError::Profile(_)));
}

// -- Determinism -------------------------------------------------------------

#[test]
fn repeated_assembly_is_byte_identical() {
    let asm = assembler();
    let raw = fixture("instagram-valid.eml");
    let first = asm
        .assemble(&raw, "instagram", TO_ADDRESS, &UsernameSource::DeriveFromMessage)
        .unwrap();
    for _ in 0..5 {
        let again = asm
            .assemble(&raw, "instagram", TO_ADDRESS, &UsernameSource::DeriveFromMessage)
            .unwrap();
        assert_eq!(
            first.canonical_bytes().unwrap(),
            again.canonical_bytes().unwrap()
        );
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&again).unwrap()
        );
    }
}

#[test]
fn serialized_record_keys_match_input_names() {
    let record = assembler()
        .assemble(
            &fixture("instagram-valid.eml"),
            "instagram",
            TO_ADDRESS,
            &UsernameSource::DeriveFromMessage,
        )
        .unwrap();
    let json = serde_json::to_value(&record).unwrap();
    let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
    let mut names = record.input_names();
    keys.sort_unstable();
    names.sort_unstable();
    assert_eq!(keys, names);
    assert_eq!(names.len(), 12);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn supplied_username_commitment_is_its_digest(name in "[a-z0-9._]{1,30}") {
        let record = assembler()
            .assemble(
                &fixture("instagram-valid.eml"),
                "instagram",
                TO_ADDRESS,
                &UsernameSource::Supplied(name.clone()),
            )
            .unwrap();
        let expected = weighted_digest_str(&name);
        prop_assert_eq!(record.expected_username_hash(), Some(&expected));
        prop_assert_eq!(record.expected_to_hash().map(FieldDigest::to_hex), Some("0x6b69".to_string()));
    }
}
