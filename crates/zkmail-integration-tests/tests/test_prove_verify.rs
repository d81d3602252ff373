//! # Prove and Verify End to End
//!
//! Assembles inputs from the signed fixtures, proves them with the
//! reference engine against the compiled Instagram circuit artifact, and
//! verifies the result on every supported backend. Covers the expected
//! negative outcome (a wrong username is a constraint violation, not a
//! crash) and the orchestration guarantees: single setup per backend,
//! reusable handles, deadlines.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use zkmail_core::{
    weighted_digest_str, CanonicalInputRecord, ExtractionError, ProfileRegistry, UsernameExtractor,
};
use zkmail_inputs::{AssemblyError, DkimParser, InputAssembler, KeyStore, UsernameSource};
use zkmail_zkp::{
    BackendId, CompiledCircuit, FailureKind, Prover, ProvingError, ReferenceEngine,
};

const TO_ADDRESS: &str = "deneme.test581@gmail.com";
const USERNAME: &str = "denemedeneme581";

fn data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data").join(name)
}

fn circuit() -> Arc<CompiledCircuit> {
    Arc::new(CompiledCircuit::from_file(&data("instagram_example.json")).unwrap())
}

fn inputs(eml: &str, to: &str, username: UsernameSource) -> CanonicalInputRecord {
    let keys = KeyStore::from_file(&data("keys.yaml")).unwrap();
    let asm = InputAssembler::new(ProfileRegistry::builtin(), DkimParser::new(keys));
    let raw = std::fs::read(data(eml)).unwrap();
    asm.assemble(&raw, "instagram", to, &username).unwrap()
}

fn custom_assembler(extractor: Option<UsernameExtractor>) -> InputAssembler<DkimParser<KeyStore>> {
    let keys = KeyStore::from_file(&data("keys.yaml")).unwrap();
    let asm = InputAssembler::new(ProfileRegistry::builtin(), DkimParser::new(keys));
    match extractor {
        Some(extractor) => asm.with_extractor(extractor),
        None => asm,
    }
}

fn hallo() -> UsernameExtractor {
    UsernameExtractor::with_greetings(&["Hallo"]).unwrap()
}

fn valid_inputs() -> CanonicalInputRecord {
    inputs("instagram-valid.eml", TO_ADDRESS, UsernameSource::DeriveFromMessage)
}

#[tokio::test]
async fn round_trip_on_every_backend() {
    let engine = Arc::new(ReferenceEngine::new());
    let prover = Prover::prepare_all(circuit(), Arc::clone(&engine));
    let record = valid_inputs();

    for backend in BackendId::ALL {
        let proof = prover.prove(&record, backend).await.unwrap();
        assert_eq!(proof.backend, backend);
        assert!(prover.verify(&proof, backend).await.unwrap(), "{backend}");
    }
    assert_eq!(engine.setup_invocations(), 2);
}

#[tokio::test]
async fn single_backend_round_trip() {
    for backend in BackendId::ALL {
        let prover = Prover::new(circuit(), Arc::new(ReferenceEngine::new()), backend);
        let proof = prover.prove(&valid_inputs(), backend).await.unwrap();
        assert!(prover.verify(&proof, backend).await.unwrap());
    }
}

#[tokio::test]
async fn public_outputs_carry_commitments() {
    let prover = Prover::new(circuit(), Arc::new(ReferenceEngine::new()), BackendId::Honk);
    let proof = prover.prove(&valid_inputs(), BackendId::Honk).await.unwrap();

    assert_eq!(
        proof.public_output("expected_username_hash"),
        Some(&serde_json::Value::String(weighted_digest_str(USERNAME).to_hex()))
    );
    assert_eq!(
        proof.public_output("expected_to_hash"),
        Some(&serde_json::Value::String(weighted_digest_str(TO_ADDRESS).to_hex()))
    );
    assert!(proof.public_output("pubkey").is_some());
    assert!(proof.public_output("header").is_none());
}

#[tokio::test]
async fn wrong_username_is_constraint_violation() {
    let record = inputs(
        "instagram-valid.eml",
        TO_ADDRESS,
        UsernameSource::Supplied("wrongusername123".to_string()),
    );
    let prover = Prover::new(circuit(), Arc::new(ReferenceEngine::new()), BackendId::Honk);
    let err = prover.prove(&record, BackendId::Honk).await.unwrap_err();

    assert!(err.is_constraint_violation());
    assert_eq!(err.kind(), FailureKind::ConstraintViolation);
    assert!(matches!(
        err,
        ProvingError::ConstraintViolation { ref constraint, .. } if constraint == "username_hash"
    ));
}

#[tokio::test]
async fn wrong_to_address_is_constraint_violation() {
    let record = inputs(
        "instagram-valid.eml",
        "someone.else@example.com",
        UsernameSource::DeriveFromMessage,
    );
    let prover = Prover::new(circuit(), Arc::new(ReferenceEngine::new()), BackendId::Plonk);
    let err = prover.prove(&record, BackendId::Plonk).await.unwrap_err();
    assert!(matches!(
        err,
        ProvingError::ConstraintViolation { ref constraint, .. } if constraint == "to_hash"
    ));
}

#[tokio::test]
async fn footer_derived_username_proves() {
    let record = inputs(
        "instagram-footer-only.eml",
        TO_ADDRESS,
        UsernameSource::DeriveFromMessage,
    );
    let prover = Prover::new(circuit(), Arc::new(ReferenceEngine::new()), BackendId::Honk);
    let proof = prover.prove(&record, BackendId::Honk).await.unwrap();
    assert!(prover.verify(&proof, BackendId::Honk).await.unwrap());
}

#[tokio::test]
async fn supplied_username_without_body_match_is_rejected_by_circuit() {
    let record = inputs(
        "instagram-no-username.eml",
        TO_ADDRESS,
        UsernameSource::Supplied(USERNAME.to_string()),
    );
    let prover = Prover::new(circuit(), Arc::new(ReferenceEngine::new()), BackendId::Honk);
    let err = prover.prove(&record, BackendId::Honk).await.unwrap_err();
    assert!(err.is_constraint_violation());
}

#[tokio::test]
async fn tampered_public_output_does_not_verify() {
    let prover = Prover::new(circuit(), Arc::new(ReferenceEngine::new()), BackendId::Honk);
    let mut proof = prover.prove(&valid_inputs(), BackendId::Honk).await.unwrap();
    proof.public_outputs.insert(
        "expected_username_hash".to_string(),
        serde_json::Value::String(weighted_digest_str("wrongusername123").to_hex()),
    );
    assert!(!prover.verify(&proof, BackendId::Honk).await.unwrap());
}

#[tokio::test]
async fn proof_from_other_backend_is_verification_error() {
    let prover = Prover::prepare_all(circuit(), Arc::new(ReferenceEngine::new()));
    let proof = prover.prove(&valid_inputs(), BackendId::Honk).await.unwrap();
    assert!(prover.verify(&proof, BackendId::Plonk).await.is_err());
}

#[tokio::test]
async fn unselected_backend_is_infrastructure_failure() {
    let prover = Prover::new(circuit(), Arc::new(ReferenceEngine::new()), BackendId::Honk);
    let err = prover.prove(&valid_inputs(), BackendId::Plonk).await.unwrap_err();
    assert_eq!(err, ProvingError::BackendNotPrepared(BackendId::Plonk));
    assert_eq!(err.kind(), FailureKind::Infrastructure);
}

#[tokio::test]
async fn record_missing_declared_input_is_infrastructure_failure() {
    let registry = ProfileRegistry::builtin()
        .extend_from_yaml(
            "profiles:\n  to-only:\n    max_headers_length: 576\n    max_body_length: 16384\n    extract_from: true\n    extract_to: true\n    commitment_mode: to_address\n",
        )
        .unwrap();
    let keys = KeyStore::from_file(&data("keys.yaml")).unwrap();
    let asm = InputAssembler::new(registry, DkimParser::new(keys));
    let raw = std::fs::read(data("instagram-valid.eml")).unwrap();
    let record = asm
        .assemble(&raw, "to-only", TO_ADDRESS, &UsernameSource::DeriveFromMessage)
        .unwrap();

    let prover = Prover::new(circuit(), Arc::new(ReferenceEngine::new()), BackendId::Honk);
    let err = prover.prove(&record, BackendId::Honk).await.unwrap_err();
    assert_eq!(err, ProvingError::MissingInput("expected_username_hash".into()));
    assert!(!err.is_constraint_violation());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_proves_trigger_one_setup() {
    let engine = Arc::new(ReferenceEngine::new().with_latency(Duration::from_millis(50)));
    let prover = Prover::new(circuit(), Arc::clone(&engine), BackendId::Honk);
    let record = valid_inputs();

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let prover = prover.clone();
            let record = record.clone();
            tokio::spawn(async move { prover.prove(&record, BackendId::Honk).await })
        })
        .collect();
    for task in tasks {
        let proof = task.await.unwrap().unwrap();
        assert!(prover.verify(&proof, BackendId::Honk).await.unwrap());
    }
    assert_eq!(engine.setup_invocations(), 1);
}

#[tokio::test]
async fn handle_is_reusable_after_failure() {
    let prover = Prover::new(circuit(), Arc::new(ReferenceEngine::new()), BackendId::Honk);
    let bad = inputs(
        "instagram-valid.eml",
        TO_ADDRESS,
        UsernameSource::Supplied("wrongusername123".to_string()),
    );
    assert!(prover.prove(&bad, BackendId::Honk).await.is_err());

    let proof = prover.prove(&valid_inputs(), BackendId::Honk).await.unwrap();
    assert!(prover.verify(&proof, BackendId::Honk).await.unwrap());
}

#[tokio::test]
async fn deadline_elapsing_is_cancelled_kind() {
    let engine = Arc::new(ReferenceEngine::new().with_latency(Duration::from_millis(300)));
    let prover = Prover::new(circuit(), engine, BackendId::Plonk);
    let err = prover
        .prove_with_deadline(&valid_inputs(), BackendId::Plonk, Duration::from_millis(10))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Cancelled);
    assert!(prover.prepared_backends().is_empty());
}

#[tokio::test]
async fn proof_serializes_for_transport() {
    let prover = Prover::new(circuit(), Arc::new(ReferenceEngine::new()), BackendId::Honk);
    let proof = prover.prove(&valid_inputs(), BackendId::Honk).await.unwrap();
    let json = serde_json::to_string(&proof).unwrap();
    let back: zkmail_zkp::Proof = serde_json::from_str(&json).unwrap();
    assert_eq!(back, proof);
    assert!(prover.verify(&back, BackendId::Honk).await.unwrap());
}

#[tokio::test]
async fn custom_greeting_proves_when_engine_shares_extractor() {
    let raw = std::fs::read(data("instagram-custom-greeting.eml")).unwrap();
    let derive = UsernameSource::DeriveFromMessage;

    let err = custom_assembler(None)
        .assemble(&raw, "instagram", TO_ADDRESS, &derive)
        .unwrap_err();
    assert!(matches!(
        err,
        AssemblyError::Extraction(ExtractionError::NoPatternMatched { .. })
    ));

    let record = custom_assembler(Some(hallo()))
        .assemble(&raw, "instagram", TO_ADDRESS, &derive)
        .unwrap();
    assert_eq!(
        record.expected_username_hash(),
        Some(&weighted_digest_str(USERNAME))
    );

    let standard = Prover::new(circuit(), Arc::new(ReferenceEngine::new()), BackendId::Honk);
    let err = standard.prove(&record, BackendId::Honk).await.unwrap_err();
    assert!(matches!(
        err,
        ProvingError::ConstraintViolation { ref constraint, .. } if constraint == "username_hash"
    ));

    let engine = ReferenceEngine::new().with_extractor(hallo());
    let prover = Prover::new(circuit(), Arc::new(engine), BackendId::Honk);
    let proof = prover.prove(&record, BackendId::Honk).await.unwrap();
    assert!(prover.verify(&proof, BackendId::Honk).await.unwrap());
}

#[tokio::test]
async fn soft_line_break_in_username_is_rejected_by_circuit() {
    // Extraction runs on the decoded text, the circuit on the raw body.
    let record = inputs(
        "instagram-soft-break.eml",
        TO_ADDRESS,
        UsernameSource::DeriveFromMessage,
    );
    assert_eq!(
        record.expected_username_hash(),
        Some(&weighted_digest_str(USERNAME))
    );

    let prover = Prover::new(circuit(), Arc::new(ReferenceEngine::new()), BackendId::Honk);
    let err = prover.prove(&record, BackendId::Honk).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::ConstraintViolation);
    assert!(matches!(
        err,
        ProvingError::ConstraintViolation { ref constraint, .. } if constraint == "username_hash"
    ));
}
