// Copyright 2023 Fondazione LINKS

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at

//     http://www.apache.org/licenses/LICENSE-2.0

// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! `BbsBlsSignature2020` and `BbsBlsSignatureProof2020` linked data proofs.
//!
//! The signed messages are the canonical statements of the proof options
//! followed by the canonical statements of the document without its `proof`.
//! A derived proof always discloses every proof-option statement.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use elliptic_curve::hash2curve::ExpandMsg;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::encoder::{statements_to_messages, MessageEncoder};
use super::loader::DocumentLoader;
use super::rdf::Quad;
use super::reveal::{deskolemize, skolemize, to_expanded_document, RevealSelection};
use crate::bbsplus::ciphersuites::BbsCiphersuite;
use crate::bbsplus::generators::Generators;
use crate::bbsplus::keys::BBSplusPublicKey;
use crate::bbsplus::proof::BBSplusPoKSignature;
use crate::bbsplus::signature::BBSplusSignature;
use crate::errors::Error;
use crate::keys::pair::KeyPair;
use crate::schemes::algorithms::BBSplus;
use crate::utils::message::BBSplusMessage;

pub const BBS_SIGNATURE_2020: &str = "BbsBlsSignature2020";
pub const BBS_SIGNATURE_PROOF_2020: &str = "BbsBlsSignatureProof2020";
pub const SECURITY_CONTEXT_BBS_V1: &str = "https://w3id.org/security/bbs/v1";
pub const ASSERTION_METHOD: &str = "assertionMethod";

fn default_proof_purpose() -> String {
    ASSERTION_METHOD.to_owned()
}

fn default_security_context() -> String {
    SECURITY_CONTEXT_BBS_V1.to_owned()
}

/// Options of a new `BbsBlsSignature2020` proof.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofOptions {
    pub verification_method: String,
    #[serde(default = "default_proof_purpose")]
    pub proof_purpose: String,
    /// RFC 3339 timestamp, the current time when missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    /// Context the proof options are interpreted in.
    #[serde(default = "default_security_context")]
    pub security_context: String,
}

impl ProofOptions {
    pub fn new(verification_method: impl Into<String>) -> Self {
        Self {
            verification_method: verification_method.into(),
            proof_purpose: default_proof_purpose(),
            created: None,
            security_context: default_security_context(),
        }
    }

    pub fn with_created(mut self, created: impl Into<String>) -> Self {
        self.created = Some(created.into());
        self
    }

    pub fn with_proof_purpose(mut self, proof_purpose: impl Into<String>) -> Self {
        self.proof_purpose = proof_purpose.into();
        self
    }
}

/// The proof fields that are signed.
#[derive(Clone, PartialEq, Eq, Debug)]
struct ProofConfig {
    proof_type: String,
    created: String,
    verification_method: String,
    proof_purpose: String,
    context: String,
}

impl ProofConfig {
    fn from_options(options: &ProofOptions) -> Self {
        Self {
            proof_type: BBS_SIGNATURE_2020.to_owned(),
            created: options
                .created
                .clone()
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
            verification_method: options.verification_method.clone(),
            proof_purpose: options.proof_purpose.clone(),
            context: options.security_context.clone(),
        }
    }

    fn from_embedded(proof: &Map<String, Value>, expected_type: &str) -> Result<Self, Error> {
        let proof_type = string_field(proof, "type")?;
        if proof_type != expected_type {
            return Err(Error::InvalidLinkedDataProof(format!("expected a {} proof, found {}", expected_type, proof_type)));
        }

        Ok(Self {
            proof_type,
            created: string_field(proof, "created")?,
            verification_method: string_field(proof, "verificationMethod")?,
            proof_purpose: string_field(proof, "proofPurpose")?,
            context: match proof.get("@context") {
                Some(Value::String(context)) => context.clone(),
                Some(_) => return Err(Error::InvalidLinkedDataProof("proof @context must be a URL".to_owned())),
                None => default_security_context(),
            },
        })
    }

    /// The document whose canonical statements are signed.
    fn to_document(&self) -> Value {
        json!({
            "@context": self.context,
            "type": self.proof_type,
            "created": self.created,
            "verificationMethod": self.verification_method,
            "proofPurpose": self.proof_purpose,
        })
    }

    /// The `proof` entry attached to a document, `proofValue` excluded.
    fn to_embedded(&self, proof_type: &str) -> Map<String, Value> {
        let mut proof = Map::new();
        if self.context != SECURITY_CONTEXT_BBS_V1 {
            proof.insert("@context".to_owned(), Value::String(self.context.clone()));
        }
        proof.insert("type".to_owned(), Value::String(proof_type.to_owned()));
        proof.insert("created".to_owned(), Value::String(self.created.clone()));
        proof.insert("verificationMethod".to_owned(), Value::String(self.verification_method.clone()));
        proof.insert("proofPurpose".to_owned(), Value::String(self.proof_purpose.clone()));
        proof
    }

    fn statements(&self, encoder: &MessageEncoder<'_>) -> Result<Vec<String>, Error> {
        encoder.canonicalize(&self.to_document())
    }
}

fn string_field(proof: &Map<String, Value>, field: &str) -> Result<String, Error> {
    proof
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| Error::InvalidLinkedDataProof(format!("proof has no {}", field)))
}

fn decode_field(proof: &Map<String, Value>, field: &str) -> Result<Vec<u8>, Error> {
    STANDARD
        .decode(string_field(proof, field)?)
        .map_err(|e| Error::InvalidLinkedDataProof(format!("{} is not valid base64: {}", field, e)))
}

/// Splits a signed document into the document without `proof` and the proof object.
fn split_proof(document: &Value) -> Result<(Value, Map<String, Value>), Error> {
    let Value::Object(map) = document else {
        return Err(Error::InvalidLinkedDataProof("document must be a JSON object".to_owned()));
    };
    let mut unsigned = map.clone();
    match unsigned.remove("proof") {
        Some(Value::Object(proof)) => Ok((Value::Object(unsigned), proof)),
        Some(Value::Array(_)) => Err(Error::InvalidLinkedDataProof("multiple proofs are not supported".to_owned())),
        Some(_) => Err(Error::InvalidLinkedDataProof("proof must be a JSON object".to_owned())),
        None => Err(Error::InvalidLinkedDataProof("document has no proof".to_owned())),
    }
}

/// Signs `document`, returning a copy with a `BbsBlsSignature2020` proof.
/// An existing `proof` is replaced.
pub fn sign_credential<CS>(
    document: &Value,
    keypair: &KeyPair<BBSplus<CS>>,
    options: &ProofOptions,
    loader: &dyn DocumentLoader,
) -> Result<Value, Error>
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
{
    let Value::Object(map) = document else {
        return Err(Error::InvalidLinkedDataProof("document must be a JSON object".to_owned()));
    };
    let mut signed = map.clone();
    signed.remove("proof");

    let encoder = MessageEncoder::new(loader);
    let config = ProofConfig::from_options(options);

    let mut statements = config.statements(&encoder)?;
    statements.extend(encoder.canonicalize(&Value::Object(signed.clone()))?);
    log::debug!("signing credential over {} statements", statements.len());

    let messages = statements_to_messages::<CS>(&statements)?;
    let generators = Generators::derive::<CS>(messages.len())?;
    let signature = BBSplusSignature::sign(keypair.private_key(), &generators, &messages)?;

    let mut proof = config.to_embedded(BBS_SIGNATURE_2020);
    proof.insert("proofValue".to_owned(), Value::String(STANDARD.encode(signature.to_bytes())));
    signed.insert("proof".to_owned(), Value::Object(proof));

    Ok(Value::Object(signed))
}

/// `Ok(false)` when the signature does not match; `Err` when the document or proof is malformed.
pub fn verify_credential<CS>(document: &Value, pk: &BBSplusPublicKey, loader: &dyn DocumentLoader) -> Result<bool, Error>
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
{
    let (unsigned, proof) = split_proof(document)?;
    let config = ProofConfig::from_embedded(&proof, BBS_SIGNATURE_2020)?;
    let signature = BBSplusSignature::from_bytes(&decode_field(&proof, "proofValue")?)?;

    let encoder = MessageEncoder::new(loader);
    let mut statements = config.statements(&encoder)?;
    statements.extend(encoder.canonicalize(&unsigned)?);

    let messages = statements_to_messages::<CS>(&statements)?;
    let generators = Generators::derive::<CS>(messages.len())?;
    let valid = signature.verify(pk, &generators, &messages)?;
    log::debug!("credential signature over {} statements valid: {}", messages.len(), valid);
    Ok(valid)
}

/// Derives a `BbsBlsSignatureProof2020` disclosing the statements picked by `reveal`.
///
/// The result is a flattened, expanded JSON-LD document of the disclosed
/// statements in which canonical blank nodes appear as `urn:bnid:` IRIs.
pub fn derive_proof<CS>(
    document: &Value,
    pk: &BBSplusPublicKey,
    reveal: &RevealSelection,
    nonce: &[u8],
    loader: &dyn DocumentLoader,
) -> Result<Value, Error>
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
{
    let (unsigned, proof) = split_proof(document)?;
    let config = ProofConfig::from_embedded(&proof, BBS_SIGNATURE_2020)?;
    let signature = BBSplusSignature::from_bytes(&decode_field(&proof, "proofValue")?)?;

    let encoder = MessageEncoder::new(loader);
    let proof_statements = config.statements(&encoder)?;
    let document_quads = encoder.canonical_quads(&unsigned)?;

    let offset = proof_statements.len();
    let statements: Vec<String> = proof_statements
        .into_iter()
        .chain(document_quads.iter().map(Quad::to_nquad))
        .collect();
    let messages = statements_to_messages::<CS>(&statements)?;
    let generators = Generators::derive::<CS>(messages.len())?;

    let revealed = reveal.select(&document_quads)?;
    let revealed_indexes: Vec<usize> = (0..offset).chain(revealed.iter().map(|i| i + offset)).collect();
    log::debug!("deriving proof revealing {} of {} statements", revealed_indexes.len(), messages.len());

    let pok = BBSplusPoKSignature::derive::<CS>(pk, &generators, &messages, &signature, &revealed_indexes, nonce)?;

    let revealed_quads: Vec<Quad> = revealed.iter().map(|&i| document_quads[i].map_nodes(skolemize)).collect();
    let Value::Object(mut derived) = to_expanded_document(&revealed_quads) else {
        return Err(Error::ProofGenError("revealed document is not an object".to_owned()));
    };

    let mut derived_proof = config.to_embedded(BBS_SIGNATURE_PROOF_2020);
    derived_proof.insert("nonce".to_owned(), Value::String(STANDARD.encode(nonce)));
    derived_proof.insert("proofValue".to_owned(), Value::String(STANDARD.encode(pok.to_bytes())));
    derived.insert("proof".to_owned(), Value::Object(derived_proof));

    Ok(Value::Object(derived))
}

/// Verifies a document produced by [`derive_proof`] against the verifier's `nonce`.
pub fn verify_derived_proof<CS>(
    document: &Value,
    pk: &BBSplusPublicKey,
    nonce: &[u8],
    loader: &dyn DocumentLoader,
) -> Result<(), Error>
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
{
    let (revealed_document, proof) = split_proof(document)?;
    let mut config = ProofConfig::from_embedded(&proof, BBS_SIGNATURE_PROOF_2020)?;
    config.proof_type = BBS_SIGNATURE_2020.to_owned();

    if decode_field(&proof, "nonce")? != nonce {
        return Err(Error::NonceMismatch);
    }
    let pok = BBSplusPoKSignature::from_bytes(&decode_field(&proof, "proofValue")?)?;

    let encoder = MessageEncoder::new(loader);
    let proof_statements = config.statements(&encoder)?;

    let mut document_statements: Vec<String> = encoder
        .canonical_quads(&revealed_document)?
        .iter()
        .map(|quad| quad.map_nodes(deskolemize).to_nquad())
        .collect();
    document_statements.sort();
    document_statements.dedup();

    let statements: Vec<String> = proof_statements.into_iter().chain(document_statements).collect();
    let revealed_indexes = pok.revealed_indexes();
    if revealed_indexes.len() != statements.len() {
        log::debug!("proof reveals {} messages, document has {} statements", revealed_indexes.len(), statements.len());
        return Err(Error::RevealedSetMismatch);
    }

    let messages = statements_to_messages::<CS>(&statements)?;
    let revealed_messages: BTreeMap<usize, BBSplusMessage> = revealed_indexes.into_iter().zip(messages).collect();
    let generators = Generators::derive::<CS>(pok.message_count())?;

    pok.verify::<CS>(pk, &generators, &revealed_messages, nonce)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbsplus::ciphersuites::Bls12381Sha256;
    use crate::ld::loader::StaticDocumentLoader;
    use crate::schemes::algorithms::BbsBls12381Sha256;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn loader() -> StaticDocumentLoader {
        StaticDocumentLoader::new().with_document(
            SECURITY_CONTEXT_BBS_V1,
            json!({"@context": {
                "@version": 1.1,
                "id": "@id",
                "type": "@type",
                "BbsBlsSignature2020": {
                    "@id": "https://w3id.org/security#BbsBlsSignature2020",
                    "@context": {
                        "sec": "https://w3id.org/security#",
                        "created": {"@id": "http://purl.org/dc/terms/created", "@type": "http://www.w3.org/2001/XMLSchema#dateTime"},
                        "proofPurpose": {"@id": "sec:proofPurpose", "@type": "@vocab"},
                        "verificationMethod": {"@id": "sec:verificationMethod", "@type": "@id"},
                        "assertionMethod": {"@id": "sec:assertionMethod", "@type": "@id"}
                    }
                },
                "name": "http://schema.org/name",
                "email": "http://schema.org/email",
                "knows": {"@id": "http://schema.org/knows"}
            }}),
        )
    }

    fn document() -> Value {
        json!({
            "@context": SECURITY_CONTEXT_BBS_V1,
            "id": "urn:example:doc",
            "name": "Jane",
            "email": "jane@example.org",
            "knows": {"name": "John"}
        })
    }

    fn options() -> ProofOptions {
        ProofOptions::new("did:example:issuer#key-1").with_created("2023-05-01T10:00:00Z")
    }

    #[test]
    fn proof_options_are_signed() {
        let loader = loader();
        let encoder = MessageEncoder::new(&loader);
        let statements = ProofConfig::from_options(&options()).statements(&encoder).unwrap();
        assert_eq!(statements.len(), 4);
        assert!(statements.iter().any(|s| s.contains("<https://w3id.org/security#assertionMethod>")));
        assert!(statements.iter().any(|s| s.contains("\"2023-05-01T10:00:00Z\"^^<http://www.w3.org/2001/XMLSchema#dateTime>")));
    }

    #[test]
    fn proof_options_defaults() {
        let options: ProofOptions = serde_json::from_value(json!({"verificationMethod": "did:example:issuer#key-1"})).unwrap();
        assert_eq!(options, ProofOptions::new("did:example:issuer#key-1"));
        assert_eq!(options.proof_purpose, ASSERTION_METHOD);
        assert_eq!(options.security_context, SECURITY_CONTEXT_BBS_V1);

        let config = ProofConfig::from_options(&options.with_proof_purpose("authentication"));
        assert_eq!(config.proof_purpose, "authentication");
        assert!(config.created.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&config.created).is_ok());
    }

    #[test]
    fn sign_and_verify() {
        let loader = loader();
        let keypair = KeyPair::<BbsBls12381Sha256>::random(&mut StdRng::seed_from_u64(3)).unwrap();
        let signed = sign_credential(&document(), &keypair, &options(), &loader).unwrap();

        assert_eq!(signed["proof"]["type"], BBS_SIGNATURE_2020);
        assert_eq!(signed["proof"]["created"], "2023-05-01T10:00:00Z");
        assert!(verify_credential::<Bls12381Sha256>(&signed, keypair.public_key(), &loader).unwrap());

        let mut tampered = signed.clone();
        tampered["name"] = json!("Janet");
        assert!(!verify_credential::<Bls12381Sha256>(&tampered, keypair.public_key(), &loader).unwrap());

        let mut tampered = signed.clone();
        tampered["proof"]["created"] = json!("2024-05-01T10:00:00Z");
        assert!(!verify_credential::<Bls12381Sha256>(&tampered, keypair.public_key(), &loader).unwrap());
    }

    #[test]
    fn malformed_proofs() {
        let loader = loader();
        let pk = KeyPair::<BbsBls12381Sha256>::random(&mut StdRng::seed_from_u64(4)).unwrap().public_key().clone();

        let res = verify_credential::<Bls12381Sha256>(&document(), &pk, &loader);
        assert!(matches!(res, Err(Error::InvalidLinkedDataProof(_))));

        let mut doc = document();
        doc["proof"] = json!({"type": "Ed25519Signature2018", "created": "x", "verificationMethod": "x", "proofPurpose": "x"});
        let res = verify_credential::<Bls12381Sha256>(&doc, &pk, &loader);
        assert!(matches!(res, Err(Error::InvalidLinkedDataProof(_))));

        let mut doc = document();
        doc["proof"] = json!({"type": BBS_SIGNATURE_2020, "created": "2023-05-01T10:00:00Z", "verificationMethod": "did:example:issuer#key-1", "proofPurpose": "assertionMethod", "proofValue": "AAAA"});
        let res = verify_credential::<Bls12381Sha256>(&doc, &pk, &loader);
        assert!(matches!(res, Err(Error::KeyFormatError(_))));
    }

    #[test]
    fn derive_and_verify() {
        let loader = loader();
        let keypair = KeyPair::<BbsBls12381Sha256>::random(&mut StdRng::seed_from_u64(5)).unwrap();
        let signed = sign_credential(&document(), &keypair, &options(), &loader).unwrap();
        let nonce = b"0123456789abcdef";

        let reveal = RevealSelection::Predicates(vec!["http://schema.org/name".to_owned()]);
        let derived = derive_proof::<Bls12381Sha256>(&signed, keypair.public_key(), &reveal, nonce, &loader).unwrap();

        assert_eq!(derived["proof"]["type"], BBS_SIGNATURE_PROOF_2020);
        let text = derived.to_string();
        assert!(text.contains("Jane"));
        assert!(text.contains("John"));
        assert!(!text.contains("jane@example.org"));

        verify_derived_proof::<Bls12381Sha256>(&derived, keypair.public_key(), nonce, &loader).unwrap();

        assert_eq!(
            verify_derived_proof::<Bls12381Sha256>(&derived, keypair.public_key(), b"another nonce", &loader),
            Err(Error::NonceMismatch)
        );
    }

    #[test]
    fn altered_disclosure_fails() {
        let loader = loader();
        let keypair = KeyPair::<BbsBls12381Sha256>::random(&mut StdRng::seed_from_u64(6)).unwrap();
        let signed = sign_credential(&document(), &keypair, &options(), &loader).unwrap();
        let nonce = b"nonce";

        let derived = derive_proof::<Bls12381Sha256>(&signed, keypair.public_key(), &RevealSelection::All, nonce, &loader).unwrap();
        verify_derived_proof::<Bls12381Sha256>(&derived, keypair.public_key(), nonce, &loader).unwrap();

        let altered: Value = serde_json::from_str(&derived.to_string().replace("Jane", "Mary")).unwrap();
        let res = verify_derived_proof::<Bls12381Sha256>(&altered, keypair.public_key(), nonce, &loader);
        assert!(matches!(res, Err(Error::InvalidProof(_))));

        let mut dropped = derived.clone();
        if let Some(nodes) = dropped["@graph"].as_array_mut() {
            nodes.retain(|node| node["@id"] != "urn:example:doc");
        }
        let res = verify_derived_proof::<Bls12381Sha256>(&dropped, keypair.public_key(), nonce, &loader);
        assert_eq!(res, Err(Error::RevealedSetMismatch));
    }
}
