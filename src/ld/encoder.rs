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

use elliptic_curve::hash2curve::ExpandMsg;
use serde_json::Value;

use super::expand::to_rdf;
use super::loader::DocumentLoader;
use super::rdf::Quad;
use super::urdna2015::canonicalize;
use crate::bbsplus::ciphersuites::BbsCiphersuite;
use crate::errors::Error;
use crate::utils::message::BBSplusMessage;

/// Turns a JSON-LD document into the ordered messages that get signed:
/// one message per canonical N-Quads statement.
pub struct MessageEncoder<'l> {
    loader: &'l dyn DocumentLoader,
}

impl<'l> MessageEncoder<'l> {
    pub fn new(loader: &'l dyn DocumentLoader) -> Self {
        Self { loader }
    }

    /// Canonically labelled quads, sorted by their N-Quads serialization, without duplicates.
    pub fn canonical_quads(&self, document: &Value) -> Result<Vec<Quad>, Error> {
        let quads = to_rdf(document, self.loader)?;
        Ok(sort_quads(canonicalize(&quads)))
    }

    /// Sorted canonical statements, without trailing newlines.
    pub fn canonicalize(&self, document: &Value) -> Result<Vec<String>, Error> {
        let statements: Vec<String> = self.canonical_quads(document)?.iter().map(Quad::to_nquad).collect();
        log::debug!("document canonicalized into {} statements", statements.len());
        Ok(statements)
    }

    pub fn encode<CS>(&self, document: &Value) -> Result<Vec<BBSplusMessage>, Error>
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        statements_to_messages::<CS>(&self.canonicalize(document)?)
    }
}

pub fn statements_to_messages<CS>(statements: &[String]) -> Result<Vec<BBSplusMessage>, Error>
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
{
    BBSplusMessage::messages_to_scalar::<CS>(statements)
}

pub(crate) fn sort_quads(quads: Vec<Quad>) -> Vec<Quad> {
    let mut keyed: Vec<(String, Quad)> = quads.into_iter().map(|q| (q.to_nquad(), q)).collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.dedup_by(|a, b| a.0 == b.0);
    keyed.into_iter().map(|(_, q)| q).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbsplus::ciphersuites::{Bls12381Sha256, Bls12381Shake256};
    use crate::ld::loader::StaticDocumentLoader;
    use serde_json::json;

    fn loader() -> StaticDocumentLoader {
        StaticDocumentLoader::new().with_document(
            "https://example.org/person/v1",
            json!({"@context": {
                "@vocab": "http://schema.org/",
                "id": "@id",
                "type": "@type",
                "address": {"@id": "http://schema.org/address"}
            }}),
        )
    }

    #[test]
    fn key_order_and_blank_labels_do_not_matter() {
        let loader = loader();
        let encoder = MessageEncoder::new(&loader);

        let first = json!({
            "@context": "https://example.org/person/v1",
            "id": "did:example:jane",
            "type": "Person",
            "name": "Jane",
            "address": {"streetAddress": "Main St 1", "postalCode": "10100"}
        });
        let second = json!({
            "address": {"postalCode": "10100", "@id": "_:whatever", "streetAddress": "Main St 1"},
            "name": "Jane",
            "type": "Person",
            "id": "did:example:jane",
            "@context": "https://example.org/person/v1"
        });

        let statements = encoder.canonicalize(&first).unwrap();
        assert_eq!(statements, encoder.canonicalize(&second).unwrap());
        assert_eq!(statements.len(), 5);
        assert!(statements.iter().any(|s| s.starts_with("_:c14n0 ")));
        assert!(statements.iter().all(|s| !s.ends_with('\n')));

        assert_eq!(
            encoder.encode::<Bls12381Sha256>(&first).unwrap(),
            encoder.encode::<Bls12381Sha256>(&second).unwrap()
        );
    }

    #[test]
    fn semantic_changes_change_messages() {
        let loader = loader();
        let encoder = MessageEncoder::new(&loader);
        let doc = json!({"@context": "https://example.org/person/v1", "id": "did:example:jane", "name": "Jane"});
        let changed = json!({"@context": "https://example.org/person/v1", "id": "did:example:jane", "name": "John"});

        assert_ne!(encoder.encode::<Bls12381Sha256>(&doc).unwrap(), encoder.encode::<Bls12381Sha256>(&changed).unwrap());
        assert_ne!(encoder.encode::<Bls12381Sha256>(&doc).unwrap(), encoder.encode::<Bls12381Shake256>(&doc).unwrap());
    }

    #[test]
    fn duplicate_statements_collapse() {
        let loader = loader();
        let encoder = MessageEncoder::new(&loader);
        let doc = json!({"@context": "https://example.org/person/v1", "id": "did:example:jane", "name": ["Jane", "Jane"]});
        assert_eq!(encoder.canonicalize(&doc).unwrap().len(), 1);
    }

    #[test]
    fn missing_context_is_a_canonicalization_error() {
        let loader = StaticDocumentLoader::new();
        let encoder = MessageEncoder::new(&loader);
        let res = encoder.canonicalize(&json!({"@context": "https://example.org/unknown", "name": "x"}));
        assert!(matches!(res, Err(Error::CanonicalizationError(_))));
    }
}
