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

//! Batch verification of independent signatures and proofs.
//!
//! Every item is checked, there is no fail-fast: the outcome carries one result
//! per input, in input order, plus the logical AND of all of them.

use std::collections::BTreeMap;

use elliptic_curve::hash2curve::ExpandMsg;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::ciphersuites::BbsCiphersuite;
use super::generators::Generators;
use super::keys::BBSplusPublicKey;
use super::proof::BBSplusPoKSignature;
use super::signature::BBSplusSignature;
use crate::errors::Error;
use crate::utils::message::BBSplusMessage;

pub struct SignatureItem<'a> {
    pub public_key: &'a BBSplusPublicKey,
    pub generators: &'a Generators,
    pub messages: &'a [BBSplusMessage],
    pub signature: &'a BBSplusSignature,
}

pub struct ProofItem<'a> {
    pub public_key: &'a BBSplusPublicKey,
    pub generators: &'a Generators,
    pub revealed_messages: &'a BTreeMap<usize, BBSplusMessage>,
    pub proof: &'a BBSplusPoKSignature,
    pub nonce: &'a [u8],
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BatchVerification {
    pub results: Vec<Result<(), Error>>,
    pub all_valid: bool,
}

impl BatchVerification {
    fn from_results(results: Vec<Result<(), Error>>) -> Self {
        let all_valid = results.iter().all(Result::is_ok);
        log::debug!(
            "batch of {} items verified, {} failed",
            results.len(),
            results.iter().filter(|r| r.is_err()).count()
        );
        Self { results, all_valid }
    }

    pub fn failures(&self) -> impl Iterator<Item = (usize, &Error)> {
        self.results.iter().enumerate().filter_map(|(i, r)| r.as_ref().err().map(|e| (i, e)))
    }
}

fn verify_signature_item(item: &SignatureItem<'_>) -> Result<(), Error> {
    match item.signature.verify(item.public_key, item.generators, item.messages)? {
        true => Ok(()),
        false => Err(Error::InvalidSignature),
    }
}

/// A signature that does not verify is reported as [`Error::InvalidSignature`].
pub fn verify_signatures(items: &[SignatureItem<'_>]) -> BatchVerification {
    #[cfg(feature = "parallel")]
    let results = items.par_iter().map(verify_signature_item).collect();
    #[cfg(not(feature = "parallel"))]
    let results = items.iter().map(verify_signature_item).collect();

    BatchVerification::from_results(results)
}

pub fn verify_proofs<CS>(items: &[ProofItem<'_>]) -> BatchVerification
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
{
    let check = |item: &ProofItem<'_>| {
        item.proof.verify::<CS>(item.public_key, item.generators, item.revealed_messages, item.nonce)
    };

    #[cfg(feature = "parallel")]
    let results = items.par_iter().map(check).collect();
    #[cfg(not(feature = "parallel"))]
    let results = items.iter().map(check).collect();

    BatchVerification::from_results(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbsplus::ciphersuites::Bls12381Sha256;
    use crate::keys::pair::KeyPair;
    use crate::schemes::algorithms::BbsBls12381Sha256;
    use bls12_381_plus::Scalar;
    use ff::Field;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn collects_every_result() {
        let mut rng = StdRng::seed_from_u64(5);
        let keypair = KeyPair::<BbsBls12381Sha256>::random(&mut rng).unwrap();
        let generators = Generators::create::<Bls12381Sha256>(3).unwrap();
        let messages: Vec<BBSplusMessage> = (0..3).map(|_| BBSplusMessage::random(&mut rng)).collect();
        let signature = BBSplusSignature::sign(keypair.private_key(), &generators, &messages).unwrap();

        let mut tampered = messages.clone();
        tampered[1] = BBSplusMessage::new(tampered[1].value + Scalar::ONE);

        let items = [
            SignatureItem { public_key: keypair.public_key(), generators: &generators, messages: &messages, signature: &signature },
            SignatureItem { public_key: keypair.public_key(), generators: &generators, messages: &tampered, signature: &signature },
            SignatureItem { public_key: keypair.public_key(), generators: &generators, messages: &messages[..2], signature: &signature },
            SignatureItem { public_key: keypair.public_key(), generators: &generators, messages: &messages, signature: &signature },
        ];

        let outcome = verify_signatures(&items);
        assert!(!outcome.all_valid);
        assert_eq!(outcome.results.len(), 4);
        assert_eq!(outcome.results[0], Ok(()));
        assert_eq!(outcome.results[1], Err(Error::InvalidSignature));
        assert!(matches!(outcome.results[2], Err(Error::GeneratorCountMismatch { .. })));
        assert_eq!(outcome.results[3], Ok(()));
        assert_eq!(outcome.failures().map(|(i, _)| i).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn proofs_batch() {
        let mut rng = StdRng::seed_from_u64(6);
        let keypair = KeyPair::<BbsBls12381Sha256>::random(&mut rng).unwrap();
        let generators = Generators::create::<Bls12381Sha256>(4).unwrap();
        let messages: Vec<BBSplusMessage> = (0..4).map(|_| BBSplusMessage::random(&mut rng)).collect();
        let signature = BBSplusSignature::sign(keypair.private_key(), &generators, &messages).unwrap();
        let proof = BBSplusPoKSignature::derive::<Bls12381Sha256>(keypair.public_key(), &generators, &messages, &signature, &[2], b"n")
            .unwrap();
        let revealed: BTreeMap<usize, BBSplusMessage> = [(2, messages[2])].into_iter().collect();

        let items = [
            ProofItem { public_key: keypair.public_key(), generators: &generators, revealed_messages: &revealed, proof: &proof, nonce: b"n" },
            ProofItem { public_key: keypair.public_key(), generators: &generators, revealed_messages: &revealed, proof: &proof, nonce: b"n" },
        ];
        let outcome = verify_proofs::<Bls12381Sha256>(&items);
        assert!(outcome.all_valid);

        let items = [ProofItem { public_key: keypair.public_key(), generators: &generators, revealed_messages: &revealed, proof: &proof, nonce: b"other" }];
        let outcome = verify_proofs::<Bls12381Sha256>(&items);
        assert_eq!(outcome.results, vec![Err(Error::NonceMismatch)]);
    }

    #[test]
    fn empty_batch_is_valid() {
        assert!(verify_signatures(&[]).all_valid);
    }
}
