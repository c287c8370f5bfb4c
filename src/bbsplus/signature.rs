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

use bls12_381_plus::{multi_miller_loop, G1Affine, G1Projective, G2Prepared, Scalar};
use ff::Field;
use group::{Curve, Group};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use super::generators::Generators;
use super::keys::{BBSplusPublicKey, BBSplusSecretKey};
use crate::errors::Error;
use crate::utils::message::BBSplusMessage;
use crate::utils::util::bbsplus_utils::{calculate_random_scalars, ScalarExt};

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct BBSplusSignature {
    pub a: G1Projective,
    pub e: Scalar,
    pub s: Scalar,
}

impl BBSplusSignature {
    pub const SIGNATURE_LENGTH: usize = 112;

    pub fn to_bytes(&self) -> [u8; Self::SIGNATURE_LENGTH] {
        let mut bytes = [0u8; Self::SIGNATURE_LENGTH];
        bytes[0..48].copy_from_slice(&self.a.to_affine().to_compressed());
        bytes[48..80].copy_from_slice(&self.e.to_bytes_be());
        bytes[80..112].copy_from_slice(&self.s.to_bytes_be());
        bytes
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        if data.len() != Self::SIGNATURE_LENGTH {
            return Err(Error::KeyFormatError(format!(
                "signature must be {} bytes, got {}",
                Self::SIGNATURE_LENGTH,
                data.len()
            )));
        }

        let mut a_bytes = [0u8; 48];
        a_bytes.copy_from_slice(&data[0..48]);
        let a = Option::<G1Affine>::from(G1Affine::from_compressed(&a_bytes))
            .map(G1Projective::from)
            .ok_or_else(|| Error::KeyFormatError("signature A is not a valid G1 point".to_owned()))?;

        let mut scalar_bytes = [0u8; 32];
        scalar_bytes.copy_from_slice(&data[48..80]);
        let e = Scalar::from_bytes_be_checked(&scalar_bytes)
            .ok_or_else(|| Error::KeyFormatError("signature e is not a canonical scalar".to_owned()))?;
        scalar_bytes.copy_from_slice(&data[80..112]);
        let s = Scalar::from_bytes_be_checked(&scalar_bytes)
            .ok_or_else(|| Error::KeyFormatError("signature s is not a canonical scalar".to_owned()))?;

        Ok(Self { a, e, s })
    }

    /// Signs `messages` with fresh random `e` and `s`: two calls on the same input
    /// produce different, equally valid signatures.
    pub fn sign(sk: &BBSplusSecretKey, generators: &Generators, messages: &[BBSplusMessage]) -> Result<Self, Error> {
        Self::sign_with_rng(sk, generators, messages, &mut rand::thread_rng())
    }

    pub fn sign_with_rng<R: RngCore + CryptoRng>(
        sk: &BBSplusSecretKey,
        generators: &Generators,
        messages: &[BBSplusMessage],
        rng: &mut R,
    ) -> Result<Self, Error> {
        core_sign(sk, generators, messages, rng)
    }

    /// `Ok(false)` when the signature does not verify, `Err` when the inputs are malformed.
    pub fn verify(&self, pk: &BBSplusPublicKey, generators: &Generators, messages: &[BBSplusMessage]) -> Result<bool, Error> {
        core_verify(pk, self, messages, generators)
    }
}

/// B = g1 + h0 * s + h_1 * msg_1 + ... + h_L * msg_L
pub(crate) fn compute_b(generators: &Generators, s: Scalar, messages: &[BBSplusMessage]) -> Result<G1Projective, Error> {
    check_generators(generators, messages.len())?;

    let mut B = generators.g1_base_point + generators.h0 * s;
    for (h_i, m_i) in generators.message_generators.iter().zip(messages) {
        B += h_i * m_i.value;
    }
    Ok(B)
}

pub(crate) fn check_generators(generators: &Generators, count: usize) -> Result<(), Error> {
    if generators.message_generators.len() != count {
        return Err(Error::GeneratorCountMismatch { expected: count, found: generators.message_generators.len() });
    }
    Ok(())
}

fn core_sign<R: RngCore + CryptoRng>(
    sk: &BBSplusSecretKey,
    generators: &Generators,
    messages: &[BBSplusMessage],
    rng: &mut R,
) -> Result<BBSplusSignature, Error> {
    let L = messages.len();
    log::debug!("signing {} messages", L);

    let random_scalars = calculate_random_scalars(2, rng);
    let e = random_scalars[0];
    let s = random_scalars[1];

    let B = compute_b(generators, s, messages)?;

    // A = B * (1 / (SK + e))
    let inverse = Option::<Scalar>::from((sk.0 + e).invert())
        .ok_or_else(|| Error::SignatureGenerationError("SK + e is not invertible".to_owned()))?;
    let A = B * inverse;

    if bool::from(A.is_identity()) {
        return Err(Error::SignatureGenerationError("A == Identity_G1".to_owned()));
    }

    Ok(BBSplusSignature { a: A, e, s })
}

fn core_verify(
    pk: &BBSplusPublicKey,
    signature: &BBSplusSignature,
    messages: &[BBSplusMessage],
    generators: &Generators,
) -> Result<bool, Error> {
    let B = compute_b(generators, signature.s, messages)?;

    if bool::from(signature.a.is_identity()) {
        return Ok(false);
    }

    let BP2 = generators.g2_base_point;
    let A2 = pk.0 + BP2 * signature.e;

    // e(A, W + BP2 * e) * e(B, -BP2) == 1
    let term1 = (&signature.a.to_affine(), &G2Prepared::from(A2.to_affine()));
    let term2 = (&B.to_affine(), &G2Prepared::from(-BP2.to_affine()));

    let pairing = multi_miller_loop(&[term1, term2]).final_exponentiation();

    Ok(bool::from(pairing.is_identity()))
}
