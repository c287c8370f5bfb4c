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

//! Proof of knowledge of a signature with selective disclosure.
//!
//! The holder re-randomizes `(A, e, s)` into `(A', Abar, d)` with
//! `A' = A * r1`, `Abar = A' * (-e) + B * r1` and `d = B * r1 - h0 * r2`, and
//! proves knowledge of the exponents of the two relations
//!
//! ```text
//! Abar - d                    = A' * (-e) + h0 * r2
//! g1 + sum_{i in R} h_i * m_i = d * r3 - h0 * s' - sum_{j not in R} h_j * m_j
//! ```
//!
//! with `r3 = 1 / r1` and `s' = s - r2 * r3`. The verifier additionally checks
//! `e(A', W) == e(Abar, g2)`.

use std::collections::BTreeMap;

use bls12_381_plus::{multi_miller_loop, G1Affine, G1Projective, G2Prepared, Scalar};
use elliptic_curve::hash2curve::ExpandMsg;
use ff::Field;
use group::{Curve, Group};
use rand::{CryptoRng, RngCore};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::ciphersuites::BbsCiphersuite;
use super::generators::Generators;
use super::keys::BBSplusPublicKey;
use super::signature::{check_generators, compute_b, BBSplusSignature};
use crate::errors::Error;
use crate::utils::message::BBSplusMessage;
use crate::utils::util::bbsplus_utils::{
    calculate_random_scalars, get_remaining_indexes, hash_to_scalar, i2osp, serialize_g1, ScalarExt,
};

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BBSplusPoKSignature {
    A_prime: G1Projective,
    Abar: G1Projective,
    D: G1Projective,
    challenge: Scalar,
    e_cap: Scalar,
    r2_cap: Scalar,
    r3_cap: Scalar,
    s_cap: Scalar,
    m_cap: Vec<Scalar>,
    message_count: usize,
    revealed: BTreeMap<usize, BBSplusMessage>,
    nonce: Vec<u8>,
}

impl BBSplusPoKSignature {
    const FIXED_POINTS: usize = 3 * 48;
    const FIXED_SCALARS: usize = 5 * 32;

    /// Derives a proof revealing the messages at `revealed_indexes`, bound to `nonce`.
    pub fn derive<CS>(
        pk: &BBSplusPublicKey,
        generators: &Generators,
        messages: &[BBSplusMessage],
        signature: &BBSplusSignature,
        revealed_indexes: &[usize],
        nonce: &[u8],
    ) -> Result<Self, Error>
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        Self::derive_with_rng::<CS, _>(pk, generators, messages, signature, revealed_indexes, nonce, &mut rand::thread_rng())
    }

    pub fn derive_with_rng<CS, R>(
        pk: &BBSplusPublicKey,
        generators: &Generators,
        messages: &[BBSplusMessage],
        signature: &BBSplusSignature,
        revealed_indexes: &[usize],
        nonce: &[u8],
        rng: &mut R,
    ) -> Result<Self, Error>
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
        R: RngCore + CryptoRng,
    {
        core_proof_gen::<CS, R>(pk, signature, generators, messages, revealed_indexes, nonce, rng)
    }

    /// Checks the proof against the caller's view of the revealed messages and nonce.
    pub fn verify<CS>(
        &self,
        pk: &BBSplusPublicKey,
        generators: &Generators,
        revealed_messages: &BTreeMap<usize, BBSplusMessage>,
        nonce: &[u8],
    ) -> Result<(), Error>
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        core_proof_verify::<CS>(pk, self, generators, revealed_messages, nonce)
    }

    pub fn message_count(&self) -> usize {
        self.message_count
    }

    pub fn revealed_indexes(&self) -> Vec<usize> {
        self.revealed.keys().copied().collect()
    }

    pub fn revealed_messages(&self) -> &BTreeMap<usize, BBSplusMessage> {
        &self.revealed
    }

    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    // message_count: u32 BE            //4
    // R: u32 BE                        //4
    // (index: u32 BE, m_i: Scalar)*R   //36 * R
    // nonce_len: u32 BE || nonce
    // A_prime, Abar, D                 //48 * 3
    // c, e_cap, r2_cap, r3_cap, s_cap  //32 * 5
    // m_cap                            //32 * (L - R)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = Vec::new();

        bytes.extend_from_slice(&i2osp(self.message_count, 4));
        bytes.extend_from_slice(&i2osp(self.revealed.len(), 4));
        for (i, m) in &self.revealed {
            bytes.extend_from_slice(&i2osp(*i, 4));
            bytes.extend_from_slice(&m.to_bytes_be());
        }
        bytes.extend_from_slice(&i2osp(self.nonce.len(), 4));
        bytes.extend_from_slice(&self.nonce);

        bytes.extend_from_slice(&serialize_g1(&[self.A_prime, self.Abar, self.D]));
        bytes.extend_from_slice(&self.challenge.to_bytes_be());
        bytes.extend_from_slice(&self.e_cap.to_bytes_be());
        bytes.extend_from_slice(&self.r2_cap.to_bytes_be());
        bytes.extend_from_slice(&self.r3_cap.to_bytes_be());
        bytes.extend_from_slice(&self.s_cap.to_bytes_be());
        self.m_cap.iter().for_each(|v| bytes.extend_from_slice(&v.to_bytes_be()));
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut reader = ByteReader { bytes, offset: 0 };

        let message_count = reader.u32()?;
        let R = reader.u32()?;
        if R > message_count {
            return Err(malformed("more revealed messages than messages"));
        }

        let mut revealed = BTreeMap::new();
        for _ in 0..R {
            let index = reader.u32()?;
            if index >= message_count {
                return Err(malformed("revealed index out of range"));
            }
            let m = reader.scalar()?;
            if revealed.insert(index, BBSplusMessage::new(m)).is_some() {
                return Err(malformed("duplicated revealed index"));
            }
        }

        let nonce_len = reader.u32()?;
        let nonce = reader.take(nonce_len)?.to_vec();

        let U = message_count - R;
        if reader.remaining() != Self::FIXED_POINTS + Self::FIXED_SCALARS + 32 * U {
            return Err(malformed("unexpected proof length"));
        }

        let A_prime = reader.g1()?;
        let Abar = reader.g1()?;
        let D = reader.g1()?;
        let challenge = reader.scalar()?;
        let e_cap = reader.scalar()?;
        let r2_cap = reader.scalar()?;
        let r3_cap = reader.scalar()?;
        let s_cap = reader.scalar()?;
        let m_cap = (0..U).map(|_| reader.scalar()).collect::<Result<Vec<_>, _>>()?;

        Ok(Self { A_prime, Abar, D, challenge, e_cap, r2_cap, r3_cap, s_cap, m_cap, message_count, revealed, nonce })
    }
}

/// Proofs travel as the hex of their byte encoding, so deserializing runs the
/// same checks as `from_bytes`.
impl Serialize for BBSplusPoKSignature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for BBSplusPoKSignature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(encoded).map_err(D::Error::custom)?;
        Self::from_bytes(&bytes).map_err(D::Error::custom)
    }
}

fn malformed(reason: &str) -> Error {
    Error::InvalidProof(format!("malformed encoding: {}", reason))
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], Error> {
        let end = self.offset.checked_add(len).filter(|&end| end <= self.bytes.len()).ok_or_else(|| malformed("truncated"))?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn u32(&mut self) -> Result<usize, Error> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(buf) as usize)
    }

    fn scalar(&mut self) -> Result<Scalar, Error> {
        let mut buf = [0u8; 32];
        buf.copy_from_slice(self.take(32)?);
        Scalar::from_bytes_be_checked(&buf).ok_or_else(|| malformed("not a canonical scalar"))
    }

    fn g1(&mut self) -> Result<G1Projective, Error> {
        let mut buf = [0u8; 48];
        buf.copy_from_slice(self.take(48)?);
        Option::<G1Affine>::from(G1Affine::from_compressed(&buf))
            .map(G1Projective::from)
            .ok_or_else(|| malformed("not a valid G1 point"))
    }
}

fn core_proof_gen<CS, R>(
    pk: &BBSplusPublicKey,
    signature: &BBSplusSignature,
    generators: &Generators,
    messages: &[BBSplusMessage],
    revealed_indexes: &[usize],
    nonce: &[u8],
    rng: &mut R,
) -> Result<BBSplusPoKSignature, Error>
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
    R: RngCore + CryptoRng,
{
    let L = messages.len();
    check_generators(generators, L)?;

    let mut revealed_indexes = revealed_indexes.to_vec();
    revealed_indexes.sort_unstable();
    revealed_indexes.dedup();

    if let Some(&invalid_index) = revealed_indexes.iter().find(|&&i| i >= L) {
        return Err(Error::GeneratorCountMismatch { expected: L, found: invalid_index + 1 });
    }

    let hidden_indexes = get_remaining_indexes(L, &revealed_indexes);
    let U = hidden_indexes.len();
    log::debug!("deriving proof over {} messages, revealing {}", L, L - U);

    let revealed: BTreeMap<usize, BBSplusMessage> = revealed_indexes.iter().map(|&i| (i, messages[i])).collect();

    if !signature.verify(pk, generators, messages)? {
        return Err(Error::ProofGenError("signature does not verify over the given messages".to_owned()));
    }

    let random_scalars = calculate_random_scalars(6 + U, rng);
    let r1 = random_scalars[0];
    let r2 = random_scalars[1];
    let e_tilde = random_scalars[2];
    let r2_tilde = random_scalars[3];
    let r3_tilde = random_scalars[4];
    let s_tilde = random_scalars[5];
    let m_tilde = &random_scalars[6..];

    let r3 = Option::<Scalar>::from(r1.invert()).ok_or_else(|| Error::ProofGenError("r1 is not invertible".to_owned()))?;

    let B = compute_b(generators, signature.s, messages)?;

    let A_prime = signature.a * r1;
    let Abar = A_prime * (-signature.e) + B * r1;
    let D = B * r1 - generators.h0 * r2;
    let s_prime = signature.s - r2 * r3;

    if bool::from(A_prime.is_identity()) {
        return Err(Error::ProofGenError("A' == Identity_G1".to_owned()));
    }

    let C1 = A_prime * (-e_tilde) + generators.h0 * r2_tilde;
    let mut C2 = D * r3_tilde - generators.h0 * s_tilde;
    for (idx, &j) in hidden_indexes.iter().enumerate() {
        C2 -= generators.message_generators[j] * m_tilde[idx];
    }

    let challenge = proof_challenge_calculate::<CS>(&[A_prime, Abar, D, C1, C2], &revealed, nonce)?;

    // response = blinding - c * secret
    let e_cap = e_tilde - challenge * signature.e;
    let r2_cap = r2_tilde - challenge * r2;
    let r3_cap = r3_tilde - challenge * r3;
    let s_cap = s_tilde - challenge * s_prime;
    let m_cap: Vec<Scalar> = hidden_indexes
        .iter()
        .enumerate()
        .map(|(idx, &j)| m_tilde[idx] - challenge * messages[j].value)
        .collect();

    Ok(BBSplusPoKSignature {
        A_prime,
        Abar,
        D,
        challenge,
        e_cap,
        r2_cap,
        r3_cap,
        s_cap,
        m_cap,
        message_count: L,
        revealed,
        nonce: nonce.to_vec(),
    })
}

/// c = hash_to_scalar(A' || Abar || D || C1 || C2 || I2OSP(R, 8) || (I2OSP(i, 8) || m_i)* || I2OSP(len(nonce), 8) || nonce)
fn proof_challenge_calculate<CS>(
    points: &[G1Projective],
    revealed: &BTreeMap<usize, BBSplusMessage>,
    nonce: &[u8],
) -> Result<Scalar, Error>
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
{
    let mut c_arr: Vec<u8> = serialize_g1(points);
    c_arr.extend_from_slice(&i2osp(revealed.len(), 8));
    for (i, m) in revealed {
        c_arr.extend_from_slice(&i2osp(*i, 8));
        c_arr.extend_from_slice(&m.to_bytes_be());
    }
    c_arr.extend_from_slice(&i2osp(nonce.len(), 8));
    c_arr.extend_from_slice(nonce);

    hash_to_scalar::<CS>(&c_arr, &CS::challenge_dst())
}

fn core_proof_verify<CS>(
    pk: &BBSplusPublicKey,
    proof: &BBSplusPoKSignature,
    generators: &Generators,
    revealed_messages: &BTreeMap<usize, BBSplusMessage>,
    nonce: &[u8],
) -> Result<(), Error>
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
{
    let L = proof.message_count;
    check_generators(generators, L)?;

    if proof.revealed.len() > L || proof.revealed.keys().any(|&i| i >= L) {
        return Err(Error::InvalidProof("revealed index out of range".to_owned()));
    }

    if !revealed_messages.keys().eq(proof.revealed.keys()) {
        return Err(Error::RevealedSetMismatch);
    }

    if proof.nonce != nonce {
        return Err(Error::NonceMismatch);
    }

    if bool::from(proof.A_prime.is_identity()) {
        return Err(Error::InvalidProof("A' == Identity_G1".to_owned()));
    }

    let revealed_indexes: Vec<usize> = revealed_messages.keys().copied().collect();
    let hidden_indexes = get_remaining_indexes(L, &revealed_indexes);
    if hidden_indexes.len() != proof.m_cap.len() {
        return Err(Error::InvalidProof("wrong number of hidden message responses".to_owned()));
    }

    let c = proof.challenge;

    // C1 = A' * (-e^) + h0 * r2^ + (Abar - D) * c
    let C1 = proof.A_prime * (-proof.e_cap) + generators.h0 * proof.r2_cap + (proof.Abar - proof.D) * c;

    // C2 = D * r3^ - h0 * s^ - sum h_j * m^_j + (g1 + sum h_i * m_i) * c
    let mut T = generators.g1_base_point;
    for (&i, m) in revealed_messages {
        T += generators.message_generators[i] * m.value;
    }
    let mut C2 = proof.D * proof.r3_cap - generators.h0 * proof.s_cap + T * c;
    for (idx, &j) in hidden_indexes.iter().enumerate() {
        C2 -= generators.message_generators[j] * proof.m_cap[idx];
    }

    let challenge = proof_challenge_calculate::<CS>(&[proof.A_prime, proof.Abar, proof.D, C1, C2], revealed_messages, nonce)?;

    if challenge != proof.challenge {
        return Err(Error::InvalidProof("invalid challenge".to_owned()));
    }

    // e(A', W) * e(Abar, -BP2) == 1
    let term1 = (&proof.A_prime.to_affine(), &G2Prepared::from(pk.0.to_affine()));
    let term2 = (&proof.Abar.to_affine(), &G2Prepared::from(-generators.g2_base_point.to_affine()));

    let pairing = multi_miller_loop(&[term1, term2]).final_exponentiation();

    if bool::from(pairing.is_identity()) {
        Ok(())
    } else {
        Err(Error::InvalidProof("pairing check failed".to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbsplus::ciphersuites::{Bls12381Sha256, Bls12381Shake256};
    use crate::keys::pair::KeyPair;
    use crate::schemes::algorithms::BBSplus;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Fixture {
        pk: BBSplusPublicKey,
        generators: Generators,
        messages: Vec<BBSplusMessage>,
        signature: BBSplusSignature,
    }

    fn fixture<CS>(count: usize) -> Fixture
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        let mut rng = StdRng::seed_from_u64(1234);
        let keypair = KeyPair::<BBSplus<CS>>::random(&mut rng).unwrap();
        let generators = Generators::create::<CS>(count).unwrap();
        let messages: Vec<BBSplusMessage> = (0..count).map(|_| BBSplusMessage::random(&mut rng)).collect();
        let signature = BBSplusSignature::sign(keypair.private_key(), &generators, &messages).unwrap();
        let (_, pk) = keypair.into_parts();
        Fixture { pk, generators, messages, signature }
    }

    fn revealed(messages: &[BBSplusMessage], indexes: &[usize]) -> BTreeMap<usize, BBSplusMessage> {
        indexes.iter().map(|&i| (i, messages[i])).collect()
    }

    fn derive_and_verify<CS>(count: usize, indexes: &[usize])
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        let f = fixture::<CS>(count);
        let nonce = b"verifier-nonce";
        let proof = BBSplusPoKSignature::derive::<CS>(&f.pk, &f.generators, &f.messages, &f.signature, indexes, nonce).unwrap();
        proof.verify::<CS>(&f.pk, &f.generators, &revealed(&f.messages, indexes), nonce).unwrap();
    }

    #[test]
    fn proof_round_trip_sha256() {
        derive_and_verify::<Bls12381Sha256>(5, &[0, 2]);
    }

    #[test]
    fn proof_round_trip_shake256() {
        derive_and_verify::<Bls12381Shake256>(5, &[1, 3, 4]);
    }

    #[test]
    fn reveal_nothing_and_everything() {
        derive_and_verify::<Bls12381Sha256>(4, &[]);
        derive_and_verify::<Bls12381Sha256>(4, &[0, 1, 2, 3]);
    }

    #[test]
    fn wrong_nonce() {
        let f = fixture::<Bls12381Sha256>(5);
        let proof = BBSplusPoKSignature::derive::<Bls12381Sha256>(&f.pk, &f.generators, &f.messages, &f.signature, &[0, 2], b"nonce-1").unwrap();
        let res = proof.verify::<Bls12381Sha256>(&f.pk, &f.generators, &revealed(&f.messages, &[0, 2]), b"nonce-2");
        assert_eq!(res, Err(Error::NonceMismatch));
    }

    #[test]
    fn altered_revealed_value() {
        let f = fixture::<Bls12381Sha256>(5);
        let proof = BBSplusPoKSignature::derive::<Bls12381Sha256>(&f.pk, &f.generators, &f.messages, &f.signature, &[0, 2], b"nonce").unwrap();
        let mut disclosed = revealed(&f.messages, &[0, 2]);
        disclosed.insert(2, BBSplusMessage::new(f.messages[2].value + Scalar::ONE));
        let res = proof.verify::<Bls12381Sha256>(&f.pk, &f.generators, &disclosed, b"nonce");
        assert!(matches!(res, Err(Error::InvalidProof(_))));
    }

    #[test]
    fn mismatched_revealed_set() {
        let f = fixture::<Bls12381Sha256>(5);
        let proof = BBSplusPoKSignature::derive::<Bls12381Sha256>(&f.pk, &f.generators, &f.messages, &f.signature, &[0, 2], b"nonce").unwrap();
        let res = proof.verify::<Bls12381Sha256>(&f.pk, &f.generators, &revealed(&f.messages, &[0]), b"nonce");
        assert_eq!(res, Err(Error::RevealedSetMismatch));
    }

    #[test]
    fn out_of_range_index() {
        let f = fixture::<Bls12381Sha256>(3);
        let res = BBSplusPoKSignature::derive::<Bls12381Sha256>(&f.pk, &f.generators, &f.messages, &f.signature, &[3], b"nonce");
        assert!(matches!(res, Err(Error::GeneratorCountMismatch { .. })));
    }

    #[test]
    fn invalid_signature_is_rejected() {
        let f = fixture::<Bls12381Sha256>(3);
        let mut messages = f.messages.clone();
        messages[0] = BBSplusMessage::new(messages[0].value + Scalar::ONE);
        let res = BBSplusPoKSignature::derive::<Bls12381Sha256>(&f.pk, &f.generators, &messages, &f.signature, &[0], b"nonce");
        assert!(matches!(res, Err(Error::ProofGenError(_))));
    }

    #[test]
    fn wrong_public_key() {
        let f = fixture::<Bls12381Sha256>(3);
        let other = KeyPair::<BBSplus<Bls12381Sha256>>::random(&mut StdRng::seed_from_u64(99)).unwrap();
        let proof = BBSplusPoKSignature::derive::<Bls12381Sha256>(&f.pk, &f.generators, &f.messages, &f.signature, &[1], b"nonce").unwrap();
        let res = proof.verify::<Bls12381Sha256>(other.public_key(), &f.generators, &revealed(&f.messages, &[1]), b"nonce");
        assert!(matches!(res, Err(Error::InvalidProof(_))));
    }

    #[test]
    fn proofs_are_unlinkable() {
        let f = fixture::<Bls12381Sha256>(3);
        let a = BBSplusPoKSignature::derive::<Bls12381Sha256>(&f.pk, &f.generators, &f.messages, &f.signature, &[0], b"n1").unwrap();
        let b = BBSplusPoKSignature::derive::<Bls12381Sha256>(&f.pk, &f.generators, &f.messages, &f.signature, &[0], b"n2").unwrap();
        let c = BBSplusPoKSignature::derive::<Bls12381Sha256>(&f.pk, &f.generators, &f.messages, &f.signature, &[0], b"n1").unwrap();
        assert_ne!(a.to_bytes(), b.to_bytes());
        assert_ne!(a.to_bytes(), c.to_bytes());
        assert_ne!(a.A_prime, f.signature.a);
    }

    #[test]
    fn bytes_round_trip() {
        let f = fixture::<Bls12381Sha256>(4);
        let proof = BBSplusPoKSignature::derive::<Bls12381Sha256>(&f.pk, &f.generators, &f.messages, &f.signature, &[3, 1], b"nonce").unwrap();
        let bytes = proof.to_bytes();
        let decoded = BBSplusPoKSignature::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, proof);
        assert_eq!(decoded.revealed_indexes(), vec![1, 3]);
        decoded.verify::<Bls12381Sha256>(&f.pk, &f.generators, &revealed(&f.messages, &[1, 3]), b"nonce").unwrap();

        assert!(matches!(BBSplusPoKSignature::from_bytes(&bytes[..bytes.len() - 1]), Err(Error::InvalidProof(_))));
    }

    #[test]
    fn out_of_range_revealed_index_is_rejected() {
        let f = fixture::<Bls12381Sha256>(5);
        let mut proof = BBSplusPoKSignature::derive::<Bls12381Sha256>(&f.pk, &f.generators, &f.messages, &f.signature, &[0, 2], b"nonce").unwrap();
        proof.revealed.insert(10, f.messages[1]);

        let mut disclosed = revealed(&f.messages, &[0, 2]);
        disclosed.insert(10, f.messages[1]);
        let res = proof.verify::<Bls12381Sha256>(&f.pk, &f.generators, &disclosed, b"nonce");
        assert_eq!(res, Err(Error::InvalidProof("revealed index out of range".to_owned())));
    }

    #[test]
    fn serde_goes_through_byte_checks() {
        let f = fixture::<Bls12381Sha256>(5);
        let proof = BBSplusPoKSignature::derive::<Bls12381Sha256>(&f.pk, &f.generators, &f.messages, &f.signature, &[0, 2], b"nonce").unwrap();

        let json = serde_json::to_string(&proof).unwrap();
        let decoded: BBSplusPoKSignature = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, proof);

        // first revealed index sits right after message_count and R
        let mut bytes = proof.to_bytes();
        bytes[8..12].copy_from_slice(&10u32.to_be_bytes());
        let forged = serde_json::Value::String(hex::encode(&bytes));
        assert!(serde_json::from_value::<BBSplusPoKSignature>(forged).is_err());
    }

    #[test]
    fn tampered_response() {
        let f = fixture::<Bls12381Sha256>(4);
        let mut proof = BBSplusPoKSignature::derive::<Bls12381Sha256>(&f.pk, &f.generators, &f.messages, &f.signature, &[0], b"nonce").unwrap();
        proof.m_cap[0] += Scalar::ONE;
        let res = proof.verify::<Bls12381Sha256>(&f.pk, &f.generators, &revealed(&f.messages, &[0]), b"nonce");
        assert!(matches!(res, Err(Error::InvalidProof(_))));
    }
}
