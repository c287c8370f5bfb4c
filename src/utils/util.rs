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

pub mod bbsplus_utils {

    use bls12_381_plus::{G1Projective, Scalar};
    use elliptic_curve::hash2curve::{ExpandMsg, Expander};
    use group::Curve;
    use rand::{CryptoRng, RngCore};

    use crate::{bbsplus::ciphersuites::BbsCiphersuite, errors::Error};

    /// Integer to octet string of `len` bytes, big-endian.
    pub fn i2osp(value: usize, len: usize) -> Vec<u8> {
        let bytes = (value as u64).to_be_bytes();
        if len >= bytes.len() {
            let mut out = vec![0u8; len - bytes.len()];
            out.extend_from_slice(&bytes);
            out
        } else {
            bytes[bytes.len() - len..].to_vec()
        }
    }

    /// https://datatracker.ietf.org/doc/html/draft-irtf-cfrg-bbs-signatures-05#name-hash-to-scalar
    ///
    /// Expands `msg_octets` to `EXPAND_LEN` uniform bytes under `dst` and reduces them modulo r.
    pub fn hash_to_scalar<CS>(msg_octets: &[u8], dst: &[u8]) -> Result<Scalar, Error>
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        if dst.len() > 255 {
            return Err(Error::HashToScalarError);
        }

        let mut uniform_bytes = vec![0u8; CS::EXPAND_LEN];
        CS::Expander::expand_message(&[msg_octets], &[dst], CS::EXPAND_LEN)
            .map_err(|_| Error::HashToScalarError)?
            .fill_bytes(&mut uniform_bytes);

        let okm: &[u8; 48] = uniform_bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error::HashToScalarError)?;

        Ok(Scalar::from_okm(okm))
    }

    pub fn calculate_random_scalars<R: RngCore + CryptoRng>(count: usize, rng: &mut R) -> Vec<Scalar> {
        let mut random_scalars: Vec<Scalar> = Vec::with_capacity(count);
        for _ in 0..count {
            let mut buf = [0u8; 48];
            rng.fill_bytes(&mut buf);
            random_scalars.push(Scalar::from_okm(&buf));
        }

        random_scalars
    }

    pub fn serialize_g1(points: &[G1Projective]) -> Vec<u8> {
        let mut out = Vec::with_capacity(points.len() * 48);
        points.iter().for_each(|p| out.extend_from_slice(&p.to_affine().to_compressed()));
        out
    }

    pub fn get_remaining_indexes(length: usize, indexes: &[usize]) -> Vec<usize> {
        (0..length).filter(|i| !indexes.contains(i)).collect()
    }

    pub trait ScalarExt {
        fn to_bytes_be(&self) -> [u8; 32];
        fn from_bytes_be_checked(bytes: &[u8; 32]) -> Option<Self>
        where
            Self: Sized;
    }

    impl ScalarExt for Scalar {
        fn to_bytes_be(&self) -> [u8; 32] {
            self.to_be_bytes()
        }

        fn from_bytes_be_checked(bytes: &[u8; 32]) -> Option<Self> {
            Option::from(Scalar::from_be_bytes(bytes))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::bbsplus::ciphersuites::{Bls12381Sha256, Bls12381Shake256};

        #[test]
        fn i2osp_pads_and_truncates() {
            assert_eq!(i2osp(1, 2), vec![0u8, 1u8]);
            assert_eq!(i2osp(258, 4), vec![0u8, 0u8, 1u8, 2u8]);
            assert_eq!(i2osp(0x0102, 1), vec![2u8]);
            assert_eq!(i2osp(7, 10).len(), 10);
        }

        #[test]
        fn hash_to_scalar_depends_on_dst_and_suite() {
            let msg = b"some statement";
            let a = hash_to_scalar::<Bls12381Sha256>(msg, b"DST_A").unwrap();
            let b = hash_to_scalar::<Bls12381Sha256>(msg, b"DST_B").unwrap();
            let c = hash_to_scalar::<Bls12381Shake256>(msg, b"DST_A").unwrap();
            assert_ne!(a, b);
            assert_ne!(a, c);
            assert_eq!(a, hash_to_scalar::<Bls12381Sha256>(msg, b"DST_A").unwrap());
        }

        #[test]
        fn remaining_indexes() {
            assert_eq!(get_remaining_indexes(5, &[0, 2]), vec![1, 3, 4]);
            assert!(get_remaining_indexes(2, &[0, 1]).is_empty());
        }
    }
}
