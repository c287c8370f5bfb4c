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

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use bls12_381_plus::{G1Projective, G2Projective};
use elliptic_curve::hash2curve::{ExpandMsg, Expander};
use group::Curve;
use parking_lot::RwLock;
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use super::ciphersuites::BbsCiphersuite;
use crate::errors::Error;
use crate::utils::util::bbsplus_utils::i2osp;

/// Bases used by signing, verification and proofs.
///
/// `g1` and `h0` are shared by every message count; `message_generators[i]`
/// is bound to the message at position `i`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Generators {
    pub g1_base_point: G1Projective,
    pub g2_base_point: G2Projective,
    pub h0: G1Projective,
    pub message_generators: Vec<G1Projective>,
}

impl Serialize for Generators {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let result: Vec<String> = self
            .message_generators
            .iter()
            .map(|item| hex::encode(item.to_affine().to_compressed()))
            .collect();

        let mut state = serializer.serialize_struct("Generators", 4)?;
        state.serialize_field("G1", &hex::encode(self.g1_base_point.to_affine().to_compressed()))?;
        state.serialize_field("G2", &hex::encode(self.g2_base_point.to_affine().to_compressed()))?;
        state.serialize_field("H0", &hex::encode(self.h0.to_affine().to_compressed()))?;
        state.serialize_field("MsgGenerators", &result)?;
        state.end()
    }
}

type CacheKey = (&'static [u8], usize);

/// Largest message count whose generators are kept in the process-wide cache.
/// Bigger sets are computed per call, so counts read from untrusted proofs
/// cannot grow the cache without bound.
pub const MAX_CACHED_MESSAGES: usize = 256;

static GENERATORS_CACHE: OnceLock<RwLock<HashMap<CacheKey, Arc<Generators>>>> = OnceLock::new();

impl Generators {
    /// Generators for `count` messages, served from the process-wide cache.
    ///
    /// Entries are inserted once per `(ciphersuite, count)` and never mutated.
    /// Two threads racing on the same key may both compute the value; the first
    /// insertion wins and both observe the same `Arc`.
    pub fn derive<CS>(count: usize) -> Result<Arc<Generators>, Error>
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        if count > MAX_CACHED_MESSAGES {
            log::debug!("deriving uncached generators for {} messages", count);
            return Ok(Arc::new(Self::create::<CS>(count)?));
        }

        let cache = GENERATORS_CACHE.get_or_init(|| RwLock::new(HashMap::new()));
        let key: CacheKey = (CS::ID, count);

        if let Some(generators) = cache.read().get(&key) {
            log::trace!("generators cache hit for {} messages", count);
            return Ok(Arc::clone(generators));
        }

        log::debug!("deriving generators for {} messages", count);
        let generators = Arc::new(Self::create::<CS>(count)?);

        let mut writer = cache.write();
        let entry = writer.entry(key).or_insert(generators);
        Ok(Arc::clone(entry))
    }

    /// Computes the generators for `count` messages without touching the cache.
    pub fn create<CS>(count: usize) -> Result<Generators, Error>
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        // h0 heads the chain, message generators follow
        let points = Self::create_generators::<CS>(count + 1)?;

        Ok(Generators {
            g1_base_point: Self::create_g1_base_point::<CS>()?,
            g2_base_point: G2Projective::GENERATOR,
            h0: points[0],
            message_generators: points[1..].to_vec(),
        })
    }

    pub fn len(&self) -> usize {
        self.message_generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.message_generators.is_empty()
    }

    fn create_generators<CS>(len: usize) -> Result<Vec<G1Projective>, Error>
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        let mut generators: Vec<G1Projective> = Vec::with_capacity(len);

        let mut v = vec![0u8; CS::EXPAND_LEN];
        CS::Expander::expand_message(&[CS::GENERATOR_SEED], &[CS::GENERATOR_SEED_DST], CS::EXPAND_LEN)
            .map_err(|_| Error::HashToScalarError)?
            .fill_bytes(&mut v);

        let mut n = 1usize;
        while generators.len() < len {
            v = Self::next_seed::<CS>(&v, n)?;
            n += 1;

            let candidate = G1Projective::hash::<CS::Expander>(&v, CS::GENERATOR_DST);
            if !generators.contains(&candidate) {
                generators.push(candidate);
            }
        }

        Ok(generators)
    }

    fn create_g1_base_point<CS>() -> Result<G1Projective, Error>
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        let mut v = vec![0u8; CS::EXPAND_LEN];
        CS::Expander::expand_message(&[CS::GENERATOR_SEED_BP], &[CS::GENERATOR_SEED_DST], CS::EXPAND_LEN)
            .map_err(|_| Error::HashToScalarError)?
            .fill_bytes(&mut v);

        let v = Self::next_seed::<CS>(&v, 1)?;
        Ok(G1Projective::hash::<CS::Expander>(&v, CS::GENERATOR_DST))
    }

    /// v = expand_message(v || I2OSP(n, 4), seed_dst, expand_len)
    fn next_seed<CS>(v: &[u8], n: usize) -> Result<Vec<u8>, Error>
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        let input = [v, &i2osp(n, 4)].concat();
        let mut out = vec![0u8; CS::EXPAND_LEN];
        CS::Expander::expand_message(&[&input], &[CS::GENERATOR_SEED_DST], CS::EXPAND_LEN)
            .map_err(|_| Error::HashToScalarError)?
            .fill_bytes(&mut out);
        Ok(out)
    }
}
