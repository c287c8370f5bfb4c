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

use bls12_381_plus::Scalar;
use elliptic_curve::hash2curve::ExpandMsg;
use ff::Field;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::bbsplus::ciphersuites::BbsCiphersuite;
use crate::errors::Error;
use crate::utils::util::bbsplus_utils::hash_to_scalar;

/// A signed message: one field element, bound by position to one message generator.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct BBSplusMessage {
    pub value: Scalar,
}

impl BBSplusMessage {
    pub fn new(msg: Scalar) -> Self {
        Self { value: msg }
    }

    pub fn random(rng: impl RngCore) -> Self {
        Self::new(Scalar::random(rng))
    }

    pub fn map_message_to_scalar_as_hash<CS>(data: &[u8], dst: Option<&[u8]>) -> Result<Self, Error>
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        let default_dst = CS::map_msg_dst();
        let dst = dst.unwrap_or(&default_dst);

        let scalar = hash_to_scalar::<CS>(data, dst)?;
        Ok(Self { value: scalar })
    }

    /// Maps each octet string to a scalar, preserving order.
    pub fn messages_to_scalar<CS>(messages: &[impl AsRef<[u8]>]) -> Result<Vec<Self>, Error>
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        messages
            .iter()
            .map(|m| Self::map_message_to_scalar_as_hash::<CS>(m.as_ref(), None))
            .collect()
    }

    //in BE
    pub fn to_bytes_be(&self) -> [u8; 32] {
        self.value.to_be_bytes()
    }
}

impl From<Scalar> for BBSplusMessage {
    fn from(value: Scalar) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbsplus::ciphersuites::Bls12381Sha256;

    #[test]
    fn mapping_is_deterministic_and_order_preserving() {
        let msgs = ["a", "b", "c"];
        let first = BBSplusMessage::messages_to_scalar::<Bls12381Sha256>(&msgs).unwrap();
        let second = BBSplusMessage::messages_to_scalar::<Bls12381Sha256>(&msgs).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert_ne!(first[0], first[1]);

        let reversed = BBSplusMessage::messages_to_scalar::<Bls12381Sha256>(&["c", "b", "a"]).unwrap();
        assert_eq!(first[0], reversed[2]);
    }

    #[test]
    fn custom_dst_changes_scalar() {
        let a = BBSplusMessage::map_message_to_scalar_as_hash::<Bls12381Sha256>(b"msg", None).unwrap();
        let b = BBSplusMessage::map_message_to_scalar_as_hash::<Bls12381Sha256>(b"msg", Some(b"OTHER_DST")).unwrap();
        assert_ne!(a, b);
    }
}
