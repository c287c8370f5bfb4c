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
use rand::{CryptoRng, RngCore};

use crate::bbsplus::ciphersuites::BbsCiphersuite;
use crate::bbsplus::keys::{key_gen, sk_to_pk, BBSplusPublicKey, BBSplusSecretKey, KeyDocument, BLS12381_G2_KEY_TYPE};
use crate::errors::Error;
use crate::schemes::algorithms::{BBSplus, Scheme};

/// An issuer key pair. The public half is what verifiers receive.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct KeyPair<S: Scheme> {
    pub(crate) public: S::PubKey,
    pub(crate) private: S::PrivKey,
}

impl<S> KeyPair<S>
where
    S: Scheme,
{
    pub fn public_key(&self) -> &S::PubKey {
        &self.public
    }

    pub fn private_key(&self) -> &S::PrivKey {
        &self.private
    }

    /// Returns the couple `(sk, pk)`.
    pub fn into_parts(self) -> (S::PrivKey, S::PubKey) {
        (self.private, self.public)
    }
}

impl<CS: BbsCiphersuite> KeyPair<BBSplus<CS>> {
    /// Deterministic key generation from at least `CS::IKM_LEN` bytes of key material.
    pub fn generate(key_material: &[u8], key_info: Option<&[u8]>, key_dst: Option<&[u8]>) -> Result<Self, Error>
    where
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        let sk = key_gen::<CS>(key_material, key_info, key_dst)?;
        Ok(Self::from_secret_key(BBSplusSecretKey(sk)))
    }

    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, Error>
    where
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        let mut key_material = vec![0u8; CS::IKM_LEN];
        rng.fill_bytes(&mut key_material);
        Self::generate(&key_material, None, None)
    }

    pub fn from_secret_key(private: BBSplusSecretKey) -> Self {
        let public = BBSplusPublicKey(sk_to_pk(private.0));
        Self { public, private }
    }

    /// Rebuilds a key pair from a key document carrying both halves.
    pub fn from_key_document(document: &KeyDocument) -> Result<Self, Error> {
        let public = document.public_key()?;
        let private = document
            .secret_key()?
            .ok_or_else(|| Error::KeyFormatError("key document has no private key".to_owned()))?;

        let keypair = Self::from_secret_key(private);
        if keypair.public != public {
            return Err(Error::KeyFormatError("private key does not match public key".to_owned()));
        }
        Ok(keypair)
    }

    pub fn to_key_document(&self, id: Option<&str>, controller: Option<&str>) -> KeyDocument {
        KeyDocument {
            id: id.map(str::to_owned),
            controller: controller.map(str::to_owned),
            key_type: BLS12381_G2_KEY_TYPE.to_owned(),
            public_key_base58: self.public.to_base58(),
            private_key_base58: Some(self.private.to_base58()),
        }
    }

    /// Key document without the private key, safe to publish.
    pub fn to_public_key_document(&self, id: Option<&str>, controller: Option<&str>) -> KeyDocument {
        KeyDocument { private_key_base58: None, ..self.to_key_document(id, controller) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemes::algorithms::BbsBls12381Shake256;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn secret_key_determines_the_pair() {
        let keypair = KeyPair::<BbsBls12381Shake256>::random(&mut StdRng::seed_from_u64(11)).unwrap();
        let rebuilt = KeyPair::<BbsBls12381Shake256>::from_secret_key(keypair.private_key().clone());
        assert_eq!(rebuilt, keypair);

        let (sk, pk) = rebuilt.into_parts();
        assert_eq!(sk.public_key(), pk);
    }

    #[test]
    fn public_key_documents_omit_the_private_key() {
        let keypair = KeyPair::<BbsBls12381Shake256>::random(&mut StdRng::seed_from_u64(12)).unwrap();
        let document = keypair.to_public_key_document(Some("did:example:issuer#bbs"), None);
        assert!(document.private_key_base58.is_none());
        assert_eq!(&document.public_key().unwrap(), keypair.public_key());
        assert!(matches!(
            KeyPair::<BbsBls12381Shake256>::from_key_document(&document),
            Err(Error::KeyFormatError(_))
        ));
    }
}
