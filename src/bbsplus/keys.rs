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

use bls12_381_plus::{G2Affine, G2Projective, Scalar};
use elliptic_curve::hash2curve::ExpandMsg;
use ff::Field;
use group::Curve;
use serde::{Deserialize, Serialize};

use super::ciphersuites::BbsCiphersuite;
use crate::errors::Error;
use crate::utils::util::bbsplus_utils::{hash_to_scalar, i2osp};

/// Key type name used by linked-data key documents for BLS12-381 G2 keys.
pub const BLS12381_G2_KEY_TYPE: &str = "Bls12381G2Key2020";

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct BBSplusPublicKey(pub G2Projective);

impl BBSplusPublicKey {
    pub const BYTES: usize = G2Affine::COMPRESSED_BYTES;

    pub fn to_bytes(&self) -> [u8; G2Affine::COMPRESSED_BYTES] {
        self.0.to_affine().to_compressed()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; G2Affine::COMPRESSED_BYTES] = bytes.try_into().map_err(|_| {
            Error::KeyFormatError(format!(
                "public key must be {} bytes, got {}",
                G2Affine::COMPRESSED_BYTES,
                bytes.len()
            ))
        })?;
        let point = Option::<G2Affine>::from(G2Affine::from_compressed(&bytes))
            .ok_or_else(|| Error::KeyFormatError("not a valid G2 point".to_owned()))?;
        if bool::from(point.is_identity()) {
            return Err(Error::KeyFormatError("public key is the identity".to_owned()));
        }
        Ok(Self(G2Projective::from(point)))
    }

    pub fn encode(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn decode(hex_str: &str) -> Result<Self, Error> {
        let bytes = hex::decode(hex_str).map_err(|e| Error::KeyFormatError(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.to_bytes()).into_string()
    }

    pub fn from_base58(encoded: &str) -> Result<Self, Error> {
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| Error::KeyFormatError(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BBSplusSecretKey(pub Scalar);

impl core::fmt::Debug for BBSplusSecretKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "BBSplusSecretKey(<private>)")
    }
}

impl BBSplusSecretKey {
    pub const BYTES: usize = Scalar::BYTES;

    //in BE order
    pub fn to_bytes(&self) -> [u8; Scalar::BYTES] {
        self.0.to_be_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; Scalar::BYTES] = bytes.try_into().map_err(|_| {
            Error::KeyFormatError(format!("secret key must be {} bytes, got {}", Scalar::BYTES, bytes.len()))
        })?;
        let s = Option::<Scalar>::from(Scalar::from_be_bytes(&bytes))
            .ok_or_else(|| Error::KeyFormatError("secret key is not a canonical scalar".to_owned()))?;
        if bool::from(s.is_zero()) {
            return Err(Error::KeyFormatError("secret key is zero".to_owned()));
        }
        Ok(Self(s))
    }

    pub fn encode(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn decode(hex_str: &str) -> Result<Self, Error> {
        let bytes = hex::decode(hex_str).map_err(|e| Error::KeyFormatError(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.to_bytes()).into_string()
    }

    pub fn from_base58(encoded: &str) -> Result<Self, Error> {
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| Error::KeyFormatError(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn public_key(&self) -> BBSplusPublicKey {
        BBSplusPublicKey(sk_to_pk(self.0))
    }
}

/// Key document as exchanged alongside linked-data credentials.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    #[serde(rename = "type")]
    pub key_type: String,
    pub public_key_base58: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_base58: Option<String>,
}

impl KeyDocument {
    pub fn public_key(&self) -> Result<BBSplusPublicKey, Error> {
        self.check_type()?;
        BBSplusPublicKey::from_base58(&self.public_key_base58)
    }

    pub fn secret_key(&self) -> Result<Option<BBSplusSecretKey>, Error> {
        self.check_type()?;
        self.private_key_base58
            .as_deref()
            .map(BBSplusSecretKey::from_base58)
            .transpose()
    }

    fn check_type(&self) -> Result<(), Error> {
        if self.key_type != BLS12381_G2_KEY_TYPE {
            return Err(Error::UnsupportedCurve(self.key_type.clone()));
        }
        Ok(())
    }
}

/// https://datatracker.ietf.org/doc/html/draft-irtf-cfrg-bbs-signatures-05#name-secret-key -> SK = KeyGen(key_material, key_info, key_dst)
///
/// # Description
/// This operation generates a secret key (SK) deterministically from a secret octet string (key_material)
///
/// # Inputs:
/// * `key_material` (REQUIRED), a secret octet string of at least 32 bytes.
/// * `key_info` (OPTIONAL), an octet string. Defaults to an empty string if
/// not supplied.
/// * `key_dst` (OPTIONAL), an octet string representing the domain separation
/// tag. Defaults to the octet string
/// ciphersuite_id || "KEYGEN_DST_" if not supplied.
///
pub(crate) fn key_gen<CS>(key_material: &[u8], key_info: Option<&[u8]>, key_dst: Option<&[u8]>) -> Result<Scalar, Error>
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
{
    if key_material.len() < CS::IKM_LEN {
        return Err(Error::KeyGenError("length(key_material) < 32".to_owned()));
    }

    let key_info = key_info.unwrap_or(&[]);

    if key_info.len() > 65535 {
        return Err(Error::KeyGenError("length(key_info) > 65535".to_owned()));
    }

    let key_dst_default = CS::keygen_dst();
    let key_dst = key_dst.unwrap_or(&key_dst_default);

    // derive_input = key_material || I2OSP(length(key_info), 2) || key_info
    let derive_input = [key_material, &i2osp(key_info.len(), 2), key_info].concat();

    let sk = hash_to_scalar::<CS>(&derive_input, key_dst)?;
    if bool::from(sk.is_zero()) {
        return Err(Error::KeyGenError("derived a zero secret key".to_owned()));
    }
    Ok(sk)
}

pub(crate) fn sk_to_pk(sk: Scalar) -> G2Projective {
    // W = SK * BP2
    G2Projective::GENERATOR * sk
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::pair::KeyPair;
    use crate::schemes::algorithms::BbsBls12381Sha256;

    const IKM: &str = "746869732d49532d6a7573742d616e2d546573742d494b4d2d746f2d67656e65726174652d246528724074232d6b6579";

    #[test]
    fn keygen_is_deterministic() {
        let ikm = hex::decode(IKM).unwrap();
        let a = KeyPair::<BbsBls12381Sha256>::generate(&ikm, Some(b"info"), None).unwrap();
        let b = KeyPair::<BbsBls12381Sha256>::generate(&ikm, Some(b"info"), None).unwrap();
        assert_eq!(a, b);

        let c = KeyPair::<BbsBls12381Sha256>::generate(&ikm, None, None).unwrap();
        assert_ne!(a.public_key(), c.public_key());
    }

    #[test]
    fn short_key_material_is_rejected() {
        let res = KeyPair::<BbsBls12381Sha256>::generate(&[1u8; 16], None, None);
        assert!(matches!(res, Err(Error::KeyGenError(_))));
    }

    #[test]
    fn hex_and_base58_round_trip() {
        let ikm = hex::decode(IKM).unwrap();
        let keypair = KeyPair::<BbsBls12381Sha256>::generate(&ikm, None, None).unwrap();

        let pk = keypair.public_key();
        assert_eq!(&BBSplusPublicKey::decode(&pk.encode()).unwrap(), pk);
        assert_eq!(&BBSplusPublicKey::from_base58(&pk.to_base58()).unwrap(), pk);

        let sk = keypair.private_key();
        assert_eq!(&BBSplusSecretKey::decode(&sk.encode()).unwrap(), sk);
        assert_eq!(&BBSplusSecretKey::from_base58(&sk.to_base58()).unwrap(), sk);
        assert_eq!(&sk.public_key(), pk);
    }

    #[test]
    fn malformed_keys_are_key_format_errors() {
        assert!(matches!(BBSplusPublicKey::from_bytes(&[0u8; 10]), Err(Error::KeyFormatError(_))));
        assert!(matches!(BBSplusPublicKey::from_bytes(&[0xffu8; 96]), Err(Error::KeyFormatError(_))));
        assert!(matches!(BBSplusPublicKey::from_base58("0OIl"), Err(Error::KeyFormatError(_))));
        assert!(matches!(BBSplusSecretKey::from_bytes(&[0u8; 32]), Err(Error::KeyFormatError(_))));
        assert!(matches!(BBSplusSecretKey::decode("zz"), Err(Error::KeyFormatError(_))));
    }

    #[test]
    fn key_documents() {
        let ikm = hex::decode(IKM).unwrap();
        let keypair = KeyPair::<BbsBls12381Sha256>::generate(&ikm, None, None).unwrap();
        let document = keypair.to_key_document(Some("did:example:489398593#test"), Some("did:example:489398593"));

        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["type"], "Bls12381G2Key2020");
        assert!(json["publicKeyBase58"].is_string());

        let parsed: KeyDocument = serde_json::from_value(json).unwrap();
        let restored = KeyPair::<BbsBls12381Sha256>::from_key_document(&parsed).unwrap();
        assert_eq!(restored, keypair);

        let mut ed25519 = parsed.clone();
        ed25519.key_type = "Ed25519VerificationKey2018".to_owned();
        assert_eq!(ed25519.public_key(), Err(Error::UnsupportedCurve("Ed25519VerificationKey2018".to_owned())));
    }
}
