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

#[cfg(feature = "ld")]
mod credential_example {
    use std::collections::BTreeMap;
    use std::fs;

    use bbs_ld::{
        bbsplus::ciphersuites::BbsCiphersuite,
        errors::Error,
        keys::pair::KeyPair,
        ld::{
            derive_proof, sign_credential, verify_credential, verify_derived_proof, ProofOptions, RevealSelection,
            StaticDocumentLoader,
        },
        schemes::algorithms::{BBSplus, Scheme},
    };
    use elliptic_curve::hash2curve::ExpandMsg;
    use rand::RngCore;
    use serde_json::Value;

    fn read_json(path: &str) -> Result<Value, Error> {
        let data = fs::read_to_string(path).map_err(|_| Error::DocumentNotFound(path.to_owned()))?;
        serde_json::from_str(&data).map_err(|e| Error::CanonicalizationError(format!("{}: {}", path, e)))
    }

    /// Contexts are served from `fixture_data/`, never fetched.
    fn loader(fixtures: &str) -> Result<StaticDocumentLoader, Error> {
        let contexts: BTreeMap<String, String> = serde_json::from_value(read_json(&format!("{}/contexts.json", fixtures))?)
            .map_err(|e| Error::CanonicalizationError(e.to_string()))?;

        let mut loader = StaticDocumentLoader::new();
        for (url, path) in contexts {
            loader.insert(url, read_json(&format!("{}/{}", fixtures, path))?);
        }
        Ok(loader)
    }

    pub(crate) fn credential_main<S: Scheme>(fixtures: &str) -> Result<(), Error>
    where
        S::Ciphersuite: BbsCiphersuite,
        <S::Ciphersuite as BbsCiphersuite>::Expander: for<'a> ExpandMsg<'a>,
    {
        let loader = loader(fixtures)?;
        let credential = read_json(&format!("{}/credential.json", fixtures))?;

        let mut rng = rand::thread_rng();

        log::info!("Issuer Keypair Generation");
        let issuer = KeyPair::<BBSplus<S::Ciphersuite>>::random(&mut rng)?;
        let key_document = issuer.to_key_document(Some("did:example:489398593#bbs"), Some("did:example:489398593"));
        log::info!("Issuer key: {}", key_document.public_key_base58);

        log::info!("Credential Signature...");
        let options = ProofOptions::new("did:example:489398593#bbs");
        let signed = sign_credential(&credential, &issuer, &options, &loader)?;
        log::info!("Signed credential: {}", serde_json::to_string_pretty(&signed).unwrap_or_default());

        assert!(verify_credential::<S::Ciphersuite>(&signed, issuer.public_key(), &loader)?, "Credential verification FAILED!");
        log::info!("Credential signature is VALID");

        //Holder receive nonce from Verifier
        let mut nonce = [0u8; 32];
        rng.fill_bytes(&mut nonce);

        log::info!("Derived Proof Generation...");
        let reveal = RevealSelection::Predicates(vec![
            "http://schema.org/givenName".to_owned(),
            "http://schema.org/familyName".to_owned(),
        ]);
        let derived = derive_proof::<S::Ciphersuite>(&signed, issuer.public_key(), &reveal, &nonce, &loader)?;
        log::info!("Derived credential: {}", serde_json::to_string_pretty(&derived).unwrap_or_default());

        log::info!("Derived Proof verification...");
        verify_derived_proof::<S::Ciphersuite>(&derived, issuer.public_key(), &nonce, &loader)?;
        log::info!("Derived Proof is VALID!");

        Ok(())
    }
}

#[cfg(feature = "ld")]
fn main() {
    use crate::credential_example::credential_main;
    use bbs_ld::schemes::algorithms::{BbsBls12381Sha256, BbsBls12381Shake256};
    use std::env;

    dotenvy::dotenv().ok();
    env_logger::init();

    let fixtures = env::var("FIXTURE_DATA").unwrap_or_else(|_| "./fixture_data".to_owned());
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        println!(
            "Usage: {} <cipher_suite>
                Ciphersuites:
                    - BLS12-381-SHA-256
                    - BLS12-381-SHAKE-256",
            args[0]
        );
        return;
    }

    let result = match args[1].as_str() {
        "BLS12-381-SHA-256" => credential_main::<BbsBls12381Sha256>(&fixtures),
        "BLS12-381-SHAKE-256" => credential_main::<BbsBls12381Shake256>(&fixtures),
        other => {
            println!("Unknown cipher suite: {}", other);
            return;
        }
    };

    if let Err(e) = result {
        log::error!("{}", e);
    }
}

#[cfg(not(feature = "ld"))]
fn main() {}
