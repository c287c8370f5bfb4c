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

mod bbsplus_example {
    use std::collections::BTreeMap;

    use bbs_ld::{
        bbsplus::{
            ciphersuites::BbsCiphersuite, generators::Generators, proof::BBSplusPoKSignature,
            signature::BBSplusSignature,
        },
        errors::Error,
        keys::pair::KeyPair,
        schemes::algorithms::{BBSplus, Scheme},
        utils::message::BBSplusMessage,
    };
    use elliptic_curve::hash2curve::ExpandMsg;
    use rand::RngCore;

    pub(crate) fn bbsplus_main<S: Scheme>() -> Result<(), Error>
    where
        S::Ciphersuite: BbsCiphersuite,
        <S::Ciphersuite as BbsCiphersuite>::Expander: for<'a> ExpandMsg<'a>,
    {
        const STATEMENTS: [&str; 5] = [
            "<did:example:jane> <http://schema.org/address> _:c14n0 .",
            "<did:example:jane> <http://schema.org/name> \"Jane Doe\" .",
            "<did:example:jane> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://schema.org/Person> .",
            "_:c14n0 <http://schema.org/postalCode> \"10138\" .",
            "_:c14n0 <http://schema.org/streetAddress> \"Via Pier Carlo Boggio 61\" .",
        ];

        log::info!("Statements: {:#?}", STATEMENTS);

        let mut rng = rand::thread_rng();

        log::info!("Issuer key pair generation");
        let issuer_keypair = KeyPair::<BBSplus<S::Ciphersuite>>::random(&mut rng)?;
        let issuer_sk = issuer_keypair.private_key();
        let issuer_pk = issuer_keypair.public_key();
        log::info!("PK: {}", issuer_pk.encode());

        let messages = BBSplusMessage::messages_to_scalar::<S::Ciphersuite>(&STATEMENTS)?;
        let generators = Generators::derive::<S::Ciphersuite>(messages.len())?;

        log::info!("Signing {} canonical statements...", messages.len());
        let signature = BBSplusSignature::sign(issuer_sk, &generators, &messages)?;
        log::info!("Signature: {}", hex::encode(signature.to_bytes()));

        assert!(signature.verify(issuer_pk, &generators, &messages)?, "signature over the statements does not verify");
        log::info!("Signature verified");

        // verifier challenge
        let mut nonce_verifier = [0u8; 32];
        rng.fill_bytes(&mut nonce_verifier);
        log::info!("Nonce: {}", hex::encode(nonce_verifier));

        let disclosed_indexes = [0usize, 2usize];

        log::info!("Deriving a proof disclosing statements {:?}", disclosed_indexes);
        let proof = BBSplusPoKSignature::derive::<S::Ciphersuite>(
            issuer_pk,
            &generators,
            &messages,
            &signature,
            &disclosed_indexes,
            &nonce_verifier,
        )?;
        log::info!("Proof: {} bytes", proof.to_bytes().len());

        let disclosed_messages: BTreeMap<usize, BBSplusMessage> =
            disclosed_indexes.iter().map(|&i| (i, messages[i])).collect();

        proof.verify::<S::Ciphersuite>(issuer_pk, &generators, &disclosed_messages, &nonce_verifier)?;
        log::info!("Derived proof verified");

        Ok(())
    }
}

fn main() {
    use crate::bbsplus_example::bbsplus_main;
    use bbs_ld::schemes::algorithms::{BbsBls12381Sha256, BbsBls12381Shake256};
    use std::env;

    dotenvy::dotenv().ok();
    env_logger::init();

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

    let cipher_suite = &args[1];

    let result = match cipher_suite.as_str() {
        "BLS12-381-SHA-256" => {
            log::info!("Ciphersuite: BLS12-381-SHA-256");
            bbsplus_main::<BbsBls12381Sha256>()
        }
        "BLS12-381-SHAKE-256" => {
            log::info!("Ciphersuite: BLS12-381-SHAKE-256");
            bbsplus_main::<BbsBls12381Shake256>()
        }
        _ => {
            println!("Unknown cipher suite: {}", cipher_suite);
            return;
        }
    };

    if let Err(e) = result {
        log::error!("{}", e);
    }
}
