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

//! The BBS+ signature scheme as used by the `BbsBlsSignature2020` Linked-Data suite.
//!
//! BBS+ is a pairing-based multi-message signature scheme over BLS12-381.
//! Key characteristics:
//! - **Signature Compactness**: a single signature `(A, e, s)` covers an ordered list of messages,
//!                              one G1 point and two scalars regardless of how many messages are signed.
//! - **Selective Disclosure**: the holder of a signature can reveal any subset of the signed messages
//!                             and prove in zero knowledge that the hidden ones were signed too.
//! - **Unlinkable Proofs**: every derived proof re-randomizes the signature, so two proofs of the same
//!                          signature cannot be correlated by a verifier.
//! - **Nonce Binding**: a proof is bound to a verifier-supplied nonce and cannot be replayed elsewhere.
//!
//! Keys live in G2 and signatures in G1. Messages are scalars, usually obtained by hashing the
//! canonical statements of a Linked-Data document (see the `ld` module).
//! # Usage
//! ```toml
//! bbs-ld = { version = "0.1", default-features = false }
//! ```

/// Module for batch verification
pub mod batch;
/// Module for ciphersuites
pub mod ciphersuites;
/// Module for generators
pub mod generators;
/// Module for keys
pub mod keys;
/// Module for proofs
pub mod proof;
/// Module for signatures
pub mod signature;
