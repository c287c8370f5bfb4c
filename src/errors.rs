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

use thiserror::Error;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Error during keypair generation: {0}")]
    KeyGenError(String),
    #[error("Invalid key encoding: {0}")]
    KeyFormatError(String),
    #[error("Unsupported curve or key type: {0}")]
    UnsupportedCurve(String),

    #[error("Canonicalization failed: {0}")]
    CanonicalizationError(String),
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Generators do not match the messages (expected {expected}, found {found})")]
    GeneratorCountMismatch { expected: usize, found: usize },
    #[error("Error during hash to scalar computation")]
    HashToScalarError,

    #[error("Error during computation of a Signature: {0}")]
    SignatureGenerationError(String),
    #[error("Not a valid Signature")]
    InvalidSignature,

    #[error("Error during computation of a Proof of Knowledge of a Signature: {0}")]
    ProofGenError(String),
    #[error("Invalid Proof of Knowledge of a Signature: {0}")]
    InvalidProof(String),
    #[error("Nonce does not match the one the proof was derived with")]
    NonceMismatch,
    #[error("Revealed messages do not match the revealed indexes of the proof")]
    RevealedSetMismatch,

    #[error("Malformed linked data proof: {0}")]
    InvalidLinkedDataProof(String),
}
