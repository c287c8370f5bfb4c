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

//! Linked Data support: JSON-LD documents are turned into RDF, canonicalized
//! with URDNA2015 and signed statement by statement with BBS+.
//!
//! Remote contexts are never fetched from the network; they are resolved
//! through a [`DocumentLoader`].

/// Module for JSON-LD context processing
pub mod context;
/// Module for encoding documents into BBS+ messages
pub mod encoder;
/// Module for JSON-LD to RDF conversion
pub mod expand;
/// Module for resolving remote contexts
pub mod loader;
/// Module for RDF terms and quads
pub mod rdf;
/// Module for selecting and rebuilding the revealed statements
pub mod reveal;
/// Module for the BbsBlsSignature2020 suite
pub mod suite;
/// Module for RDF dataset canonicalization
pub mod urdna2015;

pub use encoder::MessageEncoder;
pub use loader::{DocumentLoader, RemoteDocument, StaticDocumentLoader};
pub use reveal::RevealSelection;
pub use suite::{derive_proof, sign_credential, verify_credential, verify_derived_proof, ProofOptions};
