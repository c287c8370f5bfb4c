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

use core::fmt::Debug;
use core::marker::PhantomData;

use crate::bbsplus::ciphersuites::{BbsCiphersuite, Bls12381Sha256, Bls12381Shake256};
use crate::bbsplus::keys::{BBSplusPublicKey, BBSplusSecretKey};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BBSplus<CS: BbsCiphersuite>(PhantomData<CS>);

pub type BbsBls12381Sha256 = BBSplus<Bls12381Sha256>;
pub type BbsBls12381Shake256 = BBSplus<Bls12381Shake256>;

pub trait Scheme: Eq + Debug + Clone + Send + Sync + 'static + Sized {
    type Ciphersuite: BbsCiphersuite;
    type PrivKey: Clone + PartialEq + Eq + Debug + Send + Sync;
    type PubKey: Clone + PartialEq + Eq + Debug + Send + Sync;
}

impl<CS: BbsCiphersuite> Scheme for BBSplus<CS> {
    type Ciphersuite = CS;
    type PrivKey = BBSplusSecretKey;
    type PubKey = BBSplusPublicKey;
}
