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

use serde_json::Value;

use crate::errors::Error;

#[derive(Clone, PartialEq, Debug)]
pub struct RemoteDocument {
    /// URL after redirects.
    pub document_url: String,
    pub document: Value,
}

/// Resolves remote contexts referenced by a document.
///
/// Loading is synchronous: anything that needs network access has to happen
/// before canonicalization, and the loader only hands out what was fetched.
pub trait DocumentLoader {
    fn load(&self, url: &str) -> Result<RemoteDocument, Error>;
}

impl<F> DocumentLoader for F
where
    F: Fn(&str) -> Result<RemoteDocument, Error>,
{
    fn load(&self, url: &str) -> Result<RemoteDocument, Error> {
        self(url)
    }
}

/// In-memory map from URL to document.
#[derive(Clone, Debug, Default)]
pub struct StaticDocumentLoader {
    documents: HashMap<String, Value>,
}

impl StaticDocumentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, document: Value) -> Option<Value> {
        self.documents.insert(url.into(), document)
    }

    pub fn with_document(mut self, url: impl Into<String>, document: Value) -> Self {
        self.insert(url, document);
        self
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentLoader for StaticDocumentLoader {
    fn load(&self, url: &str) -> Result<RemoteDocument, Error> {
        log::trace!("loading {}", url);
        self.documents
            .get(url)
            .map(|document| RemoteDocument { document_url: url.to_owned(), document: document.clone() })
            .ok_or_else(|| Error::DocumentNotFound(url.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn static_loader() {
        let loader = StaticDocumentLoader::new().with_document("https://example.org/ctx", json!({"@context": {}}));
        assert_eq!(loader.load("https://example.org/ctx").unwrap().document, json!({"@context": {}}));
        assert_eq!(loader.load("https://example.org/missing"), Err(Error::DocumentNotFound("https://example.org/missing".to_owned())));
    }

    #[test]
    fn closures_are_loaders() {
        let loader = |url: &str| -> Result<RemoteDocument, Error> {
            match url {
                "urn:ctx" => Ok(RemoteDocument { document_url: url.to_owned(), document: json!({"@context": null}) }),
                _ => Err(Error::DocumentNotFound(url.to_owned())),
            }
        };
        let dyn_loader: &dyn DocumentLoader = &loader;
        assert!(dyn_loader.load("urn:ctx").is_ok());
        assert!(dyn_loader.load("urn:other").is_err());
    }
}
