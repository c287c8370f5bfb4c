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

//! JSON-LD context processing and IRI expansion.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::loader::DocumentLoader;
use crate::errors::Error;

/// Remote contexts may include further remote contexts, up to this depth.
pub const MAX_CONTEXT_DEPTH: usize = 16;

const KEYWORDS: &[&str] = &[
    "@base",
    "@container",
    "@context",
    "@direction",
    "@graph",
    "@id",
    "@import",
    "@included",
    "@index",
    "@json",
    "@language",
    "@list",
    "@nest",
    "@none",
    "@prefix",
    "@propagate",
    "@protected",
    "@reverse",
    "@set",
    "@type",
    "@value",
    "@version",
    "@vocab",
];

pub fn is_keyword(value: &str) -> bool {
    KEYWORDS.contains(&value)
}

/// `@` followed by ASCII letters only: reserved, ignored when not a keyword.
fn looks_like_keyword(value: &str) -> bool {
    value.len() > 1 && value.starts_with('@') && value[1..].chars().all(|c| c.is_ascii_alphabetic())
}

/// Whether `value` starts with an IRI scheme.
pub fn is_absolute_iri(value: &str) -> bool {
    match value.split_once(':') {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

pub(crate) fn invalid(reason: impl Into<String>) -> Error {
    Error::CanonicalizationError(reason.into())
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Container {
    #[default]
    None,
    Set,
    List,
    Graph,
    Language,
    Index,
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct TermDefinition {
    /// `None` when the term is explicitly mapped to `null`.
    pub iri: Option<String>,
    /// `@id`, `@vocab`, `@none` or a datatype IRI.
    pub type_mapping: Option<String>,
    pub container: Container,
    /// `Some(None)` resets the default language for values of this term.
    pub language: Option<Option<String>>,
    /// Scoped context, processed when the term is used.
    pub context: Option<Value>,
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct ActiveContext {
    terms: HashMap<String, TermDefinition>,
    vocab: Option<String>,
    base: Option<String>,
    language: Option<String>,
    /// Context to restore when entering a nested node object.
    previous: Option<Box<ActiveContext>>,
}

impl ActiveContext {
    pub fn new(base: Option<String>) -> Self {
        Self { base, ..Default::default() }
    }

    pub fn term(&self, term: &str) -> Option<&TermDefinition> {
        self.terms.get(term)
    }

    pub fn vocab(&self) -> Option<&str> {
        self.vocab.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn previous(&self) -> Option<&ActiveContext> {
        self.previous.as_deref()
    }

    /// Applies a local context (`@context` value) on top of this one.
    pub fn process(&self, local: &Value, loader: &dyn DocumentLoader) -> Result<Self, Error> {
        self.process_with(local, loader, &mut Vec::new(), true)
    }

    /// Applies a scoped context. Type-scoped contexts pass `propagate = false`
    /// so that nested node objects see the context as it was before.
    pub fn process_scoped(&self, local: &Value, loader: &dyn DocumentLoader, propagate: bool) -> Result<Self, Error> {
        self.process_with(local, loader, &mut Vec::new(), propagate)
    }

    fn process_with(
        &self,
        local: &Value,
        loader: &dyn DocumentLoader,
        remote: &mut Vec<String>,
        propagate: bool,
    ) -> Result<Self, Error> {
        let propagate = match local {
            Value::Object(map) => match map.get("@propagate") {
                Some(Value::Bool(p)) => *p,
                Some(_) => return Err(invalid("@propagate must be a boolean")),
                None => propagate,
            },
            _ => propagate,
        };

        let mut result = self.clone();
        if !propagate && result.previous.is_none() {
            result.previous = Some(Box::new(self.clone()));
        }

        let contexts: Vec<&Value> = match local {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        for context in contexts {
            match context {
                Value::Null => {
                    let previous = result.previous.take();
                    result = ActiveContext::new(self.base.clone());
                    result.previous = previous;
                }
                Value::String(reference) => {
                    let url = resolve_iri(result.base.as_deref(), reference);
                    if remote.len() >= MAX_CONTEXT_DEPTH || remote.contains(&url) {
                        return Err(invalid(format!("recursive context inclusion of {}", url)));
                    }

                    let remote_document = loader
                        .load(&url)
                        .map_err(|e| invalid(format!("loading remote context failed: {}", e)))?;
                    let inner = remote_document
                        .document
                        .get("@context")
                        .ok_or_else(|| invalid(format!("{} is not a valid context document", url)))?;

                    log::trace!("processing remote context {}", remote_document.document_url);
                    remote.push(url);
                    result = result.process_with(inner, loader, remote, true)?;
                    remote.pop();
                }
                Value::Object(map) => result.apply_local(map)?,
                _ => return Err(invalid("invalid local context")),
            }
        }

        Ok(result)
    }

    fn apply_local(&mut self, local: &Map<String, Value>) -> Result<(), Error> {
        if let Some(version) = local.get("@version") {
            if version.as_f64() != Some(1.1) {
                return Err(invalid("invalid @version value"));
            }
        }

        if local.contains_key("@import") {
            return Err(invalid("@import is not supported"));
        }

        match local.get("@base") {
            Some(Value::Null) => self.base = None,
            Some(Value::String(base)) => self.base = Some(resolve_iri(self.base.as_deref(), base)),
            Some(_) => return Err(invalid("invalid base IRI")),
            None => {}
        }

        match local.get("@vocab") {
            Some(Value::Null) => self.vocab = None,
            Some(Value::String(vocab)) => {
                self.vocab = self.expand_iri(vocab, true, true);
            }
            Some(_) => return Err(invalid("invalid vocab mapping")),
            None => {}
        }

        match local.get("@language") {
            Some(Value::Null) => self.language = None,
            Some(Value::String(language)) => self.language = Some(language.to_lowercase()),
            Some(_) => return Err(invalid("invalid default language")),
            None => {}
        }

        let mut defined = HashMap::new();
        for term in local.keys() {
            if matches!(
                term.as_str(),
                "@base" | "@vocab" | "@language" | "@version" | "@propagate" | "@protected" | "@direction"
            ) {
                continue;
            }
            self.create_term_definition(local, term, &mut defined)?;
        }

        Ok(())
    }

    fn create_term_definition(
        &mut self,
        local: &Map<String, Value>,
        term: &str,
        defined: &mut HashMap<String, bool>,
    ) -> Result<(), Error> {
        match defined.get(term) {
            Some(true) => return Ok(()),
            Some(false) => return Err(invalid(format!("cyclic IRI mapping for {}", term))),
            None => {}
        }

        if is_keyword(term) || looks_like_keyword(term) {
            defined.insert(term.to_owned(), true);
            return Ok(());
        }

        defined.insert(term.to_owned(), false);
        self.terms.remove(term);

        let value = local.get(term).ok_or_else(|| invalid(format!("undefined term {}", term)))?;
        let simple;
        let definition_map = match value {
            Value::Null => {
                self.terms.insert(term.to_owned(), TermDefinition::default());
                defined.insert(term.to_owned(), true);
                return Ok(());
            }
            Value::String(id) => {
                let mut map = Map::new();
                map.insert("@id".to_owned(), Value::String(id.clone()));
                simple = map;
                &simple
            }
            Value::Object(map) => map,
            _ => return Err(invalid(format!("invalid term definition for {}", term))),
        };

        for unsupported in ["@reverse", "@nest"] {
            if definition_map.contains_key(unsupported) {
                return Err(invalid(format!("{} in term definitions is not supported", unsupported)));
            }
        }

        let mut definition = TermDefinition::default();

        match definition_map.get("@id") {
            Some(Value::Null) => {
                self.terms.insert(term.to_owned(), definition);
                defined.insert(term.to_owned(), true);
                return Ok(());
            }
            Some(Value::String(id)) if id != term => {
                if looks_like_keyword(id) && !is_keyword(id) {
                    defined.insert(term.to_owned(), true);
                    return Ok(());
                }
                self.define_dependencies(local, id, defined)?;
                match self.expand_iri(id, false, true) {
                    Some(iri) if is_keyword(&iri) || is_absolute_iri(&iri) => definition.iri = Some(iri),
                    _ => return Err(invalid(format!("invalid IRI mapping for {}", term))),
                }
            }
            Some(Value::String(_)) | None => {
                definition.iri = Some(self.term_iri(local, term, defined)?);
            }
            Some(_) => return Err(invalid(format!("invalid IRI mapping for {}", term))),
        }

        if let Some(type_mapping) = definition_map.get("@type") {
            let type_mapping = type_mapping.as_str().ok_or_else(|| invalid("invalid type mapping"))?;
            definition.type_mapping = Some(match type_mapping {
                "@id" | "@vocab" | "@none" => type_mapping.to_owned(),
                "@json" => return Err(invalid("@json literals are not supported")),
                _ => {
                    self.define_dependencies(local, type_mapping, defined)?;
                    match self.expand_iri(type_mapping, false, true) {
                        Some(iri) if is_absolute_iri(&iri) => iri,
                        _ => return Err(invalid(format!("invalid type mapping {}", type_mapping))),
                    }
                }
            });
        }

        if let Some(container) = definition_map.get("@container") {
            definition.container = parse_container(container)?;
        }

        match definition_map.get("@language") {
            Some(Value::Null) => definition.language = Some(None),
            Some(Value::String(language)) => definition.language = Some(Some(language.to_lowercase())),
            Some(_) => return Err(invalid("invalid language mapping")),
            None => {}
        }

        if let Some(context) = definition_map.get("@context") {
            definition.context = Some(context.clone());
        }

        self.terms.insert(term.to_owned(), definition);
        defined.insert(term.to_owned(), true);
        Ok(())
    }

    /// IRI of a term defined without `@id`: compact IRI, relative IRI or vocabulary term.
    fn term_iri(&mut self, local: &Map<String, Value>, term: &str, defined: &mut HashMap<String, bool>) -> Result<String, Error> {
        if let Some((prefix, suffix)) = term.split_once(':').filter(|(prefix, _)| !prefix.is_empty()) {
            if local.contains_key(prefix) {
                self.create_term_definition(local, prefix, defined)?;
            }
            return Ok(match self.terms.get(prefix).and_then(|d| d.iri.as_deref()) {
                Some(prefix_iri) => format!("{}{}", prefix_iri, suffix),
                None => term.to_owned(),
            });
        }

        if term.contains('/') {
            return self.expand_iri(term, false, true).ok_or_else(|| invalid(format!("invalid IRI mapping for {}", term)));
        }

        match &self.vocab {
            Some(vocab) => Ok(format!("{}{}", vocab, term)),
            None => Err(invalid(format!("no IRI mapping for term {}", term))),
        }
    }

    /// Makes sure the terms `value` depends on are defined before expanding it.
    fn define_dependencies(
        &mut self,
        local: &Map<String, Value>,
        value: &str,
        defined: &mut HashMap<String, bool>,
    ) -> Result<(), Error> {
        if local.contains_key(value) && defined.get(value) != Some(&true) {
            self.create_term_definition(local, value, defined)?;
        }
        if let Some((prefix, _)) = value.split_once(':') {
            if local.contains_key(prefix) && defined.get(prefix) != Some(&true) {
                self.create_term_definition(local, prefix, defined)?;
            }
        }
        Ok(())
    }

    /// Expands a term, compact IRI or relative IRI. `None` means the value
    /// has no mapping and must be dropped.
    pub fn expand_iri(&self, value: &str, document_relative: bool, vocab: bool) -> Option<String> {
        if is_keyword(value) {
            return Some(value.to_owned());
        }
        if looks_like_keyword(value) {
            return None;
        }

        if vocab {
            if let Some(definition) = self.terms.get(value) {
                return definition.iri.clone();
            }
        }

        if let Some((prefix, suffix)) = value.split_once(':') {
            if prefix == "_" || suffix.starts_with("//") {
                return Some(value.to_owned());
            }
            if let Some(prefix_iri) = self.terms.get(prefix).and_then(|d| d.iri.as_deref()) {
                return Some(format!("{}{}", prefix_iri, suffix));
            }
            if is_absolute_iri(value) {
                return Some(value.to_owned());
            }
        }

        if vocab {
            if let Some(vocab_iri) = &self.vocab {
                return Some(format!("{}{}", vocab_iri, value));
            }
        }

        if document_relative {
            return Some(resolve_iri(self.base.as_deref(), value));
        }

        Some(value.to_owned())
    }
}

fn parse_container(container: &Value) -> Result<Container, Error> {
    let values: Vec<&str> = match container {
        Value::Null => Vec::new(),
        Value::String(value) => vec![value.as_str()],
        Value::Array(values) => values
            .iter()
            .map(|v| v.as_str().ok_or_else(|| invalid("invalid container mapping")))
            .collect::<Result<_, _>>()?,
        _ => return Err(invalid("invalid container mapping")),
    };

    let has = |keyword: &str| values.contains(&keyword);
    if has("@id") || has("@type") {
        return Err(invalid("@id and @type maps are not supported"));
    }

    Ok(if has("@list") {
        Container::List
    } else if has("@graph") {
        Container::Graph
    } else if has("@language") {
        Container::Language
    } else if has("@index") {
        Container::Index
    } else if has("@set") {
        Container::Set
    } else if values.is_empty() {
        Container::None
    } else {
        return Err(invalid(format!("invalid container mapping {:?}", values)));
    })
}

/// RFC 3986 reference resolution.
pub fn resolve_iri(base: Option<&str>, reference: &str) -> String {
    if is_absolute_iri(reference) {
        return reference.to_owned();
    }
    let Some(base) = base else {
        return reference.to_owned();
    };
    let Some((scheme, rest)) = base.split_once(':') else {
        return reference.to_owned();
    };

    let (authority, path_and_more) = match rest.strip_prefix("//") {
        Some(after) => {
            let end = after.find(['/', '?', '#']).unwrap_or(after.len());
            (Some(&after[..end]), &after[end..])
        }
        None => (None, rest),
    };
    let prefix = match authority {
        Some(authority) => format!("{}://{}", scheme, authority),
        None => format!("{}:", scheme),
    };

    let without_fragment = path_and_more.split('#').next().unwrap_or("");
    let base_path = without_fragment.split('?').next().unwrap_or("");

    if reference.is_empty() {
        return format!("{}{}", prefix, without_fragment);
    }
    if reference.starts_with('#') {
        return format!("{}{}{}", prefix, without_fragment, reference);
    }
    if let Some(network_path) = reference.strip_prefix("//") {
        return format!("{}://{}", scheme, network_path);
    }
    if reference.starts_with('?') {
        return format!("{}{}{}", prefix, base_path, reference);
    }

    let (reference_path, suffix) = match reference.find(['?', '#']) {
        Some(i) => reference.split_at(i),
        None => (reference, ""),
    };

    let merged = if reference_path.starts_with('/') {
        reference_path.to_owned()
    } else if authority.is_some() && base_path.is_empty() {
        format!("/{}", reference_path)
    } else {
        match base_path.rfind('/') {
            Some(i) => format!("{}{}", &base_path[..=i], reference_path),
            None => reference_path.to_owned(),
        }
    };

    format!("{}{}{}", prefix, remove_dot_segments(&merged), suffix)
}

fn remove_dot_segments(path: &str) -> String {
    let absolute = path.starts_with('/');
    let segments: Vec<&str> = path.split('/').collect();
    let last = segments.len().saturating_sub(1);
    let mut output: Vec<&str> = Vec::new();
    let mut trailing_slash = false;

    for (i, segment) in segments.iter().enumerate() {
        trailing_slash = false;
        match *segment {
            "." => trailing_slash = i == last,
            ".." => {
                if output.len() > usize::from(absolute) {
                    output.pop();
                }
                trailing_slash = i == last;
            }
            s => output.push(s),
        }
    }

    let mut result = output.join("/");
    if absolute && !result.starts_with('/') {
        result.insert(0, '/');
    }
    if trailing_slash && !result.ends_with('/') {
        result.push('/');
    }
    result
}
