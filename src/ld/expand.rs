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

//! JSON-LD document to RDF dataset.
//!
//! Expansion and RDF conversion happen in a single walk over the document.
//! Properties that do not expand to an absolute IRI are dropped, as are
//! references that do not resolve to one.

use std::collections::HashMap;

use serde_json::{Map, Number, Value};

use super::context::{invalid, is_absolute_iri, is_keyword, ActiveContext, Container, TermDefinition};
use super::loader::DocumentLoader;
use super::rdf::{Quad, Term, RDF_FIRST, RDF_NIL, RDF_REST, RDF_TYPE, XSD_BOOLEAN, XSD_DOUBLE, XSD_INTEGER, XSD_STRING};
use crate::errors::Error;

const UNSUPPORTED_KEYWORDS: &[&str] = &["@reverse", "@nest", "@included", "@json", "@direction"];

/// Converts a JSON-LD document into the quads it denotes. Blank nodes get
/// fresh `b<n>` labels.
pub fn to_rdf(document: &Value, loader: &dyn DocumentLoader) -> Result<Vec<Quad>, Error> {
    let mut emitter = RdfEmitter::new(loader);
    let context = ActiveContext::default();

    match document {
        Value::Array(items) => {
            for item in items {
                emitter.top_level(item, &context)?;
            }
        }
        Value::Object(_) => emitter.top_level(document, &context)?,
        _ => return Err(invalid("a JSON-LD document must be an object or an array")),
    }

    log::trace!("document expanded to {} quads", emitter.quads.len());
    Ok(emitter.quads)
}

struct RdfEmitter<'l> {
    loader: &'l dyn DocumentLoader,
    quads: Vec<Quad>,
    blank_counter: usize,
    blank_labels: HashMap<String, String>,
}

impl<'l> RdfEmitter<'l> {
    fn new(loader: &'l dyn DocumentLoader) -> Self {
        Self { loader, quads: Vec::new(), blank_counter: 0, blank_labels: HashMap::new() }
    }

    fn fresh_blank(&mut self) -> Term {
        let label = format!("b{}", self.blank_counter);
        self.blank_counter += 1;
        Term::BlankNode(label)
    }

    /// Blank node identifiers found in the document keep their identity but not their label.
    fn relabel_blank(&mut self, identifier: &str) -> Term {
        if let Some(label) = self.blank_labels.get(identifier) {
            return Term::BlankNode(label.clone());
        }
        let term = self.fresh_blank();
        if let Term::BlankNode(label) = &term {
            self.blank_labels.insert(identifier.to_owned(), label.clone());
        }
        term
    }

    /// `None` when `iri` is missing or relative.
    fn reference(&mut self, iri: Option<String>) -> Option<Term> {
        match iri {
            Some(iri) if iri.starts_with("_:") => Some(self.relabel_blank(&iri)),
            Some(iri) if is_absolute_iri(&iri) => Some(Term::Iri(iri)),
            other => {
                log::trace!("dropping reference {:?}", other);
                None
            }
        }
    }

    fn emit(&mut self, subject: &Term, predicate: &str, object: Term, graph: &Option<Term>) {
        self.quads.push(Quad::new(subject.clone(), Term::iri(predicate), object, graph.clone()));
    }

    fn top_level(&mut self, item: &Value, context: &ActiveContext) -> Result<(), Error> {
        let Value::Object(map) = item else {
            return Err(invalid("top-level items must be node objects"));
        };

        let active = match map.get("@context") {
            Some(local) => context.process(local, self.loader)?,
            None => context.clone(),
        };

        if keyword_entry(map, &active, "@value").is_some() {
            return Ok(());
        }

        // an object made only of @graph describes the default graph
        let content: Vec<&String> = map.keys().filter(|k| k.as_str() != "@context").collect();
        if let [key] = content.as_slice() {
            if active.expand_iri(key, false, true).as_deref() == Some("@graph") {
                for node in as_array(&map[key.as_str()]) {
                    match node {
                        Value::Object(node) => {
                            self.node(node, &active, None, &None)?;
                        }
                        _ => return Err(invalid("@graph members must be node objects")),
                    }
                }
                return Ok(());
            }
        }

        self.node(map, context, None, &None)?;
        Ok(())
    }

    fn node(
        &mut self,
        map: &Map<String, Value>,
        context: &ActiveContext,
        property_scoped: Option<&Value>,
        graph: &Option<Term>,
    ) -> Result<Term, Error> {
        let mut active = match context.previous() {
            Some(previous) if !is_reference_only(map, context) => previous.clone(),
            _ => context.clone(),
        };
        if let Some(scoped) = property_scoped {
            active = active.process_scoped(scoped, self.loader, true)?;
        }
        if let Some(local) = map.get("@context") {
            active = active.process(local, self.loader)?;
        }

        // type-scoped contexts, applied in lexicographical order of the types
        let type_scoped = active.clone();
        let mut types: Vec<&str> = Vec::new();
        for (key, value) in map {
            if type_scoped.expand_iri(key, false, true).as_deref() == Some("@type") {
                for t in as_array(value) {
                    types.push(t.as_str().ok_or_else(|| invalid("@type values must be strings"))?);
                }
            }
        }
        types.sort_unstable();
        for t in &types {
            if let Some(scoped) = type_scoped.term(t).and_then(|d| d.context.as_ref()) {
                active = active.process_scoped(scoped, self.loader, false)?;
            }
        }

        let subject = match keyword_entry(map, &active, "@id") {
            Some(Value::String(id)) => self
                .reference(active.expand_iri(id, true, false))
                .ok_or_else(|| invalid(format!("node identifier {} is not an absolute IRI", id)))?,
            Some(_) => return Err(invalid("@id value must be a string")),
            None => self.fresh_blank(),
        };

        for t in &types {
            if let Some(object) = self.reference(type_scoped.expand_iri(t, true, true)) {
                self.emit(&subject, RDF_TYPE, object, graph);
            }
        }

        for (key, value) in map {
            if key == "@context" {
                continue;
            }
            let Some(expanded) = active.expand_iri(key, false, true) else {
                continue;
            };

            match expanded.as_str() {
                "@id" | "@type" | "@index" => {}
                "@graph" => {
                    let named = Some(subject.clone());
                    for member in as_array(value) {
                        match member {
                            Value::Object(member) => {
                                self.node(member, &active, None, &named)?;
                            }
                            _ => return Err(invalid("@graph members must be node objects")),
                        }
                    }
                }
                keyword if UNSUPPORTED_KEYWORDS.contains(&keyword) => {
                    return Err(invalid(format!("{} is not supported", keyword)));
                }
                "@value" | "@list" | "@set" | "@language" => {
                    return Err(invalid(format!("{} is not allowed in a node object", expanded)));
                }
                keyword if is_keyword(keyword) => {}
                predicate if is_absolute_iri(predicate) && !predicate.starts_with("_:") => {
                    let definition = active.term(key).cloned().unwrap_or_default();
                    self.property(&subject, predicate, value, &definition, &active, graph)?;
                }
                _ => log::trace!("dropping unmapped property {}", key),
            }
        }

        Ok(subject)
    }

    fn property(
        &mut self,
        subject: &Term,
        predicate: &str,
        value: &Value,
        definition: &TermDefinition,
        active: &ActiveContext,
        graph: &Option<Term>,
    ) -> Result<(), Error> {
        match (definition.container, value) {
            (Container::List, _) if !is_list_object(value, active) => {
                let head = self.list(&as_array(value), definition, active, graph)?;
                self.emit(subject, predicate, head, graph);
            }
            (Container::Language, Value::Object(languages)) => {
                for (language, strings) in languages {
                    let language = match active.expand_iri(language, false, true).as_deref() {
                        Some("@none") => None,
                        _ => Some(language.to_lowercase()),
                    };
                    for string in as_array(strings) {
                        let object = match (string, &language) {
                            (Value::Null, _) => continue,
                            (Value::String(s), Some(language)) => Term::lang_string(s.as_str(), language.as_str()),
                            (Value::String(s), None) => Term::literal(s.as_str(), XSD_STRING),
                            _ => return Err(invalid("language map values must be strings")),
                        };
                        self.emit(subject, predicate, object, graph);
                    }
                }
            }
            (Container::Index, Value::Object(entries)) => {
                for entry in entries.values() {
                    self.values(subject, predicate, entry, definition, active, graph)?;
                }
            }
            (Container::Graph, _) => {
                for member in as_array(value) {
                    let Value::Object(member) = member else {
                        return Err(invalid("graph container values must be objects"));
                    };
                    let name = self.fresh_blank();
                    self.emit(subject, predicate, name.clone(), graph);
                    let named = Some(name);

                    // an explicit graph object is not wrapped a second time
                    match keyword_entry(member, active, "@graph") {
                        Some(nodes) if member.len() == 1 => {
                            for node in as_array(nodes) {
                                let Value::Object(node) = node else {
                                    return Err(invalid("graph members must be node objects"));
                                };
                                self.node(node, active, definition.context.as_ref(), &named)?;
                            }
                        }
                        _ => {
                            self.node(member, active, definition.context.as_ref(), &named)?;
                        }
                    }
                }
            }
            _ => self.values(subject, predicate, value, definition, active, graph)?,
        }
        Ok(())
    }

    fn values(
        &mut self,
        subject: &Term,
        predicate: &str,
        value: &Value,
        definition: &TermDefinition,
        active: &ActiveContext,
        graph: &Option<Term>,
    ) -> Result<(), Error> {
        if let Value::Array(items) = value {
            for item in items {
                self.values(subject, predicate, item, definition, active, graph)?;
            }
            return Ok(());
        }

        if let Value::Object(map) = value {
            if let Some(set) = keyword_entry(map, active, "@set") {
                return self.values(subject, predicate, set, definition, active, graph);
            }
        }

        if let Some(object) = self.object(value, definition, active, graph)? {
            self.emit(subject, predicate, object, graph);
        }
        Ok(())
    }

    /// The RDF term a single (non-array) property value denotes.
    fn object(
        &mut self,
        value: &Value,
        definition: &TermDefinition,
        active: &ActiveContext,
        graph: &Option<Term>,
    ) -> Result<Option<Term>, Error> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => self.coerce_string(s, definition, active),
            Value::Bool(b) => Ok(Some(Term::literal(b.to_string(), datatype_or(definition, XSD_BOOLEAN)))),
            Value::Number(n) => number_literal(n, datatype(definition)).map(Some),
            Value::Array(items) => self.list(&items.iter().collect::<Vec<_>>(), definition, active, graph).map(Some),
            Value::Object(map) => {
                if keyword_entry(map, active, "@value").is_some() {
                    value_object(map, active)
                } else if let Some(items) = keyword_entry(map, active, "@list") {
                    self.list(&as_array(items), definition, active, graph).map(Some)
                } else if keyword_entry(map, active, "@set").is_some() {
                    Err(invalid("@set is not allowed here"))
                } else {
                    self.node(map, active, definition.context.as_ref(), graph).map(Some)
                }
            }
        }
    }

    fn coerce_string(&mut self, s: &str, definition: &TermDefinition, active: &ActiveContext) -> Result<Option<Term>, Error> {
        // identifiers are expanded with the property-scoped context in effect
        let scoped;
        let scope = match (definition.type_mapping.as_deref(), &definition.context) {
            (Some("@id" | "@vocab"), Some(local)) => {
                scoped = active.process_scoped(local, self.loader, true)?;
                &scoped
            }
            _ => active,
        };

        Ok(match definition.type_mapping.as_deref() {
            Some("@id") => self.reference(scope.expand_iri(s, true, false)),
            Some("@vocab") => self.reference(scope.expand_iri(s, true, true)),
            Some(datatype) if datatype != "@none" => Some(Term::literal(s, datatype)),
            _ => {
                let language = match &definition.language {
                    Some(language) => language.as_deref(),
                    None => active.language(),
                };
                Some(match language {
                    Some(language) => Term::lang_string(s, language),
                    None => Term::literal(s, XSD_STRING),
                })
            }
        })
    }

    /// Emits the `rdf:first` / `rdf:rest` chain and returns its head.
    fn list(
        &mut self,
        items: &[&Value],
        definition: &TermDefinition,
        active: &ActiveContext,
        graph: &Option<Term>,
    ) -> Result<Term, Error> {
        let mut members = Vec::with_capacity(items.len());
        for item in items {
            if let Some(member) = self.object(item, definition, active, graph)? {
                members.push(member);
            }
        }

        if members.is_empty() {
            return Ok(Term::iri(RDF_NIL));
        }

        let nodes: Vec<Term> = members.iter().map(|_| self.fresh_blank()).collect();
        for (i, member) in members.into_iter().enumerate() {
            self.emit(&nodes[i], RDF_FIRST, member, graph);
            let rest = nodes.get(i + 1).cloned().unwrap_or_else(|| Term::iri(RDF_NIL));
            self.emit(&nodes[i], RDF_REST, rest, graph);
        }
        Ok(nodes[0].clone())
    }
}

fn as_array(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// Value of the entry whose key expands to `keyword`.
fn keyword_entry<'a>(map: &'a Map<String, Value>, active: &ActiveContext, keyword: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(key, _)| key.as_str() == keyword || active.expand_iri(key, false, true).as_deref() == Some(keyword))
        .map(|(_, value)| value)
}

fn is_reference_only(map: &Map<String, Value>, active: &ActiveContext) -> bool {
    map.len() == 1 && keyword_entry(map, active, "@id").is_some()
}

fn is_list_object(value: &Value, active: &ActiveContext) -> bool {
    matches!(value, Value::Object(map) if keyword_entry(map, active, "@list").is_some())
}

fn datatype(definition: &TermDefinition) -> Option<&str> {
    definition.type_mapping.as_deref().filter(|t| !t.starts_with('@'))
}

fn datatype_or<'a>(definition: &'a TermDefinition, default: &'a str) -> &'a str {
    datatype(definition).unwrap_or(default)
}

fn value_object(map: &Map<String, Value>, active: &ActiveContext) -> Result<Option<Term>, Error> {
    let mut value = None;
    let mut datatype = None;
    let mut language = None;

    for (key, entry) in map {
        match active.expand_iri(key, false, true).as_deref() {
            Some("@value") => value = Some(entry),
            Some("@type") => {
                let t = entry.as_str().ok_or_else(|| invalid("value object @type must be a string"))?;
                if t == "@json" {
                    return Err(invalid("@json literals are not supported"));
                }
                datatype = active.expand_iri(t, true, true).filter(|iri| is_absolute_iri(iri));
                if datatype.is_none() {
                    return Err(invalid(format!("invalid datatype {}", t)));
                }
            }
            Some("@language") => {
                language = Some(entry.as_str().ok_or_else(|| invalid("@language must be a string"))?.to_lowercase());
            }
            Some("@index") | Some("@context") => {}
            _ => return Err(invalid(format!("invalid value object entry {}", key))),
        }
    }

    if datatype.is_some() && language.is_some() {
        return Err(invalid("a value object cannot have both @type and @language"));
    }

    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(match language {
            Some(language) => Term::lang_string(s.as_str(), language),
            None => Term::literal(s.as_str(), datatype.unwrap_or_else(|| XSD_STRING.to_owned())),
        })),
        Some(Value::Bool(b)) => Ok(Some(Term::literal(b.to_string(), datatype.unwrap_or_else(|| XSD_BOOLEAN.to_owned())))),
        Some(Value::Number(n)) => number_literal(n, datatype.as_deref()).map(Some),
        Some(_) => Err(invalid("@value must be a scalar")),
    }
}

/// Largest integer a JSON number can carry without losing precision as an IEEE double.
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Integral numbers become `xsd:integer`, anything else canonical `xsd:double` (`5.3E0`).
///
/// Numbers are read as doubles, so integers beyond 2^53 are rounded to the
/// nearest double before printing (`123456789012345678` becomes
/// `123456789012345680`).
fn number_literal(n: &Number, datatype: Option<&str>) -> Result<Term, Error> {
    let is_double = datatype == Some(XSD_DOUBLE);

    if !is_double {
        if let Some(i) = n.as_i64().filter(|i| i.unsigned_abs() <= MAX_SAFE_INTEGER) {
            return Ok(Term::literal(i.to_string(), datatype.unwrap_or(XSD_INTEGER)));
        }
    }

    let f = n.as_f64().ok_or_else(|| invalid("number out of range"))?;
    if !is_double && f.fract() == 0.0 && f.abs() < 1e21 {
        let lexical = if f == 0.0 { "0".to_owned() } else { format!("{:.0}", f) };
        return Ok(Term::literal(lexical, datatype.unwrap_or(XSD_INTEGER)));
    }

    Ok(Term::literal(canonical_double(f), datatype.unwrap_or(XSD_DOUBLE)))
}

/// Sixteen significant digits with trailing zeros dropped, one kept after the point.
fn canonical_double(f: f64) -> String {
    let formatted = format!("{:.15E}", f);
    match formatted.split_once('E') {
        Some((mantissa, exponent)) => {
            let mut mantissa = mantissa.trim_end_matches('0').to_owned();
            if mantissa.ends_with('.') {
                mantissa.push('0');
            }
            format!("{}E{}", mantissa, exponent)
        }
        None => formatted,
    }
}
