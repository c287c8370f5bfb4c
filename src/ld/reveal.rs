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

//! Choosing the revealed statements of a signed document and rebuilding a
//! JSON-LD document from them.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::rdf::{Quad, Term, RDF_TYPE, XSD_STRING};
use crate::errors::Error;

/// Canonical blank nodes are revealed as `urn:bnid:_:c14nN` IRIs so that they
/// survive the second canonicalization done by the verifier.
pub const SKOLEM_PREFIX: &str = "urn:bnid:_:";

/// Which statements of the signed document a derived proof discloses.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RevealSelection {
    All,
    /// Positions in the sorted canonical statements of the document.
    Statements(Vec<usize>),
    /// Statements with one of these predicate IRIs, along with the `rdf:type`
    /// statements of the nodes involved and the statements linking those nodes
    /// back to their parents.
    Predicates(Vec<String>),
}

impl RevealSelection {
    /// Indexes of the revealed statements among `quads`, ascending.
    pub fn select(&self, quads: &[Quad]) -> Result<Vec<usize>, Error> {
        match self {
            RevealSelection::All => Ok((0..quads.len()).collect()),
            RevealSelection::Statements(indexes) => {
                let selected: BTreeSet<usize> = indexes.iter().copied().collect();
                match selected.iter().next_back() {
                    Some(&last) if last >= quads.len() => {
                        Err(Error::GeneratorCountMismatch { expected: quads.len(), found: last + 1 })
                    }
                    _ => Ok(selected.into_iter().collect()),
                }
            }
            RevealSelection::Predicates(predicates) => Ok(select_predicates(quads, predicates)),
        }
    }
}

fn select_predicates(quads: &[Quad], predicates: &[String]) -> Vec<usize> {
    let wanted: HashSet<&str> = predicates.iter().map(String::as_str).collect();
    let mut selected: BTreeSet<usize> = BTreeSet::new();
    let mut pending: Vec<Term> = Vec::new();

    for (i, quad) in quads.iter().enumerate() {
        if matches!(&quad.predicate, Term::Iri(p) if wanted.contains(p.as_str())) {
            selected.insert(i);
            pending.push(quad.subject.clone());
            pending.extend(quad.graph.clone());
        }
    }

    let mut visited: HashSet<Term> = HashSet::new();
    while let Some(node) = pending.pop() {
        if !visited.insert(node.clone()) {
            continue;
        }
        for (i, quad) in quads.iter().enumerate() {
            let is_type = quad.subject == node && matches!(&quad.predicate, Term::Iri(p) if p == RDF_TYPE);
            let is_parent_link = quad.object == node;
            if is_type || is_parent_link {
                selected.insert(i);
                pending.extend(quad.graph.clone());
            }
            if is_parent_link {
                pending.push(quad.subject.clone());
            }
        }
    }

    selected.into_iter().collect()
}

pub fn skolemize(term: &Term) -> Term {
    match term {
        Term::BlankNode(label) => Term::Iri(format!("{}{}", SKOLEM_PREFIX, label)),
        other => other.clone(),
    }
}

pub fn deskolemize(term: &Term) -> Term {
    match term {
        Term::Iri(iri) => match iri.strip_prefix(SKOLEM_PREFIX) {
            Some(label) => Term::BlankNode(label.to_owned()),
            None => term.clone(),
        },
        other => other.clone(),
    }
}

fn node_id(term: &Term) -> String {
    match term {
        Term::Iri(iri) => iri.clone(),
        Term::BlankNode(label) => format!("_:{}", label),
        Term::Literal { value, .. } => value.clone(),
    }
}

fn object_json(term: &Term) -> Value {
    match term {
        Term::Literal { value, language: Some(language), .. } => json!({"@value": value, "@language": language}),
        Term::Literal { value, datatype, .. } if datatype == XSD_STRING => json!({"@value": value}),
        Term::Literal { value, datatype, .. } => json!({"@value": value, "@type": datatype}),
        node => json!({"@id": node_id(node)}),
    }
}

fn push_entry(node: &mut Map<String, Value>, key: &str, value: Value) {
    match node.entry(key.to_owned()).or_insert_with(|| Value::Array(Vec::new())) {
        Value::Array(values) => values.push(value),
        other => *other = Value::Array(vec![other.clone(), value]),
    }
}

/// Flattened, expanded JSON-LD for `quads` (`{"@graph": [...]}`), with full
/// IRIs and no context.
pub fn to_expanded_document(quads: &[Quad]) -> Value {
    let mut graphs: BTreeMap<Option<String>, BTreeMap<String, Map<String, Value>>> = BTreeMap::new();

    for quad in quads {
        let subject = node_id(&quad.subject);
        let node = graphs
            .entry(quad.graph.as_ref().map(node_id))
            .or_default()
            .entry(subject.clone())
            .or_insert_with(|| {
                let mut node = Map::new();
                node.insert("@id".to_owned(), Value::String(subject));
                node
            });

        match (&quad.predicate, &quad.object) {
            (Term::Iri(p), Term::Iri(_) | Term::BlankNode(_)) if p == RDF_TYPE => {
                push_entry(node, "@type", Value::String(node_id(&quad.object)));
            }
            (predicate, object) => push_entry(node, &node_id(predicate), object_json(object)),
        }
    }

    let mut default_graph = graphs.remove(&None).unwrap_or_default();
    for (name, nodes) in graphs {
        let Some(name) = name else { continue };
        let graph_node = default_graph.entry(name.clone()).or_insert_with(|| {
            let mut node = Map::new();
            node.insert("@id".to_owned(), Value::String(name));
            node
        });
        graph_node.insert("@graph".to_owned(), Value::Array(nodes.into_values().map(Value::Object).collect()));
    }

    json!({ "@graph": default_graph.into_values().map(Value::Object).collect::<Vec<_>>() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ld::expand::to_rdf;
    use crate::ld::loader::StaticDocumentLoader;
    use crate::ld::rdf::XSD_INTEGER;

    fn quad(s: Term, p: &str, o: Term) -> Quad {
        Quad::new(s, Term::iri(p), o, None)
    }

    fn sample() -> Vec<Quad> {
        vec![
            quad(Term::iri("urn:cred"), "urn:subject", Term::BlankNode("c14n0".to_owned())),
            quad(Term::iri("urn:cred"), RDF_TYPE, Term::iri("urn:Credential")),
            quad(Term::BlankNode("c14n0".to_owned()), "urn:age", Term::literal("42", XSD_INTEGER)),
            quad(Term::BlankNode("c14n0".to_owned()), "urn:name", Term::literal("Jane", XSD_STRING)),
            quad(Term::BlankNode("c14n0".to_owned()), RDF_TYPE, Term::iri("urn:Person")),
            quad(Term::iri("urn:cred"), "urn:issuer", Term::iri("urn:issuer")),
        ]
    }

    #[test]
    fn statements_selection() {
        let quads = sample();
        assert_eq!(RevealSelection::Statements(vec![3, 0, 3]).select(&quads).unwrap(), vec![0, 3]);
        assert_eq!(RevealSelection::All.select(&quads).unwrap().len(), quads.len());
        assert_eq!(
            RevealSelection::Statements(vec![6]).select(&quads),
            Err(Error::GeneratorCountMismatch { expected: 6, found: 7 })
        );
    }

    #[test]
    fn predicate_selection_keeps_types_and_parents() {
        let quads = sample();
        let selected = RevealSelection::Predicates(vec!["urn:name".to_owned()]).select(&quads).unwrap();
        // name, the subject's type, the link from the credential and the credential's type
        assert_eq!(selected, vec![0, 1, 3, 4]);
    }

    #[test]
    fn skolemization_round_trip() {
        let blank = Term::BlankNode("c14n3".to_owned());
        let skolem = skolemize(&blank);
        assert_eq!(skolem, Term::iri("urn:bnid:_:c14n3"));
        assert_eq!(deskolemize(&skolem), blank);
        assert_eq!(deskolemize(&Term::iri("urn:other")), Term::iri("urn:other"));
    }

    #[test]
    fn expanded_document_denotes_the_same_quads() {
        let quads: Vec<Quad> = sample().iter().map(|q| q.map_nodes(skolemize)).collect();
        let document = to_expanded_document(&quads);

        let mut expected: Vec<String> = quads.iter().map(Quad::to_nquad).collect();
        expected.sort();
        let mut actual: Vec<String> = to_rdf(&document, &StaticDocumentLoader::new())
            .unwrap()
            .iter()
            .map(Quad::to_nquad)
            .collect();
        actual.sort();
        assert_eq!(actual, expected);
    }

    #[test]
    fn named_graphs_are_nested() {
        let quads = vec![Quad::new(Term::iri("urn:s"), Term::iri("urn:p"), Term::iri("urn:o"), Some(Term::iri("urn:g")))];
        let document = to_expanded_document(&quads);
        assert_eq!(
            document,
            json!({"@graph": [{"@id": "urn:g", "@graph": [{"@id": "urn:s", "urn:p": [{"@id": "urn:o"}]}]}]})
        );
    }
}
