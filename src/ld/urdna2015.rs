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

//! URDNA2015 RDF dataset canonicalization.
//!
//! Blank nodes are relabelled `_:c14n0`, `_:c14n1`, ... so that isomorphic
//! datasets serialize to the same sorted N-Quads regardless of the labels and
//! statement order they started with.

use std::collections::{BTreeMap, HashMap};

use sha2::{Digest, Sha256};

use super::rdf::{Quad, Term};

pub const CANONICAL_PREFIX: &str = "c14n";

#[derive(Clone, Debug)]
struct IdentifierIssuer {
    prefix: &'static str,
    counter: usize,
    /// Existing label -> issued label, in issuance order.
    issued: Vec<(String, String)>,
    lookup: HashMap<String, String>,
}

impl IdentifierIssuer {
    fn new(prefix: &'static str) -> Self {
        Self { prefix, counter: 0, issued: Vec::new(), lookup: HashMap::new() }
    }

    fn issue(&mut self, existing: &str) -> String {
        if let Some(issued) = self.lookup.get(existing) {
            return issued.clone();
        }
        let issued = format!("{}{}", self.prefix, self.counter);
        self.counter += 1;
        self.issued.push((existing.to_owned(), issued.clone()));
        self.lookup.insert(existing.to_owned(), issued.clone());
        issued
    }

    fn get(&self, existing: &str) -> Option<&str> {
        self.lookup.get(existing).map(String::as_str)
    }

    fn has(&self, existing: &str) -> bool {
        self.lookup.contains_key(existing)
    }
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

struct Canonicalizer<'q> {
    quads: &'q [Quad],
    blank_to_quads: HashMap<String, Vec<usize>>,
    canonical: IdentifierIssuer,
    first_degree_cache: HashMap<String, String>,
}

/// Relabels every blank node of `quads` with its canonical label.
/// The returned quads keep the input order; callers sort the serialization.
pub fn canonicalize(quads: &[Quad]) -> Vec<Quad> {
    let mut canonicalizer = Canonicalizer::new(quads);
    canonicalizer.issue_labels();

    let canonical = &canonicalizer.canonical;
    let relabel = |term: &Term| match term {
        Term::BlankNode(label) => Term::BlankNode(canonical.get(label).unwrap_or(label.as_str()).to_owned()),
        other => other.clone(),
    };
    quads.iter().map(|quad| quad.map_nodes(&relabel)).collect()
}

impl<'q> Canonicalizer<'q> {
    fn new(quads: &'q [Quad]) -> Self {
        let mut blank_to_quads: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, quad) in quads.iter().enumerate() {
            for term in [Some(&quad.subject), Some(&quad.object), quad.graph.as_ref()].into_iter().flatten() {
                if let Term::BlankNode(label) = term {
                    let entry = blank_to_quads.entry(label.clone()).or_default();
                    if entry.last() != Some(&i) {
                        entry.push(i);
                    }
                }
            }
        }

        Self {
            quads,
            blank_to_quads,
            canonical: IdentifierIssuer::new(CANONICAL_PREFIX),
            first_degree_cache: HashMap::new(),
        }
    }

    fn issue_labels(&mut self) {
        let mut blank_nodes: Vec<String> = self.blank_to_quads.keys().cloned().collect();
        blank_nodes.sort();

        let mut hash_to_blank_nodes: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for blank in &blank_nodes {
            let hash = self.first_degree_hash(blank);
            hash_to_blank_nodes.entry(hash).or_default().push(blank.clone());
        }

        // unique first degree hashes are labelled straight away, in hash order
        let mut shared: Vec<Vec<String>> = Vec::new();
        for (_, identifiers) in hash_to_blank_nodes {
            if identifiers.len() == 1 {
                self.canonical.issue(&identifiers[0]);
            } else {
                shared.push(identifiers);
            }
        }

        for identifiers in shared {
            let mut hash_path_list: Vec<(String, IdentifierIssuer)> = Vec::new();
            for identifier in &identifiers {
                if self.canonical.has(identifier) {
                    continue;
                }
                let mut temporary = IdentifierIssuer::new("b");
                temporary.issue(identifier);
                hash_path_list.push(self.hash_n_degree_quads(identifier, temporary));
            }

            hash_path_list.sort_by(|a, b| a.0.cmp(&b.0));
            for (_, issuer) in hash_path_list {
                for (existing, _) in &issuer.issued {
                    self.canonical.issue(existing);
                }
            }
        }

        log::trace!("issued {} canonical blank node labels", self.canonical.issued.len());
    }

    fn first_degree_hash(&mut self, identifier: &str) -> String {
        if let Some(hash) = self.first_degree_cache.get(identifier) {
            return hash.clone();
        }

        let replace = |term: &Term| match term {
            Term::BlankNode(label) if label == identifier => Term::BlankNode("a".to_owned()),
            Term::BlankNode(_) => Term::BlankNode("z".to_owned()),
            other => other.clone(),
        };

        let mut nquads: Vec<String> = self
            .blank_to_quads
            .get(identifier)
            .map(|indexes| indexes.iter().map(|&i| self.quads[i].map_nodes(&replace).to_nquad() + "\n").collect())
            .unwrap_or_default();
        nquads.sort();

        let hash = sha256_hex(nquads.concat().as_bytes());
        self.first_degree_cache.insert(identifier.to_owned(), hash.clone());
        hash
    }

    fn hash_related_blank_node(&mut self, related: &str, quad: &Quad, issuer: &IdentifierIssuer, position: char) -> String {
        let identifier = match self.canonical.get(related).or_else(|| issuer.get(related)) {
            Some(label) => format!("_:{}", label),
            None => self.first_degree_hash(related),
        };

        let mut input = position.to_string();
        if position != 'g' {
            input.push_str(&quad.predicate.to_string());
        }
        input.push_str(&identifier);
        sha256_hex(input.as_bytes())
    }

    fn hash_n_degree_quads(&mut self, identifier: &str, issuer: IdentifierIssuer) -> (String, IdentifierIssuer) {
        let mut issuer = issuer;
        let mut hash_to_related: BTreeMap<String, Vec<String>> = BTreeMap::new();

        let quads = self.quads;
        let indexes = self.blank_to_quads.get(identifier).cloned().unwrap_or_default();
        for i in indexes {
            let quad = &quads[i];
            let components = [(&quad.subject, 's'), (&quad.object, 'o')]
                .into_iter()
                .chain(quad.graph.as_ref().map(|g| (g, 'g')));
            for (term, position) in components {
                if let Term::BlankNode(related) = term {
                    if related != identifier {
                        let hash = self.hash_related_blank_node(related, quad, &issuer, position);
                        hash_to_related.entry(hash).or_default().push(related.clone());
                    }
                }
            }
        }

        let mut data_to_hash = String::new();
        for (related_hash, blank_nodes) in hash_to_related {
            data_to_hash.push_str(&related_hash);
            let mut chosen_path = String::new();
            let mut chosen_issuer: Option<IdentifierIssuer> = None;

            'permutations: for permutation in permutations(&blank_nodes) {
                let mut issuer_copy = issuer.clone();
                let mut path = String::new();
                let mut recursion_list: Vec<String> = Vec::new();

                for related in &permutation {
                    match self.canonical.get(related) {
                        Some(label) => path.push_str(&format!("_:{}", label)),
                        None => {
                            if !issuer_copy.has(related) {
                                recursion_list.push(related.clone());
                            }
                            path.push_str(&format!("_:{}", issuer_copy.issue(related)));
                        }
                    }
                    if is_worse(&path, &chosen_path) {
                        continue 'permutations;
                    }
                }

                for related in &recursion_list {
                    let (result_hash, result_issuer) = self.hash_n_degree_quads(related, issuer_copy.clone());
                    path.push_str(&format!("_:{}", issuer_copy.issue(related)));
                    path.push('<');
                    path.push_str(&result_hash);
                    path.push('>');
                    issuer_copy = result_issuer;
                    if is_worse(&path, &chosen_path) {
                        continue 'permutations;
                    }
                }

                if chosen_path.is_empty() || path < chosen_path {
                    chosen_path = path;
                    chosen_issuer = Some(issuer_copy);
                }
            }

            data_to_hash.push_str(&chosen_path);
            if let Some(chosen) = chosen_issuer {
                issuer = chosen;
            }
        }

        (sha256_hex(data_to_hash.as_bytes()), issuer)
    }
}

/// A path that cannot become the lexicographically least one any more.
fn is_worse(path: &str, chosen_path: &str) -> bool {
    !chosen_path.is_empty() && path.len() >= chosen_path.len() && path > chosen_path
}

fn permutations(items: &[String]) -> Vec<Vec<String>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut result = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head.clone());
            result.push(tail);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ld::rdf::XSD_STRING;

    fn blank(label: &str) -> Term {
        Term::BlankNode(label.to_owned())
    }

    fn iri(value: &str) -> Term {
        Term::iri(value)
    }

    fn sorted_nquads(quads: &[Quad]) -> Vec<String> {
        let mut lines: Vec<String> = canonicalize(quads).iter().map(Quad::to_nquad).collect();
        lines.sort();
        lines
    }

    #[test]
    fn single_blank_node() {
        let quads = vec![Quad::new(blank("x"), iri("http://example.org/name"), Term::literal("a", XSD_STRING), None)];
        assert_eq!(sorted_nquads(&quads), vec!["_:c14n0 <http://example.org/name> \"a\" ."]);
    }

    #[test]
    fn labels_and_order_do_not_matter() {
        let p = "http://example.org/p";
        let q = "http://example.org/q";
        let first = vec![
            Quad::new(iri("urn:root"), iri(p), blank("one"), None),
            Quad::new(blank("one"), iri(q), Term::literal("1", XSD_STRING), None),
            Quad::new(iri("urn:root"), iri(p), blank("two"), None),
            Quad::new(blank("two"), iri(q), Term::literal("2", XSD_STRING), None),
        ];
        let second = vec![
            Quad::new(blank("k"), iri(q), Term::literal("2", XSD_STRING), None),
            Quad::new(iri("urn:root"), iri(p), blank("j"), None),
            Quad::new(blank("j"), iri(q), Term::literal("1", XSD_STRING), None),
            Quad::new(iri("urn:root"), iri(p), blank("k"), None),
        ];
        assert_eq!(sorted_nquads(&first), sorted_nquads(&second));
    }

    #[test]
    fn symmetric_blank_nodes_need_n_degree_hashing() {
        let p = "http://example.org/knows";
        let cycle = |a: &str, b: &str, c: &str| {
            vec![
                Quad::new(blank(a), iri(p), blank(b), None),
                Quad::new(blank(b), iri(p), blank(c), None),
                Quad::new(blank(c), iri(p), blank(a), None),
            ]
        };
        let first = sorted_nquads(&cycle("x", "y", "z"));
        let second = sorted_nquads(&cycle("q", "r", "s"));
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        for label in ["_:c14n0", "_:c14n1", "_:c14n2"] {
            assert!(first.iter().any(|line| line.starts_with(label)));
        }
    }

    #[test]
    fn graph_names_are_relabelled() {
        let quads = vec![Quad::new(iri("urn:s"), iri("urn:p"), iri("urn:o"), Some(blank("g")))];
        assert_eq!(sorted_nquads(&quads), vec!["<urn:s> <urn:p> <urn:o> _:c14n0 ."]);
    }

    #[test]
    fn permutations_are_complete() {
        let items: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let all = permutations(&items);
        assert_eq!(all.len(), 6);
        assert!(all.contains(&vec!["c".to_owned(), "a".to_owned(), "b".to_owned()]));
    }
}
