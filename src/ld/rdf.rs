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

//! RDF terms and quads with their N-Quads serialization.

use std::fmt;

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDF_FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
pub const RDF_REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
pub const RDF_NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";

#[derive(Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub enum Term {
    Iri(String),
    /// Label without the `_:` prefix.
    BlankNode(String),
    Literal { value: String, datatype: String, language: Option<String> },
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    pub fn literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal { value: value.into(), datatype: datatype.into(), language: None }
    }

    pub fn lang_string(value: impl Into<String>, language: impl Into<String>) -> Self {
        Term::Literal { value: value.into(), datatype: RDF_LANG_STRING.to_owned(), language: Some(language.into()) }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::BlankNode(label) => write!(f, "_:{}", label),
            Term::Literal { value, datatype, language } => {
                write!(f, "\"{}\"", escape(value))?;
                match language {
                    Some(language) => write!(f, "@{}", language),
                    None if datatype != XSD_STRING => write!(f, "^^<{}>", datatype),
                    None => Ok(()),
                }
            }
        }
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Quad {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
    /// `None` is the default graph.
    pub graph: Option<Term>,
}

impl Quad {
    pub fn new(subject: Term, predicate: Term, object: Term, graph: Option<Term>) -> Self {
        Self { subject, predicate, object, graph }
    }

    /// N-Quads line without the trailing newline.
    pub fn to_nquad(&self) -> String {
        match &self.graph {
            Some(graph) => format!("{} {} {} {} .", self.subject, self.predicate, self.object, graph),
            None => format!("{} {} {} .", self.subject, self.predicate, self.object),
        }
    }

    /// Applies `f` to subject, object and graph name.
    pub fn map_nodes(&self, f: impl Fn(&Term) -> Term) -> Self {
        Quad {
            subject: f(&self.subject),
            predicate: self.predicate.clone(),
            object: f(&self.object),
            graph: self.graph.as_ref().map(&f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nquad_serialization() {
        let quad = Quad::new(
            Term::BlankNode("c14n0".to_owned()),
            Term::iri("http://schema.org/name"),
            Term::literal("Jane \"J\" Doe\n", XSD_STRING),
            None,
        );
        assert_eq!(quad.to_nquad(), r#"_:c14n0 <http://schema.org/name> "Jane \"J\" Doe\n" ."#);

        let quad = Quad::new(
            Term::iri("did:example:b34ca6cd37bbf23"),
            Term::iri("http://schema.org/age"),
            Term::literal("42", XSD_INTEGER),
            Some(Term::iri("urn:graph")),
        );
        assert_eq!(
            quad.to_nquad(),
            "<did:example:b34ca6cd37bbf23> <http://schema.org/age> \"42\"^^<http://www.w3.org/2001/XMLSchema#integer> <urn:graph> ."
        );

        let quad = Quad::new(Term::iri("urn:a"), Term::iri("urn:p"), Term::lang_string("ciao", "it"), None);
        assert_eq!(quad.to_nquad(), "<urn:a> <urn:p> \"ciao\"@it .");
    }
}
