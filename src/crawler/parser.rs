//! RDF parsing and TREE vocabulary extraction
//!
//! A fragment is parsed into one graph. Relations are the `tree:node`
//! targets of its `tree:relation`s, members are the objects of `tree:member`.

use oxrdf::{Graph, NamedNodeRef, SubjectRef, TermRef, Triple};
use oxrdfio::{RdfFormat, RdfParser};
use std::collections::HashSet;

pub const TREE_RELATION: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("https://w3id.org/tree#relation");
pub const TREE_NODE: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("https://w3id.org/tree#node");
pub const TREE_MEMBER: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("https://w3id.org/tree#member");

/// Parses a response body into a graph
///
/// Relative IRIs resolve against `base_iri`. Quads in named graphs are folded
/// into the default graph.
pub fn parse_graph(body: &[u8], format: RdfFormat, base_iri: &str) -> Result<Graph, String> {
    let parser = RdfParser::from_format(format)
        .with_base_iri(base_iri)
        .map_err(|e| e.to_string())?;

    let mut graph = Graph::new();
    for quad in parser.for_reader(body) {
        let quad = quad.map_err(|e| e.to_string())?;
        graph.insert(&Triple::new(quad.subject, quad.predicate, quad.object));
    }
    Ok(graph)
}

/// Returns the node if the term can appear in subject position
pub fn as_subject(term: TermRef<'_>) -> Option<SubjectRef<'_>> {
    match term {
        TermRef::NamedNode(node) => Some(node.into()),
        TermRef::BlankNode(node) => Some(node.into()),
        _ => None,
    }
}

/// String identity of a node: the bare IRI, or `_:label` for blank nodes
pub fn subject_id(subject: SubjectRef<'_>) -> String {
    match subject {
        SubjectRef::NamedNode(node) => node.as_str().to_string(),
        other => other.to_string(),
    }
}

/// String value of a term: the bare IRI, the literal's lexical form, or `_:label`
pub fn term_value(term: TermRef<'_>) -> String {
    match term {
        TermRef::NamedNode(node) => node.as_str().to_string(),
        TermRef::Literal(literal) => literal.value().to_string(),
        other => other.to_string(),
    }
}

/// Extracts relation target URLs in document order, without duplicates
pub fn extract_relations(graph: &Graph) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut relations = Vec::new();

    for relation in graph.triples_for_predicate(TREE_RELATION) {
        let Some(relation_node) = as_subject(relation.object) else {
            continue;
        };
        for target in graph.objects_for_subject_predicate(relation_node, TREE_NODE) {
            if let TermRef::NamedNode(node) = target {
                if seen.insert(node.as_str()) {
                    relations.push(node.as_str().to_string());
                }
            }
        }
    }

    relations
}

/// Extracts every member with its own sub-graph
pub fn extract_members(graph: &Graph) -> Vec<(String, Graph)> {
    let mut seen = HashSet::new();
    let mut members = Vec::new();

    for triple in graph.triples_for_predicate(TREE_MEMBER) {
        let Some(root) = as_subject(triple.object) else {
            continue;
        };
        if seen.insert(root) {
            members.push((subject_id(root), member_closure(graph, root)));
        }
    }

    members
}

/// Collects all triples reachable from `root` over outgoing edges
pub fn member_closure(graph: &Graph, root: SubjectRef<'_>) -> Graph {
    let mut closure = Graph::new();
    let mut visited = HashSet::new();
    let mut pending = vec![root];

    while let Some(node) = pending.pop() {
        if !visited.insert(node) {
            continue;
        }
        for triple in graph.triples_for_subject(node) {
            closure.insert(triple);
            if let Some(next) = as_subject(triple.object) {
                if !visited.contains(&next) {
                    pending.push(next);
                }
            }
        }
    }

    closure
}
