//! Domain-specific connection validity rules.
//!
//! Each graph kind defines which kind-pairs may be connected. The predicate
//! is pure: it reads the graph and returns a verdict, nothing else. Callers
//! evaluate it before attempting edge creation.
//!
//! Program and application graphs share one rule table:
//!
//! | source                             | target | allowed when                     |
//! |------------------------------------|--------|----------------------------------|
//! | account \| collection \| instruction | field  | target in-degree is 0            |
//! | field (struct-typed)               | field  | target in-degree is 0            |
//! | anything else                      |        | never                            |
//!
//! A field accepts at most one incoming definition edge, and only
//! struct-typed fields can nest other fields.
//!
//! Instruction and workspace graphs define no valid connections: their
//! node-kind sets have no field targets, so every pair is rejected.

use crate::model::{NodeData, NodeKind};

use super::{Graph, GraphKind, Node};

/// Whether an edge `source -> target` would be valid on this graph.
#[must_use]
pub fn can_connect(graph: &Graph, source_id: &str, target_id: &str) -> bool {
    // An endpoint that does not resolve to a live node is an orphaned
    // reference; reject before consulting any rule table.
    let (Some(source), Some(target)) = (graph.node(source_id), graph.node(target_id)) else {
        return false;
    };

    match graph.kind {
        GraphKind::Program | GraphKind::Application => {
            definition_rule(graph, source, target, target_id)
        }
        GraphKind::Instruction | GraphKind::Workspace => false,
    }
}

fn definition_rule(graph: &Graph, source: &Node, target: &Node, target_id: &str) -> bool {
    if target.kind != NodeKind::Field {
        return false;
    }

    match source.kind {
        NodeKind::Account | NodeKind::Collection | NodeKind::Instruction => {
            graph.in_degree(target_id) == 0
        }
        NodeKind::Field => {
            let NodeData::Field(data) = &source.data else {
                return false;
            };
            data.field_type.is_composite() && graph.in_degree(target_id) == 0
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Edge;
    use crate::model::{
        AccountData, ApplicationData, FieldData, FieldType, SignerData, SysvarData,
    };
    use std::collections::BTreeMap;

    fn account(id: &str) -> Node {
        Node::new(
            id,
            NodeData::Account(AccountData {
                name: id.into(),
                space: None,
                extra: BTreeMap::new(),
            }),
        )
    }

    fn field(id: &str, ty: FieldType) -> Node {
        Node::new(
            id,
            NodeData::Field(FieldData {
                name: id.into(),
                field_type: ty,
                extra: BTreeMap::new(),
            }),
        )
    }

    fn graph_with(kind: GraphKind, nodes: Vec<Node>) -> Graph {
        let mut graph = Graph::new("g", kind);
        for node in nodes {
            graph.add_node(node).expect("add node");
        }
        graph
    }

    #[test]
    fn account_to_free_field_is_allowed() {
        let graph = graph_with(
            GraphKind::Program,
            vec![account("a1"), field("f1", FieldType::String)],
        );
        assert!(can_connect(&graph, "a1", "f1"));
    }

    #[test]
    fn occupied_field_rejects_second_definition() {
        let mut graph = graph_with(
            GraphKind::Program,
            vec![account("a1"), account("a2"), field("f1", FieldType::String)],
        );
        assert!(can_connect(&graph, "a1", "f1"));
        graph
            .add_edge(Edge {
                id: "e1".into(),
                source: "a1".into(),
                target: "f1".into(),
            })
            .expect("add edge");
        assert!(!can_connect(&graph, "a2", "f1"));
        // The same pair again is also rejected: in-degree is now 1.
        assert!(!can_connect(&graph, "a1", "f1"));
    }

    #[test]
    fn struct_field_may_nest_a_free_field() {
        let graph = graph_with(
            GraphKind::Program,
            vec![field("parent", FieldType::Struct), field("child", FieldType::U8)],
        );
        assert!(can_connect(&graph, "parent", "child"));
    }

    #[test]
    fn scalar_field_may_not_nest() {
        let graph = graph_with(
            GraphKind::Program,
            vec![field("parent", FieldType::U64), field("child", FieldType::U8)],
        );
        assert!(!can_connect(&graph, "parent", "child"));
    }

    #[test]
    fn field_to_non_field_is_rejected() {
        let graph = graph_with(
            GraphKind::Program,
            vec![field("f1", FieldType::Struct), account("a1")],
        );
        assert!(!can_connect(&graph, "f1", "a1"));
    }

    #[test]
    fn orphaned_endpoint_is_rejected() {
        let graph = graph_with(GraphKind::Program, vec![account("a1")]);
        assert!(!can_connect(&graph, "a1", "ghost"));
        assert!(!can_connect(&graph, "ghost", "a1"));
    }

    #[test]
    fn application_graphs_share_the_rule_table() {
        let graph = graph_with(
            GraphKind::Application,
            vec![account("a1"), field("f1", FieldType::Pubkey)],
        );
        assert!(can_connect(&graph, "a1", "f1"));
    }

    #[test]
    fn instruction_graphs_reject_everything() {
        let graph = graph_with(
            GraphKind::Instruction,
            vec![
                Node::new(
                    "s1",
                    NodeData::Signer(SignerData {
                        name: "payer".into(),
                        save_changes: false,
                        extra: BTreeMap::new(),
                    }),
                ),
                Node::new(
                    "v1",
                    NodeData::Sysvar(SysvarData {
                        name: "clock".into(),
                        extra: BTreeMap::new(),
                    }),
                ),
                Node::new(
                    "app1",
                    NodeData::Application(ApplicationData {
                        name: "app".into(),
                        extra: BTreeMap::new(),
                    }),
                ),
            ],
        );
        for source in ["s1", "v1", "app1"] {
            for target in ["s1", "v1", "app1"] {
                assert!(!can_connect(&graph, source, target), "{source} -> {target}");
            }
        }
    }

    #[test]
    fn predicate_is_pure() {
        let graph = graph_with(
            GraphKind::Program,
            vec![account("a1"), field("f1", FieldType::String)],
        );
        let before = graph.clone();
        let first = can_connect(&graph, "a1", "f1");
        let second = can_connect(&graph, "a1", "f1");
        assert_eq!(first, second);
        assert_eq!(graph, before);
    }
}
