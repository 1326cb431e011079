use ahash::{HashSet, HashSetExt};
use derive_more::IsVariant;
use tracing::debug;

use crate::{PolygraphError, PolymerGraph, PolymerTree, Result};

/// How the ends of a polymer are closed off, decided by the shape of its root container
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, IsVariant)]
pub enum Strategy {
    /// The polymer closes on itself, so it has no end groups at all
    Cyclic,
    /// A chain that may start at an initiator and may stop at an end cap
    Linear { has_initiator: bool, has_end_cap: bool },
}

impl Strategy {
    /// Looks only at the root container: its own connections and the fragments directly inside of it
    ///
    /// A root holding nested containers, without any connection from a fragment back to itself, is a linear chain.
    /// The chain has an initiator when some root fragment is the source of a connection, and has an end cap when some
    /// connected root fragment is never a source.
    #[must_use]
    pub fn select(graph: &PolymerGraph) -> Self {
        let strategy = Self::from_tree(graph.tree());
        debug!(?strategy, "selected weighting strategy");
        strategy
    }

    fn from_tree(tree: &PolymerTree) -> Self {
        let Some(root) = tree.root() else {
            return Self::Cyclic;
        };

        let has_containers = root.children.iter().any(|&id| tree.container(id).is_some());
        let has_self_edges = root.connections.iter().any(|edge| edge.is_self_loop());
        if !has_containers || has_self_edges {
            return Self::Cyclic;
        }

        let leaves: HashSet<_> = root
            .children
            .iter()
            .filter_map(|&id| tree.node(id))
            .map(|node| node.name.as_str())
            .collect();
        let mut sources = HashSet::new();
        let mut touched = HashSet::new();
        for edge in &root.connections {
            for (endpoint, is_source) in [(&edge.source, true), (&edge.target, false)] {
                let node = endpoint.node();
                if leaves.contains(node) {
                    touched.insert(node);
                    if is_source {
                        sources.insert(node);
                    }
                }
            }
        }

        Self::Linear {
            has_initiator: !sources.is_empty(),
            has_end_cap: touched.iter().any(|node| !sources.contains(node)),
        }
    }

    /// The number of chain ends left open, each of which still counts towards the total score
    pub fn pseudo_end_groups(self) -> Result<u32> {
        match self {
            Self::Cyclic
            | Self::Linear {
                has_initiator: true,
                has_end_cap: true,
            } => Ok(0),
            Self::Linear {
                has_initiator: true,
                has_end_cap: false,
            } => Ok(1),
            Self::Linear {
                has_initiator: false,
                has_end_cap: false,
            } => Ok(2),
            Self::Linear {
                has_initiator: false,
                has_end_cap: true,
            } => Err(PolygraphError::structural_state("invalid linear strategy state").into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{ConnectionSpec, Container, PolymerNode, testing_tools::load_tree};

    fn select(tree: &mut PolymerTree) -> Strategy {
        let graph = PolymerGraph::new(tree).unwrap();
        Strategy::select(&graph)
    }

    #[test]
    fn linear_strategies() {
        let mut tree = load_tree!("egMeO_pVL");
        assert_eq!(
            select(&mut tree),
            Strategy::Linear {
                has_initiator: true,
                has_end_cap: false
            }
        );

        let mut tree = load_tree!("BASE");
        assert_eq!(
            select(&mut tree),
            Strategy::Linear {
                has_initiator: true,
                has_end_cap: true
            }
        );

        let mut tree = load_tree!("dendrimer");
        assert!(select(&mut tree).is_linear());
    }

    #[test]
    fn capped_without_initiator() {
        let mut tree = PolymerTree::new("capped");
        tree.insert_container(Container::new("capped"), None).unwrap();
        tree.insert_container(Container::new("P"), Some("capped"))
            .unwrap();
        tree.insert_node(PolymerNode::new("P", "[CH2]", dec!(14.027)), "P")
            .unwrap();
        tree.insert_node(PolymerNode::new("E", "[H]", dec!(1.008)), "capped")
            .unwrap();
        tree.create_edges(&ConnectionSpec::new(["P.P.R"], ["E.Q"], 1), "capped")
            .unwrap();

        let strategy = select(&mut tree);
        assert_eq!(
            strategy,
            Strategy::Linear {
                has_initiator: false,
                has_end_cap: true
            }
        );
        let err = strategy.pseudo_end_groups().unwrap_err();
        assert!(matches!(*err, PolygraphError::StructuralState(ref reason) if reason == "invalid linear strategy state"));
    }

    #[test]
    fn cyclic_strategies() {
        // No nested containers at all
        let json = indoc! {r#"
            {"name": "ring", "type": "polymer_graph", "tree": {"name": "ring", "parent": null, "children": [
              {"name": "A", "mw": 14.027, "smiles": "[CH2]", "parent": "ring"},
              {"name": "B", "mw": 14.027, "smiles": "[CH2]", "parent": "ring"}
            ], "connections": [
              {"source": "A.R", "target": "B.Q", "weight": 1, "quantity": "1"},
              {"source": "B.R", "target": "A.Q", "weight": 1, "quantity": "1"}
            ]}}
        "#};
        let mut tree = PolymerTree::from_json(json).unwrap();
        assert_eq!(select(&mut tree), Strategy::Cyclic);

        // A root fragment connected to itself
        let mut tree = load_tree!("BASE");
        tree.create_edges(&ConnectionSpec::new(["I.R"], ["I.Q"], 1), "BASE")
            .unwrap();
        assert_eq!(select(&mut tree), Strategy::Cyclic);

        assert_eq!(Strategy::from_tree(&PolymerTree::default()), Strategy::Cyclic);
    }

    #[test]
    fn pseudo_end_groups() {
        let linear = |has_initiator, has_end_cap| Strategy::Linear {
            has_initiator,
            has_end_cap,
        };
        assert_eq!(Strategy::Cyclic.pseudo_end_groups().unwrap(), 0);
        assert_eq!(linear(true, true).pseudo_end_groups().unwrap(), 0);
        assert_eq!(linear(true, false).pseudo_end_groups().unwrap(), 1);
        assert_eq!(linear(false, false).pseudo_end_groups().unwrap(), 2);
        assert!(linear(false, true).pseudo_end_groups().is_err());
    }
}
