use std::fmt::{self, Display, Formatter};

use ahash::{HashMap, HashMapExt};
use itertools::Itertools;
use rust_decimal::Decimal;
use tracing::debug;

use crate::{
    Container, DEGREE_POLY, EdgeId, PolygraphError, PolymerEdge, PolymerGraph, PolymerNode,
    PolymerTree, Result, json::GraphJson,
};

impl<'t> PolymerGraph<'t> {
    /// Projects `tree` into a graph, resolving its paths first
    ///
    /// Every leaf fragment becomes a node and every connection becomes an edge listed under its source node. Both
    /// ends of every connection must name a fragment that exists somewhere in the tree.
    pub fn new(tree: &'t mut PolymerTree) -> Result<Self> {
        tree.resolve_paths();

        let mut nodes = Vec::new();
        let mut node_index = HashMap::new();
        for id in tree.bfs() {
            let Some(node) = tree.node(id) else { continue };
            if node_index.insert(node.name.clone(), nodes.len()).is_some() {
                return Err(PolygraphError::structural_state(format!(
                    "the fragment {:?} appears more than once in the tree",
                    node.name
                ))
                .into());
            }
            nodes.push(id);
        }

        let mut adjacency = vec![Vec::new(); nodes.len()];
        let mut edges = Vec::new();
        for (id, _, edge) in tree.connections() {
            let source = node_index
                .get(edge.source.node())
                .copied()
                .ok_or_else(|| PolygraphError::missing_node(edge.source.node()))?;
            if !node_index.contains_key(edge.target.node()) {
                return Err(PolygraphError::missing_node(edge.target.node()).into());
            }
            adjacency[source].push(id);
            edges.push(id);
        }

        debug!(tree = %tree.name, nodes = nodes.len(), edges = edges.len(), "built polymer graph");
        Ok(Self {
            tree,
            nodes,
            node_index,
            adjacency,
            edges,
        })
    }

    #[must_use]
    pub fn tree(&self) -> &PolymerTree {
        &*self.tree
    }

    pub fn node(&self, path: &str) -> Result<&PolymerNode> {
        let id = self.nodes[self.index(path)?];
        self.tree
            .node(id)
            .ok_or_else(|| PolygraphError::missing_node(path).into())
    }

    /// Every node, in breadth-first order from the root
    pub fn nodes(&self) -> impl Iterator<Item = &PolymerNode> {
        self.nodes.iter().filter_map(|&id| self.tree.node(id))
    }

    /// Every edge, in the order that their containers declared them
    pub fn edges(&self) -> impl Iterator<Item = &PolymerEdge> {
        self.edges.iter().filter_map(|&id| self.tree.edge(id))
    }

    /// The edges leaving the node at `path`
    pub fn outgoing(&self, path: &str) -> Result<impl Iterator<Item = &PolymerEdge>> {
        let index = self.index(path)?;
        Ok(self.adjacency[index]
            .iter()
            .filter_map(|&id| self.tree.edge(id)))
    }

    /// The first edge running from the node at `source` to the node at `target`
    pub fn edge(&self, source: &str, target: &str) -> Result<&PolymerEdge> {
        self.outgoing(source)?
            .find(|edge| edge.target.node() == target)
            .ok_or_else(|| PolygraphError::missing_edge(source, target).into())
    }

    pub fn degree_poly(&self, path: &str) -> Result<Decimal> {
        self.node(path).map(PolymerNode::degree_poly)
    }

    pub fn set_node_property(&mut self, path: &str, name: &str, value: Decimal) -> Result<()> {
        let id = self.nodes[self.index(path)?];
        let node = self
            .tree
            .node_mut(id)
            .ok_or_else(|| PolygraphError::missing_node(path))?;
        node.set_property(name, value);
        Ok(())
    }

    /// Writes out every node and edge as JSON, with absolute paths for edge endpoints
    pub fn to_json(&self) -> Result<String> {
        let graph = GraphJson {
            nodes: self.nodes().map(|node| self.tree.node_json(node)).collect(),
            edges: self
                .edges()
                .map(|edge| edge.to_json(ToString::to_string))
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&graph).map_err(PolygraphError::from)?)
    }

    /// A terse rendering for logs, with every node path masked as `[@N]`
    #[must_use]
    pub fn to_compressed_string(&self) -> String {
        let mask = |path: &str| {
            self.node_index
                .get(path)
                .map_or_else(|| path.to_owned(), |index| format!("[@{index}]"))
        };

        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, &id)| Some((index, self.tree.node(id)?)))
            .map(|(index, node)| {
                let degree_poly = node
                    .property(DEGREE_POLY)
                    .map(|dp| format!(";{dp}"))
                    .unwrap_or_default();
                let edges = self.adjacency[index]
                    .iter()
                    .filter_map(|&id| self.tree.edge(id))
                    .map(|edge| {
                        format!(
                            "{}.{} -> {}.{}",
                            mask(edge.source.node()),
                            edge.source.point(),
                            mask(edge.target.node()),
                            edge.target.point()
                        )
                    })
                    .join(", ");
                format!("<<[@{index}];{}{degree_poly}>{edges}>", node.smiles)
            })
            .collect()
    }

    // Crate API =======================================================================================================

    /// Every edge, alongside its handle and the container that declared it
    pub(crate) fn connections(&self) -> impl Iterator<Item = (EdgeId, &Container, &PolymerEdge)> {
        self.tree.connections()
    }

    /// The local name of the container holding the node at `path`
    pub(crate) fn group(&self, path: &str) -> Result<&str> {
        let id = self.nodes[self.index(path)?];
        self.tree
            .node(id)
            .and_then(|node| node.parent)
            .and_then(|parent| self.tree.container(parent))
            .map(Container::name)
            .ok_or_else(|| {
                PolygraphError::structural_state(format!("the fragment {path:?} has no container")).into()
            })
    }

    pub(crate) fn set_weight(&mut self, id: EdgeId, weight: Decimal) -> Result<()> {
        let edge = self.tree.edge_mut(id).ok_or_else(|| {
            PolygraphError::structural_state(format!("the edge {id:?} no longer exists"))
        })?;
        edge.set_weight(weight);
        Ok(())
    }

    pub(crate) fn root_name(&self) -> Result<&str> {
        self.tree
            .root()
            .map(Container::name)
            .ok_or_else(|| PolygraphError::structural_state("the polymer tree has no root").into())
    }

    fn index(&self, path: &str) -> Result<usize> {
        self.node_index
            .get(path)
            .copied()
            .ok_or_else(|| PolygraphError::missing_node(path).into())
    }
}

impl Display for PolymerGraph<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_compressed_string())
    }
}
