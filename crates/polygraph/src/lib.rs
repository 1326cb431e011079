//! Composite polymer trees, their graph projections, and the stoichiometric weighting of their edges

mod edge;
pub mod errors;
mod graph;
mod graph_values;
mod json;
mod node;
mod strategy;
mod tree;
mod weights;

#[cfg(test)]
mod testing_tools;

// Standard Library Imports
use std::collections::BTreeMap;

// External Crate Imports
use ahash::HashMap;
use rust_decimal::Decimal;

// Re-exports
pub use errors::{PolygraphError, Result};
pub use graph_values::GraphValue;
pub use strategy::Strategy;
pub use tree::ContainerMap;
pub use weights::{Grafted, PolymerWeight, Scored, weight_polymer};

/// The node property holding a fragment's degree of polymerization
pub const DEGREE_POLY: &str = "degree_poly";

// Public API ==========================================================================================================

/// An index into the arena of a [`PolymerTree`]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ComponentId(usize);

/// Points at the `index`-th connection declared by the container `container`
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct EdgeId {
    container: ComponentId,
    index: usize,
}

/// A strict tree of containers and leaf fragments, stored as an arena
///
/// Every component knows the index of the container that owns it, but ownership only ever flows downwards: containers
/// own their children and the connections declared inside of them.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct PolymerTree {
    name: String,
    components: Vec<Component>,
    root: Option<ComponentId>,
}

#[derive(Clone, Eq, PartialEq, Debug)]
enum Component {
    Container(Container),
    Node(PolymerNode),
}

/// A named scope holding leaf fragments, nested containers, and the connections between them
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Container {
    name: String,
    connections: Vec<PolymerEdge>,
    children: Vec<ComponentId>,
    parent: Option<ComponentId>,
    path: Option<Vec<String>>,
}

/// A leaf fragment of the polymer
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct PolymerNode {
    name: String,
    fragment: String,
    smiles: String,
    mw: Decimal,
    properties: BTreeMap<String, Decimal>,
    parent: Option<ComponentId>,
}

/// A directed connection between the connection points of two fragments
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct PolymerEdge {
    source: Endpoint,
    target: Endpoint,
    weight: Decimal,
    quantity: u32,
}

/// One end of a [`PolymerEdge`]: a dotted path to a fragment, followed by the name of its connection point
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Endpoint {
    declared: String,
    path: Vec<String>,
    node: String,
    point: String,
    merged: bool,
}

/// A connection that may list several sources and targets, expanded into one edge per source-target pair
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ConnectionSpec {
    pub sources: Vec<String>,
    pub targets: Vec<String>,
    pub quantity: u32,
}

/// A flat view of a [`PolymerTree`]: every leaf fragment as a node, and every connection as an edge keyed by its
/// source. The tree remains the owner of all nodes and edges.
#[derive(Debug)]
pub struct PolymerGraph<'t> {
    tree: &'t mut PolymerTree,
    nodes: Vec<ComponentId>,
    node_index: HashMap<String, usize>,
    adjacency: Vec<Vec<EdgeId>>,
    edges: Vec<EdgeId>,
}

// NOTE: Weighting runs on separate clones of a tree may happen on separate threads
static_assertions::assert_impl_all!(PolymerTree: Send, Sync, Clone);
static_assertions::assert_impl_all!(PolymerGraph<'static>: Send, Sync);
