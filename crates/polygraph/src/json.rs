use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Component, ComponentId, Container, DEGREE_POLY, Endpoint, PolygraphError, PolymerEdge,
    PolymerNode, PolymerTree, Result,
};

const TREE_TYPE: &str = "polymer_graph";

// JSON Schema =========================================================================================================

#[derive(Debug, Serialize, Deserialize)]
struct TreeJson {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    tree: ContainerJson,
}

#[derive(Debug, Serialize, Deserialize)]
struct ContainerJson {
    name: String,
    connections: Vec<ConnectionJson>,
    parent: Option<String>,
    children: Vec<ComponentJson>,
}

// NOTE: Only containers have connections, so untagged deserialization tries them first
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ComponentJson {
    Container(ContainerJson),
    Node(NodeJson),
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct NodeJson {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub mw: Decimal,
    pub smiles: String,
    pub parent: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::str_option"
    )]
    pub degree_poly: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ConnectionJson {
    pub source: String,
    pub target: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub weight: Decimal,
    pub quantity: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct GraphJson {
    pub nodes: Vec<NodeJson>,
    pub edges: Vec<ConnectionJson>,
}

// Tree Import and Export ==============================================================================================

impl PolymerTree {
    /// Builds a tree from its JSON form, `{"name": …, "type": "polymer_graph", "tree": …}`, then resolves its paths
    pub fn from_json(json: &str) -> Result<Self> {
        let TreeJson { name, kind, tree } =
            serde_json::from_str(json).map_err(PolygraphError::from)?;
        if kind != TREE_TYPE {
            return Err(PolygraphError::parse(&kind, "expected a tree of type \"polymer_graph\"").into());
        }

        let mut polymer = Self::new(name);
        polymer.import_container(tree, None)?;
        polymer.resolve_paths();
        debug!(
            tree = %polymer.name,
            nodes = polymer.nodes().count(),
            edges = polymer.edges().count(),
            "imported polymer tree"
        );
        Ok(polymer)
    }

    /// Writes this tree out as JSON. Connections keep the paths they were declared with, so that the output can be
    /// imported again.
    pub fn to_json(&self) -> Result<String> {
        let Some(root) = self.root else {
            return Err(PolygraphError::structural_state("cannot export an empty tree").into());
        };
        let tree = TreeJson {
            name: self.name.clone(),
            kind: TREE_TYPE.to_owned(),
            tree: self.export_container(root)?,
        };
        Ok(serde_json::to_string_pretty(&tree).map_err(PolygraphError::from)?)
    }

    fn import_container(&mut self, json: ContainerJson, parent: Option<ComponentId>) -> Result<()> {
        let ContainerJson {
            name,
            connections,
            children,
            ..
        } = json;

        let edges = connections
            .iter()
            .map(PolymerEdge::from_json)
            .collect::<Result<Vec<_>>>()?;
        let mut container = Container::new(name);
        container.push_edges(edges);
        let id = self.attach(parent, Component::Container(container));

        for child in children {
            match child {
                ComponentJson::Container(container) => self.import_container(container, Some(id))?,
                ComponentJson::Node(node) => {
                    self.attach(Some(id), Component::Node(PolymerNode::from_json(node)));
                }
            }
        }
        Ok(())
    }

    fn export_container(&self, id: ComponentId) -> Result<ContainerJson> {
        let container = self.container(id).ok_or_else(|| {
            PolygraphError::structural_state(format!("component {id:?} is not a container"))
        })?;

        let mut children = Vec::with_capacity(container.children.len());
        for &child in &container.children {
            if self.container(child).is_some() {
                children.push(ComponentJson::Container(self.export_container(child)?));
            } else if let Some(node) = self.node(child) {
                children.push(ComponentJson::Node(self.node_json(node)));
            }
        }

        Ok(ContainerJson {
            name: container.name.clone(),
            connections: container
                .connections
                .iter()
                .map(|edge| edge.to_json(|endpoint| endpoint.declared().to_owned()))
                .collect(),
            parent: self.parent_name(container.parent),
            children,
        })
    }

    pub(crate) fn node_json(&self, node: &PolymerNode) -> NodeJson {
        NodeJson {
            name: node.name.clone(),
            mw: node.mw,
            smiles: node.smiles.clone(),
            parent: self.parent_name(node.parent),
            degree_poly: node.property(DEGREE_POLY),
        }
    }

    fn parent_name(&self, parent: Option<ComponentId>) -> Option<String> {
        parent
            .and_then(|id| self.container(id))
            .map(|parent| parent.name.clone())
    }
}

impl PolymerNode {
    // NOTE: The fragment of a node is the last segment of its (possibly dotted) name
    fn from_json(json: NodeJson) -> Self {
        let fragment = json.name.rsplit('.').next().unwrap_or_default();
        let mut node = Self::new(fragment, json.smiles, json.mw);
        if let Some(degree_poly) = json.degree_poly {
            node.set_property(DEGREE_POLY, degree_poly);
        }
        node
    }
}

impl PolymerEdge {
    fn from_json(json: &ConnectionJson) -> Result<Self> {
        let quantity = json.quantity.trim().parse().map_err(|_| {
            PolygraphError::parse(&json.quantity, "the quantity of a connection must be a positive integer")
        })?;
        let mut edge = Self::new(&json.source, &json.target, quantity)?;
        edge.set_weight(json.weight);
        Ok(edge)
    }

    pub(crate) fn to_json(&self, path: impl Fn(&Endpoint) -> String) -> ConnectionJson {
        ConnectionJson {
            source: path(&self.source),
            target: path(&self.target),
            weight: self.weight,
            quantity: self.quantity.to_string(),
        }
    }
}
