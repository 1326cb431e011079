use std::collections::VecDeque;

use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};
use itertools::Itertools;
use tracing::debug;

use crate::{
    Component, ComponentId, ConnectionSpec, Container, EdgeId, PolygraphError, PolymerEdge,
    PolymerNode, PolymerTree, Result,
};

/// Maps every container's name to the names of the containers directly inside of it
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct ContainerMap(HashMap<String, Vec<String>>);

impl PolymerTree {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn root(&self) -> Option<&Container> {
        self.root.and_then(|id| self.container(id))
    }

    /// Adds a container under the container named `parent`, or makes it the root of an empty tree
    pub fn insert_container(
        &mut self,
        container: Container,
        parent: Option<&str>,
    ) -> Result<ComponentId> {
        match (self.root, parent) {
            (None, None) => Ok(self.attach(None, Component::Container(container))),
            (None, Some(parent)) => Err(PolygraphError::structural_state(format!(
                "cannot insert {:?} under {parent:?}, since the tree is still empty",
                container.name
            ))
            .into()),
            (Some(_), None) => Err(PolygraphError::structural_state(format!(
                "cannot make {:?} the root, since the tree already has one",
                container.name
            ))
            .into()),
            (Some(_), Some(parent)) => {
                let parent = self.find_container(parent)?;
                Ok(self.attach(Some(parent), Component::Container(container)))
            }
        }
    }

    /// Adds a leaf fragment to the container named `parent`
    pub fn insert_node(&mut self, node: PolymerNode, parent: &str) -> Result<ComponentId> {
        let parent = self.find_container(parent)?;
        Ok(self.attach(Some(parent), Component::Node(node)))
    }

    /// Declares the connections of `spec` inside of the container named `container`, one edge per source and target
    pub fn create_edges(&mut self, spec: &ConnectionSpec, container: &str) -> Result<()> {
        let edges = spec.edges()?;
        let id = self.find_container(container)?;
        if let Some(container) = self.container_mut(id) {
            container.push_edges(edges);
        }
        Ok(())
    }

    /// Resolves the absolute path of every container and fragment, then makes every connection path absolute
    ///
    /// All containers must have their paths set before any connection is touched, or connections would be resolved
    /// against incomplete paths. Running this more than once changes nothing.
    pub fn resolve_paths(&mut self) {
        for id in self.bfs() {
            let parent_path = self
                .component(id)
                .and_then(Component::parent)
                .and_then(|parent| self.container(parent))
                .and_then(|parent| parent.path.clone())
                .unwrap_or_default();

            match &mut self.components[id.0] {
                Component::Container(container) => {
                    let mut path = parent_path;
                    path.push(container.name.clone());
                    container.path = Some(path);
                }
                Component::Node(node) => {
                    node.name = parent_path
                        .iter()
                        .chain([&node.fragment])
                        .join(".");
                }
            }
        }

        for component in &mut self.components {
            if let Component::Container(container) = component {
                let base = container.path.clone().unwrap_or_default();
                for edge in &mut container.connections {
                    edge.merge_base_path(&base);
                }
            }
        }
        debug!(tree = %self.name, components = self.components.len(), "resolved tree paths");
    }

    /// Joins the SMILES of every fragment with `.`, ignoring how they're connected
    #[must_use]
    pub fn compile_smiles(&self) -> String {
        self.nodes().map(PolymerNode::smiles).join(".")
    }

    #[must_use]
    pub fn container_map(&self) -> ContainerMap {
        let mut map = HashMap::new();
        for container in self.containers() {
            let children = container
                .children
                .iter()
                .filter_map(|&id| self.container(id))
                .map(|child| child.name.clone())
                .collect();
            map.insert(container.name.clone(), children);
        }
        ContainerMap(map)
    }

    /// Every container, in breadth-first order from the root
    pub fn containers(&self) -> impl Iterator<Item = &Container> {
        self.bfs().into_iter().filter_map(|id| self.container(id))
    }

    /// Every leaf fragment, in breadth-first order from the root
    pub fn nodes(&self) -> impl Iterator<Item = &PolymerNode> {
        self.bfs().into_iter().filter_map(|id| self.node(id))
    }

    /// Every connection, grouped by declaring container in breadth-first order
    pub fn edges(&self) -> impl Iterator<Item = &PolymerEdge> {
        self.connections().map(|(_, _, edge)| edge)
    }

    // Crate API =======================================================================================================

    pub(crate) fn bfs(&self) -> Vec<ComponentId> {
        let mut order = Vec::with_capacity(self.components.len());
        let mut queue: VecDeque<_> = self.root.into_iter().collect();
        while let Some(id) = queue.pop_front() {
            order.push(id);
            if let Some(container) = self.container(id) {
                queue.extend(&container.children);
            }
        }
        order
    }

    pub(crate) fn connections(&self) -> impl Iterator<Item = (EdgeId, &Container, &PolymerEdge)> {
        self.bfs().into_iter().flat_map(move |id| {
            self.container(id).into_iter().flat_map(move |container| {
                container.connections.iter().enumerate().map(move |(index, edge)| {
                    (EdgeId { container: id, index }, container, edge)
                })
            })
        })
    }

    pub(crate) fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(id.0)
    }

    pub(crate) fn container(&self, id: ComponentId) -> Option<&Container> {
        match self.component(id)? {
            Component::Container(container) => Some(container),
            Component::Node(_) => None,
        }
    }

    pub(crate) fn node(&self, id: ComponentId) -> Option<&PolymerNode> {
        match self.component(id)? {
            Component::Node(node) => Some(node),
            Component::Container(_) => None,
        }
    }

    pub(crate) fn node_mut(&mut self, id: ComponentId) -> Option<&mut PolymerNode> {
        match self.components.get_mut(id.0)? {
            Component::Node(node) => Some(node),
            Component::Container(_) => None,
        }
    }

    pub(crate) fn edge(&self, id: EdgeId) -> Option<&PolymerEdge> {
        self.container(id.container)?.connections.get(id.index)
    }

    pub(crate) fn edge_mut(&mut self, id: EdgeId) -> Option<&mut PolymerEdge> {
        self.container_mut(id.container)?
            .connections
            .get_mut(id.index)
    }

    /// The container named `name`, found by a breadth-first search from the root
    pub(crate) fn find_container(&self, name: &str) -> Result<ComponentId> {
        self.bfs()
            .into_iter()
            .find(|&id| self.container(id).is_some_and(|c| c.name == name))
            .ok_or_else(|| PolygraphError::missing_container(name).into())
    }

    pub(crate) fn container_mut(&mut self, id: ComponentId) -> Option<&mut Container> {
        match self.components.get_mut(id.0)? {
            Component::Container(container) => Some(container),
            Component::Node(_) => None,
        }
    }

    /// Adds a component to the arena, under `parent` or as the new root
    pub(crate) fn attach(&mut self, parent: Option<ComponentId>, mut component: Component) -> ComponentId {
        let id = ComponentId(self.components.len());
        match &mut component {
            Component::Container(container) => container.parent = parent,
            Component::Node(node) => node.parent = parent,
        }
        self.components.push(component);

        match parent.and_then(|parent| self.container_mut(parent)) {
            Some(parent) => parent.children.push(id),
            None => self.root = Some(id),
        }
        id
    }
}

impl Component {
    pub(crate) const fn parent(&self) -> Option<ComponentId> {
        match self {
            Self::Container(container) => container.parent,
            Self::Node(node) => node.parent,
        }
    }
}

impl ContainerMap {
    /// The names of the containers directly inside of `name`
    #[must_use]
    pub fn children(&self, name: &str) -> &[String] {
        self.0.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// The name of the container directly holding `name`, if there is one
    #[must_use]
    pub fn parent(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, children)| children.iter().any(|c| c == name))
            .map(|(parent, _)| parent.as_str())
    }

    /// The names of every container nested (at any depth) inside of `name`, depth-first
    #[must_use]
    pub fn descendants(&self, name: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut descendants = Vec::new();
        let mut stack: Vec<_> = self.children(name).iter().rev().collect();
        while let Some(child) = stack.pop() {
            // NOTE: Container names aren't required to be unique, so guard against looping back on ourselves
            if child == name || !seen.insert(child) {
                continue;
            }
            descendants.push(child.clone());
            stack.extend(self.children(child).iter().rev());
        }
        descendants
    }
}
