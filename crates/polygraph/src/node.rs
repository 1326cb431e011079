use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::{Container, DEGREE_POLY, PolymerEdge, PolymerNode};

impl Container {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connections: Vec::new(),
            children: Vec::new(),
            parent: None,
            path: None,
        }
    }

    /// The local name of this container, which is also the group name of every fragment directly inside of it
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn connections(&self) -> &[PolymerEdge] {
        &self.connections
    }

    /// The absolute path of this container, once the paths of its tree have been resolved
    #[must_use]
    pub fn path(&self) -> Option<&[String]> {
        self.path.as_deref()
    }

    pub(crate) fn push_edges(&mut self, edges: impl IntoIterator<Item = PolymerEdge>) {
        self.connections.extend(edges);
    }
}

impl PolymerNode {
    pub fn new(fragment: impl Into<String>, smiles: impl Into<String>, mw: Decimal) -> Self {
        let fragment = fragment.into();
        Self {
            name: fragment.clone(),
            fragment,
            smiles: smiles.into(),
            mw,
            properties: BTreeMap::new(),
            parent: None,
        }
    }

    /// The absolute, dotted path of this fragment (or just its local name before paths are resolved)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    #[must_use]
    pub fn smiles(&self) -> &str {
        &self.smiles
    }

    #[must_use]
    pub const fn mw(&self) -> Decimal {
        self.mw
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<Decimal> {
        self.properties.get(name).copied()
    }

    #[must_use]
    pub const fn properties(&self) -> &BTreeMap<String, Decimal> {
        &self.properties
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: Decimal) {
        self.properties.insert(name.into(), value);
    }

    /// The degree of polymerization of this fragment, which is 1 unless it's been set
    #[must_use]
    pub fn degree_poly(&self) -> Decimal {
        self.property(DEGREE_POLY).unwrap_or(Decimal::ONE)
    }
}
