use std::fmt::{self, Display, Formatter};

use itertools::Itertools;
use rust_decimal::Decimal;

use crate::{ConnectionSpec, Endpoint, PolygraphError, PolymerEdge, Result};

impl Endpoint {
    /// Parses a declared endpoint like `EG.EG.R`, which is relative to the container declaring the connection
    pub fn new(declared: &str) -> Result<Self> {
        let path: Vec<_> = declared.split('.').map(str::trim).map(ToOwned::to_owned).collect();
        if path.iter().any(String::is_empty) {
            return Err(PolygraphError::parse(declared, "the path contains an empty segment").into());
        }
        let point = match path.as_slice() {
            [_, .., point] => point.clone(),
            _ => {
                return Err(PolygraphError::parse(
                    declared,
                    "an endpoint needs both a fragment and a connection point",
                )
                .into());
            }
        };
        if !point.chars().all(char::is_alphanumeric) {
            return Err(PolygraphError::parse(
                declared,
                "connection points must be alphanumeric",
            )
            .into());
        }

        let mut endpoint = Self {
            declared: declared.to_owned(),
            path,
            node: String::new(),
            point,
            merged: false,
        };
        endpoint.refresh_node();
        Ok(endpoint)
    }

    /// The path as it was written, relative to the declaring container
    #[must_use]
    pub fn declared(&self) -> &str {
        &self.declared
    }

    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The dotted path of the fragment, without the connection point
    #[must_use]
    pub fn node(&self) -> &str {
        &self.node
    }

    #[must_use]
    pub fn point(&self) -> &str {
        &self.point
    }

    #[must_use]
    pub const fn is_merged(&self) -> bool {
        self.merged
    }

    /// Makes this endpoint absolute by prefixing it with the path of its declaring container. Merging happens at most
    /// once, so repeated path resolution leaves absolute paths alone.
    pub(crate) fn merge_base_path(&mut self, base: &[String]) {
        if self.merged {
            return;
        }
        self.path.splice(0..0, base.iter().cloned());
        self.refresh_node();
        self.merged = true;
    }

    // NOTE: `Endpoint::new()` ensures there are always at least two path segments
    fn refresh_node(&mut self) {
        self.node = self.path[..self.path.len() - 1].join(".");
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.iter().format("."))
    }
}

impl PolymerEdge {
    pub fn new(source: &str, target: &str, quantity: u32) -> Result<Self> {
        if quantity == 0 {
            return Err(PolygraphError::parse(
                &format!("{source} -> {target}"),
                "the quantity of a connection must be positive",
            )
            .into());
        }
        Ok(Self {
            source: Endpoint::new(source)?,
            target: Endpoint::new(target)?,
            weight: Decimal::ONE,
            quantity,
        })
    }

    #[must_use]
    pub const fn source(&self) -> &Endpoint {
        &self.source
    }

    #[must_use]
    pub const fn target(&self) -> &Endpoint {
        &self.target
    }

    #[must_use]
    pub const fn weight(&self) -> Decimal {
        self.weight
    }

    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.source.node == self.target.node
    }

    pub fn set_weight(&mut self, weight: Decimal) {
        self.weight = weight;
    }

    pub(crate) fn merge_base_path(&mut self, base: &[String]) {
        self.source.merge_base_path(base);
        self.target.merge_base_path(base);
    }
}

impl Display for PolymerEdge {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

impl ConnectionSpec {
    pub fn new(
        sources: impl IntoIterator<Item = impl Into<String>>,
        targets: impl IntoIterator<Item = impl Into<String>>,
        quantity: u32,
    ) -> Self {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            targets: targets.into_iter().map(Into::into).collect(),
            quantity,
        }
    }

    /// Every source connected to every target, in source-major order
    pub fn edges(&self) -> Result<Vec<PolymerEdge>> {
        self.sources
            .iter()
            .cartesian_product(&self.targets)
            .map(|(source, target)| PolymerEdge::new(source, target, self.quantity))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_endpoints() {
        let endpoint = Endpoint::new("EG.EG.R").unwrap();
        assert_eq!(endpoint.node(), "EG.EG");
        assert_eq!(endpoint.point(), "R");
        assert_eq!(endpoint.path(), ["EG", "EG", "R"]);
        assert!(!endpoint.is_merged());

        let endpoint = Endpoint::new("MeO.Q").unwrap();
        assert_eq!(endpoint.node(), "MeO");
        assert_eq!(endpoint.point(), "Q");

        for invalid in ["", "Q", "MeO.", ".Q", "EG..R", "EG.R-"] {
            let err = Endpoint::new(invalid).unwrap_err();
            assert!(matches!(*err, PolygraphError::Parse { .. }), "{invalid}");
        }
    }

    #[test]
    fn merge_base_paths() {
        let mut endpoint = Endpoint::new("EG.EG.R").unwrap();
        let base = ["polymer".to_owned()];
        endpoint.merge_base_path(&base);
        assert_eq!(endpoint.to_string(), "polymer.EG.EG.R");
        assert_eq!(endpoint.node(), "polymer.EG.EG");
        assert_eq!(endpoint.declared(), "EG.EG.R");
        assert!(endpoint.is_merged());

        // Merging is only ever done once
        endpoint.merge_base_path(&base);
        assert_eq!(endpoint.to_string(), "polymer.EG.EG.R");
    }

    #[test]
    fn self_loops() {
        assert!(PolymerEdge::new("EG.R", "EG.Q", 1).unwrap().is_self_loop());
        assert!(!PolymerEdge::new("EG.R", "VL.Q", 1).unwrap().is_self_loop());
        assert!(PolymerEdge::new("EG.R", "VL.Q", 0).is_err());
    }

    #[test]
    fn expand_connection_specs() {
        let spec = ConnectionSpec::new(["A.R", "B.R"], ["C.Q", "D.Q", "E.Q"], 2);
        let edges = spec.edges().unwrap();
        let rendered: Vec<_> = edges.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            ["A.R -> C.Q", "A.R -> D.Q", "A.R -> E.Q", "B.R -> C.Q", "B.R -> D.Q", "B.R -> E.Q"]
        );
        assert!(edges.iter().all(|e| e.quantity() == 2 && e.weight() == Decimal::ONE));

        let spec = ConnectionSpec::new(["A.R"], Vec::<String>::new(), 1);
        assert!(spec.edges().unwrap().is_empty());
    }
}
