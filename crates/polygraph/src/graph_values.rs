use quantity::Quantity;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{DEGREE_POLY, PolygraphError, PolymerGraph, Result};

/// A value computed elsewhere (by a notebook cell, for example) and destined for a node of the graph
///
/// `path` is relative to the root container, so `["EG", "EG"]` names the fragment `EG` inside of the container `EG`.
/// `value` must either look like `{"degree_poly": 30}` or be a measured quantity like `{"value": 30, "unit": ""}`.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct GraphValue {
    pub name: String,
    pub path: Vec<String>,
    pub value: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Embeddable {
    DegreePoly { degree_poly: Decimal },
    Measured(Quantity),
}

impl GraphValue {
    pub fn new(name: impl Into<String>, path: &[&str], value: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            path: path.iter().map(|&segment| segment.to_owned()).collect(),
            value,
        }
    }

    fn degree_poly(&self) -> Result<Decimal> {
        let embeddable = Embeddable::deserialize(&self.value)
            .map_err(|_| PolygraphError::UnembeddableProperty(self.name.clone()))?;
        Ok(match embeddable {
            Embeddable::DegreePoly { degree_poly } => degree_poly,
            Embeddable::Measured(Quantity { value, .. }) => value,
        })
    }
}

impl PolymerGraph<'_> {
    /// Stamps each value onto its node as the `degree_poly` property
    ///
    /// Every value is checked before any node is touched, so a failure leaves the graph unchanged.
    pub fn add_graph_values(&mut self, values: &[GraphValue]) -> Result<()> {
        let root = self.root_name()?.to_owned();
        let mut stamps = Vec::with_capacity(values.len());
        for value in values {
            let path = std::iter::once(root.as_str())
                .chain(value.path.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join(".");
            let degree_poly = value.degree_poly()?;
            self.node(&path)?;
            stamps.push((path, degree_poly));
        }

        for (path, degree_poly) in stamps {
            debug!(%path, %degree_poly, "embedding graph value");
            self.set_node_property(&path, DEGREE_POLY, degree_poly)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;
    use crate::testing_tools::load_tree;

    #[test]
    fn embed_values() {
        let mut tree = load_tree!("egMeO_pVL");
        let mut graph = PolymerGraph::new(&mut tree).unwrap();
        let values = [
            GraphValue::new("DP(EG)", &["EG", "EG"], json!({ "degree_poly": 30 })),
            GraphValue::new(
                "DP(VL)",
                &["VL", "VL"],
                json!({ "value": "12.5", "unit": "", "uncertainty": "0.5" }),
            ),
        ];
        graph.add_graph_values(&values).unwrap();

        assert_eq!(graph.degree_poly("egMeO_pVL.EG.EG").unwrap(), dec!(30));
        assert_eq!(graph.degree_poly("egMeO_pVL.VL.VL").unwrap(), dec!(12.5));
        assert_eq!(graph.degree_poly("egMeO_pVL.MeO").unwrap(), dec!(1));
    }

    #[test]
    fn deserialize_values() {
        let values: Vec<GraphValue> = serde_json::from_str(
            r#"[{"name": "DP", "path": ["EG", "EG"], "value": {"degree_poly": "42"}}]"#,
        )
        .unwrap();
        assert_eq!(values[0].path, ["EG", "EG"]);
        assert_eq!(values[0].degree_poly().unwrap(), dec!(42));
    }

    #[test]
    fn unembeddable_values() {
        let mut tree = load_tree!("egMeO_pVL");
        let mut graph = PolymerGraph::new(&mut tree).unwrap();

        for value in [json!({ "mass": 30 }), json!(30), json!({ "value": 30 }), json!(null)] {
            let values = [
                GraphValue::new("DP(EG)", &["EG", "EG"], json!({ "degree_poly": 30 })),
                GraphValue::new("odd", &["VL", "VL"], value),
            ];
            let err = graph.add_graph_values(&values).unwrap_err();
            assert!(matches!(*err, PolygraphError::UnembeddableProperty(ref name) if name == "odd"));
        }
        // Nothing was stamped before the failure
        assert_eq!(graph.degree_poly("egMeO_pVL.EG.EG").unwrap(), dec!(1));

        let values = [GraphValue::new("DP", &["PEG", "PEG"], json!({ "degree_poly": 30 }))];
        let err = graph.add_graph_values(&values).unwrap_err();
        assert!(matches!(*err, PolygraphError::MissingNode(ref path) if path == "egMeO_pVL.PEG.PEG"));
    }
}
