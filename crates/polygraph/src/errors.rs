use miette::Diagnostic;
use thiserror::Error;

pub type Result<T, E = Box<PolygraphError>> = std::result::Result<T, E>;

#[derive(Debug, Diagnostic, Error)]
pub enum PolygraphError {
    #[diagnostic(help(
        "connection endpoints are dotted paths ending in a connection point, like EG.EG.R or MeO.Q"
    ))]
    #[error("could not parse {input:?}: {reason}")]
    Parse { input: String, reason: &'static str },

    #[error("no node was found at {0:?}")]
    MissingNode(String),

    #[error("no edge was found from {source_node:?} to {target_node:?}")]
    MissingEdge {
        source_node: String,
        target_node: String,
    },

    #[diagnostic(help("containers are looked up by their local name, not by their full path"))]
    #[error("no container named {0:?} could be found in the polymer tree")]
    MissingContainer(String),

    #[error("invalid polymer structure: {0}")]
    StructuralState(String),

    #[diagnostic(help(
        r#"graph values must look like {{"degree_poly": 30}} or {{"value": 30, "unit": ""}}"#
    ))]
    #[error("the value {0:?} can't be embedded in the polymer graph")]
    UnembeddableProperty(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PolygraphError {
    pub(crate) fn parse(input: &str, reason: &'static str) -> Self {
        let input = input.to_owned();

        Self::Parse { input, reason }
    }

    pub(crate) fn missing_node(path: &str) -> Self {
        Self::MissingNode(path.to_owned())
    }

    pub(crate) fn missing_edge(source: &str, target: &str) -> Self {
        let source_node = source.to_owned();
        let target_node = target.to_owned();

        Self::MissingEdge {
            source_node,
            target_node,
        }
    }

    pub(crate) fn missing_container(name: &str) -> Self {
        Self::MissingContainer(name.to_owned())
    }

    pub(crate) fn structural_state(reason: impl Into<String>) -> Self {
        Self::StructuralState(reason.into())
    }
}
