use rust_decimal_macros::dec;

use crate::{ConnectionSpec, Container, PolymerNode, PolymerTree};

/// The block copolymer MeO-PEG-b-PVL: a methoxy initiator, then a PEG block, then a PVL block
pub fn block_copolymer() -> PolymerTree {
    let mut tree = PolymerTree::new("egMeO_pVL");
    tree.insert_container(Container::new("polymer"), None).unwrap();
    tree.insert_node(PolymerNode::new("MeO", "CO", dec!(31.034)), "polymer")
        .unwrap();
    for (block, smiles, mw) in [("EG", "CCO", dec!(44.053)), ("VL", "CCCCC(=O)O", dec!(100.117))] {
        tree.insert_container(Container::new(block), Some("polymer"))
            .unwrap();
        tree.insert_node(PolymerNode::new(block, smiles, mw), block)
            .unwrap();
    }

    let root_edges = [("MeO.R", "EG.EG.Q"), ("EG.EG.R", "VL.VL.Q")];
    for (source, target) in root_edges {
        tree.create_edges(&ConnectionSpec::new([source], [target], 1), "polymer")
            .unwrap();
    }
    for block in ["EG", "VL"] {
        let spec = ConnectionSpec::new([format!("{block}.R")], [format!("{block}.Q")], 1);
        tree.create_edges(&spec, block).unwrap();
    }
    tree
}

/// Loads one of the JSON trees under `tests/data/`
macro_rules! load_tree {
    ($name:literal) => {
        $crate::PolymerTree::from_json(include_str!(concat!("../tests/data/", $name, ".json"))).unwrap()
    };
}

pub(crate) use load_tree;
