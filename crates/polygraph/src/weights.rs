use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, trace};

use crate::{ContainerMap, EdgeId, PolygraphError, PolymerGraph, Result, Strategy};

const WEIGHT_PLACES: u32 = 4;

// NOTE: Weighting happens in three stages, each consuming the last: `PolymerWeight::new()` tabulates the graph,
// `detect_side_chains()` finds graft points, and `score()` settles the normalizing score that `weigh()` divides by

/// The edge tables of a polymer graph, the first stage of weighting it
#[derive(Clone, Debug)]
pub struct PolymerWeight {
    strategy: Strategy,
    pseudo_end_groups: u32,
    container_map: ContainerMap,
    root: String,
    edges: Vec<EdgeInfo>,
    // Source node -> target group -> edge count
    edge_groups: HashMap<String, HashMap<String, u32>>,
    // Target node -> incoming edge count, ignoring self-loops
    target_counts: HashMap<String, u32>,
    // (Source group, target group) -> edge count, ignoring self-loops
    group_edges: HashMap<(String, String), u32>,
    // Group -> self-loop count
    self_loops: HashMap<String, u32>,
    repeat_units: HashSet<String>,
}

/// A [`PolymerWeight`] that knows which groups are replicated along a grafted backbone
#[derive(Clone, Debug)]
pub struct Grafted {
    weight: PolymerWeight,
    graft_multipliers: HashMap<String, Decimal>,
}

/// A [`Grafted`] polymer with its final score, ready to weigh edges
#[derive(Clone, Debug)]
pub struct Scored {
    grafted: Grafted,
    total_score: Decimal,
    edge_multiplier: u64,
    final_score: Decimal,
}

#[derive(Clone, Debug)]
struct EdgeInfo {
    id: EdgeId,
    scope: String,
    source: String,
    target: String,
    source_group: String,
    target_group: String,
    quantity: u32,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Placement {
    SelfLoop,
    Leaving,
    Entering,
    Elsewhere,
    Within,
}

impl EdgeInfo {
    // NOTE: Edges are placed relative to the scope (container) that declared them
    fn placement(&self) -> Placement {
        let source_in_scope = self.source_group == self.scope;
        let target_in_scope = self.target_group == self.scope;
        if self.source == self.target {
            Placement::SelfLoop
        } else if source_in_scope && !target_in_scope {
            Placement::Leaving
        } else if target_in_scope && !source_in_scope {
            Placement::Entering
        } else if !source_in_scope && !target_in_scope {
            Placement::Elsewhere
        } else {
            Placement::Within
        }
    }

    fn group_pair(&self) -> (String, String) {
        (self.source_group.clone(), self.target_group.clone())
    }
}

/// Weighs every edge of `graph` and returns the final score used to normalize those weights
pub fn weight_polymer(graph: &mut PolymerGraph) -> Result<Decimal> {
    let scored = PolymerWeight::new(graph)?
        .detect_side_chains(graph)?
        .score(graph)?;
    scored.weigh(graph)?;
    Ok(scored.final_score())
}

impl PolymerWeight {
    pub fn new(graph: &PolymerGraph) -> Result<Self> {
        let strategy = Strategy::select(graph);
        let pseudo_end_groups = strategy.pseudo_end_groups()?;

        let mut edges = Vec::new();
        for (id, container, edge) in graph.connections() {
            let source = edge.source.node();
            let target = edge.target.node();
            edges.push(EdgeInfo {
                id,
                scope: container.name.clone(),
                source: source.to_owned(),
                target: target.to_owned(),
                source_group: graph.group(source)?.to_owned(),
                target_group: graph.group(target)?.to_owned(),
                quantity: edge.quantity,
            });
        }

        let mut edge_groups: HashMap<String, HashMap<String, u32>> = HashMap::new();
        let mut target_counts = HashMap::new();
        let mut group_edges = HashMap::new();
        let mut self_loops = HashMap::new();
        let mut repeat_units = HashSet::new();
        for edge in &edges {
            *edge_groups
                .entry(edge.source.clone())
                .or_default()
                .entry(edge.target_group.clone())
                .or_default() += 1;
            if edge.source == edge.target {
                *self_loops.entry(edge.source_group.clone()).or_default() += 1;
                repeat_units.insert(edge.source.clone());
            } else {
                *target_counts.entry(edge.target.clone()).or_default() += 1;
                *group_edges.entry(edge.group_pair()).or_default() += 1;
            }
        }

        Ok(Self {
            strategy,
            pseudo_end_groups,
            container_map: graph.tree().container_map(),
            root: graph.root_name()?.to_owned(),
            edges,
            edge_groups,
            target_counts,
            group_edges,
            self_loops,
            repeat_units,
        })
    }

    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Finds the side chains grafted onto repeat units
    ///
    /// When a connection declared inside of a (non-root) container leaves that container for a fragment that repeats
    /// itself, then the whole container is replicated once for every repeat of that fragment. The multiplier is shared
    /// with every other group nested under the same parent, except for the grafted fragment's own subtree.
    pub fn detect_side_chains(self, graph: &PolymerGraph) -> Result<Grafted> {
        let mut graft_multipliers = HashMap::new();
        for edge in &self.edges {
            if edge.scope == self.root
                || edge.placement() != Placement::Leaving
                || !self.repeat_units.contains(&edge.target)
            {
                continue;
            }
            let degree_poly = graph.degree_poly(&edge.target)?;
            debug!(group = %edge.scope, target = %edge.target, %degree_poly, "found grafted side chain");
            graft_multipliers.insert(edge.scope.clone(), degree_poly);

            let Some(parent) = self.container_map.parent(&edge.scope) else {
                continue;
            };
            let mut excluded = self.container_map.descendants(&edge.target_group);
            excluded.extend([edge.scope.clone(), edge.target_group.clone()]);
            for group in self.container_map.descendants(parent) {
                if !excluded.contains(&group) {
                    graft_multipliers.insert(group, degree_poly);
                }
            }
        }

        Ok(Grafted {
            weight: self,
            graft_multipliers,
        })
    }
}

impl Grafted {
    #[must_use]
    pub fn graft_multiplier(&self, group: &str) -> Option<Decimal> {
        self.graft_multipliers.get(group).copied()
    }

    /// Settles the final score: every symmetry-distinct edge adds to the total score, and multiplies the edge
    /// multiplier by its quantity, unless it's replicated by a graft
    pub fn score(self, graph: &PolymerGraph) -> Result<Scored> {
        let mut score = Score::default();
        let mut visited_groups = HashSet::new();
        let mut visited_targets = HashSet::new();
        let mut visited_pairs = HashSet::new();

        let tables = &self.weight;
        for edge in &tables.edges {
            match edge.placement() {
                Placement::SelfLoop => {
                    let degree_poly = graph.degree_poly(&edge.source)?;
                    if degree_poly > Decimal::ONE {
                        let graft = self.graft_multiplier(&edge.source_group).unwrap_or(Decimal::ONE);
                        score.add(checked_mul(degree_poly, graft)?)?;
                    }
                }
                Placement::Leaving => {
                    let count = tables.count_to_group(&edge.source, &edge.target_group);
                    if count <= 1 || visited_groups.insert((&edge.source, &edge.target_group)) {
                        score.contribute(self.graft_multiplier(&edge.source_group), edge.quantity)?;
                    }
                }
                Placement::Entering => {
                    let count = tables.target_count(&edge.target);
                    if count <= 1 || visited_targets.insert(&edge.target) {
                        score.contribute(self.graft_multiplier(&edge.source_group), edge.quantity)?;
                    }
                }
                Placement::Elsewhere => {
                    let count = tables.group_edge_count(edge);
                    if count <= 1 || visited_pairs.insert((&edge.source_group, &edge.target_group)) {
                        score.contribute(None, edge.quantity)?;
                    }
                }
                Placement::Within => score.contribute(None, edge.quantity)?,
            }
            trace!(edge = ?edge.id, placement = ?edge.placement(), total = %score.total, "scored edge");
        }

        let total_score = score.total;
        let edge_multiplier = score.multiplier;
        let final_score = total_score
            .checked_add(Decimal::from(tables.pseudo_end_groups))
            .and_then(|total| total.checked_mul(Decimal::from(edge_multiplier)))
            .ok_or_else(|| PolygraphError::structural_state("the final score overflowed"))?;
        debug!(%total_score, edge_multiplier, %final_score, "scored polymer");

        Ok(Scored {
            grafted: self,
            total_score,
            edge_multiplier,
            final_score,
        })
    }
}

impl Scored {
    #[must_use]
    pub const fn total_score(&self) -> Decimal {
        self.total_score
    }

    #[must_use]
    pub const fn edge_multiplier(&self) -> u64 {
        self.edge_multiplier
    }

    #[must_use]
    pub const fn final_score(&self) -> Decimal {
        self.final_score
    }

    /// Sets the weight of every edge, rounded half away from zero to four decimal places
    pub fn weigh(&self, graph: &mut PolymerGraph) -> Result<()> {
        let grafted = &self.grafted;
        let tables = &grafted.weight;
        let graft = |group: &str| grafted.graft_multiplier(group).unwrap_or(Decimal::ONE);
        let count = |count: u32| Decimal::from(count.max(1));

        for edge in &tables.edges {
            let weight = match edge.placement() {
                Placement::SelfLoop => {
                    let degree_poly = graph.degree_poly(&edge.source)?;
                    if degree_poly <= Decimal::ONE {
                        if tables.strategy.is_cyclic() { Decimal::ONE } else { Decimal::ZERO }
                    } else {
                        let self_loops = count(tables.self_loop_count(&edge.source_group));
                        self.normalize(checked_mul(degree_poly, graft(&edge.source_group))? / self_loops)?
                    }
                }
                Placement::Leaving => {
                    let siblings = count(tables.count_to_group(&edge.source, &edge.target_group));
                    self.normalize(graft(&edge.source_group))? / siblings
                }
                Placement::Entering => {
                    let sources = count(tables.target_count(&edge.target));
                    self.normalize(graft(&edge.source_group))? / sources
                }
                Placement::Elsewhere => {
                    let pairs = count(tables.group_edge_count(edge));
                    self.normalize(Decimal::ONE)? / pairs
                }
                Placement::Within => {
                    let degree_poly = graph.degree_poly(&edge.source)?;
                    let self_loops = if degree_poly == Decimal::ONE {
                        Decimal::ONE
                    } else {
                        count(tables.self_loop_count(&edge.source_group))
                    };
                    self.normalize(degree_poly / self_loops)?
                }
            };

            let weight = weight.round_dp_with_strategy(WEIGHT_PLACES, RoundingStrategy::MidpointAwayFromZero);
            trace!(edge = ?edge.id, %weight, "weighed edge");
            graph.set_weight(edge.id, weight)?;
        }
        Ok(())
    }

    fn normalize(&self, value: Decimal) -> Result<Decimal> {
        value.checked_div(self.final_score).ok_or_else(|| {
            PolygraphError::structural_state(format!(
                "cannot normalize edge weights by a final score of {}",
                self.final_score
            ))
            .into()
        })
    }
}

impl PolymerWeight {
    fn count_to_group(&self, source: &str, group: &str) -> u32 {
        self.edge_groups
            .get(source)
            .and_then(|groups| groups.get(group))
            .copied()
            .unwrap_or_default()
    }

    fn target_count(&self, target: &str) -> u32 {
        self.target_counts.get(target).copied().unwrap_or_default()
    }

    fn group_edge_count(&self, edge: &EdgeInfo) -> u32 {
        self.group_edges
            .get(&edge.group_pair())
            .copied()
            .unwrap_or_default()
    }

    fn self_loop_count(&self, group: &str) -> u32 {
        self.self_loops.get(group).copied().unwrap_or_default()
    }
}

#[derive(Debug)]
struct Score {
    total: Decimal,
    multiplier: u64,
}

impl Default for Score {
    fn default() -> Self {
        Self {
            total: Decimal::ZERO,
            multiplier: 1,
        }
    }
}

impl Score {
    // NOTE: A grafted group is already replicated by its multiplier, so its quantity isn't counted again
    fn contribute(&mut self, graft: Option<Decimal>, quantity: u32) -> Result<()> {
        if let Some(graft) = graft {
            self.add(graft)
        } else {
            self.multiplier = self
                .multiplier
                .checked_mul(u64::from(quantity))
                .ok_or_else(|| PolygraphError::structural_state("the edge multiplier overflowed"))?;
            self.add(Decimal::ONE)
        }
    }

    fn add(&mut self, value: Decimal) -> Result<()> {
        self.total = self
            .total
            .checked_add(value)
            .ok_or_else(|| PolygraphError::structural_state("the total score overflowed"))?;
        Ok(())
    }
}

fn checked_mul(degree_poly: Decimal, graft: Decimal) -> Result<Decimal> {
    degree_poly.checked_mul(graft).ok_or_else(|| {
        PolygraphError::structural_state(format!(
            "a degree of polymerization of {degree_poly} overflows when grafted {graft} times"
        ))
        .into()
    })
}
