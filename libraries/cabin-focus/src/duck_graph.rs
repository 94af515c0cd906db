//! Static "context X ducks context Y" graph

use std::collections::{BTreeMap, BTreeSet};

use cabin_core::{CabinError, CarAudioContext, Result};

/// Directed ducking edges between contexts
///
/// No context ducks itself, directly or through other contexts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuckGraph {
    edges: BTreeMap<CarAudioContext, BTreeSet<CarAudioContext>>,
}

fn default_edges() -> BTreeMap<CarAudioContext, BTreeSet<CarAudioContext>> {
    use CarAudioContext::{
        Alarm, Announcement, Call, CallRing, Emergency, Media, Navigation, Notification, Safety,
        SystemSound, VehicleStatus, VoiceCommand,
    };

    let mut edges = BTreeMap::new();
    edges.insert(
        Navigation,
        BTreeSet::from([
            Media,
            CallRing,
            Call,
            Alarm,
            Notification,
            SystemSound,
            VehicleStatus,
            Announcement,
        ]),
    );
    edges.insert(VoiceCommand, BTreeSet::from([CallRing]));
    edges.insert(
        Call,
        BTreeSet::from([CallRing, Alarm, Notification, VehicleStatus]),
    );
    edges.insert(Alarm, BTreeSet::from([Media]));
    edges.insert(Notification, BTreeSet::from([Media, Alarm, Announcement]));
    edges.insert(SystemSound, BTreeSet::from([Media, Alarm, Announcement]));
    edges.insert(Emergency, BTreeSet::from([Call]));
    edges.insert(
        Safety,
        CarAudioContext::ALL
            .into_iter()
            .filter(|context| !matches!(context, Emergency | Safety))
            .collect(),
    );
    edges.insert(VehicleStatus, BTreeSet::from([Media, CallRing, Announcement]));
    edges.insert(Announcement, BTreeSet::from([Media]));
    edges
}

impl DuckGraph {
    /// Build a graph from explicit edges
    ///
    /// # Errors
    /// `CabinError::Construction` when an edge touches INVALID, a context
    /// ducks itself, or the edges form a cycle.
    pub fn new(edges: BTreeMap<CarAudioContext, BTreeSet<CarAudioContext>>) -> Result<Self> {
        for (source, targets) in &edges {
            if !source.is_valid() || targets.iter().any(|target| !target.is_valid()) {
                return Err(CabinError::construction(
                    "duck graph edges cannot involve INVALID",
                ));
            }
            if targets.contains(source) {
                return Err(CabinError::construction(format!(
                    "context {source} ducks itself"
                )));
            }
        }
        let graph = Self { edges };
        if let Some(context) = graph.find_cycle() {
            return Err(CabinError::construction(format!(
                "duck graph has a cycle through {context}"
            )));
        }
        Ok(graph)
    }

    /// The built-in graph, checked
    pub fn built_in() -> Result<Self> {
        Self::new(default_edges())
    }

    /// Contexts directly ducked by `context`
    pub fn ducked_by(&self, context: CarAudioContext) -> impl Iterator<Item = CarAudioContext> + '_ {
        self.edges.get(&context).into_iter().flatten().copied()
    }

    pub fn ducks(&self, ducker: CarAudioContext, ducked: CarAudioContext) -> bool {
        self.edges
            .get(&ducker)
            .is_some_and(|targets| targets.contains(&ducked))
    }

    /// Contexts in `holding` that some other member of `holding` ducks
    pub fn ducked_among(&self, holding: &BTreeSet<CarAudioContext>) -> BTreeSet<CarAudioContext> {
        holding
            .iter()
            .flat_map(|context| self.ducked_by(*context))
            .filter(|ducked| holding.contains(ducked))
            .collect()
    }

    /// Some context reachable from itself, if any
    fn find_cycle(&self) -> Option<CarAudioContext> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit(
            graph: &DuckGraph,
            context: CarAudioContext,
            marks: &mut BTreeMap<CarAudioContext, Mark>,
        ) -> Option<CarAudioContext> {
            match marks.get(&context) {
                Some(Mark::Visiting) => return Some(context),
                Some(Mark::Done) => return None,
                None => {}
            }
            marks.insert(context, Mark::Visiting);
            for next in graph.ducked_by(context) {
                if let Some(found) = visit(graph, next, marks) {
                    return Some(found);
                }
            }
            marks.insert(context, Mark::Done);
            None
        }

        let mut marks = BTreeMap::new();
        self.edges
            .keys()
            .find_map(|context| visit(self, *context, &mut marks))
    }
}

impl Default for DuckGraph {
    /// The built-in car ducking graph
    fn default() -> Self {
        Self {
            edges: default_edges(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CarAudioContext as Ctx;

    #[test]
    fn default_graph_is_acyclic() {
        assert!(DuckGraph::built_in().is_ok());
        let graph = DuckGraph::default();
        for context in CarAudioContext::ALL {
            assert!(!graph.ducks(context, context));
        }
    }

    #[test]
    fn cycles_are_rejected() {
        let mut edges = BTreeMap::new();
        edges.insert(Ctx::Media, BTreeSet::from([Ctx::Alarm]));
        edges.insert(Ctx::Alarm, BTreeSet::from([Ctx::Media]));
        assert!(matches!(
            DuckGraph::new(edges),
            Err(CabinError::Construction(_))
        ));
    }

    #[test]
    fn self_loops_are_rejected() {
        let mut edges = BTreeMap::new();
        edges.insert(Ctx::Navigation, BTreeSet::from([Ctx::Navigation]));
        assert!(DuckGraph::new(edges).is_err());
    }

    #[test]
    fn ducked_among_only_reports_holding_contexts() {
        let graph = DuckGraph::default();
        let holding = BTreeSet::from([Ctx::Navigation, Ctx::Media]);
        assert_eq!(graph.ducked_among(&holding), BTreeSet::from([Ctx::Media]));

        let holding = BTreeSet::from([Ctx::Navigation]);
        assert!(graph.ducked_among(&holding).is_empty());
    }

    #[test]
    fn safety_ducks_everything_but_critical() {
        let graph = DuckGraph::default();
        assert!(graph.ducks(Ctx::Safety, Ctx::Navigation));
        assert!(!graph.ducks(Ctx::Safety, Ctx::Emergency));
        assert!(!graph.ducks(Ctx::Media, Ctx::Navigation));
    }
}
