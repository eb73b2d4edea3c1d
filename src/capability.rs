/*!
 * The three remote capabilities of the manipulation service and where they
 * live in the naming hierarchy
 */

use hpp_locator_interface::{CompoundName, NameComponent};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Id prefix of the application's root naming entry
pub const ROOT_ID_PREFIX: &str = "hpp";

/// Kind of the application's root naming entry
pub const ROOT_KIND: &str = "corbaserver";

/// Id shared by all manipulation entries under the root
pub const MANIPULATION_ID: &str = "manipulation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Robot,
    Problem,
    Graph,
}

impl Capability {
    /// All capabilities, in binding order
    pub const ALL: [Capability; 3] = [Capability::Robot, Capability::Problem, Capability::Graph];

    /// Naming kind of this capability's entry
    pub fn kind(&self) -> &'static str {
        match self {
            Capability::Robot => "robot",
            Capability::Problem => "problem",
            Capability::Graph => "graph",
        }
    }

    /// Repository id a bound object must carry
    pub fn repository_id(&self) -> &'static str {
        match self {
            Capability::Robot => "IDL:hpp/corbaserver/manipulation/Robot:1.0",
            Capability::Problem => "IDL:hpp/corbaserver/manipulation/Problem:1.0",
            Capability::Graph => "IDL:hpp/corbaserver/manipulation/Graph:1.0",
        }
    }

    /// Full name of this capability under the namespace `"hpp" + namespace_suffix`
    pub fn compound_name(&self, namespace_suffix: &str) -> CompoundName {
        CompoundName::new(vec![root_component(namespace_suffix)])
            .child(NameComponent::new(MANIPULATION_ID, self.kind()))
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())
    }
}

/// The application's root naming entry for a namespace suffix
pub fn root_component(namespace_suffix: &str) -> NameComponent {
    NameComponent::new(format!("{}{}", ROOT_ID_PREFIX, namespace_suffix), ROOT_KIND)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_namespace_names() {
        assert_eq!(
            Capability::Robot.compound_name("").to_string(),
            "hpp.corbaserver/manipulation.robot"
        );
        assert_eq!(
            Capability::Problem.compound_name("").to_string(),
            "hpp.corbaserver/manipulation.problem"
        );
        assert_eq!(
            Capability::Graph.compound_name("").to_string(),
            "hpp.corbaserver/manipulation.graph"
        );
    }

    #[test]
    fn test_namespace_suffix_composes_root() {
        let name = Capability::Graph.compound_name("-test");
        assert_eq!(
            name.first(),
            Some(&NameComponent::new("hpp-test", "corbaserver"))
        );
        assert_eq!(name.components()[1], NameComponent::new("manipulation", "graph"));
    }

    #[test]
    fn test_repository_ids_are_distinct() {
        let ids: std::collections::HashSet<_> =
            Capability::ALL.iter().map(|c| c.repository_id()).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_capability_serde() {
        let json = serde_json::to_string(&Capability::Problem).unwrap();
        assert_eq!(json, "\"problem\"");
    }
}
