/// coordinator settings that a host may carry in its own config file
///
use serde::{Deserialize, Serialize};

fn default_hydrate() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorSettings {
    /// write values found at a farther level back into the nearer levels that missed
    #[serde(default = "default_hydrate")]
    pub hydrate: bool,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        CoordinatorSettings {
            hydrate: default_hydrate(),
        }
    }
}
