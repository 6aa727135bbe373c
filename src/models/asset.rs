//! Assets and their environment classification.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Production,
    Staging,
    Development,
    Dr,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Asset {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub platform: String,
    pub region: String,
    pub environment: Environment,
    pub image_ref: String,
}

impl Asset {
    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }
}
