use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plant {
    pub id: String,
    pub name: String,
    pub species: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
