use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    #[serde(default)]
    pub owner: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePantryRequest {
    pub owner_key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}
