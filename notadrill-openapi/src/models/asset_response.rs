#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetResponse {
    #[serde(rename = "url")]
    pub url: String,
    #[serde(rename = "name")]
    pub name: String,
}

impl AssetResponse {
    pub fn new(url: String, name: String) -> AssetResponse {
        AssetResponse { url, name }
    }
}
