#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "error")]
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: String) -> ErrorResponse {
        ErrorResponse { error }
    }
}
