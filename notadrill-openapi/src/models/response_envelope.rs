use std::collections::BTreeMap;

/// What an HTTP gateway expects back from a function invocation.
///
/// `body` is itself a JSON document, already serialized.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(rename = "headers")]
    pub headers: BTreeMap<String, String>,
    #[serde(rename = "body")]
    pub body: String,
}

impl ResponseEnvelope {
    pub fn new(status_code: u16, headers: BTreeMap<String, String>, body: String) -> ResponseEnvelope {
        ResponseEnvelope {
            status_code,
            headers,
            body,
        }
    }
}
