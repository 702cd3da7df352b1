pub mod asset_response;
pub use self::asset_response::AssetResponse;
pub mod error_response;
pub use self::error_response::ErrorResponse;
pub mod response_envelope;
pub use self::response_envelope::ResponseEnvelope;
