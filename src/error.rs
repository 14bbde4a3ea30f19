/// Error types for FocusBrowse
use wasm_bindgen::JsValue;

/// Durable store failures. Always logged and never fatal to the timer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("failed to serialize {key}: {details}")]
    Serialize { key: &'static str, details: String },

    #[error("stored {key} is malformed: {details}")]
    Corrupt { key: &'static str, details: String },
}

/// Failure to deliver one push to one observer
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeliveryError {
    #[error("observer is gone")]
    Disconnected,

    #[error("observer rejected message: {0}")]
    Rejected(String),
}

/// Malformed message crossing the JS boundary
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("failed to decode request: {0}")]
    Decode(String),

    #[error("failed to encode response: {0}")]
    Encode(String),
}

impl From<ProtocolError> for JsValue {
    fn from(error: ProtocolError) -> JsValue {
        JsValue::from_str(&error.to_string())
    }
}
