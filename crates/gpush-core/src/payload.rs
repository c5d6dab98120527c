//! Register payload: the JSON array of API names a client handles.

use crate::error::Result;

/// Encode the advertised API names for the `/register` envelope.
pub fn encode_api_list<S: AsRef<str>>(apis: &[S]) -> Result<Vec<u8>> {
    let names: Vec<&str> = apis.iter().map(AsRef::as_ref).collect();
    Ok(serde_json::to_vec(&names)?)
}

/// Decode the advertised API names from a `/register` payload.
pub fn decode_api_list(data: &[u8]) -> Result<Vec<String>> {
    Ok(serde_json::from_slice(data)?)
}
