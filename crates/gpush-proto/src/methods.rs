//! Reserved API names and payloads used by the registration handshake.
//!
//! Shared between the server session and the client engine so the literals
//! stay in sync. Application code may use any other API name.

/// Client to server: first envelope on a stream, carries the client id and a
/// JSON array of the API names the client handles.
pub const API_REGISTER: &str = "/register";

/// Server to client: registration accepted.
pub const API_OK: &str = "/ok";

/// Server to client: registration rejected.
pub const API_ERROR: &str = "/error";

/// Payload of the `/ok` acknowledgment.
pub const PAYLOAD_SUCCESS: &[u8] = b"success";

/// Payload of the `/error` reply when the id is already live.
pub const PAYLOAD_DUP_ID: &[u8] = b"dup id";

/// Whether `api` is one of the names reserved by the handshake.
pub fn is_reserved(api: &str) -> bool {
    matches!(api, API_REGISTER | API_OK | API_ERROR)
}
