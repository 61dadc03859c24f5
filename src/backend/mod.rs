//! Backend adapter concerns: payload decoding, push-event decoding, media
//! route selection, and in-memory stand-ins for tests.

pub mod decode;
pub mod event_decode;
pub mod routes;
pub mod stubs;
