// Protocol module - framing and message definitions

pub mod frame;
pub mod messages;

pub use frame::{read_payload_header, write_payload_header};
pub use messages::{FileRequest, Listing, Response};
