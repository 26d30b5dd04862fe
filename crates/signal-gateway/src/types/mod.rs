//! Wire types for the Signal gateway daemon API.

mod envelope;
mod link;
mod send;

pub use envelope::{Attachment, DataMessage, Envelope, GroupInfo, ReceiveEvent};
pub use link::LinkStatus;
pub use send::{RecipientResult, SendParams, SendReceipt, TextStyleParam};
