//! Connection handling: transport streams, response framing and the
//! type-state client.

mod client;
mod framed;
mod stream;

pub use client::{Authenticated, Client, NotAuthenticated, Selected};
pub use framed::{FramedStream, ResponseAccumulator};
pub use stream::{ImapStream, connect_plain, connect_tls, tls_connector};
