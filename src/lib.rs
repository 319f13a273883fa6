pub mod api;
pub mod events;
pub mod model;
pub mod publish;
pub mod reshape;
pub mod session;

pub use api::{Api, Error, HttpTransport, RetryPolicy, Transport};
pub use session::{PollData, Session};
