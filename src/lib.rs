//! Forward network-security alerts to IBM QRadar.
//!
//! Each (alert, threat) pair of an [`models::AlertBatch`] is encoded as one
//! LEEF event ([`leef`]) and sent as one syslog message ([`sink`]) by an
//! [`dispatch::AlertDispatcher`].
//!
//! ```text
//! AlertBatch -> alerts x threats -> LeefEncoder -> line -> EventSink::send_line
//! ```

pub mod config;
pub mod dispatch;
pub mod leef;
pub mod models;
pub mod observability;
pub mod sink;

pub use dispatch::AlertDispatcher;
pub use leef::{LeefEncoder, ProductIdentity};
pub use models::AlertBatch;
pub use sink::{EventSink, SinkError};
