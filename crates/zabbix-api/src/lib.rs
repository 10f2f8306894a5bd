// zabbix-api: Blocking client for the Zabbix JSON-RPC API
//
// Pulls triggers, functions, items, history, hosts, host groups,
// applications and events from a Zabbix frontend and returns them as
// typed tables.

pub mod client;
pub mod config;
pub mod error;
mod rpc;
pub mod schema;
pub mod session;
pub mod table;
pub mod transport;
pub mod value_type;
pub mod version;

pub use client::ZabbixApi;
pub use config::ServerConfig;
pub use error::Error;
pub use schema::application::ApplicationColumn;
pub use schema::event::{EVENT_ID_NOT_FOUND, EventColumn, UNLIMITED};
pub use schema::function::FunctionColumn;
pub use schema::group::GroupColumn;
pub use schema::history::HistoryColumn;
pub use schema::host::{HostColumn, HostGroupColumn, HostTables};
pub use schema::item::ItemColumn;
pub use schema::trigger::TriggerColumn;
pub use session::{AuthState, AuthTokenListener, SessionExpiryRule};
pub use table::{Cell, CellKind, Column, Row, Table};
pub use transport::{HttpReply, HttpTransport, TlsMode, Transport, TransportConfig};
pub use value_type::{ItemValueType, ValueType};
pub use version::ApiVersion;
