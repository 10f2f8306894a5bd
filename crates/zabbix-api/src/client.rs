// Zabbix API client
//
// One `ZabbixApi` per monitored server. It owns the dispatcher and the
// auth session, caches the server's API version, and exposes one method
// per entity query. Every query logs in on demand and, if the server
// reports the session as expired, logs in again and retries exactly once.

use secrecy::ExposeSecret;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ServerConfig;
use crate::error::Error;
use crate::rpc::Dispatcher;
use crate::schema::application::{self, ApplicationColumn};
use crate::schema::event::{self, EventColumn, UNLIMITED};
use crate::schema::function::{self, FunctionColumn};
use crate::schema::group::{self, GroupColumn};
use crate::schema::history::{self, HistoryColumn};
use crate::schema::host::{self, HostTables};
use crate::schema::item::{self, ItemColumn};
use crate::schema::trigger::{self, TriggerColumn};
use crate::session::{AuthSession, AuthState, AuthTokenListener};
use crate::table::Table;
use crate::transport::{HttpTransport, Transport, TransportConfig};
use crate::value_type::ValueType;
use crate::version::ApiVersion;

/// `user.login` takes `username` from 5.4 on and `user` before.
const LOGIN_USERNAME_KEY_SINCE: ApiVersion = ApiVersion::new(5, 4, 0);

/// `event.get` accepts an explicit field list for `output` from 2.4 on.
const EVENT_OUTPUT_LIST_SINCE: ApiVersion = ApiVersion::new(2, 4, 0);

/// Applications were replaced by item tags in 5.4; `application.get` and
/// `selectApplications` are gone from then on.
const APPLICATIONS_REMOVED_IN: ApiVersion = ApiVersion::new(5, 4, 0);

/// Client session for one Zabbix server.
///
/// All operations block the calling thread and take `&mut self`; a
/// session is meant to be owned by one polling task. The type is `Send`,
/// so it can be moved to a worker thread.
pub struct ZabbixApi<T = HttpTransport> {
    config: ServerConfig,
    rpc: Dispatcher<T>,
    session: AuthSession,
    api_version: Option<String>,
    /// Raw `result` of the last successful trigger query.
    trigger_result: Option<Value>,
}

impl ZabbixApi<HttpTransport> {
    /// Create a client that talks HTTP(S) through `reqwest`.
    pub fn connect(config: ServerConfig, transport: &TransportConfig) -> Result<Self, Error> {
        let http = HttpTransport::new(transport)?;
        Self::with_transport(config, http)
    }
}

impl<T: Transport> ZabbixApi<T> {
    /// Create a client over an arbitrary transport.
    pub fn with_transport(config: ServerConfig, transport: T) -> Result<Self, Error> {
        let endpoint = config.endpoint()?;
        debug!(endpoint = %endpoint, "zabbix client created");
        Ok(Self {
            config,
            rpc: Dispatcher::new(transport, endpoint),
            session: AuthSession::new(),
            api_version: None,
            trigger_result: None,
        })
    }

    /// Register a hook called with every newly issued auth token.
    pub fn with_listener(mut self, listener: impl AuthTokenListener + 'static) -> Self {
        self.session.set_listener(Box::new(listener));
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &Url {
        self.rpc.endpoint()
    }

    pub fn transport(&self) -> &T {
        self.rpc.transport()
    }

    // ── Version ──────────────────────────────────────────────────────

    /// The server's API version string, fetched once per client.
    pub fn api_version(&mut self) -> Result<String, Error> {
        if let Some(version) = &self.api_version {
            return Ok(version.clone());
        }

        let result = self.rpc.call("apiinfo.version", &json!([]), None)?;
        let version = match result {
            Value::String(version) => version,
            other => {
                return Err(Error::schema(
                    "apiinfo",
                    "version",
                    format!("expected a string, got {other}"),
                ));
            }
        };

        info!(version = %version, "zabbix API version");
        self.api_version = Some(version.clone());
        Ok(version)
    }

    /// The server's API version, parsed.
    pub fn server_version(&mut self) -> Result<ApiVersion, Error> {
        self.api_version()?.parse()
    }

    /// `true` if the server's API version is equal to or newer than
    /// `major.minor.micro`.
    pub fn check_api_version(&mut self, major: u32, minor: u32, micro: u32) -> Result<bool, Error> {
        Ok(self.server_version()?.is_at_least(major, minor, micro))
    }

    // ── Authentication ───────────────────────────────────────────────

    pub fn auth_state(&self) -> AuthState {
        self.session.state()
    }

    /// Log in with the configured credentials. Does nothing while the
    /// session is authenticated.
    ///
    /// Verifies the configured minimum API version first. A login the
    /// server rejects is reported as [`Error::Authentication`]; transport
    /// and HTTP failures are returned as they are.
    pub fn open_session(&mut self) -> Result<(), Error> {
        if self.session.state() == AuthState::Authenticated && self.session.token().is_some() {
            return Ok(());
        }

        let server = self.server_version()?;
        if let Some(required) = self.config.min_api_version {
            if server < required {
                return Err(Error::UnsupportedVersion { server, required });
            }
        }

        let username_key = if server >= LOGIN_USERNAME_KEY_SINCE {
            "username"
        } else {
            "user"
        };
        let mut params = Map::new();
        params.insert(
            username_key.to_owned(),
            Value::String(self.config.username.clone()),
        );
        params.insert(
            "password".to_owned(),
            Value::String(self.config.password.expose_secret().to_owned()),
        );

        self.session.begin();
        debug!(user = %self.config.username, "logging in");

        let result = match self.rpc.call("user.login", &Value::Object(params), None) {
            Ok(result) => result,
            Err(Error::Rpc {
                code,
                message,
                data,
            }) => {
                self.session.clear();
                let detail = data.map(|d| format!(" ({d})")).unwrap_or_default();
                return Err(Error::Authentication {
                    message: format!("login rejected (code {code}): {message}{detail}"),
                });
            }
            Err(e) => {
                self.session.clear();
                return Err(e);
            }
        };

        match result {
            Value::String(token) => {
                info!(user = %self.config.username, "logged in");
                self.session.complete(token);
                Ok(())
            }
            other => {
                self.session.clear();
                Err(Error::Authentication {
                    message: format!("login returned {other} instead of a token"),
                })
            }
        }
    }

    /// Log in unless a token is already held.
    pub fn update_auth_token_if_needed(&mut self) -> Result<(), Error> {
        if self.session.token().is_none() {
            self.open_session()?;
        }
        Ok(())
    }

    /// The current auth token, logging in first if necessary.
    pub fn auth_token(&mut self) -> Result<String, Error> {
        self.update_auth_token_if_needed()?;
        self.session
            .token()
            .map(str::to_owned)
            .ok_or_else(|| Error::Authentication {
                message: "no auth token after login".into(),
            })
    }

    /// The current auth token without contacting the server.
    pub fn cached_auth_token(&self) -> Option<&str> {
        self.session.token()
    }

    /// Forget the auth token; the next query logs in again.
    pub fn clear_auth_token(&mut self) {
        self.session.clear();
    }

    // ── Queries ──────────────────────────────────────────────────────

    fn query(&mut self, method: &str, params: &Value) -> Result<Value, Error> {
        match self.authenticated_call(method, params) {
            Err(Error::SessionExpired { code, message }) => {
                warn!(method, code, message = %message, "session expired, logging in again");
                self.session.clear();
                match self.authenticated_call(method, params) {
                    Err(Error::SessionExpired { code, message }) => {
                        self.session.clear();
                        Err(Error::Authentication {
                            message: format!(
                                "session rejected again after re-login (code {code}): {message}"
                            ),
                        })
                    }
                    other => other,
                }
            }
            other => other,
        }
    }

    fn authenticated_call(&mut self, method: &str, params: &Value) -> Result<Value, Error> {
        self.update_auth_token_if_needed()?;
        self.rpc
            .call(method, params, self.session.token())
            .map_err(|e| self.config.session_expiry.classify(e))
    }

    /// Triggers whose state changed at or after `since` (Unix seconds);
    /// `0` returns every active trigger.
    ///
    /// The response is kept for [`get_functions`](Self::get_functions).
    pub fn get_triggers(&mut self, since: i64) -> Result<Table<TriggerColumn>, Error> {
        let mut params = json!({
            "output": "extend",
            "selectFunctions": "extend",
            "selectHosts": "refer",
            "active": true,
        });
        if since > 0 {
            params["lastChangeSince"] = json!(since);
        }

        let result = self.query("trigger.get", &params)?;
        let table = trigger::parse(&result)?;
        debug!(rows = table.len(), "triggers received");
        self.trigger_result = Some(result);
        Ok(table)
    }

    /// Functions of the triggers returned by the last
    /// [`get_triggers`](Self::get_triggers) call. Issues no request; empty
    /// until triggers have been fetched.
    pub fn get_functions(&self) -> Result<Table<FunctionColumn>, Error> {
        match &self.trigger_result {
            Some(result) => function::parse(result),
            None => Ok(Table::new()),
        }
    }

    /// Items of monitored hosts. On servers without applications every
    /// item's application id is 0.
    pub fn get_items(&mut self) -> Result<Table<ItemColumn>, Error> {
        let mut params = json!({
            "output": "extend",
            "monitored": true,
        });
        if self.server_version()? < APPLICATIONS_REMOVED_IN {
            params["selectApplications"] = json!("refer");
        }
        let result = self.query("item.get", &params)?;
        item::parse(&result)
    }

    /// Samples of `item_id` with `from <= clock <= till`, oldest first.
    pub fn get_history(
        &mut self,
        item_id: u64,
        value_type: ValueType,
        from: i64,
        till: i64,
    ) -> Result<Table<HistoryColumn>, Error> {
        let code = value_type.code().ok_or_else(|| {
            Error::InvalidArgument(format!("no history for value type {value_type}"))
        })?;
        let params = json!({
            "output": "extend",
            "itemids": [item_id],
            "history": code,
            "sortfield": "clock",
            "sortorder": "ASC",
            "time_from": from,
            "time_till": till,
        });
        let result = self.query("history.get", &params)?;
        history::parse(&result, value_type)
    }

    /// Hosts and their group memberships.
    pub fn get_hosts(&mut self) -> Result<HostTables, Error> {
        let params = json!({
            "output": "extend",
            "selectGroups": "refer",
        });
        let result = self.query("host.get", &params)?;
        host::parse(&result)
    }

    pub fn get_groups(&mut self) -> Result<Table<GroupColumn>, Error> {
        let result = self.query("hostgroup.get", &json!({"output": "extend"}))?;
        group::parse(&result)
    }

    /// Applications by id. Duplicate ids are sent once; an empty list
    /// returns an empty table without contacting the server.
    pub fn get_applications(&mut self, ids: &[u64]) -> Result<Table<ApplicationColumn>, Error> {
        self.query_applications(application::distinct_ids(ids))
    }

    /// Applications referenced by `items`.
    pub fn get_applications_for_items(
        &mut self,
        items: &Table<ItemColumn>,
    ) -> Result<Table<ApplicationColumn>, Error> {
        self.query_applications(application::application_ids(items))
    }

    fn query_applications(&mut self, ids: Vec<u64>) -> Result<Table<ApplicationColumn>, Error> {
        if ids.is_empty() {
            debug!("no application ids, skipping application.get");
            return Ok(Table::new());
        }
        if self.server_version()? >= APPLICATIONS_REMOVED_IN {
            debug!("server has no applications, skipping application.get");
            return Ok(Table::new());
        }
        let params = json!({
            "output": "extend",
            "applicationids": ids,
        });
        let result = self.query("application.get", &params)?;
        application::parse(&result)
    }

    /// Events with `from <= eventid <= till`; pass [`UNLIMITED`] as `till`
    /// for no upper bound.
    pub fn get_events(&mut self, from: u64, till: u64) -> Result<Table<EventColumn>, Error> {
        let mut params = json!({
            "output": "extend",
            "eventid_from": from,
            "sortfield": "eventid",
            "sortorder": "ASC",
        });
        if till != UNLIMITED {
            params["eventid_till"] = json!(till);
        }
        let result = self.query("event.get", &params)?;
        event::parse(&result)
    }

    /// The first (`first == true`) or last event id the server has, or
    /// [`EVENT_ID_NOT_FOUND`](event::EVENT_ID_NOT_FOUND) if it has none.
    pub fn get_end_event_id(&mut self, first: bool) -> Result<u64, Error> {
        let output = if self.server_version()? >= EVENT_OUTPUT_LIST_SINCE {
            json!(["eventid"])
        } else {
            json!("shorten")
        };
        let order = if first { "ASC" } else { "DESC" };
        let params = json!({
            "output": output,
            "sortfield": "eventid",
            "sortorder": order,
            "limit": 1,
        });
        let result = self.query("event.get", &params)?;
        event::parse_end_event_id(&result)
    }
}
