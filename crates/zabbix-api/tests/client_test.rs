#![allow(clippy::unwrap_used)]
// Session, retry and request-shaping tests for `ZabbixApi` over a
// scripted in-memory transport.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use url::Url;

use zabbix_api::{
    ApiVersion, AuthState, EVENT_ID_NOT_FOUND, Error, FunctionColumn, HttpReply, ServerConfig,
    Transport, UNLIMITED, ValueType, ZabbixApi,
};

// ── Helpers ─────────────────────────────────────────────────────────

enum Reply {
    Result(Value),
    RpcError {
        code: i64,
        message: &'static str,
        data: Option<&'static str>,
    },
    Raw {
        status: u16,
        body: &'static str,
    },
}

#[derive(Default)]
struct Script {
    replies: VecDeque<Reply>,
    requests: Vec<Value>,
}

/// Answers requests from a FIFO of scripted replies, echoing each
/// request's id, and records every request body.
#[derive(Clone, Default)]
struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    fn push(&self, reply: Reply) -> &Self {
        self.script.lock().unwrap().replies.push_back(reply);
        self
    }

    fn result(&self, result: Value) -> &Self {
        self.push(Reply::Result(result))
    }

    fn session_terminated(&self) -> &Self {
        self.push(Reply::RpcError {
            code: -32602,
            message: "Invalid params.",
            data: Some("Session terminated, re-login, please."),
        })
    }

    fn requests(&self) -> Vec<Value> {
        self.script.lock().unwrap().requests.clone()
    }

    fn methods(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| r["method"].as_str().unwrap().to_owned())
            .collect()
    }

    fn last_params(&self) -> Value {
        self.requests().last().unwrap()["params"].clone()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, _endpoint: &Url, body: String) -> Result<HttpReply, Error> {
        let request: Value = serde_json::from_str(&body).unwrap();
        let id = request["id"].clone();

        let mut script = self.script.lock().unwrap();
        script.requests.push(request);
        let reply = script.replies.pop_front().ok_or_else(|| {
            Error::Transport(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "no scripted reply left",
            )))
        })?;

        let (status, body) = match reply {
            Reply::Result(result) => (
                200,
                json!({"jsonrpc": "2.0", "result": result, "id": id}).to_string(),
            ),
            Reply::RpcError {
                code,
                message,
                data,
            } => (
                200,
                json!({
                    "jsonrpc": "2.0",
                    "error": {"code": code, "message": message, "data": data},
                    "id": id
                })
                .to_string(),
            ),
            Reply::Raw { status, body } => (status, body.to_owned()),
        };
        Ok(HttpReply { status, body })
    }
}

fn server_config() -> ServerConfig {
    ServerConfig::new(
        Url::parse("http://zabbix.test/zabbix").unwrap(),
        "Admin",
        "zabbix".to_owned().into(),
    )
}

fn client(transport: &ScriptedTransport) -> ZabbixApi<ScriptedTransport> {
    ZabbixApi::with_transport(server_config(), transport.clone()).unwrap()
}

/// Client with the version and login exchange already scripted.
fn logged_in_script(version: &str) -> ScriptedTransport {
    let transport = ScriptedTransport::default();
    transport.result(json!(version)).result(json!("token-1"));
    transport
}

fn item(item_id: u64, app_id: Option<u64>) -> Value {
    let applications = match app_id {
        Some(id) => json!([{"applicationid": id.to_string()}]),
        None => json!([]),
    };
    json!({
        "itemid": item_id.to_string(), "hostid": "10084", "key_": "system.cpu.load",
        "name": "CPU load", "value_type": "0", "lastclock": "1413265550", "lastns": "0",
        "lastvalue": "0.1", "prevvalue": "0.2", "units": "", "applications": applications
    })
}

// ── Version tests ───────────────────────────────────────────────────

#[test]
fn check_api_version_against_2_0_4() {
    let transport = ScriptedTransport::default();
    transport.result(json!("2.0.4"));
    let mut api = client(&transport);

    let cases = [
        ((2, 0, 4), true),
        ((2, 0, 3), true),
        ((2, 0, 5), false),
        ((2, 1, 4), false),
        ((1, 0, 4), true),
        ((3, 0, 4), false),
    ];
    for ((major, minor, micro), expected) in cases {
        assert_eq!(
            api.check_api_version(major, minor, micro).unwrap(),
            expected,
            "check_api_version({major}, {minor}, {micro})"
        );
    }

    assert_eq!(transport.methods(), vec!["apiinfo.version"]);
    assert!(transport.requests()[0].get("auth").is_none());
}

#[test]
fn api_version_is_cached() {
    let transport = ScriptedTransport::default();
    transport.result(json!("6.0.21"));
    let mut api = client(&transport);

    assert_eq!(api.api_version().unwrap(), "6.0.21");
    assert_eq!(api.api_version().unwrap(), "6.0.21");
    assert_eq!(api.server_version().unwrap(), ApiVersion::new(6, 0, 21));
    assert_eq!(transport.requests().len(), 1);
}

#[test]
fn unsupported_server_version_refuses_login() {
    let transport = ScriptedTransport::default();
    transport.result(json!("2.0.4"));
    let mut config = server_config();
    config.min_api_version = Some(ApiVersion::new(2, 2, 0));
    let mut api = ZabbixApi::with_transport(config, transport.clone()).unwrap();

    match api.open_session() {
        Err(Error::UnsupportedVersion { server, required }) => {
            assert_eq!(server, ApiVersion::new(2, 0, 4));
            assert_eq!(required, ApiVersion::new(2, 2, 0));
        }
        other => panic!("expected UnsupportedVersion, got: {other:?}"),
    }
    assert_eq!(transport.methods(), vec!["apiinfo.version"]);
    assert_eq!(api.auth_state(), AuthState::Unauthenticated);
}

// ── Authentication tests ────────────────────────────────────────────

#[test]
fn token_is_reused_and_login_sent_once() {
    let transport = logged_in_script("2.0.4");
    let mut api = client(&transport);
    assert_eq!(api.auth_state(), AuthState::Unauthenticated);

    let first = api.auth_token().unwrap();
    let second = api.auth_token().unwrap();
    assert_eq!(first, "token-1");
    assert_eq!(first, second);
    assert_eq!(api.cached_auth_token(), Some("token-1"));
    assert_eq!(api.auth_state(), AuthState::Authenticated);

    assert_eq!(transport.methods(), vec!["apiinfo.version", "user.login"]);
    let login = &transport.requests()[1];
    assert!(login.get("auth").is_none());
    assert_eq!(login["params"], json!({"user": "Admin", "password": "zabbix"}));
}

#[test]
fn newer_servers_get_username_key() {
    let transport = logged_in_script("6.4.0");
    let mut api = client(&transport);
    api.open_session().unwrap();
    assert_eq!(
        transport.last_params(),
        json!({"username": "Admin", "password": "zabbix"})
    );
}

#[test]
fn open_session_is_a_no_op_while_authenticated() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let transport = logged_in_script("2.0.4");
    transport.result(json!("token-2"));
    let mut api = client(&transport).with_listener(move |token: &str| {
        sink.lock().unwrap().push(token.to_owned());
    });

    api.open_session().unwrap();
    api.open_session().unwrap();
    assert_eq!(api.cached_auth_token(), Some("token-1"));
    assert_eq!(transport.methods(), vec!["apiinfo.version", "user.login"]);
    assert_eq!(*seen.lock().unwrap(), vec!["token-1"]);
}

#[test]
fn clear_auth_token_forces_new_login() {
    let transport = logged_in_script("2.0.4");
    transport.result(json!("token-2"));
    let mut api = client(&transport);

    assert_eq!(api.auth_token().unwrap(), "token-1");
    api.clear_auth_token();
    assert_eq!(api.cached_auth_token(), None);
    assert_eq!(api.auth_state(), AuthState::Unauthenticated);
    assert_eq!(api.auth_token().unwrap(), "token-2");
    assert_eq!(
        transport.methods(),
        vec!["apiinfo.version", "user.login", "user.login"]
    );
}

#[test]
fn rejected_login_is_an_authentication_error() {
    let transport = ScriptedTransport::default();
    transport.result(json!("2.0.4")).push(Reply::RpcError {
        code: -32602,
        message: "Invalid params.",
        data: Some("Login name or password is incorrect."),
    });
    let mut api = client(&transport);

    match api.open_session() {
        Err(Error::Authentication { message }) => {
            assert!(message.contains("Login name or password is incorrect."));
        }
        other => panic!("expected Authentication error, got: {other:?}"),
    }
    assert_eq!(api.auth_state(), AuthState::Unauthenticated);
    assert_eq!(api.cached_auth_token(), None);
}

#[test]
fn listener_sees_every_new_token() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let transport = logged_in_script("2.0.4");
    transport
        .session_terminated()
        .result(json!("token-2"))
        .result(json!([]));
    let mut api = client(&transport).with_listener(move |token: &str| {
        sink.lock().unwrap().push(token.to_owned());
    });

    api.get_groups().unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["token-1", "token-2"]);
}

// ── Session expiry tests ────────────────────────────────────────────

#[test]
fn expired_session_is_retried_once_with_new_token() {
    let transport = logged_in_script("2.0.4");
    transport
        .session_terminated()
        .result(json!("token-2"))
        .result(json!([item(23296, Some(179))]));
    let mut api = client(&transport);

    let items = api.get_items().unwrap();
    assert_eq!(items.len(), 1);

    assert_eq!(
        transport.methods(),
        vec!["apiinfo.version", "user.login", "item.get", "user.login", "item.get"]
    );
    let requests = transport.requests();
    assert_eq!(requests[2]["auth"], json!("token-1"));
    assert_eq!(requests[4]["auth"], json!("token-2"));
    assert_eq!(requests[2]["params"], requests[4]["params"]);
    assert_eq!(api.cached_auth_token(), Some("token-2"));
}

#[test]
fn second_expiry_is_an_authentication_error() {
    let transport = logged_in_script("2.0.4");
    transport
        .session_terminated()
        .result(json!("token-2"))
        .session_terminated();
    let mut api = client(&transport);

    let result = api.get_hosts();
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
    assert_eq!(transport.requests().len(), 5, "no third attempt");
    assert_eq!(api.auth_state(), AuthState::Unauthenticated);
}

#[test]
fn ordinary_rpc_error_is_not_retried() {
    let transport = logged_in_script("2.0.4");
    transport.push(Reply::RpcError {
        code: -32602,
        message: "Invalid params.",
        data: Some("Incorrect API \"hostgroup\"."),
    });
    let mut api = client(&transport);

    match api.get_groups() {
        Err(Error::Rpc { code, data, .. }) => {
            assert_eq!(code, -32602);
            assert_eq!(data.as_deref(), Some("Incorrect API \"hostgroup\"."));
        }
        other => panic!("expected Rpc error, got: {other:?}"),
    }
    assert_eq!(transport.requests().len(), 3);
    assert_eq!(api.cached_auth_token(), Some("token-1"));
}

#[test]
fn request_ids_increase_from_one() {
    let transport = logged_in_script("2.0.4");
    transport.result(json!([])).result(json!([])).result(json!([]));
    let mut api = client(&transport);

    api.get_groups().unwrap();
    api.get_events(1, UNLIMITED).unwrap();
    api.get_groups().unwrap();

    let ids: Vec<u64> = transport
        .requests()
        .iter()
        .map(|r| r["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

// ── Transport error tests ───────────────────────────────────────────

#[test]
fn http_status_is_surfaced() {
    let transport = logged_in_script("2.0.4");
    transport.push(Reply::Raw {
        status: 503,
        body: "Service Unavailable",
    });
    let mut api = client(&transport);

    match api.get_items() {
        Err(Error::HttpStatus { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "Service Unavailable");
        }
        other => panic!("expected HttpStatus error, got: {other:?}"),
    }
}

#[test]
fn malformed_body_is_a_parse_error() {
    let transport = logged_in_script("2.0.4");
    transport.push(Reply::Raw {
        status: 200,
        body: "<html>maintenance</html>",
    });
    let mut api = client(&transport);
    assert!(matches!(api.get_items(), Err(Error::Parse { .. })));
}

#[test]
fn null_result_is_a_schema_error() {
    let transport = logged_in_script("2.0.4");
    transport.result(Value::Null);
    let mut api = client(&transport);
    match api.get_groups() {
        Err(Error::Schema { field, .. }) => assert_eq!(field, "result"),
        other => panic!("expected Schema error, got: {other:?}"),
    }
}

#[test]
fn transport_failure_is_surfaced() {
    let transport = ScriptedTransport::default();
    let mut api = client(&transport);
    let result = api.auth_token();
    assert!(
        matches!(&result, Err(e) if e.is_transient()),
        "expected transport error, got: {result:?}"
    );
}

// ── Query tests ─────────────────────────────────────────────────────

#[test]
fn functions_before_triggers_are_empty() {
    let transport = ScriptedTransport::default();
    let api = client(&transport);
    assert!(api.get_functions().unwrap().is_empty());
    assert!(transport.requests().is_empty());
}

#[test]
fn functions_come_from_last_trigger_query() {
    let transport = logged_in_script("2.0.4");
    transport.result(json!([{
        "triggerid": "13569", "status": "0", "value": "1", "priority": "2",
        "lastchange": "1413268970", "expression": "{12942}>5",
        "description": "Processor load is too high on {HOST.NAME}",
        "hosts": [{"hostid": "10084"}],
        "functions": [{"functionid": "12942", "itemid": "23296",
                       "function": "avg", "parameter": "5m"}]
    }]));
    let mut api = client(&transport);

    let triggers = api.get_triggers(0).unwrap();
    assert_eq!(triggers.len(), 1);
    assert_eq!(
        transport.last_params(),
        json!({"output": "extend", "selectFunctions": "extend",
               "selectHosts": "refer", "active": true})
    );

    let requests_before = transport.requests().len();
    let functions = api.get_functions().unwrap();
    assert_eq!(transport.requests().len(), requests_before);
    assert_eq!(functions.len(), 1);
    let row = &functions.rows()[0];
    assert_eq!(row.u64(FunctionColumn::FunctionId), Some(12942));
    assert_eq!(row.u64(FunctionColumn::TriggerId), Some(13569));
    assert_eq!(row.text(FunctionColumn::Function), Some("avg"));
}

#[test]
fn trigger_query_passes_since() {
    let transport = logged_in_script("2.0.4");
    transport.result(json!([]));
    let mut api = client(&transport);
    api.get_triggers(1_413_268_970).unwrap();
    assert_eq!(transport.last_params()["lastChangeSince"], json!(1_413_268_970));
}

#[test]
fn applications_for_items_sends_distinct_ids() {
    let transport = logged_in_script("2.0.4");
    transport
        .result(json!([
            item(1, Some(179)),
            item(2, Some(180)),
            item(3, Some(179)),
            item(4, None),
            item(5, Some(180)),
        ]))
        .result(json!([
            {"applicationid": "179", "hostid": "10084", "name": "CPU"},
            {"applicationid": "180", "hostid": "10084", "name": "Memory"}
        ]));
    let mut api = client(&transport);

    let items = api.get_items().unwrap();
    let apps = api.get_applications_for_items(&items).unwrap();
    assert_eq!(apps.len(), 2);
    assert_eq!(transport.last_params()["applicationids"], json!([179, 180]));
}

#[test]
fn explicit_application_ids_are_deduplicated() {
    let transport = logged_in_script("2.0.4");
    transport.result(json!([]));
    let mut api = client(&transport);

    api.get_applications(&[7, 7, 3, 7]).unwrap();
    assert_eq!(transport.last_params()["applicationids"], json!([7, 3]));
}

#[test]
fn empty_application_set_sends_nothing() {
    let transport = ScriptedTransport::default();
    let mut api = client(&transport);
    assert!(api.get_applications(&[]).unwrap().is_empty());
    assert!(transport.requests().is_empty());
}

#[test]
fn servers_without_applications_skip_them() {
    let transport = logged_in_script("5.4.0");
    let mut element = item(1, None);
    element.as_object_mut().unwrap().remove("applications");
    transport.result(json!([element]));
    let mut api = client(&transport);

    let items = api.get_items().unwrap();
    assert!(transport.last_params().get("selectApplications").is_none());
    assert_eq!(items.len(), 1);

    assert!(api.get_applications(&[179]).unwrap().is_empty());
    assert_eq!(
        transport.methods(),
        vec!["apiinfo.version", "user.login", "item.get"]
    );
}

#[test]
fn older_servers_select_applications() {
    let transport = logged_in_script("5.2.0");
    transport.result(json!([item(1, Some(179))]));
    let mut api = client(&transport);

    api.get_items().unwrap();
    assert_eq!(transport.last_params()["selectApplications"], json!("refer"));
}

#[test]
fn history_request_and_rows() {
    let transport = logged_in_script("2.0.4");
    transport.result(json!([
        {"itemid": "23296", "clock": "1413265550", "value": "0.0833", "ns": "735163925"},
        {"itemid": "23296", "clock": "1413265610", "value": "0.1000", "ns": "735881206"}
    ]));
    let mut api = client(&transport);

    let history = api
        .get_history(23296, ValueType::Float, 1_413_265_000, 1_413_266_000)
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(
        transport.last_params(),
        json!({
            "output": "extend", "itemids": [23296], "history": 0,
            "sortfield": "clock", "sortorder": "ASC",
            "time_from": 1_413_265_000, "time_till": 1_413_266_000
        })
    );
}

#[test]
fn history_of_unknown_value_type_is_rejected_locally() {
    let transport = ScriptedTransport::default();
    let mut api = client(&transport);
    assert!(matches!(
        api.get_history(1, ValueType::Unknown, 0, 10),
        Err(Error::InvalidArgument(_))
    ));
    assert!(transport.requests().is_empty());
}

#[test]
fn hosts_and_memberships() {
    let transport = logged_in_script("2.0.4");
    transport.result(json!([
        {"hostid": "10084", "name": "Zabbix server", "status": "0",
         "groups": [{"groupid": "2"}, {"groupid": "4"}]},
        {"hostid": "10085", "name": "web-01", "status": "0",
         "groups": [{"groupid": "2"}]}
    ]));
    let mut api = client(&transport);

    let tables = api.get_hosts().unwrap();
    assert_eq!(tables.hosts.len(), 2);
    assert_eq!(tables.host_groups.len(), 3);
    assert_eq!(transport.last_params()["selectGroups"], json!("refer"));
}

#[test]
fn unlimited_event_range_omits_upper_bound() {
    let transport = logged_in_script("2.0.4");
    transport.result(json!([])).result(json!([]));
    let mut api = client(&transport);

    api.get_events(100, UNLIMITED).unwrap();
    let params = transport.last_params();
    assert_eq!(params["eventid_from"], json!(100));
    assert!(params.get("eventid_till").is_none());

    api.get_events(100, 200).unwrap();
    assert_eq!(transport.last_params()["eventid_till"], json!(200));
}

#[test]
fn end_event_id_on_empty_server() {
    let transport = logged_in_script("2.0.4");
    transport.result(json!([]));
    let mut api = client(&transport);

    assert_eq!(api.get_end_event_id(true).unwrap(), EVENT_ID_NOT_FOUND);
    let params = transport.last_params();
    assert_eq!(params["output"], json!("shorten"));
    assert_eq!(params["sortorder"], json!("ASC"));
    assert_eq!(params["limit"], json!(1));
}

#[test]
fn last_event_id_on_newer_server() {
    let transport = logged_in_script("2.4.0");
    transport.result(json!([{"eventid": "8697"}]));
    let mut api = client(&transport);

    assert_eq!(api.get_end_event_id(false).unwrap(), 8697);
    let params = transport.last_params();
    assert_eq!(params["output"], json!(["eventid"]));
    assert_eq!(params["sortorder"], json!("DESC"));
}
