// JSON-RPC 2.0 request dispatch
//
// Builds the request envelope, numbers requests, hands the body to the
// transport and classifies whatever comes back. Session handling lives a
// layer up; this module only reports what the server said.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::Error;
use crate::transport::Transport;

const JSON_RPC_VERSION: &str = "2.0";

/// Methods whose request body carries credentials.
const SENSITIVE_METHODS: &[&str] = &["user.login"];

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: &'a Value,
    id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    /// `None` only when the member is absent; `"result": null` is `Some(Null)`.
    #[serde(default, deserialize_with = "present")]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
    #[serde(default)]
    id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl From<RpcError> for Error {
    fn from(err: RpcError) -> Self {
        // Zabbix sends `data` as a string, but nothing guarantees it.
        let data = err.data.map(|d| match d {
            Value::String(s) => s,
            other => other.to_string(),
        });
        Self::Rpc {
            code: err.code,
            message: err.message,
            data,
        }
    }
}

/// Sends numbered JSON-RPC requests to one endpoint.
pub(crate) struct Dispatcher<T> {
    transport: T,
    endpoint: Url,
    next_id: u64,
}

impl<T: Transport> Dispatcher<T> {
    pub(crate) fn new(transport: T, endpoint: Url) -> Self {
        Self {
            transport,
            endpoint,
            next_id: 1,
        }
    }

    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Issue `method` and return its raw `result`.
    ///
    /// `auth` is omitted from the envelope when `None`.
    pub(crate) fn call(
        &mut self,
        method: &str,
        params: &Value,
        auth: Option<&str>,
    ) -> Result<Value, Error> {
        let id = self.next_id;
        self.next_id += 1;

        let request = RpcRequest {
            jsonrpc: JSON_RPC_VERSION,
            method,
            params,
            id,
            auth,
        };
        let body = serde_json::to_string(&request).map_err(|e| Error::Parse {
            message: format!("failed to serialize {method} request: {e}"),
            body: String::new(),
        })?;

        debug!(method, id, "JSON-RPC request");
        if !SENSITIVE_METHODS.contains(&method) {
            trace!(body = %body, "request body");
        }

        let reply = self.transport.send(&self.endpoint, body)?;
        trace!(status = reply.status, body = %reply.body, "response body");

        if !reply.is_success() {
            return Err(Error::HttpStatus {
                status: reply.status,
                body: reply.body,
            });
        }

        let response: RpcResponse = match serde_json::from_str(&reply.body) {
            Ok(response) => response,
            Err(e) => {
                return Err(Error::Parse {
                    message: format!("{method}: {e}"),
                    body: reply.body,
                });
            }
        };

        if response.id.as_ref().and_then(Value::as_u64) != Some(id) {
            warn!(method, expected = id, got = ?response.id, "response id mismatch");
        }

        if let Some(err) = response.error {
            return Err(err.into());
        }

        response.result.ok_or_else(|| Error::Parse {
            message: format!("{method}: response has neither result nor error"),
            body: reply.body,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;
    use crate::transport::HttpReply;

    #[derive(Clone, Default)]
    struct Canned {
        replies: Arc<Mutex<Vec<HttpReply>>>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl Canned {
        fn reply(self, status: u16, body: &str) -> Self {
            self.replies.lock().unwrap().push(HttpReply {
                status,
                body: body.to_owned(),
            });
            self
        }

        fn sent(&self) -> Vec<Value> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|b| serde_json::from_str(b).unwrap())
                .collect()
        }
    }

    impl Transport for Canned {
        fn send(&self, _endpoint: &Url, body: String) -> Result<HttpReply, Error> {
            self.sent.lock().unwrap().push(body);
            let mut replies = self.replies.lock().unwrap();
            Ok(replies.remove(0))
        }
    }

    fn dispatcher(transport: Canned) -> Dispatcher<Canned> {
        let endpoint = Url::parse("http://zabbix.test/api_jsonrpc.php").unwrap();
        Dispatcher::new(transport, endpoint)
    }

    #[test]
    fn envelope_and_incrementing_ids() {
        let canned = Canned::default()
            .reply(200, r#"{"jsonrpc":"2.0","result":"2.0.4","id":1}"#)
            .reply(200, r#"{"jsonrpc":"2.0","result":[],"id":2}"#);
        let mut rpc = dispatcher(canned.clone());

        let version = rpc.call("apiinfo.version", &json!([]), None).unwrap();
        assert_eq!(version, json!("2.0.4"));
        let hosts = rpc.call("host.get", &json!({"output": "extend"}), Some("tok")).unwrap();
        assert_eq!(hosts, json!([]));

        let sent = canned.sent();
        assert_eq!(
            sent[0],
            json!({"jsonrpc": "2.0", "method": "apiinfo.version", "params": [], "id": 1})
        );
        assert_eq!(sent[1]["id"], json!(2));
        assert_eq!(sent[1]["auth"], json!("tok"));
    }

    #[test]
    fn error_member_becomes_rpc_error() {
        let canned = Canned::default().reply(
            200,
            r#"{"jsonrpc":"2.0","error":{"code":-32602,"message":"Invalid params.","data":"No groups for host \"x\"."},"id":1}"#,
        );
        match dispatcher(canned).call("host.create", &json!({}), Some("t")) {
            Err(Error::Rpc {
                code,
                message,
                data,
            }) => {
                assert_eq!(code, -32602);
                assert_eq!(message, "Invalid params.");
                assert_eq!(data.as_deref(), Some("No groups for host \"x\"."));
            }
            other => panic!("expected Rpc error, got: {other:?}"),
        }
    }

    #[test]
    fn structured_error_data_is_stringified() {
        let canned = Canned::default().reply(
            200,
            r#"{"jsonrpc":"2.0","error":{"code":-32500,"message":"Application error.","data":{"x":1}},"id":1}"#,
        );
        match dispatcher(canned).call("item.get", &json!({}), Some("t")) {
            Err(Error::Rpc { data, .. }) => assert_eq!(data.as_deref(), Some(r#"{"x":1}"#)),
            other => panic!("expected Rpc error, got: {other:?}"),
        }
    }

    #[test]
    fn non_success_status() {
        let canned = Canned::default().reply(502, "Bad Gateway");
        match dispatcher(canned).call("item.get", &json!({}), Some("t")) {
            Err(Error::HttpStatus { status, body }) => {
                assert_eq!(status, 502);
                assert_eq!(body, "Bad Gateway");
            }
            other => panic!("expected HttpStatus error, got: {other:?}"),
        }
    }

    #[test]
    fn null_result_is_returned_as_null() {
        let canned = Canned::default().reply(200, r#"{"jsonrpc":"2.0","result":null,"id":1}"#);
        let result = dispatcher(canned).call("apiinfo.version", &json!([]), None).unwrap();
        assert_eq!(result, Value::Null);
    }

    #[test]
    fn malformed_bodies_are_parse_errors() {
        let canned = Canned::default()
            .reply(200, "<html>maintenance</html>")
            .reply(200, r#"{"jsonrpc":"2.0","id":2}"#);
        let mut rpc = dispatcher(canned);

        match rpc.call("item.get", &json!({}), Some("t")) {
            Err(Error::Parse { body, .. }) => assert_eq!(body, "<html>maintenance</html>"),
            other => panic!("expected Parse error, got: {other:?}"),
        }
        assert!(matches!(
            rpc.call("item.get", &json!({}), Some("t")),
            Err(Error::Parse { .. })
        ));
    }
}
