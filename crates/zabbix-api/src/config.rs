// Server connection settings
//
// Where the frontend lives, who logs in, and which servers and session
// errors the client accepts.

use secrecy::SecretString;
use url::Url;

use crate::error::Error;
use crate::session::SessionExpiryRule;
use crate::version::ApiVersion;

/// Script name of the Zabbix frontend's JSON-RPC endpoint.
pub const JSON_RPC_SCRIPT: &str = "api_jsonrpc.php";

/// Connection and credential settings for one Zabbix server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Frontend URL, either its root (`https://zbx.example.com/zabbix`) or
    /// the full endpoint (`.../api_jsonrpc.php`).
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    /// Refuse to log in to servers older than this.
    pub min_api_version: Option<ApiVersion>,
    pub session_expiry: SessionExpiryRule,
}

impl ServerConfig {
    pub fn new(url: Url, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            url,
            username: username.into(),
            password,
            min_api_version: None,
            session_expiry: SessionExpiryRule::default(),
        }
    }

    /// The JSON-RPC endpoint: `url` itself when it already names a `.php`
    /// script, otherwise `api_jsonrpc.php` below it.
    pub fn endpoint(&self) -> Result<Url, Error> {
        if self.url.path().ends_with(".php") {
            return Ok(self.url.clone());
        }
        let mut base = self.url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base.join(JSON_RPC_SCRIPT)?)
    }
}
