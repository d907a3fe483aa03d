/// API module for talking to the procurement backend
///
/// This module provides a small JSON-over-HTTP client shared by the data
/// fetcher and the HTTP report definition store. The client is built from
/// settings and passed explicitly; nothing here reads ambient session state.
use crate::error::FetchError;
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

const USER_AGENT: &str = concat!("licitacao-relatorios/", env!("CARGO_PKG_VERSION"));

/// JSON client bound to one backend base URL
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    agent: ureq::Agent,
}

impl ApiClient {
    /// Create a client for `base_url`, optionally sending a bearer token
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new().user_agent(USER_AGENT).build();
        Self { base_url: base_url.trim_end_matches('/').to_string(), token, agent }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an absolute URL for an endpoint path
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let request = self.agent.request(method, &self.url(path)).set("Accept", "application/json");
        match &self.token {
            Some(token) => request.set("Authorization", &format!("Bearer {}", token)),
            None => request,
        }
    }

    /// GET `path` with query parameters and decode the JSON body
    pub fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(String, String)]) -> Result<T, FetchError> {
        debug!("GET {} ({} parameters)", path, query.len());
        let mut request = self.request("GET", path);
        for (key, value) in query {
            request = request.query(key, value);
        }
        decode(path, request.call()?)
    }

    /// Send a JSON body with `method` and decode the JSON answer
    pub fn send_json<T: DeserializeOwned, B: Serialize>(&self, method: &str, path: &str, body: &B) -> Result<T, FetchError> {
        debug!("{} {}", method, path);
        let payload = serde_json::to_string(body)
            .map_err(|e| FetchError::Decode { endpoint: path.to_string(), message: e.to_string() })?;
        let response =
            self.request(method, path).set("Content-Type", "application/json").send_string(&payload)?;
        decode(path, response)
    }

    /// DELETE `path`, ignoring any response body
    pub fn delete(&self, path: &str) -> Result<(), FetchError> {
        debug!("DELETE {}", path);
        self.request("DELETE", path).call()?;
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, response: ureq::Response) -> Result<T, FetchError> {
    serde_json::from_reader(response.into_reader())
        .map_err(|e| FetchError::Decode { endpoint: endpoint.to_string(), message: e.to_string() })
}

/// Flatten query parameters; list values repeat their key.
pub fn query_pairs(params: &BTreeMap<String, serde_json::Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        match value {
            serde_json::Value::Array(items) => {
                pairs.extend(items.iter().map(|item| (key.clone(), scalar_to_string(item))));
            }
            other => pairs.push((key.clone(), scalar_to_string(other))),
        }
    }
    pairs
}

fn scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
