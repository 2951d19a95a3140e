#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::Result;
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use ghbulk::{Api, ApiError, ClientFactory, Method};
use serde_json::{Value, json};

type Canned = Result<Value, (u16, String)>;

fn replay(canned: &Canned) -> Result<Value, ApiError> {
    canned.clone().map_err(|(status, message)| {
        if status == 0 {
            ApiError::GraphQl(message)
        } else {
            ApiError::Status { status, message }
        }
    })
}

/// A mutating request seen by the mock.
#[derive(Debug, Clone)]
pub struct Sent {
    pub method: Method,
    pub route: String,
    pub body: Value,
}

/// A GraphQL request seen by the mock.
#[derive(Debug, Clone)]
pub struct GraphQlCall {
    pub query: String,
    pub variables: Value,
}

/// In-memory GitHub keyed by route.
///
/// Unregistered GET routes answer 404. Listings only have a first page.
/// GraphQL responses are matched by a substring of the document and
/// replayed in order; the last one repeats.
#[derive(Default)]
pub struct MockGitHub {
    gets: Mutex<HashMap<String, Canned>>,
    sends: Mutex<HashMap<String, Canned>>,
    graphql: Mutex<Vec<(String, VecDeque<Canned>)>>,
    sent: Mutex<Vec<Sent>>,
    graphql_calls: Mutex<Vec<GraphQlCall>>,
    calls: AtomicUsize,
}

impl MockGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_get(&self, route: &str, response: Value) -> &Self {
        self.gets
            .lock()
            .unwrap()
            .insert(route.to_string(), Ok(response));
        self
    }

    pub fn on_get_error(&self, route: &str, status: u16, message: &str) -> &Self {
        self.gets
            .lock()
            .unwrap()
            .insert(route.to_string(), Err((status, message.to_string())));
        self
    }

    /// Registers a base64-encoded file under the contents API.
    pub fn with_file(&self, owner_repo: &str, path: &str, content: &str, sha: &str) -> &Self {
        self.on_get(
            &format!("/repos/{owner_repo}/contents/{path}"),
            json!({
                "path": path,
                "sha": sha,
                "content": STANDARD.encode(content),
                "encoding": "base64",
            }),
        )
    }

    pub fn on_send(&self, method: Method, route: &str, response: Value) -> &Self {
        self.sends
            .lock()
            .unwrap()
            .insert(format!("{method} {route}"), Ok(response));
        self
    }

    pub fn on_send_error(&self, method: Method, route: &str, status: u16, message: &str) -> &Self {
        self.sends
            .lock()
            .unwrap()
            .insert(format!("{method} {route}"), Err((status, message.to_string())));
        self
    }

    pub fn on_graphql(&self, needle: &str, response: Value) -> &Self {
        self.push_graphql(needle, Ok(response))
    }

    pub fn on_graphql_error(&self, needle: &str, message: &str) -> &Self {
        self.push_graphql(needle, Err((0, message.to_string())))
    }

    fn push_graphql(&self, needle: &str, canned: Canned) -> &Self {
        let mut handlers = self.graphql.lock().unwrap();
        match handlers.iter_mut().find(|(n, _)| n == needle) {
            Some((_, queue)) => queue.push_back(canned),
            None => handlers.push((needle.to_string(), VecDeque::from([canned]))),
        }
        self
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, method: Method, route: &str) -> Vec<Sent> {
        self.sent()
            .into_iter()
            .filter(|s| s.method == method && s.route == route)
            .collect()
    }

    pub fn graphql_calls(&self) -> Vec<GraphQlCall> {
        self.graphql_calls.lock().unwrap().clone()
    }

    /// GraphQL calls whose document contains `needle`.
    pub fn graphql_calls_to(&self, needle: &str) -> Vec<GraphQlCall> {
        self.graphql_calls()
            .into_iter()
            .filter(|c| c.query.contains(needle))
            .collect()
    }
}

#[async_trait]
impl Api for MockGitHub {
    async fn get(&self, route: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        let page = query
            .iter()
            .find(|(k, _)| *k == "page")
            .map(|(_, v)| v.as_str())
            .unwrap_or("1");
        if page != "1" {
            return Ok(json!([]));
        }

        match self.gets.lock().unwrap().get(route) {
            Some(canned) => replay(canned),
            None => Err(ApiError::Status {
                status: 404,
                message: "Not Found".to_string(),
            }),
        }
    }

    async fn send(&self, method: Method, route: &str, body: Value) -> Result<Value, ApiError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.sent.lock().unwrap().push(Sent {
            method,
            route: route.to_string(),
            body,
        });

        match self.sends.lock().unwrap().get(&format!("{method} {route}")) {
            Some(canned) => replay(canned),
            None => Ok(json!({})),
        }
    }

    async fn graphql(&self, query: &str, variables: Value) -> Result<Value, ApiError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.graphql_calls.lock().unwrap().push(GraphQlCall {
            query: query.to_string(),
            variables,
        });

        let mut handlers = self.graphql.lock().unwrap();
        let Some((_, queue)) = handlers.iter_mut().find(|(n, _)| query.contains(n.as_str())) else {
            return Err(ApiError::GraphQl("no canned response".to_string()));
        };
        let canned = if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().unwrap().clone()
        };
        replay(&canned)
    }

    fn api_calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

/// Hands out one mock per organization; unknown organizations fail to
/// authenticate.
#[derive(Default)]
pub struct MockFactory {
    pub orgs: HashMap<String, Arc<MockGitHub>>,
}

impl MockFactory {
    pub fn with_org(mut self, org: &str, api: Arc<MockGitHub>) -> Self {
        self.orgs.insert(org.to_string(), api);
        self
    }
}

#[async_trait]
impl ClientFactory for MockFactory {
    async fn client_for_org(&self, org: &str) -> Result<Arc<dyn Api>> {
        match self.orgs.get(org) {
            Some(api) => Ok(Arc::clone(api) as Arc<dyn Api>),
            None => anyhow::bail!("GitHub App is not installed on organization: {}", org),
        }
    }
}

pub fn decode(content: &Value) -> String {
    let bytes = STANDARD
        .decode(content.as_str().unwrap_or_default())
        .unwrap();
    String::from_utf8(bytes).unwrap()
}
