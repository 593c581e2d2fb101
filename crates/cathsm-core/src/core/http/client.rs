use super::endpoints::EndpointSet;
use super::error::ClientError;
use super::response::ApiResponse;
use super::transport::{HttpTransport, Request, Transport};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, trace};

pub type Fields = BTreeMap<String, String>;

/// Callback applied to every response of one action before it is classified.
pub type ResponseHook = Box<dyn Fn(ApiResponse) -> Result<ApiResponse, ClientError> + Send + Sync>;

const AUTH_ACTION: &str = "auth";
const AUTHORIZATION: &str = "Authorization";
const DEFAULT_AUTH_SCHEME: &str = "token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// Flattens a serializable record into string fields, dropping absent (`null`) values.
pub fn fields_from<T: Serialize + ?Sized>(record: &T) -> Result<Fields, ClientError> {
    let value = serde_json::to_value(record).map_err(|e| ClientError::Payload(e.to_string()))?;
    let map = match value {
        Value::Object(map) => map,
        other => {
            return Err(ClientError::Payload(format!(
                "expected a record, got {other}"
            )));
        }
    };

    Ok(map
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((key, s)),
            other => Some((key, other.to_string())),
        })
        .collect())
}

pub struct ApiClient<T: Transport = HttpTransport> {
    base_url: String,
    endpoints: EndpointSet,
    auth_scheme: String,
    auth_header: Option<String>,
    hooks: HashMap<String, ResponseHook>,
    transport: T,
}

impl<T: Transport> fmt::Debug for ApiClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("endpoints", &self.endpoints)
            .field("auth_scheme", &self.auth_scheme)
            .field("authenticated", &self.auth_header.is_some())
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ApiClient<HttpTransport> {
    pub fn new(base_url: &str, endpoints: EndpointSet) -> Result<Self, ClientError> {
        Ok(Self::with_transport(base_url, endpoints, HttpTransport::new()?))
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(base_url: &str, endpoints: EndpointSet, transport: T) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            endpoints,
            auth_scheme: DEFAULT_AUTH_SCHEME.to_string(),
            auth_header: None,
            hooks: HashMap::new(),
            transport,
        }
    }

    /// Sets the literal placed before the token in the `Authorization` header.
    pub fn with_auth_scheme(mut self, scheme: &str) -> Self {
        self.auth_scheme = scheme.to_string();
        self
    }

    pub fn with_hook(mut self, action: &str, hook: ResponseHook) -> Self {
        self.hooks.insert(action.to_string(), hook);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoints(&self) -> &EndpointSet {
        &self.endpoints
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn auth_header(&self) -> Option<&str> {
        self.auth_header.as_deref()
    }

    pub fn register_endpoint(&mut self, name: &str, template: &str) -> Result<(), ClientError> {
        self.endpoints.register(name, template)
    }

    pub fn build_url(&self, name: &str, fields: &Fields) -> Result<String, ClientError> {
        let path = self.endpoints.render(name, fields)?;
        Ok(format!("{}{}", self.base_url, path))
    }

    pub fn set_token(&mut self, token: &str) {
        trace!("Using authorization token {}", token);
        self.auth_header = Some(format!("{} {}", self.auth_scheme, token));
    }

    pub fn clear_token(&mut self) {
        self.auth_header = None;
    }

    /// Sends one request for `action`.
    ///
    /// A `body` is flattened into form fields. Without explicit `fields`, those flattened
    /// body fields also fill the URL placeholders. `headers`, when given, replace the
    /// client's own headers (including `Authorization`) for this call only.
    pub fn send<B: Serialize + ?Sized>(
        &self,
        action: &str,
        method: Method,
        fields: Option<&Fields>,
        body: Option<&B>,
        headers: Option<&[(String, String)]>,
    ) -> Result<ApiResponse, ClientError> {
        let form = body.map(fields_from).transpose()?;
        let empty = Fields::new();
        let replacements = fields.or(form.as_ref()).unwrap_or(&empty);
        let url = self.build_url(action, replacements)?;

        let headers = match headers {
            Some(overrides) => overrides.to_vec(),
            None => self
                .auth_header
                .iter()
                .map(|value| (AUTHORIZATION.to_string(), value.clone()))
                .collect(),
        };

        debug!("{} {:50}", method, url);
        let request = Request {
            method,
            url,
            headers,
            form: match method {
                Method::Post => form.map(|f| f.into_iter().collect()),
                Method::Get => None,
            },
        };

        let raw = self.transport.execute(&request)?;
        let response = ApiResponse::from_raw(action, raw);
        trace!("Response [{}]: {}", response.status, response.body);

        match self.hooks.get(action) {
            Some(hook) => hook(response),
            None => Ok(response),
        }
    }

    pub fn get(&self, action: &str, fields: &Fields) -> Result<ApiResponse, ClientError> {
        self.send::<Fields>(action, Method::Get, Some(fields), None, None)
    }

    /// Exchanges a username and password for a token and installs it for later calls.
    pub fn authenticate(&mut self, user: &str, password: &str) -> Result<String, ClientError> {
        let mut credentials = Fields::new();
        credentials.insert("username".to_string(), user.to_string());
        credentials.insert("password".to_string(), password.to_string());
        debug!("Authenticating as '{}'", user);

        let accept = [("accept".to_string(), "application/json".to_string())];
        let response = self.send(
            AUTH_ACTION,
            Method::Post,
            Some(&Fields::new()),
            Some(&credentials),
            Some(accept.as_slice()),
        )?;

        if response.mentions_invalid_token() {
            return Err(ClientError::InvalidToken(response.body));
        }

        // Any status without a token is a failed login.
        let token = response
            .json
            .as_ref()
            .and_then(|json| json.get("token"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ClientError::Authentication(format!(
                    "failed to get token from response: {}",
                    response.body
                ))
            })?;

        self.set_token(&token);
        Ok(token)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::core::http::transport::RawResponse;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses in order and records every request.
    #[derive(Default)]
    pub struct ScriptedTransport {
        responses: Mutex<VecDeque<RawResponse>>,
        requests: Mutex<Vec<Request>>,
    }

    impl ScriptedTransport {
        pub fn new(responses: impl IntoIterator<Item = RawResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn push(&self, response: RawResponse) {
            self.responses.lock().unwrap().push_back(response);
        }

        pub fn requests(&self) -> Vec<Request> {
            self.requests.lock().unwrap().clone()
        }

        pub fn urls(&self) -> Vec<String> {
            self.requests().into_iter().map(|r| r.url).collect()
        }
    }

    impl Transport for ScriptedTransport {
        fn execute(&self, request: &Request) -> Result<RawResponse, ClientError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ClientError::InvalidResponse {
                    action: request.url.clone(),
                    reason: "no scripted response left".to_string(),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedTransport;
    use super::*;
    use crate::core::http::transport::RawResponse;
    use serde::Serialize;

    fn alignment_endpoints() -> EndpointSet {
        EndpointSet::new()
            .with("auth", "/api-token-auth/")
            .unwrap()
            .with("submit", "/alignment/")
            .unwrap()
            .with("status", "/alignment/{project_id}/status/")
            .unwrap()
    }

    fn client(responses: Vec<RawResponse>) -> ApiClient<ScriptedTransport> {
        ApiClient::with_transport(
            "https://host/",
            alignment_endpoints(),
            ScriptedTransport::new(responses),
        )
    }

    fn project(id: &str) -> Fields {
        Fields::from([("project_id".to_string(), id.to_string())])
    }

    #[derive(Serialize)]
    struct Body {
        name: String,
        offset: u32,
        optional: Option<String>,
    }

    #[test]
    fn build_url_joins_base_and_template() {
        let client = client(vec![]);

        let url = client.build_url("status", &project("foo")).unwrap();

        assert_eq!(url, "https://host/alignment/foo/status/");
    }

    #[test]
    fn build_url_fails_for_unknown_action() {
        let client = client(vec![]);

        assert!(matches!(
            client.build_url("nope", &Fields::new()),
            Err(ClientError::UnknownAction(_))
        ));
    }

    #[test]
    fn register_endpoint_extends_the_set_once() {
        let mut client = client(vec![]);

        client
            .register_endpoint("results", "/alignment/{project_id}/")
            .unwrap();

        assert!(client.endpoints().contains("results"));
        assert!(matches!(
            client.register_endpoint("results", "/x/"),
            Err(ClientError::DuplicateEndpoint(_))
        ));
    }

    #[test]
    fn fields_from_omits_absent_optionals_and_stringifies_numbers() {
        let fields = fields_from(&Body {
            name: "abc".to_string(),
            offset: 12,
            optional: None,
        })
        .unwrap();

        assert_eq!(fields.len(), 2);
        assert_eq!(fields["name"], "abc");
        assert_eq!(fields["offset"], "12");
    }

    #[test]
    fn fields_from_rejects_non_records() {
        assert!(matches!(fields_from(&vec![1, 2]), Err(ClientError::Payload(_))));
    }

    #[test]
    fn authenticate_stores_token_for_subsequent_calls() {
        let mut client = client(vec![
            RawResponse::json(200, r#"{"token": "abc"}"#),
            RawResponse::json(200, r#"{"status": "RUNNING"}"#),
        ]);

        let token = client.authenticate("user", "secret").unwrap();
        client.get("status", &project("p1")).unwrap();

        assert_eq!(token, "abc");
        let requests = client.transport().requests();
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].header("Authorization"), None);
        assert_eq!(requests[0].header("accept"), Some("application/json"));
        let form = requests[0].form.clone().unwrap();
        assert!(form.contains(&("username".to_string(), "user".to_string())));
        assert!(form.contains(&("password".to_string(), "secret".to_string())));
        assert_eq!(requests[1].header("Authorization"), Some("token abc"));
    }

    #[test]
    fn authenticate_uses_configured_scheme() {
        let mut client = client(vec![RawResponse::json(200, r#"{"token": "abc"}"#)])
            .with_auth_scheme("Token");

        client.authenticate("user", "secret").unwrap();

        assert_eq!(client.auth_header(), Some("Token abc"));
    }

    #[test]
    fn authenticate_rejects_unauthorized() {
        let mut client = client(vec![RawResponse::json(
            401,
            r#"{"detail": "Unable to log in with provided credentials."}"#,
        )]);

        let result = client.authenticate("user", "wrong");

        assert!(matches!(result, Err(ClientError::Authentication(_))));
        assert!(client.auth_header().is_none());
    }

    #[test]
    fn authenticate_treats_bad_request_without_token_as_auth_failure() {
        let mut client = client(vec![RawResponse::json(
            400,
            r#"{"non_field_errors": ["Unable to log in with provided credentials."]}"#,
        )]);

        let result = client.authenticate("user", "wrong");

        assert!(matches!(
            result,
            Err(ClientError::Authentication(msg)) if msg.contains("non_field_errors")
        ));
        assert!(client.auth_header().is_none());
    }

    #[test]
    fn authenticate_distinguishes_invalid_token() {
        let mut client = client(vec![RawResponse::json(401, r#"{"detail": "Invalid token."}"#)]);

        assert!(matches!(
            client.authenticate("user", "pass"),
            Err(ClientError::InvalidToken(_))
        ));
    }

    #[test]
    fn authenticate_requires_token_field() {
        let mut client = client(vec![RawResponse::json(200, r#"{"detail": "ok"}"#)]);

        assert!(matches!(
            client.authenticate("user", "pass"),
            Err(ClientError::Authentication(msg)) if msg.contains("failed to get token")
        ));
    }

    #[test]
    fn set_token_installs_header_without_network() {
        let mut client = client(vec![RawResponse::json(200, "{}")]);

        client.set_token("xyz");
        client.get("status", &project("p")).unwrap();

        assert_eq!(client.transport().requests().len(), 1);
        assert_eq!(
            client.transport().requests()[0].header("Authorization"),
            Some("token xyz")
        );
    }

    #[test]
    fn body_fields_fill_url_placeholders_when_fields_absent() {
        #[derive(Serialize)]
        struct Lookup {
            project_id: String,
        }
        let client = client(vec![RawResponse::json(200, "{}")]);

        client
            .send(
                "status",
                Method::Post,
                None,
                Some(&Lookup {
                    project_id: "from-body".to_string(),
                }),
                None,
            )
            .unwrap();

        assert_eq!(
            client.transport().urls(),
            vec!["https://host/alignment/from-body/status/".to_string()]
        );
    }

    #[test]
    fn get_requests_carry_no_form() {
        let client = client(vec![RawResponse::json(200, "{}")]);

        client
            .send(
                "submit",
                Method::Get,
                None,
                Some(&Body {
                    name: "a".to_string(),
                    offset: 1,
                    optional: None,
                }),
                None,
            )
            .unwrap();

        assert!(client.transport().requests()[0].form.is_none());
    }

    #[test]
    fn hooks_rewrite_responses_for_their_action_only() {
        let client = client(vec![
            RawResponse::json(200, r#"{"status": "running"}"#),
            RawResponse::json(201, r#"{"project_id": "p"}"#),
        ])
        .with_hook(
            "status",
            Box::new(|mut response: ApiResponse| -> Result<ApiResponse, ClientError> {
                response.status = 299;
                Ok(response)
            }),
        );

        let status = client.get("status", &project("p")).unwrap();
        let submit = client
            .send::<Fields>("submit", Method::Post, None, None, None)
            .unwrap();

        assert_eq!(status.status, 299);
        assert_eq!(submit.status, 201);
    }
}
