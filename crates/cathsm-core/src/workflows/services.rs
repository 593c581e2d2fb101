use super::manager::StageSettings;
use crate::core::http::endpoints::EndpointSet;
use crate::core::http::{ApiClient, ApiResponse, ClientError, Transport};
use crate::engine::job::{JobProtocol, StatusVocabulary};
use phf::phf_map;
use serde_json::{Map, Value};
use tracing::debug;

const RESULTS_ACTION: &str = "results";
const TRUNCATE_AT: usize = 100;

static SELECT_TEMPLATE_ENDPOINTS: phf::Map<&'static str, &'static str> = phf_map! {
    "auth" => "/api/api-token-auth/",
    "submit" => "/api/select-template/",
    "status" => "/api/select-template/{task_id}/",
    "results" => "/api/select-template/{task_id}/results",
    "resolved_hits" => "/api/select-template/{task_id}/resolved_hits",
    "hit_alignments" => "/api/select-template/hit/{hit_id}/alignments",
};

static HOMOLOGY_MODEL_ENDPOINTS: phf::Map<&'static str, &'static str> = phf_map! {
    "auth" => "/api-token-auth/",
    "submit" => "/alignment/",
    "status" => "/alignment/{project_id}/status/",
    "results" => "/alignment/{project_id}/",
};

/// Static description of one remote service.
#[derive(Debug)]
pub struct ServiceProfile {
    /// Config section holding this service's persisted token.
    pub section: &'static str,
    pub default_base_url: &'static str,
    pub auth_scheme: &'static str,
    /// Prefix of the credential environment variables when both services run in one process.
    pub env_prefix: &'static str,
    pub id_key: &'static str,
    pub placeholder: &'static str,
    pub success: &'static [&'static str],
    pub failure: &'static [&'static str],
    endpoints: &'static phf::Map<&'static str, &'static str>,
}

/// CATH template selection.
pub static SELECT_TEMPLATE: ServiceProfile = ServiceProfile {
    section: "select-template",
    default_base_url: "http://localhost:8000",
    auth_scheme: "Token",
    env_prefix: "TEMPLATE_",
    id_key: "uuid",
    placeholder: "task_id",
    success: &["SUCCESS"],
    failure: &["ERROR"],
    endpoints: &SELECT_TEMPLATE_ENDPOINTS,
};

/// SWISS-MODEL homology modelling from an alignment.
pub static HOMOLOGY_MODEL: ServiceProfile = ServiceProfile {
    section: "homology-model",
    default_base_url: "https://beta.swissmodel.expasy.org",
    auth_scheme: "token",
    env_prefix: "MODEL_",
    id_key: "project_id",
    placeholder: "project_id",
    success: &["COMPLETED"],
    failure: &["FAILED"],
    endpoints: &HOMOLOGY_MODEL_ENDPOINTS,
};

impl ServiceProfile {
    pub fn endpoint(&self, name: &str) -> Option<&'static str> {
        self.endpoints.get(name).copied()
    }

    pub fn endpoint_set(&self) -> Result<EndpointSet, ClientError> {
        let mut set = EndpointSet::new();
        for (name, template) in self.endpoints.entries() {
            set.register(name, template)?;
        }
        Ok(set)
    }

    pub fn protocol(&self) -> JobProtocol {
        JobProtocol::new(
            self.id_key,
            self.placeholder,
            StatusVocabulary::new(self.success, self.failure),
        )
    }

    /// Builds a client for this service from per-stage settings.
    pub fn client<T: Transport>(
        &self,
        settings: &StageSettings,
        transport: T,
    ) -> Result<ApiClient<T>, ClientError> {
        Ok(
            ApiClient::with_transport(&settings.base_url, self.endpoint_set()?, transport)
                .with_auth_scheme(&settings.auth_scheme)
                .with_hook(RESULTS_ACTION, Box::new(log_truncated_results)),
        )
    }
}

/// Logs a results document at `debug` with long string values cut short.
fn log_truncated_results(response: ApiResponse) -> Result<ApiResponse, ClientError> {
    if let Some(Value::Object(map)) = &response.json {
        let document = truncated_document(map);
        debug!("result: {}", document);
    }
    Ok(response)
}

fn truncated_document(map: &Map<String, Value>) -> Value {
    Value::Object(
        map.iter()
            .map(|(key, value)| (key.clone(), truncate(value)))
            .collect(),
    )
}

fn truncate(value: &Value) -> Value {
    match value {
        Value::String(text) if text.chars().count() > TRUNCATE_AT => {
            let head: String = text.chars().take(TRUNCATE_AT).collect();
            Value::String(format!("{head}..."))
        }
        other => other.clone(),
    }
}
