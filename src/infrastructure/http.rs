//! HTTP-backed stand catalog (storage API for file paths, DB API for metadata).

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::config::Settings;
use crate::domain::StandIdentity;
use crate::infrastructure::error::{InfraError, InfraResult};
use crate::infrastructure::traits::{
    ReportPaths, StandCatalog, StandInfo, UpstreamError, ValidationPaths,
};

const VALIDATION_FILETYPE: &str = "validation_data_and_boundary";
const REPORT_FILETYPE: &str = "tpa_report";

#[derive(Deserialize)]
struct FilepathResponse<T> {
    filepath: T,
}

/// Stand catalog reached over the storage and DB REST services.
#[derive(Debug, Clone)]
pub struct HttpStandCatalog {
    client: Client,
    storage_api_url: String,
    db_api_url: String,
}

impl HttpStandCatalog {
    pub fn new(settings: &Settings) -> InfraResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| InfraError::http("build HTTP client", e))?;

        Ok(Self {
            client,
            storage_api_url: settings.storage_api_url.trim_end_matches('/').to_string(),
            db_api_url: settings.db_api_url.trim_end_matches('/').to_string(),
        })
    }

    fn storage_endpoint(&self, path: &str) -> String {
        format!("{}{}", self.storage_api_url, path)
    }

    fn db_endpoint(&self, path: &str) -> String {
        format!("{}{}", self.db_api_url, path)
    }

    /// POST a JSON body; anything but 200 is a failure.
    fn post(&self, endpoint: &str, body: &Value) -> Result<String, UpstreamError> {
        debug!("POST {} {}", endpoint, body);
        let response = self
            .client
            .post(endpoint)
            .json(body)
            .send()
            .map_err(|e| UpstreamError::Transport {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().map_err(|e| UpstreamError::Transport {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;

        if status != StatusCode::OK {
            return Err(UpstreamError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    fn post_json<T: DeserializeOwned>(&self, endpoint: &str, body: &Value) -> Result<T, UpstreamError> {
        let text = self.post(endpoint, body)?;
        serde_json::from_str(&text).map_err(|e| UpstreamError::Payload {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }
}

fn filepath_request(stand: &StandIdentity, filetype: &str) -> Value {
    json!({
        "entry": {
            "CLIENT_ID": stand.client_id,
            "PROJECT_ID": stand.project_id,
            "STAND_ID": stand.stand_id,
        },
        "filetype": filetype,
    })
}

impl StandCatalog for HttpStandCatalog {
    #[instrument(skip_all, fields(stand = %stand))]
    fn validation_paths(&self, stand: &StandIdentity) -> Result<ValidationPaths, UpstreamError> {
        let endpoint = self.storage_endpoint("/filepath");
        let response: FilepathResponse<ValidationPaths> =
            self.post_json(&endpoint, &filepath_request(stand, VALIDATION_FILETYPE))?;
        Ok(response.filepath)
    }

    #[instrument(skip_all, fields(stand = %stand))]
    fn stand_info(&self, stand: &StandIdentity) -> Result<StandInfo, UpstreamError> {
        let endpoint = self.db_endpoint("/api/stand_from_ids");
        let body = json!({
            "client_id": stand.client_id,
            "project_id": stand.project_id,
            "stand_id": stand.stand_id,
        });
        let rows: Vec<StandInfo> = self.post_json(&endpoint, &body)?;
        rows.into_iter().next().ok_or_else(|| UpstreamError::Payload {
            endpoint,
            message: format!("no stand row for {}", stand),
        })
    }

    #[instrument(skip_all, fields(stand = %stand))]
    fn report_paths(&self, stand: &StandIdentity) -> Result<ReportPaths, UpstreamError> {
        let endpoint = self.storage_endpoint("/filepath");
        let response: FilepathResponse<ReportPaths> =
            self.post_json(&endpoint, &filepath_request(stand, REPORT_FILETYPE))?;
        Ok(response.filepath)
    }

    #[instrument(skip_all, fields(stand = %stand))]
    fn set_validation_tpa(&self, stand: &StandIdentity, tpa: f64) -> Result<(), UpstreamError> {
        let endpoint = self.db_endpoint("/api/set_flight_data_column_true");
        let body = json!({
            "table": "flight_files",
            "column": "VAL_TPA",
            "client_id": stand.client_id,
            "project_id": stand.project_id,
            "stand_id": stand.stand_id,
            "val": tpa,
        });
        self.post(&endpoint, &body).map(|_| ())
    }
}
