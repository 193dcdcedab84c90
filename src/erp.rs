//! ErpClient - read-only access to the ERPNext attendance backend.
//!
//! Used to check the kiosk's API credentials and to look up the employee
//! roster that enrollment picks from. Requests authenticate with
//! `Authorization: token <key>:<secret>`.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::Config;
use crate::recognition::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};

const LOGGED_USER_PATH: &str = "api/method/frappe.auth.get_logged_user";
const EMPLOYEE_PATH: &str = "api/resource/Employee";
const EMPLOYEE_FIELDS: &str = r#"["name","employee_name"]"#;

/// One row of the employee roster.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Employee {
    /// Employee id (the document name, e.g. `HR-EMP-00001`)
    #[serde(rename = "name")]
    pub id: String,
    #[serde(default)]
    pub employee_name: Option<String>,
}

impl Employee {
    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.employee_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.id)
    }
}

#[derive(Debug, Deserialize)]
struct MethodResponse {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResourceList<T> {
    data: Vec<T>,
}

/// Client for the ERPNext REST API.
#[derive(Debug)]
pub struct ErpClient {
    base_url: String,
    authorization: String,
    http_client: reqwest::Client,
}

impl ErpClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: &str,
        api_secret: &str,
    ) -> Result<Self, ErpError> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ErpError::InvalidBaseUrl(base_url));
        }
        if api_key.trim().is_empty() || api_secret.trim().is_empty() {
            return Err(ErpError::MissingCredentials);
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url,
            authorization: format!("token {}:{}", api_key.trim(), api_secret.trim()),
            http_client,
        })
    }

    /// Build a client from `[session]`, if the backend is configured.
    pub fn from_config(config: &Config) -> Option<Result<Self, ErpError>> {
        let session = &config.session;
        let url = session.erp_url.as_deref()?;
        let key = session.api_key.as_deref().unwrap_or_default();
        let secret = session.api_secret.as_deref().unwrap_or_default();
        Some(Self::new(url, key, secret))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ErpError> {
        let response = self
            .http_client
            .get(self.url(path))
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ErpError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ErpError::Protocol(e.to_string()))
    }

    /// Check the credentials; returns the user they belong to.
    pub async fn logged_user(&self) -> Result<String, ErpError> {
        let body: MethodResponse = self.get(LOGGED_USER_PATH, &[]).await?;
        log::info!("ERP credentials valid for {}", body.message);
        Ok(body.message)
    }

    /// Fetch the employee roster.
    pub async fn employees(&self) -> Result<Vec<Employee>, ErpError> {
        let list: ResourceList<Employee> = self
            .get(
                EMPLOYEE_PATH,
                &[("fields", EMPLOYEE_FIELDS), ("limit_page_length", "0")],
            )
            .await?;
        log::debug!("Fetched {} employees", list.data.len());
        Ok(list.data)
    }

    /// Look up one employee by id.
    pub async fn find_employee(&self, id: &str) -> Result<Employee, ErpError> {
        self.employees()
            .await?
            .into_iter()
            .find(|e| e.id == id)
            .ok_or_else(|| ErpError::UnknownEmployee(id.to_string()))
    }
}

/// Errors that can occur while talking to the ERP backend.
#[derive(Debug, thiserror::Error)]
pub enum ErpError {
    #[error("Invalid ERP URL: {0}")]
    InvalidBaseUrl(String),

    #[error("ERP API key and secret are required ([session] api_key, api_secret)")]
    MissingCredentials,

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Request failed with status code {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    Protocol(String),

    #[error("Employee '{0}' not found")]
    UnknownEmployee(String),
}

impl ErpError {
    /// The backend refused the credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ErpError::Status { status: 401 | 403, .. })
    }
}
