//! Snowflake session over its REST endpoints.
//!
//! A session is a login token obtained from `/session/v1/login-request`,
//! statements go to `/queries/v1/query-request`, and closing deletes the
//! session. Result rows arrive as strings in `rowset` and are typed using
//! the accompanying `rowtype` metadata. Only results returned inline are
//! supported; a query that is still running or that spills into remote
//! chunks is an error rather than a partial result.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Number, Value};
use tracing::debug;
use uuid::Uuid;

use vidsage_core::config::WarehouseConfig;
use vidsage_core::{QueryResult, Row};

use crate::warehouse::{Warehouse, WarehouseError, WarehouseSession};

const CLIENT_APP_ID: &str = "vidsage";

/// Envelope codes for a statement that has not finished executing.
const QUERY_IN_PROGRESS_CODES: &[&str] = &["333333", "333334"];

/// `TIMESTAMP_TZ` cells carry their UTC offset in minutes, shifted by this.
const TIMEZONE_OFFSET_BIAS: i64 = 1440;

#[derive(Clone, Debug)]
pub struct SnowflakeSettings {
    pub account: String,
    pub user: String,
    pub password: SecretString,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    pub role: Option<String>,
    /// Overrides `https://<account>.snowflakecomputing.com`.
    pub base_url: Option<String>,
}

impl SnowflakeSettings {
    pub fn from_config(config: &WarehouseConfig) -> Result<Self, WarehouseError> {
        fn required(key: &str, value: Option<&String>) -> Result<String, WarehouseError> {
            value.filter(|value| !value.trim().is_empty()).cloned().ok_or_else(|| {
                WarehouseError::Configuration(format!("{key} is required for snowflake"))
            })
        }

        let password = config.password.clone().ok_or_else(|| {
            WarehouseError::Configuration("warehouse.password is required for snowflake".into())
        })?;

        Ok(Self {
            account: required("warehouse.account", config.account.as_ref())?,
            user: required("warehouse.user", config.user.as_ref())?,
            password,
            warehouse: required("warehouse.warehouse", config.warehouse.as_ref())?,
            database: required("warehouse.database", config.database.as_ref())?,
            schema: required("warehouse.schema", config.schema.as_ref())?,
            role: config.role.clone(),
            base_url: None,
        })
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}.snowflakecomputing.com", self.account))
    }

    /// Account locator without region or cloud suffix.
    fn account_name(&self) -> &str {
        self.account.split('.').next().unwrap_or(&self.account)
    }
}

#[derive(Clone, Debug)]
pub struct SnowflakeWarehouse {
    client: Client,
    settings: SnowflakeSettings,
}

impl SnowflakeWarehouse {
    pub fn new(settings: SnowflakeSettings) -> Self {
        Self { client: Client::new(), settings }
    }
}

#[async_trait]
impl Warehouse for SnowflakeWarehouse {
    fn provider(&self) -> &'static str {
        "snowflake"
    }

    async fn open(&self) -> Result<Box<dyn WarehouseSession>, WarehouseError> {
        let settings = &self.settings;
        let base_url = settings.base_url();

        let mut params = vec![
            ("request_id", Uuid::new_v4().to_string()),
            ("warehouse", settings.warehouse.clone()),
            ("databaseName", settings.database.clone()),
            ("schemaName", settings.schema.clone()),
        ];
        if let Some(role) = &settings.role {
            params.push(("roleName", role.clone()));
        }

        let body = json!({
            "data": {
                "CLIENT_APP_ID": CLIENT_APP_ID,
                "CLIENT_APP_VERSION": env!("CARGO_PKG_VERSION"),
                "ACCOUNT_NAME": settings.account_name(),
                "LOGIN_NAME": settings.user,
                "PASSWORD": settings.password.expose_secret(),
            }
        });

        let response = self
            .client
            .post(format!("{base_url}/session/v1/login-request"))
            .query(&params)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WarehouseError::Rejected(format!(
                "login request failed with status {}",
                response.status()
            )));
        }

        let envelope: Envelope<LoginData> = response.json().await?;
        let token = envelope.into_data("login")?.token;
        debug!(
            event_name = "warehouse.snowflake.session_opened",
            account = %settings.account,
            "snowflake session opened"
        );

        Ok(Box::new(SnowflakeSession {
            client: self.client.clone(),
            base_url,
            token: token.into(),
            sequence_id: 0,
        }))
    }
}

struct SnowflakeSession {
    client: Client,
    base_url: String,
    token: SecretString,
    sequence_id: u64,
}

impl SnowflakeSession {
    fn authorization(&self) -> String {
        format!("Snowflake Token=\"{}\"", self.token.expose_secret())
    }
}

#[async_trait]
impl WarehouseSession for SnowflakeSession {
    async fn query(&mut self, statement: &str) -> Result<QueryResult, WarehouseError> {
        self.sequence_id += 1;
        let body = json!({
            "sqlText": statement,
            "asyncExec": false,
            "sequenceId": self.sequence_id,
            "querySubmissionTime": Utc::now().timestamp_millis(),
        });

        let response = self
            .client
            .post(format!("{}/queries/v1/query-request", self.base_url))
            .query(&[("requestId", Uuid::new_v4().to_string())])
            .header("Accept", "application/snowflake")
            .header("Authorization", self.authorization())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WarehouseError::Rejected(format!(
                "query request failed with status {}",
                response.status()
            )));
        }

        let envelope: Envelope<QueryData> = response.json().await?;
        query_result(envelope)
    }

    async fn close(self: Box<Self>) -> Result<(), WarehouseError> {
        let request_id = Uuid::new_v4().to_string();
        let response = self
            .client
            .post(format!("{}/session", self.base_url))
            .query(&[("delete", "true"), ("request_id", request_id.as_str())])
            .header("Accept", "application/json")
            .header("Authorization", self.authorization())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WarehouseError::Rejected(format!(
                "session delete failed with status {}",
                response.status()
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self, operation: &str) -> Result<T, WarehouseError> {
        if !self.success {
            return Err(WarehouseError::Rejected(format!(
                "{operation} failed (code {}): {}",
                self.code.as_deref().unwrap_or("unknown"),
                self.message.as_deref().unwrap_or("no message")
            )));
        }

        self.data
            .ok_or_else(|| WarehouseError::Decode(format!("{operation} response has no data")))
    }
}

#[derive(Debug, Deserialize)]
struct LoginData {
    token: String,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    rowtype: Vec<RowType>,
    #[serde(default)]
    rowset: Vec<Vec<Option<String>>>,
    #[serde(default)]
    chunks: Option<Vec<Value>>,
}

#[derive(Clone, Debug, Deserialize)]
struct RowType {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    scale: Option<i64>,
}

fn query_result(envelope: Envelope<QueryData>) -> Result<QueryResult, WarehouseError> {
    if let Some(code) =
        envelope.code.as_deref().filter(|code| QUERY_IN_PROGRESS_CODES.contains(code))
    {
        return Err(WarehouseError::Rejected(format!(
            "query is still running (code {code}); asynchronous results are not fetched"
        )));
    }

    let data = envelope.into_data("query")?;
    if let Some(chunks) = data.chunks.as_ref().filter(|chunks| !chunks.is_empty()) {
        return Err(WarehouseError::Decode(format!(
            "result spans {} remote chunks beyond {} inline rows; chunked results are not fetched",
            chunks.len(),
            data.rowset.len()
        )));
    }

    decode_rowset(&data.rowtype, data.rowset)
}

fn decode_rowset(
    rowtype: &[RowType],
    rowset: Vec<Vec<Option<String>>>,
) -> Result<QueryResult, WarehouseError> {
    let mut rows = Vec::with_capacity(rowset.len());

    for (row_index, cells) in rowset.into_iter().enumerate() {
        if cells.len() != rowtype.len() {
            return Err(WarehouseError::Decode(format!(
                "row {row_index} has {} cells but {} columns were described",
                cells.len(),
                rowtype.len()
            )));
        }

        let fields = rowtype
            .iter()
            .zip(cells)
            .map(|(column, cell)| (column.name.clone(), decode_cell(column, cell)))
            .collect::<Vec<_>>();
        rows.push(Row::new(fields));
    }

    Ok(QueryResult::new(rows))
}

fn decode_cell(column: &RowType, cell: Option<String>) -> Value {
    let Some(text) = cell else {
        return Value::Null;
    };

    match column.kind.to_ascii_lowercase().as_str() {
        "fixed" if column.scale.unwrap_or(0) == 0 => {
            text.parse::<i64>().map(Value::from).unwrap_or(Value::String(text))
        }
        "fixed" | "real" => text
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::String(text)),
        "boolean" => match text.as_str() {
            "1" | "true" | "TRUE" => Value::Bool(true),
            "0" | "false" | "FALSE" => Value::Bool(false),
            _ => Value::String(text),
        },
        "variant" | "object" | "array" => {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        }
        "date" => decode_date(&text).map(Value::String).unwrap_or(Value::String(text)),
        "timestamp_ntz" => decode_timestamp(&text)
            .map(|at| Value::String(at.naive_utc().format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            .unwrap_or(Value::String(text)),
        "timestamp_ltz" => decode_timestamp(&text)
            .map(|at| Value::String(at.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
            .unwrap_or(Value::String(text)),
        "timestamp_tz" => decode_timestamp_tz(&text).map(Value::String).unwrap_or(Value::String(text)),
        _ => Value::String(text),
    }
}

/// Days since the Unix epoch, rendered as `YYYY-MM-DD`.
fn decode_date(text: &str) -> Option<String> {
    let days = text.trim().parse::<i64>().ok()?;
    let at = DateTime::from_timestamp(days.checked_mul(86_400)?, 0)?;
    Some(at.date_naive().format("%Y-%m-%d").to_string())
}

/// Epoch seconds with an optional fraction of up to nine digits.
fn decode_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    let negative = text.starts_with('-');
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    if fraction.len() > 9 || !fraction.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }

    let mut seconds = whole.parse::<i64>().ok()?;
    let mut nanos = if fraction.is_empty() {
        0
    } else {
        format!("{fraction:0<9}").parse::<u32>().ok()?
    };
    if negative && nanos > 0 {
        seconds -= 1;
        nanos = 1_000_000_000 - nanos;
    }

    DateTime::from_timestamp(seconds, nanos)
}

/// `<epoch seconds> <offset minutes + 1440>`, rendered with its own offset.
fn decode_timestamp_tz(text: &str) -> Option<String> {
    let (instant, offset) = text.trim().split_once(' ')?;
    let offset_minutes = offset.trim().parse::<i64>().ok()? - TIMEZONE_OFFSET_BIAS;
    let offset = FixedOffset::east_opt(i32::try_from(offset_minutes * 60).ok()?)?;
    let at = decode_timestamp(instant)?.with_timezone(&offset);
    Some(at.to_rfc3339_opts(SecondsFormat::AutoSi, false))
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use serde_json::{json, Value};

    use vidsage_core::config::AppConfig;

    use super::{decode_rowset, query_result, Envelope, QueryData, SnowflakeSettings};
    use crate::warehouse::WarehouseError;

    #[test]
    fn rowset_is_typed_from_rowtype_metadata() {
        let payload = json!({
            "success": true,
            "data": {
                "rowtype": [
                    {"name": "TITLE", "type": "text"},
                    {"name": "VIEW_COUNT", "type": "fixed", "scale": 0},
                    {"name": "POSITIVE_SENTIMENT_PCT", "type": "fixed", "scale": 2},
                    {"name": "IS_FEATURED", "type": "boolean"},
                    {"name": "GUEST", "type": "text"}
                ],
                "rowset": [["deep sleep explained", "1200", "87.50", "1", null]]
            }
        });

        let envelope: Envelope<QueryData> =
            serde_json::from_value(payload).expect("payload should deserialize");
        let data = envelope.into_data("query").expect("successful envelope");
        let result = decode_rowset(&data.rowtype, data.rowset).expect("rows decode");

        let row = &result.rows()[0];
        assert_eq!(row.get("TITLE"), Some(&json!("deep sleep explained")));
        assert_eq!(row.get("VIEW_COUNT"), Some(&json!(1200)));
        assert_eq!(row.get("POSITIVE_SENTIMENT_PCT"), Some(&json!(87.5)));
        assert_eq!(row.get("IS_FEATURED"), Some(&json!(true)));
        assert_eq!(row.get("GUEST"), Some(&Value::Null));
    }

    #[test]
    fn temporal_cells_are_rendered_as_iso_strings() {
        let payload = json!({
            "success": true,
            "data": {
                "rowtype": [
                    {"name": "PUBLISHED_DATE", "type": "date"},
                    {"name": "INGESTED_AT", "type": "timestamp_ntz", "scale": 9},
                    {"name": "UPDATED_AT", "type": "timestamp_ltz", "scale": 3},
                    {"name": "AIRED_AT", "type": "timestamp_tz", "scale": 0},
                    {"name": "BEFORE_EPOCH", "type": "timestamp_ntz", "scale": 1}
                ],
                "rowset": [[
                    "19875",
                    "1717245296.500000000",
                    "1717245296.000",
                    "1717245296 1560",
                    "-1.5"
                ]]
            }
        });

        let envelope: Envelope<QueryData> =
            serde_json::from_value(payload).expect("payload should deserialize");
        let result = query_result(envelope).expect("rows decode");

        let row = &result.rows()[0];
        assert_eq!(row.get("PUBLISHED_DATE"), Some(&json!("2024-06-01")));
        assert_eq!(row.get("INGESTED_AT"), Some(&json!("2024-06-01T12:34:56.500")));
        assert_eq!(row.get("UPDATED_AT"), Some(&json!("2024-06-01T12:34:56Z")));
        assert_eq!(row.get("AIRED_AT"), Some(&json!("2024-06-01T14:34:56+02:00")));
        assert_eq!(row.get("BEFORE_EPOCH"), Some(&json!("1969-12-31T23:59:58.500")));
    }

    #[test]
    fn unparseable_date_keeps_raw_text() {
        let payload = json!({
            "success": true,
            "data": {
                "rowtype": [{"name": "PUBLISHED_DATE", "type": "date"}],
                "rowset": [["not-a-day"]]
            }
        });

        let envelope: Envelope<QueryData> =
            serde_json::from_value(payload).expect("payload should deserialize");
        let result = query_result(envelope).expect("rows decode");

        assert_eq!(result.rows()[0].get("PUBLISHED_DATE"), Some(&json!("not-a-day")));
    }

    #[test]
    fn running_query_is_an_error_not_an_empty_result() {
        let payload = json!({
            "success": true,
            "code": "333334",
            "message": "Asynchronous execution in progress.",
            "data": {"getResultUrl": "/queries/01b2-0000/result", "queryId": "01b2-0000"}
        });

        let envelope: Envelope<QueryData> =
            serde_json::from_value(payload).expect("payload should deserialize");
        let error = query_result(envelope).expect_err("in-progress query");

        assert!(matches!(error, WarehouseError::Rejected(ref message) if message.contains("333334")));
    }

    #[test]
    fn chunked_result_is_an_error_not_a_partial_result() {
        let payload = json!({
            "success": true,
            "data": {
                "rowtype": [{"name": "TITLE", "type": "text"}],
                "rowset": [],
                "chunks": [{"url": "https://example.invalid/chunk0", "rowCount": 500}]
            }
        });

        let envelope: Envelope<QueryData> =
            serde_json::from_value(payload).expect("payload should deserialize");
        let error = query_result(envelope).expect_err("chunked result");

        assert!(matches!(error, WarehouseError::Decode(ref message) if message.contains("1 remote chunks")));
    }

    #[test]
    fn empty_inline_result_is_empty() {
        let payload = json!({
            "success": true,
            "data": {"rowtype": [{"name": "TITLE", "type": "text"}], "rowset": []}
        });

        let envelope: Envelope<QueryData> =
            serde_json::from_value(payload).expect("payload should deserialize");

        assert!(query_result(envelope).expect("empty result").is_empty());
    }

    #[test]
    fn failed_envelope_reports_code_and_message() {
        let payload = json!({
            "success": false,
            "code": "390100",
            "message": "Incorrect username or password was specified.",
            "data": null
        });

        let envelope: Envelope<QueryData> =
            serde_json::from_value(payload).expect("payload should deserialize");
        let error = envelope.into_data("login").expect_err("unsuccessful envelope");

        assert!(matches!(error, WarehouseError::Rejected(ref message) if message.contains("390100")));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let payload = json!({
            "success": true,
            "data": {
                "rowtype": [{"name": "TITLE", "type": "text"}],
                "rowset": [["a", "b"]]
            }
        });

        let envelope: Envelope<QueryData> =
            serde_json::from_value(payload).expect("payload should deserialize");
        let data = envelope.into_data("query").expect("successful envelope");
        assert!(matches!(decode_rowset(&data.rowtype, data.rowset), Err(WarehouseError::Decode(_))));
    }

    #[test]
    fn settings_derive_account_host() {
        let mut config = AppConfig::default().warehouse;
        config.account = Some("xy12345.eu-west-1".to_string());
        config.user = Some("reader".to_string());
        config.password = Some(SecretString::from("secret".to_string()));
        config.warehouse = Some("COMPUTE_WH".to_string());
        config.database = Some("MEDIA".to_string());
        config.schema = Some("PUBLIC".to_string());

        let settings = SnowflakeSettings::from_config(&config).expect("settings");
        assert_eq!(settings.base_url(), "https://xy12345.eu-west-1.snowflakecomputing.com");
        assert_eq!(settings.account_name(), "xy12345");
    }
}
