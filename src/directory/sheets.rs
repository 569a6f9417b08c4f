//! Google Sheets backed directory
//!
//! Each fetch opens a fresh session: the service account key is read from
//! disk, a signed JWT is exchanged for an access token, and the fixed range
//! is read with that token. No session is reused between fetches.

use std::path::PathBuf;

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use super::client::{DirectoryClient, DirectoryError, DirectorySnapshot, TeamRow};

/// Rows read from the sheet: header excluded, team plus three number columns
pub const READ_RANGE: &str = "A2:D";

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Fields of a service account JSON key file used for the token exchange
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: i64,
    iat: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    /// Absent when the range holds no data
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Directory client reading one range of one spreadsheet
#[derive(Debug, Clone)]
pub struct SheetsDirectory {
    http: reqwest::Client,
    spreadsheet_id: String,
    credentials_path: PathBuf,
    range: String,
    base_url: String,
}

impl SheetsDirectory {
    pub fn new(
        http: reqwest::Client,
        spreadsheet_id: impl Into<String>,
        credentials_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            http,
            spreadsheet_id: spreadsheet_id.into(),
            credentials_path: credentials_path.into(),
            range: READ_RANGE.to_string(),
            base_url: SHEETS_BASE_URL.to_string(),
        }
    }

    /// Point at another Sheets API host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = range.into();
        self
    }

    /// Establish a session and return its access token
    async fn connect(&self) -> Result<String, DirectoryError> {
        let raw = tokio::fs::read_to_string(&self.credentials_path)
            .await
            .map_err(|e| {
                DirectoryError::Connect(format!(
                    "cannot read credentials {}: {}",
                    self.credentials_path.display(),
                    e
                ))
            })?;
        let key: ServiceAccountKey = serde_json::from_str(&raw)
            .map_err(|e| DirectoryError::Connect(format!("invalid credentials file: {}", e)))?;

        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &key.client_email,
            scope: SHEETS_SCOPE,
            aud: &key.token_uri,
            exp: now + 3600,
            iat: now,
        };
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| DirectoryError::Connect(format!("invalid private key: {}", e)))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .map_err(|e| DirectoryError::Connect(format!("failed to sign JWT: {}", e)))?;

        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ];
        let response = self
            .http
            .post(&key.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| DirectoryError::Connect(format!("token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Connect(format!(
                "token exchange returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| DirectoryError::Connect(format!("invalid token response: {}", e)))?;
        Ok(token.access_token)
    }

    async fn read(&self, access_token: &str) -> Result<DirectorySnapshot, DirectoryError> {
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url, self.spreadsheet_id, self.range
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| DirectoryError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Fetch(format!("{} - {}", status, body)));
        }

        let range: ValueRange = response
            .json()
            .await
            .map_err(|e| DirectoryError::Fetch(format!("invalid response body: {}", e)))?;

        Ok(parse_rows(range.values))
    }
}

#[async_trait]
impl DirectoryClient for SheetsDirectory {
    async fn fetch_all(&self) -> Result<DirectorySnapshot, DirectoryError> {
        let token = self.connect().await?;
        let snapshot = self.read(&token).await?;
        if snapshot.is_empty() {
            return Err(DirectoryError::EmptySnapshot);
        }
        tracing::debug!(
            spreadsheet_id = %self.spreadsheet_id,
            rows = snapshot.len(),
            "Read directory from Sheet"
        );
        Ok(snapshot)
    }
}

/// Turn raw sheet rows into a snapshot.
///
/// Rows with an empty team cell are skipped. Number cells may hold several
/// comma-separated numbers.
fn parse_rows(values: Vec<Vec<serde_json::Value>>) -> DirectorySnapshot {
    let rows = values
        .into_iter()
        .filter_map(|row| {
            let mut cells = row.into_iter().map(cell_text);
            let team = cells.next()?;
            if team.is_empty() {
                return None;
            }
            let recipients = cells
                .flat_map(|cell| {
                    cell.split(',')
                        .map(|n| n.trim().to_string())
                        .filter(|n| !n.is_empty())
                        .collect::<Vec<_>>()
                })
                .collect();
            Some(TeamRow { team, recipients })
        })
        .collect();

    DirectorySnapshot::new(rows)
}

fn cell_text(cell: serde_json::Value) -> String {
    match cell {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_KEY: &str = include_str!("../../tests/fixtures/service_account_key.pem");

    fn write_key(token_uri: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let key = json!({
            "type": "service_account",
            "client_email": "alerts@project.iam.gserviceaccount.com",
            "private_key": TEST_KEY,
            "token_uri": token_uri,
        });
        file.write_all(key.to_string().as_bytes()).unwrap();
        file
    }

    async fn mock_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=urn"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "ya29.test", "expires_in": 3599})),
            )
            .mount(server)
            .await;
    }

    fn client(server: &MockServer, key: &tempfile::NamedTempFile) -> SheetsDirectory {
        SheetsDirectory::new(reqwest::Client::new(), "sheet-id", key.path())
            .with_base_url(server.uri())
    }

    #[test]
    fn test_parse_rows() {
        let snapshot = parse_rows(vec![
            vec![json!("red"), json!("+33611111111")],
            vec![json!("infra"), json!("+33333333333,+33666666666"), json!(33700000000u64)],
            vec![json!(""), json!("+33688888888")],
            vec![json!("quiet")],
            vec![],
        ]);

        assert_eq!(
            snapshot.rows,
            vec![
                TeamRow::new("red", vec!["+33611111111".to_string()]),
                TeamRow::new(
                    "infra",
                    vec![
                        "+33333333333".to_string(),
                        "+33666666666".to_string(),
                        "33700000000".to_string(),
                    ]
                ),
                TeamRow::new("quiet", vec![]),
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_all() {
        let server = MockServer::start().await;
        mock_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-id/values/A2:D"))
            .and(header("authorization", "Bearer ya29.test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "range": "Sheet1!A2:D3",
                "majorDimension": "ROWS",
                "values": [["red", "+33611111111"], ["infra", "+33333333333", "+33666666666"]]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let key = write_key(&format!("{}/token", server.uri()));
        let snapshot = client(&server, &key).fetch_all().await.unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(
            snapshot.get("infra"),
            Some(&vec!["+33333333333".to_string(), "+33666666666".to_string()])
        );
    }

    #[tokio::test]
    async fn test_empty_range_is_error() {
        let server = MockServer::start().await;
        mock_token(&server).await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"range": "Sheet1!A2:D", "majorDimension": "ROWS"})),
            )
            .mount(&server)
            .await;

        let key = write_key(&format!("{}/token", server.uri()));
        let err = client(&server, &key).fetch_all().await.unwrap_err();

        assert!(matches!(err, DirectoryError::EmptySnapshot));
    }

    #[tokio::test]
    async fn test_read_failure_is_fetch_error() {
        let server = MockServer::start().await;
        mock_token(&server).await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let key = write_key(&format!("{}/token", server.uri()));
        let err = client(&server, &key).fetch_all().await.unwrap_err();

        assert!(matches!(err, DirectoryError::Fetch(ref msg) if msg.contains("429")));
    }

    #[tokio::test]
    async fn test_rejected_token_is_connect_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let key = write_key(&format!("{}/token", server.uri()));
        let err = client(&server, &key).fetch_all().await.unwrap_err();

        assert!(matches!(err, DirectoryError::Connect(_)));
    }

    #[tokio::test]
    async fn test_missing_credentials_is_connect_error() {
        let directory = SheetsDirectory::new(
            reqwest::Client::new(),
            "sheet-id",
            "/nonexistent/credentials.json",
        );

        let err = directory.fetch_all().await.unwrap_err();

        assert!(matches!(err, DirectoryError::Connect(ref msg) if msg.contains("/nonexistent")));
    }
}
