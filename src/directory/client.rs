use async_trait::async_trait;

/// Ordered phone numbers of one team, as found in the directory row
pub type Recipients = Vec<String>;

/// One directory row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRow {
    pub team: String,
    pub recipients: Recipients,
}

impl TeamRow {
    pub fn new(team: impl Into<String>, recipients: Recipients) -> Self {
        Self {
            team: team.into(),
            recipients,
        }
    }
}

/// Every row returned by a single directory read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorySnapshot {
    pub rows: Vec<TeamRow>,
}

impl DirectorySnapshot {
    pub fn new(rows: Vec<TeamRow>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Recipients of `team`, matched exactly (case-sensitive)
    pub fn get(&self, team: &str) -> Option<&Recipients> {
        self.rows
            .iter()
            .find(|row| row.team == team)
            .map(|row| &row.recipients)
    }
}

/// Source of the team directory.
///
/// Implementations do no caching: every call is a full read of the backend.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn fetch_all(&self) -> Result<DirectorySnapshot, DirectoryError>;
}

/// Directory read failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum DirectoryError {
    /// Could not establish a session (credentials, token exchange)
    #[error("Unable to establish Sheets client: {0}")]
    Connect(String),

    /// Session established but the read itself failed
    #[error("Cannot read Sheet: {0}")]
    Fetch(String),

    /// The read succeeded but returned no usable rows
    #[error("Sheet appears to be empty")]
    EmptySnapshot,
}
