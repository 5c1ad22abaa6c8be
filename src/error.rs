use crate::schedule::CronParseError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Status update conflict for '{name}' in namespace '{namespace}'")]
    Conflict { name: String, namespace: String },

    #[error("Cron error: {0}")]
    Cron(#[from] CronParseError),

    #[error("Backup trigger submission failed: {0}")]
    TriggerSubmission(String),

    #[error("Schedule '{0}' has no upcoming fire time")]
    NoUpcomingFire(String),

    #[error("Missing object key: {0}")]
    MissingObjectKey(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn reason(&self) -> &str {
        match self {
            Error::Kube(_) => "KubernetesError",
            Error::Serialization(_) => "SerializationError",
            Error::Conflict { .. } => "Conflict",
            Error::Cron(_) => "InvalidSchedule",
            Error::TriggerSubmission(_) => "TriggerSubmissionFailed",
            Error::NoUpcomingFire(_) => "NoUpcomingFire",
            Error::MissingObjectKey(_) => "MissingObjectKey",
        }
    }

    /// Store-side failures that a fresh read and a later tick can recover from.
    pub fn is_transient_store(&self) -> bool {
        matches!(
            self,
            Error::Kube(_) | Error::Conflict { .. } | Error::Serialization(_)
        )
    }
}
