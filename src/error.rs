use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid S3 url `{0}`, it must start with s3://")]
    InvalidLocatorFormat(String),

    #[error("a cluster named {name} is already active (id {id})")]
    ClusterAlreadyExists { name: String, id: String },

    #[error("no main class found, set mainClass in the settings or use submit-job-with-main")]
    MainClassNotFound,

    #[error("malformed remote configuration: {0}")]
    MalformedRemoteConfig(String),

    #[error("remote configuration is not valid JSON")]
    RemoteConfigJson(#[from] serde_json::Error),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("failed to read settings file {}", path.display())]
    SettingsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings")]
    SettingsFormat(#[from] serde_yaml::Error),

    #[error("artifact {} cannot be uploaded: {reason}", path.display())]
    Artifact { path: PathBuf, reason: String },

    /// Any failure reported by EMR or S3, including transport errors.
    #[error("{operation} failed")]
    Service {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    /// The call succeeded but its response lacks a value the crate needs.
    #[error("{operation} response has no {field}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },
}

impl Error {
    pub(crate) fn service<E>(operation: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Service {
            operation,
            source: Box::new(source),
        }
    }
}
