use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::s3::S3Url;

pub const DEFAULT_SETTINGS_FILE: &str = "spark-emr.yaml";

const DEFAULT_EMR_RELEASE: &str = "emr-5.4.0";
const DEFAULT_SERVICE_ROLE: &str = "EMR_DefaultRole";
const DEFAULT_INSTANCE_ROLE: &str = "EMR_EC2_DefaultRole";
const DEFAULT_INSTANCE_TYPE: &str = "m3.xlarge";

/// Everything the user declares about the cluster and where the job goes.
///
/// Built once per invocation and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Settings {
    /// Clusters are looked up by this name, empty means "use the project name"
    #[serde(default)]
    pub cluster_name: String,
    /// Region of the EMR and S3 clients, may be left to `--region`
    #[serde(default)]
    pub aws_region: String,
    #[serde(default = "default_emr_release")]
    pub emr_release: String,
    #[serde(default = "default_service_role")]
    pub emr_service_role: String,
    #[serde(default)]
    pub subnet_id: Option<String>,
    /// Total number of instances, master included
    #[serde(default = "default_instance_count")]
    pub instance_count: u32,
    #[serde(default = "default_instance_type")]
    pub instance_type: String,
    /// Spot bid price, on-demand instances are used when absent
    #[serde(default)]
    pub instance_bid_price: Option<String>,
    #[serde(default = "default_instance_role")]
    pub instance_role: String,
    #[serde(default)]
    pub emr_managed_master_security_group: Option<String>,
    #[serde(default)]
    pub emr_managed_slave_security_group: Option<String>,
    #[serde(default)]
    pub additional_master_security_groups: Option<Vec<String>>,
    #[serde(default)]
    pub additional_slave_security_groups: Option<Vec<String>>,
    /// Folder the job jars are uploaded to
    pub s3_jar_folder: S3Url,
    #[serde(default)]
    pub s3_logging_folder: Option<S3Url>,
    /// JSON document with the cluster configuration classifications
    #[serde(default)]
    pub s3_json_configuration: Option<S3Url>,
    /// Installed next to Spark
    #[serde(default)]
    pub additional_applications: Option<Vec<String>>,
    #[serde(default = "default_visible_to_all_users")]
    pub visible_to_all_users: bool,
    /// Main class used by `submit-job`
    #[serde(default)]
    pub main_class: Option<String>,
}

fn default_emr_release() -> String {
    DEFAULT_EMR_RELEASE.to_string()
}

fn default_service_role() -> String {
    DEFAULT_SERVICE_ROLE.to_string()
}

fn default_instance_count() -> u32 {
    1
}

fn default_instance_type() -> String {
    DEFAULT_INSTANCE_TYPE.to_string()
}

fn default_instance_role() -> String {
    DEFAULT_INSTANCE_ROLE.to_string()
}

fn default_visible_to_all_users() -> bool {
    true
}

impl Settings {
    /// Load the settings file, naming the cluster after the project
    /// directory when no name is configured.
    ///
    /// The result is not validated yet, command line overrides may still
    /// fill in what the file leaves out.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::SettingsFile {
            path: path.to_path_buf(),
            source,
        })?;

        let project_name = project_name(path).unwrap_or_default();
        Self::from_yaml(&content, &project_name)
    }

    pub fn from_yaml(content: &str, project_name: &str) -> Result<Self> {
        let mut settings: Settings = serde_yaml::from_str(content)?;
        if settings.cluster_name.is_empty() {
            settings.cluster_name = project_name.to_string();
        }
        Ok(settings)
    }

    /// Replace the cluster name and region with the ones given on the
    /// command line.
    pub fn apply_overrides(&mut self, cluster_name: Option<String>, region: Option<String>) {
        if let Some(cluster_name) = cluster_name {
            self.cluster_name = cluster_name;
        }
        if let Some(region) = region {
            self.aws_region = region;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cluster_name.is_empty() {
            return Err(Error::InvalidSettings(
                "clusterName is empty and no project name is available".to_string(),
            ));
        }
        if self.aws_region.is_empty() {
            return Err(Error::InvalidSettings("awsRegion is empty".to_string()));
        }
        if self.instance_count < 1 {
            return Err(Error::InvalidSettings(format!(
                "instanceCount must be at least 1, got {}",
                self.instance_count
            )));
        }
        Ok(())
    }
}

/// The project is the directory holding the settings file.
fn project_name(settings_path: &Path) -> Option<String> {
    let absolute = std::fs::canonicalize(settings_path).ok()?;
    absolute
        .parent()?
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}
