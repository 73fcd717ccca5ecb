use serde::Serialize;
use tracing::{debug, info};

use crate::cluster::SparkEmr;
use crate::cmd::JobStep;
use crate::error::{Error, Result};
use crate::remote_config::{parse_classifications, Classification};
use crate::resource::{InstanceGroup, InstancePlan};
use crate::settings::Settings;

/// Always installed, before any additional application.
pub const SPARK_APPLICATION: &str = "Spark";

/// Everything sent to EMR to create a cluster. Absent options are left out
/// of the request entirely.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRequest {
    pub name: String,
    pub release_label: String,
    pub service_role: String,
    pub job_flow_role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_uri: Option<String>,
    pub visible_to_all_users: bool,
    pub applications: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configurations: Option<Vec<Classification>>,
    pub instances: InstancesConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<JobStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstancesConfig {
    pub instance_groups: Vec<InstanceGroup>,
    /// Keep the cluster up once it has no steps left
    pub keep_alive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emr_managed_master_security_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emr_managed_slave_security_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_master_security_groups: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_slave_security_groups: Option<Vec<String>>,
}

/// Build the creation request for the configured cluster.
///
/// A cluster created with an initial step terminates once it runs out of
/// steps, one created without any stays alive.
pub fn build_cluster_request(
    settings: &Settings,
    configurations: Option<Vec<Classification>>,
    initial_step: Option<JobStep>,
) -> ClusterRequest {
    let mut instances = InstancesConfig {
        instance_groups: InstancePlan::from_settings(settings).into_groups(),
        keep_alive: initial_step.is_none(),
        subnet_id: None,
        emr_managed_master_security_group: None,
        emr_managed_slave_security_group: None,
        additional_master_security_groups: None,
        additional_slave_security_groups: None,
    };
    if let Some(subnet_id) = &settings.subnet_id {
        instances.subnet_id = Some(subnet_id.clone());
    }
    if let Some(group) = &settings.emr_managed_master_security_group {
        instances.emr_managed_master_security_group = Some(group.clone());
    }
    if let Some(group) = &settings.emr_managed_slave_security_group {
        instances.emr_managed_slave_security_group = Some(group.clone());
    }
    if let Some(groups) = &settings.additional_master_security_groups {
        instances.additional_master_security_groups = Some(groups.clone());
    }
    if let Some(groups) = &settings.additional_slave_security_groups {
        instances.additional_slave_security_groups = Some(groups.clone());
    }

    let mut applications = vec![SPARK_APPLICATION.to_string()];
    if let Some(additional) = &settings.additional_applications {
        applications.extend(additional.iter().cloned());
    }

    ClusterRequest {
        name: settings.cluster_name.clone(),
        release_label: settings.emr_release.clone(),
        service_role: settings.emr_service_role.clone(),
        job_flow_role: settings.instance_role.clone(),
        log_uri: settings.s3_logging_folder.as_ref().map(|url| url.to_string()),
        visible_to_all_users: settings.visible_to_all_users,
        applications,
        configurations,
        instances,
        steps: initial_step.into_iter().collect(),
    }
}

impl SparkEmr {
    /// Build the creation request, fetching the remote configuration
    /// document when one is configured.
    pub async fn cluster_request(&self, initial_step: Option<JobStep>) -> Result<ClusterRequest> {
        let configurations = match &self.settings.s3_json_configuration {
            Some(url) => {
                debug!("fetching cluster configuration from {}", url);
                let document = self.s3.get_bytes(url).await?;
                Some(parse_classifications(&document)?)
            }
            None => None,
        };

        Ok(build_cluster_request(
            &self.settings,
            configurations,
            initial_step,
        ))
    }

    /// Create the configured cluster, returning its id.
    ///
    /// Fails when an active cluster already has the name. The check and the
    /// creation are two separate calls, so two concurrent invocations with
    /// the same name can both pass the check.
    #[tracing::instrument(skip(self, initial_step), fields(cluster = %self.settings.cluster_name))]
    pub async fn create_cluster(&self, initial_step: Option<JobStep>) -> Result<String> {
        if let Some(existing) = self.find_cluster().await? {
            return Err(Error::ClusterAlreadyExists {
                name: existing.name,
                id: existing.id,
            });
        }

        let request = self.cluster_request(initial_step).await?;
        let cluster_id = self.emr.run_job_flow(&request).await?;
        info!(
            "created cluster {} with {} instances of {}",
            cluster_id, self.settings.instance_count, self.settings.instance_type
        );
        Ok(cluster_id)
    }
}
