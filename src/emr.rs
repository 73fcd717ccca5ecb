use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_emr::types::{
    ActionOnFailure, Application, ClusterState as SdkClusterState, Configuration,
    HadoopJarStepConfig, InstanceGroupConfig, InstanceRoleType, JobFlowInstancesConfig,
    MarketType, StepConfig,
};
use serde::Serialize;
use tracing::debug;

use crate::cmd::JobStep;
use crate::error::{Error, Result};
use crate::provision::{ClusterRequest, InstancesConfig};
use crate::remote_config::Classification;
use crate::resource::InstanceGroup;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterState {
    Starting,
    Bootstrapping,
    Running,
    Waiting,
    Terminating,
    Terminated,
    TerminatedWithErrors,
    Unknown,
}

/// Clusters in these states are the only ones a name lookup can see.
pub const ACTIVE_STATES: [ClusterState; 4] = [
    ClusterState::Running,
    ClusterState::Starting,
    ClusterState::Waiting,
    ClusterState::Bootstrapping,
];

impl ClusterState {
    pub fn is_active(&self) -> bool {
        ACTIVE_STATES.contains(self)
    }
}

impl fmt::Display for ClusterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClusterState::Starting => "STARTING",
            ClusterState::Bootstrapping => "BOOTSTRAPPING",
            ClusterState::Running => "RUNNING",
            ClusterState::Waiting => "WAITING",
            ClusterState::Terminating => "TERMINATING",
            ClusterState::Terminated => "TERMINATED",
            ClusterState::TerminatedWithErrors => "TERMINATED_WITH_ERRORS",
            ClusterState::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// A cluster as reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterSummary {
    pub id: String,
    pub name: String,
    pub state: ClusterState,
}

/// The cluster-management operations this crate needs from EMR.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn list_clusters(&self, states: &[ClusterState]) -> Result<Vec<ClusterSummary>>;

    /// Create a cluster, returning its id.
    async fn run_job_flow(&self, request: &ClusterRequest) -> Result<String>;

    /// Append steps to a cluster, returning the step ids.
    async fn add_job_flow_steps(&self, cluster_id: &str, steps: &[JobStep]) -> Result<Vec<String>>;

    async fn terminate_job_flow(&self, cluster_id: &str) -> Result<()>;
}

/// Load the AWS configuration bound to the settings' region.
pub async fn aws_config(settings: &Settings) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(settings.aws_region.clone()))
        .load()
        .await
}

/// [`ControlPlane`] backed by the AWS EMR SDK.
pub struct EmrControlPlane {
    client: aws_sdk_emr::Client,
}

impl EmrControlPlane {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_emr::Client::new(config),
        }
    }
}

#[async_trait]
impl ControlPlane for EmrControlPlane {
    async fn list_clusters(&self, states: &[ClusterState]) -> Result<Vec<ClusterSummary>> {
        let states: Vec<SdkClusterState> = states.iter().map(to_sdk_state).collect();
        let mut clusters = vec![];
        let mut marker = None;

        loop {
            let page = self
                .client
                .list_clusters()
                .set_cluster_states(Some(states.clone()))
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| Error::service("ListClusters", e))?;

            for cluster in page.clusters() {
                let (Some(id), Some(name)) = (cluster.id(), cluster.name()) else {
                    debug!("skipping cluster summary without id or name: {:?}", cluster);
                    continue;
                };
                let state = cluster
                    .status()
                    .and_then(|status| status.state())
                    .map(from_sdk_state)
                    .unwrap_or(ClusterState::Unknown);

                clusters.push(ClusterSummary {
                    id: id.to_string(),
                    name: name.to_string(),
                    state,
                });
            }

            match page.marker() {
                Some(next) => marker = Some(next.to_string()),
                None => break,
            }
        }

        Ok(clusters)
    }

    async fn run_job_flow(&self, request: &ClusterRequest) -> Result<String> {
        let applications = request
            .applications
            .iter()
            .map(|name| Application::builder().name(name).build())
            .collect();

        let configurations = request
            .configurations
            .as_ref()
            .map(|configs| configs.iter().map(to_sdk_configuration).collect());

        let steps: Vec<StepConfig> = request.steps.iter().map(to_sdk_step).collect();

        let output = self
            .client
            .run_job_flow()
            .name(&request.name)
            .release_label(&request.release_label)
            .service_role(&request.service_role)
            .job_flow_role(&request.job_flow_role)
            .set_log_uri(request.log_uri.clone())
            .visible_to_all_users(request.visible_to_all_users)
            .set_applications(Some(applications))
            .set_configurations(configurations)
            .instances(to_sdk_instances(&request.instances)?)
            .set_steps(Some(steps).filter(|s| !s.is_empty()))
            .send()
            .await
            .map_err(|e| Error::service("RunJobFlow", e))?;

        output
            .job_flow_id()
            .map(str::to_string)
            .ok_or(Error::MissingField {
                operation: "RunJobFlow",
                field: "JobFlowId",
            })
    }

    async fn add_job_flow_steps(&self, cluster_id: &str, steps: &[JobStep]) -> Result<Vec<String>> {
        let steps = steps.iter().map(to_sdk_step).collect();

        let output = self
            .client
            .add_job_flow_steps()
            .job_flow_id(cluster_id)
            .set_steps(Some(steps))
            .send()
            .await
            .map_err(|e| Error::service("AddJobFlowSteps", e))?;

        Ok(output.step_ids().to_vec())
    }

    async fn terminate_job_flow(&self, cluster_id: &str) -> Result<()> {
        self.client
            .terminate_job_flows()
            .job_flow_ids(cluster_id)
            .send()
            .await
            .map_err(|e| Error::service("TerminateJobFlows", e))?;
        Ok(())
    }
}

fn to_sdk_state(state: &ClusterState) -> SdkClusterState {
    match state {
        ClusterState::Starting => SdkClusterState::Starting,
        ClusterState::Bootstrapping => SdkClusterState::Bootstrapping,
        ClusterState::Running => SdkClusterState::Running,
        ClusterState::Waiting => SdkClusterState::Waiting,
        ClusterState::Terminating => SdkClusterState::Terminating,
        ClusterState::Terminated => SdkClusterState::Terminated,
        ClusterState::TerminatedWithErrors => SdkClusterState::TerminatedWithErrors,
        ClusterState::Unknown => SdkClusterState::from("UNKNOWN"),
    }
}

fn from_sdk_state(state: &SdkClusterState) -> ClusterState {
    match state {
        SdkClusterState::Starting => ClusterState::Starting,
        SdkClusterState::Bootstrapping => ClusterState::Bootstrapping,
        SdkClusterState::Running => ClusterState::Running,
        SdkClusterState::Waiting => ClusterState::Waiting,
        SdkClusterState::Terminating => ClusterState::Terminating,
        SdkClusterState::Terminated => ClusterState::Terminated,
        SdkClusterState::TerminatedWithErrors => ClusterState::TerminatedWithErrors,
        _ => ClusterState::Unknown,
    }
}

fn to_sdk_instances(instances: &InstancesConfig) -> Result<JobFlowInstancesConfig> {
    let groups = instances
        .instance_groups
        .iter()
        .map(to_sdk_instance_group)
        .collect::<Result<Vec<_>>>()?;

    Ok(JobFlowInstancesConfig::builder()
        .set_instance_groups(Some(groups))
        .keep_job_flow_alive_when_no_steps(instances.keep_alive)
        .set_ec2_subnet_id(instances.subnet_id.clone())
        .set_emr_managed_master_security_group(instances.emr_managed_master_security_group.clone())
        .set_emr_managed_slave_security_group(instances.emr_managed_slave_security_group.clone())
        .set_additional_master_security_groups(instances.additional_master_security_groups.clone())
        .set_additional_slave_security_groups(instances.additional_slave_security_groups.clone())
        .build())
}

fn to_sdk_instance_group(group: &InstanceGroup) -> Result<InstanceGroupConfig> {
    let count = i32::try_from(group.instance_count).map_err(|_| {
        Error::InvalidSettings(format!("instance count {} is too large", group.instance_count))
    })?;

    Ok(InstanceGroupConfig::builder()
        .instance_role(InstanceRoleType::from(group.role.as_str()))
        .instance_type(&group.instance_type)
        .instance_count(count)
        .market(MarketType::from(group.market.as_str()))
        .set_bid_price(group.market.bid_price().map(str::to_string))
        .build())
}

fn to_sdk_configuration(classification: &Classification) -> Configuration {
    let properties = classification
        .properties
        .as_ref()
        .map(|props| props.clone().into_iter().collect::<HashMap<_, _>>());
    let children = classification
        .configurations
        .as_ref()
        .map(|children| children.iter().map(to_sdk_configuration).collect());

    Configuration::builder()
        .classification(&classification.classification)
        .set_properties(properties)
        .set_configurations(children)
        .build()
}

fn to_sdk_step(step: &JobStep) -> StepConfig {
    let jar_step = HadoopJarStepConfig::builder()
        .jar(&step.jar)
        .set_args(Some(step.args.clone()))
        .build();

    StepConfig::builder()
        .name(&step.name)
        .action_on_failure(ActionOnFailure::from(step.action_on_failure.as_str()))
        .hadoop_jar_step(jar_step)
        .build()
}
