use std::sync::Arc;

use tracing::{debug, info};

use crate::emr::{aws_config, ClusterSummary, ControlPlane, EmrControlPlane, ACTIVE_STATES};
use crate::error::Result;
use crate::s3::{ObjectStore, S3Store};
use crate::settings::Settings;

/// Everything one invocation works with: the settings and the two remote
/// services. Nothing is cached, every operation that needs the cluster
/// resolves it again by name.
pub struct SparkEmr {
    pub(crate) settings: Settings,
    pub(crate) emr: Arc<dyn ControlPlane>,
    pub(crate) s3: Arc<dyn ObjectStore>,
}

impl SparkEmr {
    pub fn new(settings: Settings, emr: Arc<dyn ControlPlane>, s3: Arc<dyn ObjectStore>) -> Self {
        Self { settings, emr, s3 }
    }

    /// Build the EMR and S3 clients for the settings' region.
    pub async fn connect(settings: Settings) -> Self {
        let config = aws_config(&settings).await;
        let emr = Arc::new(EmrControlPlane::new(&config));
        let s3 = Arc::new(S3Store::new(&config));
        Self::new(settings, emr, s3)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// List the clusters that are starting, bootstrapping, running or waiting.
    pub async fn active_clusters(&self) -> Result<Vec<ClusterSummary>> {
        let mut clusters = self.emr.list_clusters(&ACTIVE_STATES).await?;
        clusters.retain(|cluster| cluster.state.is_active());
        debug!("{} active clusters", clusters.len());
        Ok(clusters)
    }

    /// Find the active cluster carrying the configured name.
    ///
    /// When several active clusters share the name, whichever the service
    /// lists first wins; the listing order is not guaranteed.
    #[tracing::instrument(skip(self), fields(cluster = %self.settings.cluster_name))]
    pub async fn find_cluster(&self) -> Result<Option<ClusterSummary>> {
        let found = self
            .active_clusters()
            .await?
            .into_iter()
            .find(|cluster| cluster.name == self.settings.cluster_name);

        match &found {
            Some(cluster) => debug!("found cluster {}", cluster.id),
            None => debug!("no active cluster with this name"),
        }
        Ok(found)
    }

    /// Terminate the named cluster, returning it if it was found.
    #[tracing::instrument(skip(self), fields(cluster = %self.settings.cluster_name))]
    pub async fn terminate_cluster(&self) -> Result<Option<ClusterSummary>> {
        let Some(cluster) = self.find_cluster().await? else {
            info!("no active cluster to terminate");
            return Ok(None);
        };

        self.emr.terminate_job_flow(&cluster.id).await?;
        info!("termination of {} requested", cluster.id);
        Ok(Some(cluster))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emr::ClusterState;
    use crate::testing::{cluster, settings, spark_emr, FakeControlPlane, FakeObjectStore};

    #[tokio::test]
    async fn finds_cluster_by_exact_name() {
        let emr = Arc::new(FakeControlPlane::with_clusters(vec![
            cluster("j-1", "Foo", ClusterState::Running),
            cluster("j-2", "foo", ClusterState::Waiting),
        ]));
        let s3 = Arc::new(FakeObjectStore::default());

        let found = spark_emr(settings("foo"), &emr, &s3)
            .find_cluster()
            .await
            .unwrap();
        assert_eq!(found.map(|c| c.id), Some("j-2".to_string()));

        let listed = emr.listed_states.lock().unwrap();
        assert_eq!(listed.as_slice(), [ACTIVE_STATES.to_vec()]);
    }

    #[tokio::test]
    async fn terminated_clusters_are_invisible() {
        let emr = Arc::new(FakeControlPlane::with_clusters(vec![
            cluster("j-1", "foo", ClusterState::Terminated),
            cluster("j-2", "foo", ClusterState::TerminatedWithErrors),
            cluster("j-3", "foo", ClusterState::Terminating),
        ]));
        let s3 = Arc::new(FakeObjectStore::default());
        let spark = spark_emr(settings("foo"), &emr, &s3);

        assert_eq!(spark.find_cluster().await.unwrap(), None);
        assert!(spark.active_clusters().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lists_every_active_cluster() {
        let emr = Arc::new(FakeControlPlane::with_clusters(vec![
            cluster("j-1", "a", ClusterState::Starting),
            cluster("j-2", "b", ClusterState::Bootstrapping),
            cluster("j-3", "c", ClusterState::Terminated),
        ]));
        let s3 = Arc::new(FakeObjectStore::default());

        let ids: Vec<_> = spark_emr(settings("foo"), &emr, &s3)
            .active_clusters()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, ["j-1", "j-2"]);
    }

    #[tokio::test]
    async fn terminate_found_cluster() {
        let emr = Arc::new(FakeControlPlane::with_clusters(vec![cluster(
            "j-9",
            "foo",
            ClusterState::Waiting,
        )]));
        let s3 = Arc::new(FakeObjectStore::default());

        let terminated = spark_emr(settings("foo"), &emr, &s3)
            .terminate_cluster()
            .await
            .unwrap();
        assert_eq!(terminated.map(|c| c.id), Some("j-9".to_string()));
        assert_eq!(*emr.terminated.lock().unwrap(), ["j-9"]);
    }

    #[tokio::test]
    async fn terminate_absent_cluster_is_not_an_error() {
        let emr = Arc::new(FakeControlPlane::default());
        let s3 = Arc::new(FakeObjectStore::default());

        let terminated = spark_emr(settings("foo"), &emr, &s3)
            .terminate_cluster()
            .await
            .unwrap();
        assert_eq!(terminated, None);
        assert!(emr.terminated.lock().unwrap().is_empty());
    }
}
