//! In-memory stand-ins for EMR and S3 that record every call.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::cluster::SparkEmr;
use crate::cmd::JobStep;
use crate::emr::{ClusterState, ClusterSummary, ControlPlane};
use crate::error::{Error, Result};
use crate::provision::ClusterRequest;
use crate::s3::{ObjectStore, S3Url};
use crate::settings::Settings;

pub(crate) fn settings(cluster_name: &str) -> Settings {
    let yaml = format!(
        "clusterName: {}\nawsRegion: us-east-1\ns3JarFolder: s3://bucket/jars\n",
        cluster_name
    );
    Settings::from_yaml(&yaml, "project").unwrap()
}

pub(crate) fn cluster(id: &str, name: &str, state: ClusterState) -> ClusterSummary {
    ClusterSummary {
        id: id.to_string(),
        name: name.to_string(),
        state,
    }
}

/// Answers list requests with every cluster it knows, whatever states were
/// asked for, so callers have to filter on their own.
#[derive(Default)]
pub(crate) struct FakeControlPlane {
    pub(crate) clusters: Mutex<Vec<ClusterSummary>>,
    pub(crate) listed_states: Mutex<Vec<Vec<ClusterState>>>,
    pub(crate) created: Mutex<Vec<ClusterRequest>>,
    pub(crate) added_steps: Mutex<Vec<(String, Vec<JobStep>)>>,
    pub(crate) terminated: Mutex<Vec<String>>,
}

impl FakeControlPlane {
    pub(crate) fn with_clusters(clusters: Vec<ClusterSummary>) -> Self {
        Self {
            clusters: Mutex::new(clusters),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn list_clusters(&self, states: &[ClusterState]) -> Result<Vec<ClusterSummary>> {
        self.listed_states.lock().unwrap().push(states.to_vec());
        Ok(self.clusters.lock().unwrap().clone())
    }

    async fn run_job_flow(&self, request: &ClusterRequest) -> Result<String> {
        let mut created = self.created.lock().unwrap();
        created.push(request.clone());
        let id = format!("j-{}", created.len());

        self.clusters
            .lock()
            .unwrap()
            .push(cluster(&id, &request.name, ClusterState::Starting));
        Ok(id)
    }

    async fn add_job_flow_steps(&self, cluster_id: &str, steps: &[JobStep]) -> Result<Vec<String>> {
        let mut added = self.added_steps.lock().unwrap();
        added.push((cluster_id.to_string(), steps.to_vec()));
        Ok((0..steps.len())
            .map(|i| format!("s-{}-{}", added.len(), i))
            .collect())
    }

    async fn terminate_job_flow(&self, cluster_id: &str) -> Result<()> {
        self.terminated.lock().unwrap().push(cluster_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeObjectStore {
    pub(crate) objects: Mutex<HashMap<S3Url, Vec<u8>>>,
    pub(crate) puts: Mutex<Vec<(S3Url, PathBuf)>>,
    pub(crate) fail_puts: bool,
}

impl FakeObjectStore {
    pub(crate) fn with_object(url: &str, content: &[u8]) -> Self {
        let store = Self::default();
        store
            .objects
            .lock()
            .unwrap()
            .insert(S3Url::parse(url).unwrap(), content.to_vec());
        store
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail_puts: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn put_file(&self, dest: &S3Url, file: &Path) -> Result<()> {
        if self.fail_puts {
            return Err(Error::service(
                "PutObject",
                io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
            ));
        }
        self.puts
            .lock()
            .unwrap()
            .push((dest.clone(), file.to_path_buf()));
        Ok(())
    }

    async fn get_bytes(&self, src: &S3Url) -> Result<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(src)
            .cloned()
            .ok_or_else(|| {
                Error::service(
                    "GetObject",
                    io::Error::new(io::ErrorKind::NotFound, format!("no such key {}", src)),
                )
            })
    }
}

pub(crate) fn spark_emr(
    settings: Settings,
    emr: &Arc<FakeControlPlane>,
    s3: &Arc<FakeObjectStore>,
) -> SparkEmr {
    SparkEmr::new(settings, emr.clone(), s3.clone())
}
