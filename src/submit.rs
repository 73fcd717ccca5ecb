use std::path::Path;

use tracing::info;

use crate::cluster::SparkEmr;
use crate::cmd::{JobStep, SparkSubmitBuilder};
use crate::error::{Error, Result};
use crate::s3::S3Url;
use crate::settings::Settings;

/// Where a submitted job ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The step was appended to an active cluster.
    StepsAdded {
        cluster_id: String,
        step_ids: Vec<String>,
    },
    /// No cluster was active, so one was created running the step.
    ClusterCreated { cluster_id: String },
}

/// Pick the explicit main class, falling back to the one in the settings.
pub fn resolve_main_class(settings: &Settings, explicit: Option<String>) -> Result<String> {
    explicit
        .or_else(|| settings.main_class.clone())
        .filter(|main_class| !main_class.is_empty())
        .ok_or(Error::MainClassNotFound)
}

impl SparkEmr {
    /// The location the artifact is uploaded to, inside the jar folder.
    pub fn artifact_destination(&self, artifact: &Path) -> Result<S3Url> {
        let file_name = artifact
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::Artifact {
                path: artifact.to_path_buf(),
                reason: "it has no usable file name".to_string(),
            })?;
        Ok(self.settings.s3_jar_folder.derive(file_name))
    }

    pub fn job_step(&self, main_class: &str, jar: &S3Url, args: Vec<String>) -> JobStep {
        SparkSubmitBuilder::new()
            .main_class(main_class.to_string())
            .jar(jar.clone())
            .args(args)
            .build()
            .into_step()
    }

    /// Upload the artifact and run it on the named cluster, creating the
    /// cluster when none is active. A created cluster terminates after the
    /// step.
    ///
    /// Nothing is rolled back: if the step cannot be submitted the uploaded
    /// artifact stays in place.
    #[tracing::instrument(skip(self, args), fields(cluster = %self.settings.cluster_name))]
    pub async fn submit_job(
        &self,
        main_class: &str,
        args: Vec<String>,
        artifact: &Path,
    ) -> Result<SubmitOutcome> {
        let jar = self.artifact_destination(artifact)?;

        info!("uploading {} to {}", artifact.display(), jar);
        self.s3.put_file(&jar, artifact).await?;

        let step = self.job_step(main_class, &jar, args);

        match self.find_cluster().await? {
            Some(cluster) => {
                let step_ids = self
                    .emr
                    .add_job_flow_steps(&cluster.id, std::slice::from_ref(&step))
                    .await?;
                info!("step {:?} added to cluster {}", step_ids, cluster.id);
                Ok(SubmitOutcome::StepsAdded {
                    cluster_id: cluster.id,
                    step_ids,
                })
            }
            None => {
                info!("no active cluster, creating one to run the step");
                let cluster_id = self.create_cluster(Some(step)).await?;
                Ok(SubmitOutcome::ClusterCreated { cluster_id })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::emr::ClusterState;
    use crate::testing::{cluster, settings, spark_emr, FakeControlPlane, FakeObjectStore};

    fn artifact() -> PathBuf {
        PathBuf::from("target/scala-2.11/word-count-assembly-0.1.jar")
    }

    #[test]
    fn main_class_resolution() {
        let mut settings = settings("foo");
        assert!(matches!(
            resolve_main_class(&settings, None),
            Err(Error::MainClassNotFound)
        ));

        settings.main_class = Some("com.example.Default".to_string());
        assert_eq!(
            resolve_main_class(&settings, None).unwrap(),
            "com.example.Default"
        );
        assert_eq!(
            resolve_main_class(&settings, Some("com.example.Explicit".to_string())).unwrap(),
            "com.example.Explicit"
        );
    }

    #[test]
    fn destination_is_inside_jar_folder() {
        let emr = Arc::new(FakeControlPlane::default());
        let s3 = Arc::new(FakeObjectStore::default());
        let spark = spark_emr(settings("foo"), &emr, &s3);

        let destination = spark.artifact_destination(&artifact()).unwrap();
        assert_eq!(
            destination.to_string(),
            "s3://bucket/jars/word-count-assembly-0.1.jar"
        );
        assert!(spark.artifact_destination(Path::new("/")).is_err());
    }

    #[tokio::test]
    async fn submits_step_to_active_cluster() {
        let emr = Arc::new(FakeControlPlane::with_clusters(vec![cluster(
            "c-1",
            "foo",
            ClusterState::Waiting,
        )]));
        let s3 = Arc::new(FakeObjectStore::default());

        let outcome = spark_emr(settings("foo"), &emr, &s3)
            .submit_job("com.example.Main", vec!["arg1".to_string()], &artifact())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SubmitOutcome::StepsAdded {
                cluster_id: "c-1".to_string(),
                step_ids: vec!["s-1-0".to_string()],
            }
        );

        let puts = s3.puts.lock().unwrap();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].0.key, "jars/word-count-assembly-0.1.jar");
        assert_eq!(puts[0].1, artifact());

        let added = emr.added_steps.lock().unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].0, "c-1");
        assert_eq!(
            added[0].1[0].args,
            [
                "spark-submit",
                "--deploy-mode",
                "cluster",
                "--class",
                "com.example.Main",
                "s3://bucket/jars/word-count-assembly-0.1.jar",
                "arg1",
            ]
        );
        assert!(emr.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn creates_cluster_running_the_step_when_none_is_active() {
        let emr = Arc::new(FakeControlPlane::with_clusters(vec![cluster(
            "c-old",
            "foo",
            ClusterState::Terminated,
        )]));
        let s3 = Arc::new(FakeObjectStore::default());

        let outcome = spark_emr(settings("foo"), &emr, &s3)
            .submit_job("com.example.Main", vec![], &artifact())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SubmitOutcome::ClusterCreated {
                cluster_id: "j-1".to_string()
            }
        );
        assert_eq!(s3.puts.lock().unwrap().len(), 1);
        assert!(emr.added_steps.lock().unwrap().is_empty());

        let created = emr.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert!(!created[0].instances.keep_alive);
        assert_eq!(created[0].steps.len(), 1);
        assert_eq!(created[0].steps[0].name, "Spark Step");
        assert_eq!(
            created[0].steps[0].args[5],
            "s3://bucket/jars/word-count-assembly-0.1.jar"
        );
    }

    #[tokio::test]
    async fn failed_upload_stops_submission() {
        let emr = Arc::new(FakeControlPlane::with_clusters(vec![cluster(
            "c-1",
            "foo",
            ClusterState::Running,
        )]));
        let s3 = Arc::new(FakeObjectStore::failing());

        let err = spark_emr(settings("foo"), &emr, &s3)
            .submit_job("com.example.Main", vec![], &artifact())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Service { operation: "PutObject", .. }));
        assert!(emr.listed_states.lock().unwrap().is_empty());
        assert!(emr.added_steps.lock().unwrap().is_empty());
        assert!(emr.created.lock().unwrap().is_empty());
    }
}
