use std::path::PathBuf;
use std::{env, io};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use spark_emr::settings::DEFAULT_SETTINGS_FILE;
use spark_emr::submit::{resolve_main_class, SubmitOutcome};
use spark_emr::{Settings, SparkEmr};

/// Manage a named Spark cluster on AWS EMR and submit jobs to it.
///
/// The cluster is identified by its name only, every command looks it up
/// again among the active clusters of the region.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// the settings file
    #[arg(long, default_value_t = String::from(DEFAULT_SETTINGS_FILE))]
    config: String,

    /// overrides the cluster name of the settings file
    #[arg(long)]
    cluster_name: Option<String>,

    /// overrides the region of the settings file
    #[arg(long)]
    region: Option<String>,

    /// the log level used when RUST_LOG is not set
    #[arg(long, default_value_t = String::from("info"))]
    log_level: String,

    /// if set, the requests are printed instead of sent, this is for debugging
    #[arg(long, default_value_t = false)]
    no_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the cluster, it stays alive until terminated
    CreateCluster,
    /// List the active clusters of the region
    ListClusters,
    /// Terminate the cluster if it is active
    TerminateCluster,
    /// Submit a job using the main class of the settings
    SubmitJob {
        /// the assembled jar to upload
        #[arg(long)]
        artifact: PathBuf,

        /// the arguments of the program
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Submit a job with an explicit main class
    SubmitJobWithMain {
        /// the assembled jar to upload
        #[arg(long)]
        artifact: PathBuf,

        main_class: String,

        /// the arguments of the program
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let mut settings = Settings::load(&args.config)?;
    settings.apply_overrides(args.cluster_name, args.region);
    settings.validate()?;

    let spark = SparkEmr::connect(settings).await;

    match args.command {
        Command::CreateCluster => {
            if args.no_run {
                let request = spark.cluster_request(None).await?;
                println!("{}", serde_json::to_string_pretty(&request)?);
                println!("no_run is set, exiting");
                return Ok(());
            }
            let cluster_id = spark.create_cluster(None).await?;
            println!(
                "Created cluster {} ({})",
                spark.settings().cluster_name,
                cluster_id
            );
        }
        Command::ListClusters => {
            let clusters = spark.active_clusters().await?;
            if clusters.is_empty() {
                println!("No active cluster found");
            } else {
                println!("Found {} active cluster(s):", clusters.len());
                for cluster in clusters {
                    println!("  {}  {}  {}", cluster.id, cluster.state, cluster.name);
                }
            }
        }
        Command::TerminateCluster => match spark.terminate_cluster().await? {
            Some(cluster) => println!("Terminating cluster {} ({})", cluster.name, cluster.id),
            None => println!(
                "No active cluster named {} found",
                spark.settings().cluster_name
            ),
        },
        Command::SubmitJob {
            artifact,
            args: job_args,
        } => {
            let main_class = resolve_main_class(spark.settings(), None)?;
            submit_job(&spark, &main_class, job_args, artifact, args.no_run).await?;
        }
        Command::SubmitJobWithMain {
            artifact,
            main_class,
            args: job_args,
        } => {
            let main_class = resolve_main_class(spark.settings(), Some(main_class))?;
            submit_job(&spark, &main_class, job_args, artifact, args.no_run).await?;
        }
    }

    Ok(())
}

async fn submit_job(
    spark: &SparkEmr,
    main_class: &str,
    job_args: Vec<String>,
    artifact: PathBuf,
    no_run: bool,
) -> Result<()> {
    if no_run {
        let jar = spark.artifact_destination(&artifact)?;
        let step = spark.job_step(main_class, &jar, job_args);
        println!("{} -> {}", artifact.display(), jar);
        println!("{}", serde_json::to_string_pretty(&step)?);
        println!("no_run is set, exiting");
        return Ok(());
    }

    match spark.submit_job(main_class, job_args, &artifact).await? {
        SubmitOutcome::StepsAdded {
            cluster_id,
            step_ids,
        } => println!(
            "Submitted step {} to cluster {}",
            step_ids.join(", "),
            cluster_id
        ),
        SubmitOutcome::ClusterCreated { cluster_id } => println!(
            "Created cluster {} running the job, it terminates once the job is done",
            cluster_id
        ),
    }
    Ok(())
}

fn init_tracing(default_level: &str) {
    let rust_log = env::var(EnvFilter::DEFAULT_ENV);
    let filter = EnvFilter::new(rust_log.unwrap_or_else(|_| default_level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
