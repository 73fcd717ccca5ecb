use serde::Serialize;

use crate::s3::S3Url;

const DEPLOY_MODE: &str = "cluster";
const SPARK_SUBMIT: &str = "spark-submit";

/// EMR's generic runner, it executes its arguments as a command on the master.
pub const COMMAND_RUNNER_JAR: &str = "command-runner.jar";
pub const STEP_NAME: &str = "Spark Step";
pub const ACTION_ON_FAILURE: &str = "CONTINUE";

/// A step to run on an EMR cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStep {
    pub name: String,
    pub action_on_failure: String,
    pub jar: String,
    pub args: Vec<String>,
}

#[derive(Debug, Default)]
pub struct SparkSubmitBuilder {
    /// The entry point of the job
    main_class: Option<String>,
    /// The uploaded jar holding the main class
    jar: Option<S3Url>,
    /// The argument of the program
    args: Option<Vec<String>>,
}

impl SparkSubmitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn main_class(mut self, main_class: String) -> Self {
        self.main_class = Some(main_class);
        self
    }

    pub fn jar(mut self, jar: S3Url) -> Self {
        self.jar = Some(jar);
        self
    }

    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args = Some(args);
        self
    }

    pub fn build(self) -> SparkSubmit {
        SparkSubmit {
            main_class: self.main_class.unwrap_or_default(),
            jar: self.jar.map(|jar| jar.to_string()).unwrap_or_default(),
            args: self.args.unwrap_or_default(),
        }
    }
}

#[derive(Debug)]
pub struct SparkSubmit {
    main_class: String,
    jar: String,
    args: Vec<String>,
}

impl SparkSubmit {
    pub fn into_step(self) -> JobStep {
        let command = SparkSubmitCommand::new(SPARK_SUBMIT)
            .add_kv("--deploy-mode", DEPLOY_MODE)
            .add_kv("--class", &self.main_class)
            .arg(&self.jar)
            .args(self.args);

        JobStep {
            name: STEP_NAME.to_string(),
            action_on_failure: ACTION_ON_FAILURE.to_string(),
            jar: COMMAND_RUNNER_JAR.to_string(),
            args: command.args,
        }
    }
}

/// The argument list handed to the command runner.
struct SparkSubmitCommand {
    args: Vec<String>,
}

impl SparkSubmitCommand {
    fn new(prog: &str) -> Self {
        Self {
            args: vec![prog.to_string()],
        }
    }

    fn add_kv(mut self, key: &str, value: &str) -> Self {
        self.args.push(key.to_string());
        self.args.push(value.to_string());
        self
    }

    fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }

    fn args(mut self, args: Vec<String>) -> Self {
        self.args.extend(args);
        self
    }
}
