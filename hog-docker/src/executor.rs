//! [`RemoteExecutor`] over the Docker exec API.

use crate::error::DockerError;
use async_trait::async_trait;
use bollard::container::LogOutput;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::Docker;
use futures_util::StreamExt;
use hog_core::{ExecError, ExecOutput, RemoteExecutor};
use hog_types::Target;

/// Runs commands inside containers with create/start/inspect exec.
///
/// The target's instance name is the container the exec is created in.
#[derive(Debug, Clone)]
pub struct DockerExecutor {
    docker: Docker,
}

impl DockerExecutor {
    /// Create an executor over an existing client.
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// Connect to the local daemon.
    pub fn connect() -> Result<Self, DockerError> {
        Ok(Self::new(crate::connect()?))
    }

    async fn run(&self, container: &str, command: &[String]) -> Result<ExecOutput, DockerError> {
        let exec_options = CreateExecOptions {
            cmd: Some(command.to_vec()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let exec = self
            .docker
            .create_exec(container, exec_options)
            .await
            .map_err(|e| DockerError::from_api(e, container))?;

        let mut stdout = String::new();
        let mut stderr = String::new();

        if let StartExecResults::Attached { mut output, .. } =
            self.docker.start_exec(&exec.id, None).await?
        {
            while let Some(msg) = output.next().await {
                match msg? {
                    LogOutput::StdOut { message } => {
                        stdout.push_str(&String::from_utf8_lossy(&message));
                    }
                    LogOutput::StdErr { message } => {
                        stderr.push_str(&String::from_utf8_lossy(&message));
                    }
                    _ => {}
                }
            }
        }

        let inspect = self.docker.inspect_exec(&exec.id).await?;

        Ok(ExecOutput {
            stdout,
            stderr,
            exit_code: inspect.exit_code,
        })
    }
}

#[async_trait]
impl RemoteExecutor for DockerExecutor {
    async fn exec(&self, target: &Target, command: &[String]) -> Result<ExecOutput, ExecError> {
        tracing::debug!(
            target_name = %target,
            container = %target.name,
            command = ?command,
            "docker exec"
        );
        let output = self.run(&target.name, command).await?;
        tracing::debug!(target_name = %target, exit_code = ?output.exit_code, "docker exec finished");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::container::{
        Config, CreateContainerOptions, RemoveContainerOptions, StartContainerOptions,
    };
    use hog_types::StressSpec;

    async fn start_busybox(docker: &Docker) -> String {
        let name = format!("memhog-exec-{}", uuid::Uuid::new_v4().as_simple());
        docker
            .create_container(
                Some(CreateContainerOptions {
                    name: name.clone(),
                    platform: None,
                }),
                Config {
                    image: Some("busybox:latest".to_string()),
                    cmd: Some(vec!["sleep".to_string(), "300".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        docker
            .start_container(&name, None::<StartContainerOptions<String>>)
            .await
            .unwrap();
        name
    }

    async fn remove(docker: &Docker, name: &str) {
        let _ = docker
            .remove_container(
                name,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await;
    }

    #[tokio::test]
    #[ignore = "requires Docker with the busybox image"]
    async fn exec_reports_exit_code_and_streams() {
        let docker = crate::connect().unwrap();
        let name = start_busybox(&docker).await;
        let executor = DockerExecutor::new(docker.clone());
        let target = Target::new("default", &name, "busybox");

        let out = executor
            .exec(
                &target,
                &["/bin/sh".into(), "-c".into(), "echo hi; echo oops >&2; exit 3".into()],
            )
            .await
            .unwrap();

        remove(&docker, &name).await;
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.stdout.trim(), "hi");
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[tokio::test]
    #[ignore = "requires Docker with the busybox image"]
    async fn kill_command_stops_running_stress() {
        let docker = crate::connect().unwrap();
        let name = start_busybox(&docker).await;
        let executor = DockerExecutor::new(docker.clone());
        let target = Target::new("default", &name, "busybox");
        let spec = StressSpec::new(8, 1);

        let stress = {
            let executor = executor.clone();
            let target = target.clone();
            let cmd = spec.stress_command();
            tokio::spawn(async move { executor.exec(&target, &cmd).await })
        };
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;

        let kill = executor
            .exec(&target, &spec.kill_command_argv())
            .await
            .unwrap();
        let stress = stress.await.unwrap().unwrap();

        remove(&docker, &name).await;
        assert!(kill.success(), "kill failed: {}", kill.message());
        assert_ne!(stress.exit_code, Some(0));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn missing_container_is_target_not_found() {
        let executor = DockerExecutor::connect().unwrap();
        let target = Target::new("default", "memhog-does-not-exist", "app");
        let err = executor
            .exec(&target, &["true".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::TargetNotFound(_)));
    }
}
