//! Restart execution
//!
//! Resolves a service's start command from the topology and launches it as
//! a detached background process. Launching is fire-and-forget: the new
//! process is not awaited, and whether the service recovers is only visible
//! on a later health cycle.

use super::topology::{EnvValue, LaunchMode, TopologyEntry, TopologyLoader};
use super::RemediationError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::debug;

/// Trait for restart implementations
pub trait Restarter: Send + Sync {
    /// Launch a restart of `service_name`, returning once the process is spawned
    fn try_restart(&self, service_name: &str) -> Result<(), RemediationError>;

    /// Like [`Restarter::try_restart`], collapsing the failure to `false`
    fn restart(&self, service_name: &str) -> bool {
        self.try_restart(service_name).is_ok()
    }
}

/// Everything needed to launch one service
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchPlan {
    /// Topology identifier of the service
    pub service: String,
    pub mode: LaunchMode,
    pub command: String,
    pub work_dir: PathBuf,
    /// Variables overlaid on the inherited environment
    pub env: Vec<(String, String)>,
    /// Variables removed from the inherited environment
    pub unset: Vec<String>,
    /// Variables skipped because their value is an unresolved placeholder
    pub skipped: Vec<String>,
}

/// Restarts services by running their topology start command through the shell
#[derive(Debug, Clone)]
pub struct ShellRestarter {
    topology: TopologyLoader,
    platform_root: PathBuf,
    aliases: HashMap<String, String>,
}

impl ShellRestarter {
    pub fn new(
        topology: TopologyLoader,
        platform_root: impl Into<PathBuf>,
        aliases: HashMap<String, String>,
    ) -> Self {
        Self {
            topology,
            platform_root: platform_root.into(),
            aliases,
        }
    }

    /// Map a health-check name to its topology identifier.
    ///
    /// Names without an alias pass through unchanged.
    pub fn topology_name<'a>(&'a self, service_name: &'a str) -> &'a str {
        self.aliases
            .get(service_name)
            .map(String::as_str)
            .unwrap_or(service_name)
    }

    /// Load the topology and resolve the launch plan for a service
    pub fn plan(&self, service_name: &str) -> Result<LaunchPlan, RemediationError> {
        let topo_name = self.topology_name(service_name);
        let topology = self.topology.load()?;

        let entry = topology.entry(topo_name)?;

        build_plan(topo_name, &entry, &self.platform_root)
    }

    /// Spawn the planned command detached from this process group
    fn launch(&self, plan: &LaunchPlan) -> Result<(), RemediationError> {
        let mut command = shell_command(&plan.command);
        command
            .current_dir(&plan.work_dir)
            .envs(plan.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        for key in &plan.unset {
            command.env_remove(key);
        }

        // New session: no controlling terminal, outside our process group
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            unsafe {
                command.pre_exec(|| {
                    if libc::setsid() == -1 {
                        return Err(std::io::Error::last_os_error());
                    }
                    Ok(())
                });
            }
        }

        // Spawn through tokio so the runtime reaps the child once it exits
        let child = tokio::process::Command::from(command)
            .kill_on_drop(false)
            .spawn()
            .map_err(|source| RemediationError::Spawn {
                service: plan.service.clone(),
                source,
            })?;

        debug!(
            service = %plan.service,
            pid = ?child.id(),
            mode = %plan.mode,
            work_dir = %plan.work_dir.display(),
            skipped_env = ?plan.skipped,
            "Launched restart command"
        );

        Ok(())
    }
}

impl Restarter for ShellRestarter {
    fn try_restart(&self, service_name: &str) -> Result<(), RemediationError> {
        let plan = self.plan(service_name)?;
        self.launch(&plan)
    }
}

/// Resolve command, working directory and environment for one entry
pub fn build_plan(
    service: &str,
    entry: &TopologyEntry,
    platform_root: &Path,
) -> Result<LaunchPlan, RemediationError> {
    let (mode, command) = entry
        .start
        .resolve()
        .ok_or_else(|| RemediationError::NoStartCommand(service.to_string()))?;

    let mut plan = LaunchPlan {
        service: service.to_string(),
        mode,
        command: command.to_string(),
        work_dir: platform_root.join(&entry.path),
        env: Vec::new(),
        unset: Vec::new(),
        skipped: Vec::new(),
    };

    for (key, value) in &entry.env {
        match value {
            EnvValue::Value(v) => plan.env.push((key.clone(), v.clone())),
            EnvValue::Unset => plan.unset.push(key.clone()),
            EnvValue::Unresolved(_) => plan.skipped.push(key.clone()),
        }
    }

    Ok(plan)
}

#[cfg(unix)]
fn shell_command(command: &str) -> std::process::Command {
    let mut cmd = std::process::Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> std::process::Command {
    let mut cmd = std::process::Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
