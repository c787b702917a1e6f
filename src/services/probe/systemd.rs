use std::time::Duration;

use tokio::process::Command;

use super::ProbeOutcome;

/// systemd 探测：`systemctl is-active <unit>` 输出 `active` 时视为健康
#[derive(Debug, Clone)]
pub struct SystemdProbe {
    systemctl_path: String,
    timeout: Duration,
}

impl SystemdProbe {
    pub fn new(systemctl_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            systemctl_path: systemctl_path.into(),
            timeout,
        }
    }

    pub async fn check(&self, unit: &str) -> ProbeOutcome {
        let mut command = Command::new(&self.systemctl_path);
        command.arg("is-active").arg(unit).kill_on_drop(true);

        match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => ProbeOutcome::unhealthy(format!(
                "systemd health check timed out after {}s",
                self.timeout.as_secs()
            )),
            Ok(Err(e)) => ProbeOutcome::unhealthy(format!(
                "failed to run {} is-active {}: {}",
                self.systemctl_path, unit, e
            )),
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                if stdout.trim() == "active" {
                    ProbeOutcome::healthy()
                } else {
                    ProbeOutcome::unhealthy(format!(
                        "systemd health check command returned: {}",
                        stdout.trim()
                    ))
                }
            }
        }
    }
}
