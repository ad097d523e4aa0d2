//! Sidecar process management.
//!
//! The bridge can spawn and supervise the Baileys sidecar itself, or
//! attach to an externally managed one (see the `manage_sidecar` config
//! switch).

use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use {
    anyhow::{Context, Result, bail},
    tokio::{
        io::{AsyncBufReadExt, BufReader},
        process::{Child, Command},
    },
    tracing::{debug, error, info, warn},
};

use crate::sidecar::DEFAULT_SIDECAR_PORT;

/// Handle to a running sidecar process.
pub struct SidecarProcess {
    child: Child,
    port: u16,
}

impl SidecarProcess {
    /// Port the sidecar's WebSocket server listens on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Check if the process is still running.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Stop the sidecar, SIGTERM first, kill as fallback.
    pub async fn stop(&mut self) -> Result<()> {
        info!("stopping sidecar process");

        #[cfg(unix)]
        {
            use nix::{
                sys::signal::{Signal, kill},
                unistd::Pid,
            };

            if let Some(pid) = self.child.id() {
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            }
        }

        #[cfg(not(unix))]
        {
            let _ = self.child.kill().await;
        }

        match tokio::time::timeout(std::time::Duration::from_secs(5), self.child.wait()).await {
            Ok(Ok(status)) => {
                info!(?status, "sidecar process exited");
            },
            Ok(Err(e)) => {
                warn!(error = %e, "error waiting for sidecar process");
            },
            Err(_) => {
                warn!("sidecar process did not exit gracefully, killing");
                let _ = self.child.kill().await;
            },
        }

        Ok(())
    }
}

impl Drop for SidecarProcess {
    fn drop(&mut self) {
        // kill_on_drop on the Command handles the actual reaping.
        if let Some(pid) = self.child.id() {
            debug!(pid, "dropping sidecar process handle");
        }
    }
}

/// Configuration for starting the sidecar process.
#[derive(Debug, Clone)]
pub struct SidecarConfig {
    /// Directory containing the sidecar's `package.json`.
    pub sidecar_dir: PathBuf,
    /// Port for the sidecar's WebSocket server.
    pub port: u16,
    /// Auth directory handed to the sidecar for its own key material.
    pub auth_dir: Option<PathBuf>,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            sidecar_dir: PathBuf::new(),
            port: DEFAULT_SIDECAR_PORT,
            auth_dir: None,
        }
    }
}

/// Find the sidecar directory.
///
/// Searches in order:
/// 1. Explicit path if provided
/// 2. `WABRIDGE_SIDECAR_DIR` environment variable
/// 3. Relative to the executable: `../sidecar`
/// 4. Development paths relative to the working directory
pub fn find_sidecar_dir(explicit_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        if path.join("package.json").exists() {
            return Ok(path.to_path_buf());
        }
        bail!(
            "sidecar directory does not exist or missing package.json: {}",
            path.display()
        );
    }

    if let Ok(dir) = std::env::var("WABRIDGE_SIDECAR_DIR") {
        let path = PathBuf::from(&dir);
        if path.join("package.json").exists() {
            return Ok(path);
        }
        warn!(path = %dir, "WABRIDGE_SIDECAR_DIR set but package.json not found");
    }

    if let Ok(exe_path) = std::env::current_exe()
        && let Some(exe_dir) = exe_path.parent()
    {
        for rel in ["../sidecar", "../../sidecar"] {
            let candidate = exe_dir.join(rel);
            if candidate.join("package.json").exists() {
                return Ok(candidate);
            }
        }
    }

    for rel_path in ["sidecar", "../sidecar"] {
        let path = PathBuf::from(rel_path);
        if path.join("package.json").exists() {
            return Ok(path.canonicalize().unwrap_or(path));
        }
    }

    bail!(
        "WhatsApp sidecar not found. Set WABRIDGE_SIDECAR_DIR or ensure \
         ./sidecar exists with package.json"
    )
}

/// Check if the sidecar has been built (dist/index.js exists).
pub fn is_sidecar_built(sidecar_dir: &Path) -> bool {
    sidecar_dir.join("dist/index.js").exists()
}

fn has_node_modules(sidecar_dir: &Path) -> bool {
    sidecar_dir.join("node_modules").exists()
}

/// Start the sidecar process, building it first if needed.
pub async fn start_sidecar(config: SidecarConfig) -> Result<SidecarProcess> {
    let sidecar_dir = &config.sidecar_dir;

    if !sidecar_dir.join("package.json").exists() {
        bail!(
            "WhatsApp sidecar not found at {}. \
             Run `cd {} && npm install && npm run build` first.",
            sidecar_dir.display(),
            sidecar_dir.display()
        );
    }

    if !is_sidecar_built(sidecar_dir) {
        info!(path = %sidecar_dir.display(), "building WhatsApp sidecar");

        if !has_node_modules(sidecar_dir) {
            run_npm(sidecar_dir, &["install"]).await?;
        }
        run_npm(sidecar_dir, &["run", "build"]).await?;
    }

    info!(
        path = %sidecar_dir.display(),
        port = config.port,
        "starting WhatsApp sidecar process"
    );

    let mut cmd = Command::new("node");
    cmd.arg("dist/index.js")
        .current_dir(sidecar_dir)
        .env("WABRIDGE_SIDECAR_PORT", config.port.to_string())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(auth_dir) = &config.auth_dir {
        cmd.env("WABRIDGE_AUTH_DIR", auth_dir);
    }

    let mut child = cmd.spawn().context("failed to spawn sidecar process")?;

    // Forward the sidecar's output into tracing.
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(async move {
            let reader = BufReader::new(stdout);
            let mut lines = reader.lines();
            while let Ok(Some(line)) = lines.next_line().await {
                // Pino emits JSON log lines; unpack level and message.
                if line.starts_with('{')
                    && let Ok(log) = serde_json::from_str::<serde_json::Value>(&line)
                {
                    let level = log.get("level").and_then(|v| v.as_u64()).unwrap_or(30);
                    let msg = log.get("msg").and_then(|v| v.as_str()).unwrap_or(&line);
                    match level {
                        10 | 20 => debug!(target: "wa_sidecar", "{}", msg),
                        30 => info!(target: "wa_sidecar", "{}", msg),
                        40 => warn!(target: "wa_sidecar", "{}", msg),
                        _ => error!(target: "wa_sidecar", "{}", msg),
                    }
                    continue;
                }
                info!(target: "wa_sidecar", "{}", line);
            }
        });
    }

    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let reader = BufReader::new(stderr);
            let mut lines = reader.lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!(target: "wa_sidecar", "{}", line);
            }
        });
    }

    // Give the process a moment to fail fast on startup errors.
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    match child.try_wait() {
        Ok(Some(status)) => {
            bail!("sidecar process exited immediately with status: {status}");
        },
        Ok(None) => {},
        Err(e) => {
            bail!("failed to check sidecar process status: {e}");
        },
    }

    info!(port = config.port, "WhatsApp sidecar process started");

    Ok(SidecarProcess {
        child,
        port: config.port,
    })
}

async fn run_npm(sidecar_dir: &Path, args: &[&str]) -> Result<()> {
    info!(path = %sidecar_dir.display(), ?args, "running npm for sidecar");

    let output = Command::new("npm")
        .args(args)
        .current_dir(sidecar_dir)
        .output()
        .await
        .context("failed to run npm")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("npm {} failed: {stderr}", args.join(" "));
    }

    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dir_requires_package_json() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_sidecar_dir(Some(dir.path())).is_err());

        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        assert_eq!(find_sidecar_dir(Some(dir.path())).unwrap(), dir.path());
    }

    #[test]
    fn built_check_looks_for_dist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_sidecar_built(dir.path()));

        std::fs::create_dir_all(dir.path().join("dist")).unwrap();
        std::fs::write(dir.path().join("dist/index.js"), "").unwrap();
        assert!(is_sidecar_built(dir.path()));
    }
}
