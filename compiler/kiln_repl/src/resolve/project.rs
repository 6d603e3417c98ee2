//! Project and solution directives, resolved by running the build tool.
//!
//! The configured command runs with the project path appended. Each
//! non-empty line it prints on stdout is an artifact path, relative paths
//! taken from the project's directory. The child is polled so a cancelled
//! token kills it instead of waiting for the build to finish.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use kiln_refs::identity::read_identity;
use kiln_refs::{ArtifactRole, ReferenceArtifact, ResolutionError};
use kiln_script::CancellationToken;

use super::ReferenceResolver;
use crate::directive::ReferenceDirective;
use crate::error::ResolveFailure;

const SCHEME: &str = "project";
const PROJECT_EXTENSIONS: &[&str] = &["kproj", "ksln"];
const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct ProjectResolver {
    command: Vec<String>,
    base_dir: PathBuf,
}

impl ProjectResolver {
    pub fn new(command: Vec<String>, base_dir: PathBuf) -> Self {
        ProjectResolver { command, base_dir }
    }

    fn project_path<'a>(&self, directive: &'a ReferenceDirective) -> Option<&'a str> {
        if let Some(path) = directive.strip_scheme(SCHEME) {
            return Some(path);
        }
        let value = directive.value.trim();
        let extension = Path::new(value).extension()?.to_str()?;
        PROJECT_EXTENSIONS
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
            .then_some(value)
    }

    fn build(&self, project: &Path, cancel: &CancellationToken) -> Result<String, ResolveFailure> {
        let failed = |message: String| -> ResolveFailure {
            ResolutionError::BuildFailed {
                project: project.to_path_buf(),
                message,
            }
            .into()
        };

        let Some((program, leading)) = self.command.split_first() else {
            return Err(failed("no build command configured".to_string()));
        };
        let mut child = Command::new(program)
            .args(leading)
            .arg(project)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| failed(format!("cannot start '{program}': {err}")))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = loop {
            if cancel.is_cancelled() {
                kill(&mut child);
                tracing::debug!(project = %project.display(), "build cancelled");
                return Err(ResolveFailure::Cancelled);
            }
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(err) => {
                    kill(&mut child);
                    return Err(failed(err.to_string()));
                }
            }
        };

        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();
        if !status.success() {
            let detail = stderr.trim();
            return Err(failed(if detail.is_empty() {
                status.to_string()
            } else {
                detail.to_string()
            }));
        }
        Ok(stdout)
    }
}

/// Read a child pipe to the end on its own thread.
fn drain(pipe: Option<impl Read + Send + 'static>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut text = String::new();
        if let Some(mut pipe) = pipe {
            // A broken pipe leaves whatever was read.
            let _ = pipe.read_to_string(&mut text);
        }
        text
    })
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

impl ReferenceResolver for ProjectResolver {
    fn name(&self) -> &'static str {
        "project"
    }

    fn recognizes(&self, directive: &ReferenceDirective) -> bool {
        self.project_path(directive).is_some()
    }

    fn resolve(
        &self,
        directive: &ReferenceDirective,
        cancel: &CancellationToken,
    ) -> Result<Vec<Arc<ReferenceArtifact>>, ResolveFailure> {
        let relative = self.project_path(directive).unwrap_or_default();
        let project = self.base_dir.join(relative);
        if !project.is_file() {
            return Err(ResolutionError::BuildFailed {
                project,
                message: "project file not found".to_string(),
            }
            .into());
        }

        let output = self.build(&project, cancel)?;
        let project_dir = project.parent().unwrap_or(Path::new("."));
        let mut artifacts = Vec::new();
        for line in output.lines().map(str::trim).filter(|line| !line.is_empty()) {
            let path = project_dir.join(line);
            if !path.is_file() {
                return Err(ResolutionError::BuildFailed {
                    project,
                    message: format!("build reported missing artifact '{}'", path.display()),
                }
                .into());
            }
            let identity = read_identity(&path);
            artifacts.push(Arc::new(
                ReferenceArtifact::from_file(&path, ArtifactRole::ExecutionOnly)
                    .with_identity(identity),
            ));
        }
        tracing::debug!(project = %project.display(), artifacts = artifacts.len(), "build finished");
        Ok(artifacts)
    }
}
