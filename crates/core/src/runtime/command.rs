//! Subprocess contract runtime.
//!
//! Runs `program args... <envelope>` and takes stdout as the reply. Suits
//! executors shipped as a CLI wrapper around a compiled contract module.

use async_trait::async_trait;
use tokio::process::Command;

use super::ContractRuntime;
use crate::error::InvocationError;

pub struct CommandRuntime {
    program: String,
    args: Vec<String>,
}

impl CommandRuntime {
    pub fn new(program: &str, args: Vec<String>) -> Self {
        CommandRuntime {
            program: program.to_string(),
            args,
        }
    }
}

#[async_trait]
impl ContractRuntime for CommandRuntime {
    async fn call(&self, envelope: &str) -> Result<String, InvocationError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(envelope)
            // The invoker's timeout drops this future; take the child with it.
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| InvocationError::Unreachable {
                message: format!("failed to run {}: {}", self.program, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(InvocationError::Rejected {
                message: if stderr.is_empty() {
                    format!("{} exited with {}", self.program, output.status)
                } else {
                    stderr
                },
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn runtime_id(&self) -> &str {
        "command"
    }
}
