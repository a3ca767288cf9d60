//! External program invocation (component J): runs a configured command with
//! placeholder substitution and classifies the exit status.

use crate::context::SendContext;
use crate::login::ExternalLogin;
use alarm_common::SendError;
use alarm_message::ExternalPayload;
use tokio::process::Command;
use tracing::{debug, warn};

pub struct ExternalSender;

impl ExternalSender {
    pub fn new() -> Self {
        Self
    }

    pub async fn send(
        &self,
        payload: &ExternalPayload,
        login: &ExternalLogin,
        ctx: &SendContext,
    ) -> Result<(), SendError> {
        let arguments = ctx.substitute_placeholders(&payload.arguments);
        let mut command = Command::new(&payload.command);
        command.args(arguments.split_whitespace());
        if let Some(dir) = &login.working_directory {
            command.current_dir(dir);
        }

        debug!(command = %payload.command, %arguments, "spawning external program");

        let status = command
            .status()
            .await
            .map_err(|e| SendError::Fatal(format!("failed to spawn {}: {e}", payload.command)))?;

        if status.success() {
            Ok(())
        } else {
            warn!(command = %payload.command, code = ?status.code(), "external program exited non-zero");
            Err(SendError::Fatal(format!(
                "{} exited with {status}",
                payload.command
            )))
        }
    }
}

impl Default for ExternalSender {
    fn default() -> Self {
        Self::new()
    }
}
