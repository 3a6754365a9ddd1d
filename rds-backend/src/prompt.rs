//! Message prompts shown by an external program.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use rds_core::Prompt;
use rds_core::protocol::MessageRequest;

/// Exit status the prompt program uses for "failed".
const FAILURE_STATUS: i32 = 255;

/// Runs `program <type> <style> <timeout> [parameters...]` and answers
/// with its exit code.
#[derive(Debug, Clone)]
pub struct CommandPrompt {
    program: String,
}

impl CommandPrompt {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, request: &MessageRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(request.message_type.to_string())
            .arg(request.style.to_string())
            .arg(request.timeout.to_string())
            .args(&request.parameters)
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Prompt for CommandPrompt {
    async fn show(&self, request: MessageRequest) -> i32 {
        let status = match self.command(&request).status().await {
            Ok(status) => status,
            Err(e) => {
                warn!(program = %self.program, "prompt failed to start: {e}");
                return -1;
            }
        };
        let result = match status.code() {
            Some(FAILURE_STATUS) | None => -1,
            Some(code) => code,
        };
        debug!(message_id = request.message_id, result, "prompt finished");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(parameters: &[&str]) -> MessageRequest {
        MessageRequest {
            message_id: 1,
            message_type: 2,
            style: 0,
            timeout: 0,
            parameters: parameters.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn missing_program_fails() {
        let prompt = CommandPrompt::new("/nonexistent/rds-prompt");
        assert_eq!(prompt.show(request(&[])).await, -1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_code_is_the_answer() {
        let prompt = CommandPrompt::new("true");
        assert_eq!(prompt.show(request(&["hello"])).await, 0);

        let prompt = CommandPrompt::new("false");
        assert_eq!(prompt.show(request(&[])).await, 1);
    }
}
