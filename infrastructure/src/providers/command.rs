//! Command-backed provider adapter.
//!
//! Each generation spawns the configured provider client, writes the native
//! request body as JSON on stdin and reads the native response from stdout.
//! The client owns HTTP, auth and retries-on-the-wire; this adapter owns
//! encoding, decoding and error classification.
//!
//! The child sees `CADENCE_PROVIDER` and `CADENCE_MODEL` in its environment.

use super::ProviderAdapter;
use super::wire::{WireFormat, extract_error};
use async_trait::async_trait;
use cadence_application::ports::llm_gateway::{GatewayError, LlmSession};
use cadence_domain::core::string::headline;
use cadence_domain::{InvocationRequest, ModelCandidate, ProviderId, ProviderResponse};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// How to run one provider's client.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub wire: WireFormat,
    /// Environment variable that must hold the API key.
    pub api_key_env: Option<String>,
    /// Extra environment for the child.
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, wire: WireFormat) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            wire,
            api_key_env: None,
            env: BTreeMap::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_api_key_env(mut self, var: Option<String>) -> Self {
        self.api_key_env = var.filter(|v| !v.trim().is_empty());
        self
    }
}

pub struct CommandProvider {
    provider: ProviderId,
    spec: CommandSpec,
}

impl CommandProvider {
    pub fn new(provider: ProviderId, spec: CommandSpec) -> Self {
        Self { provider, spec }
    }

    fn check_credential(&self) -> Result<(), GatewayError> {
        let Some(var) = &self.spec.api_key_env else {
            return Ok(());
        };
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => Ok(()),
            _ => Err(GatewayError::MissingCredential(format!(
                "environment variable {} is not set for provider '{}'",
                var, self.provider
            ))),
        }
    }
}

#[async_trait]
impl ProviderAdapter for CommandProvider {
    fn provider(&self) -> &ProviderId {
        &self.provider
    }

    async fn create_session(
        &self,
        candidate: &ModelCandidate,
    ) -> Result<Box<dyn LlmSession>, GatewayError> {
        if candidate.provider != self.provider {
            return Err(GatewayError::UnknownProvider(format!(
                "adapter for '{}' cannot serve '{}'",
                self.provider, candidate.provider
            )));
        }
        self.check_credential()?;

        let program = which::which(&self.spec.program).map_err(|_| {
            GatewayError::UnknownProvider(format!(
                "provider command '{}' not found for '{}'",
                self.spec.program, self.provider
            ))
        })?;

        debug!(
            "Opened {} session for {} via {}",
            self.spec.wire,
            candidate,
            program.display()
        );
        Ok(Box::new(CommandSession {
            candidate: candidate.clone(),
            program,
            spec: self.spec.clone(),
        }))
    }
}

pub struct CommandSession {
    candidate: ModelCandidate,
    program: PathBuf,
    spec: CommandSpec,
}

impl CommandSession {
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.spec.args)
            .envs(&self.spec.env)
            .env("CADENCE_PROVIDER", self.candidate.provider.as_str())
            .env("CADENCE_MODEL", &self.candidate.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Linux: request kernel to send SIGTERM to child when parent dies.
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }
        cmd
    }
}

#[async_trait]
impl LlmSession for CommandSession {
    fn candidate(&self) -> &ModelCandidate {
        &self.candidate
    }

    async fn generate(&self, request: &InvocationRequest) -> Result<ProviderResponse, GatewayError> {
        let body = self.spec.wire.encode(&self.candidate.model, request);
        let payload = serde_json::to_vec(&body)
            .map_err(|e| GatewayError::InvalidRequest(format!("cannot encode request: {}", e)))?;

        let mut child = self.command().spawn().map_err(|e| {
            GatewayError::ConnectionError(format!(
                "failed to start {}: {}",
                self.program.display(),
                e
            ))
        })?;

        // Feed stdin concurrently so a chatty child cannot block on a full stdout pipe.
        let writer = child.stdin.take().map(|mut stdin| {
            tokio::spawn(async move {
                stdin.write_all(&payload).await?;
                stdin.shutdown().await
            })
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| GatewayError::ConnectionError(e.to_string()))?;

        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {}
                // A client that answers before reading its whole input closes the pipe early.
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => return Err(GatewayError::ConnectionError(e.to_string())),
                Err(_) => return Err(GatewayError::TransportClosed),
            }
        }

        if output.status.success() {
            return self.spec.wire.decode(&output.stdout);
        }
        Err(exit_error(output.status.code(), &output.stdout, &output.stderr))
    }
}

/// Error for a non-zero exit: a structured error object on stdout wins,
/// otherwise stderr is classified by message.
fn exit_error(code: Option<i32>, stdout: &[u8], stderr: &[u8]) -> GatewayError {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(stdout)
        && let Some(error) = extract_error(&value)
    {
        return error;
    }
    let stderr = String::from_utf8_lossy(stderr);
    let status = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
    if stderr.trim().is_empty() {
        return GatewayError::ConnectionError(format!("provider client exited with status {}", status));
    }
    GatewayError::Other(format!(
        "provider client exited with status {}: {}",
        status,
        headline(&stderr, 300)
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use cadence_domain::FailureKind;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh", WireFormat::OpenAi).with_args(vec!["-c".into(), script.into()])
    }

    fn candidate() -> ModelCandidate {
        ModelCandidate::new(ProviderId::OpenAi, "gpt-4.1-mini")
    }

    async fn generate(spec: CommandSpec) -> Result<ProviderResponse, GatewayError> {
        let provider = CommandProvider::new(ProviderId::OpenAi, spec);
        let session = provider.create_session(&candidate()).await?;
        session
            .generate(&InvocationRequest::prompt(None, "hello"))
            .await
    }

    #[tokio::test]
    async fn test_decodes_stdout() {
        let response = generate(sh(
            r#"cat >/dev/null; echo '{"choices":[{"message":{"content":"hi from '"$CADENCE_MODEL"'"}}],"usage":{"prompt_tokens":2,"completion_tokens":3}}'"#,
        ))
        .await
        .unwrap();

        assert_eq!(response.first_choice().unwrap().content, "hi from gpt-4.1-mini");
        assert_eq!(response.usage.unwrap().total_tokens, 5);
    }

    #[tokio::test]
    async fn test_request_body_on_stdin() {
        let response = generate(sh(
            r#"body=$(cat); case "$body" in *'"content":"hello"'*) echo '{"choices":[{"message":{"content":"saw it"}}]}';; *) echo '{"choices":[]}';; esac"#,
        ))
        .await
        .unwrap();
        assert_eq!(response.first_choice().unwrap().content, "saw it");
    }

    #[tokio::test]
    async fn test_stderr_is_classified() {
        let err = generate(sh("cat >/dev/null; echo 'HTTP 429 Too Many Requests' >&2; exit 3"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::RateLimited);
    }

    #[tokio::test]
    async fn test_client_stderr_noise_stays_retryable() {
        let err = generate(sh("cat >/dev/null; echo 'upstream: context canceled' >&2; exit 1"))
            .await
            .unwrap_err();
        assert!(err.kind().is_fallback_eligible());

        let err = generate(sh(
            "cat >/dev/null; echo 'dial tcp 10.0.40.1:4031: connection refused' >&2; exit 1",
        ))
        .await
        .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Transport);
    }

    #[tokio::test]
    async fn test_structured_error_on_stdout() {
        let err = generate(sh(
            r#"cat >/dev/null; echo '{"error":{"code":503,"message":"no capacity"}}'; exit 1"#,
        ))
        .await
        .unwrap_err();
        assert_eq!(err.kind(), FailureKind::ServerError { status: Some(503) });
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_at_session_open() {
        let spec = sh("echo never").with_api_key_env(Some("CADENCE_TEST_KEY_THAT_IS_NOT_SET".into()));
        let provider = CommandProvider::new(ProviderId::OpenAi, spec);
        let err = provider.create_session(&candidate()).await.err().unwrap();
        assert_eq!(err.kind(), FailureKind::MissingCredential);
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_missing_program_is_configuration_error() {
        let spec = CommandSpec::new("cadence-no-such-client", WireFormat::OpenAi);
        let provider = CommandProvider::new(ProviderId::OpenAi, spec);
        let err = provider.create_session(&candidate()).await.err().unwrap();
        assert!(err.is_configuration());
    }
}
