use breeze_ai::{
    AgentClientConfig, RunParameters, DEFAULT_AGENT_URL, DEFAULT_MAX_BUFFERED_BYTES,
    DEFAULT_RESOURCE_ID, DEFAULT_RUN_ID, DEFAULT_THREAD_ID,
};
use clap::{ArgAction, Parser};

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_unit_interval(value: &str) -> Result<f32, String> {
    let parsed = value
        .parse::<f32>()
        .map_err(|error| format!("failed to parse float: {error}"))?;
    if !parsed.is_finite() || !(0.0..=1.0).contains(&parsed) {
        return Err("value must be a finite number in range 0.0..=1.0".to_string());
    }
    Ok(parsed)
}

fn parse_temperature(value: &str) -> Result<f32, String> {
    let parsed = value
        .parse::<f32>()
        .map_err(|error| format!("failed to parse float: {error}"))?;
    if !parsed.is_finite() || !(0.0..=2.0).contains(&parsed) {
        return Err("value must be a finite number in range 0.0..=2.0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "breeze",
    about = "Terminal chat with the Breeze weather agent",
    version
)]
/// Command-line options for the `breeze` binary.
pub struct Cli {
    #[arg(
        long,
        env = "BREEZE_ENDPOINT",
        default_value = DEFAULT_AGENT_URL,
        help = "Streaming endpoint of the weather agent"
    )]
    pub endpoint: String,

    #[arg(
        long = "thread-id",
        env = "BREEZE_THREAD_ID",
        default_value = DEFAULT_THREAD_ID,
        help = "Conversation thread id sent with every request"
    )]
    pub thread_id: String,

    #[arg(
        long = "resource-id",
        env = "BREEZE_RESOURCE_ID",
        default_value = DEFAULT_RESOURCE_ID,
        help = "Resource id sent with every request"
    )]
    pub resource_id: String,

    #[arg(
        long = "run-id",
        env = "BREEZE_RUN_ID",
        default_value = DEFAULT_RUN_ID,
        help = "Run id sent with every request"
    )]
    pub run_id: String,

    #[arg(
        long = "max-retries",
        env = "BREEZE_MAX_RETRIES",
        default_value_t = 2,
        help = "Retry budget forwarded to the agent"
    )]
    pub max_retries: u32,

    #[arg(
        long = "max-steps",
        env = "BREEZE_MAX_STEPS",
        default_value_t = 5,
        help = "Maximum agent steps per reply"
    )]
    pub max_steps: u32,

    #[arg(
        long,
        env = "BREEZE_TEMPERATURE",
        default_value_t = 0.5,
        value_parser = parse_temperature,
        help = "Sampling temperature forwarded to the agent"
    )]
    pub temperature: f32,

    #[arg(
        long = "top-p",
        env = "BREEZE_TOP_P",
        default_value_t = 1.0,
        value_parser = parse_unit_interval,
        help = "Nucleus sampling value forwarded to the agent"
    )]
    pub top_p: f32,

    #[arg(
        long = "request-timeout-ms",
        env = "BREEZE_REQUEST_TIMEOUT_MS",
        default_value_t = 0,
        help = "Whole-request timeout in milliseconds, 0 disables it"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "max-buffered-bytes",
        env = "BREEZE_MAX_BUFFERED_BYTES",
        default_value_t = DEFAULT_MAX_BUFFERED_BYTES,
        value_parser = parse_positive_usize,
        help = "Largest unfinished frame held before the stream is rejected"
    )]
    pub max_buffered_bytes: usize,

    #[arg(
        long = "dev-playground-header",
        env = "BREEZE_DEV_PLAYGROUND_HEADER",
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Send the x-mastra-dev-playground header"
    )]
    pub dev_playground_header: bool,

    #[arg(
        long,
        env = "BREEZE_SOUND",
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Ring the terminal bell when a reply completes"
    )]
    pub sound: bool,

    #[arg(
        long,
        short = 'p',
        help = "Send one message, print the reply, and exit"
    )]
    pub prompt: Option<String>,
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.trim().is_empty() {
            return Err("--endpoint must not be empty".to_string());
        }
        if self.thread_id.trim().is_empty() {
            return Err("--thread-id must not be empty".to_string());
        }
        if let Some(prompt) = &self.prompt {
            if prompt.trim().is_empty() {
                return Err("--prompt must not be blank".to_string());
            }
        }
        Ok(())
    }

    pub fn client_config(&self) -> AgentClientConfig {
        AgentClientConfig {
            endpoint: self.endpoint.trim().to_string(),
            request_timeout_ms: self.request_timeout_ms,
            max_buffered_bytes: self.max_buffered_bytes,
            dev_playground_header: self.dev_playground_header,
        }
    }

    pub fn run_parameters(&self) -> RunParameters {
        RunParameters {
            run_id: self.run_id.clone(),
            thread_id: self.thread_id.clone(),
            resource_id: self.resource_id.clone(),
            max_retries: self.max_retries,
            max_steps: self.max_steps,
            temperature: self.temperature,
            top_p: self.top_p,
        }
    }
}
