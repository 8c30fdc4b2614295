use crate::cli::CallArgs;
use crate::error::{CliError, CliResult};
use crate::utils::{format_duration, ColoredOutput};
use futures::StreamExt;
use reqwest::Method;
use restkit_config::ClientSettings;
use restkit_core::{ApiResult, ClientCache, ConcurrencyAdapter};
use serde_json::Value as JsonValue;
use std::time::Instant;
use tracing::{debug, info};

pub struct CallCommand;

impl CallCommand {
    pub async fn run(
        settings: ClientSettings,
        method: Method,
        args: CallArgs,
        data: Option<String>,
    ) -> CliResult<()> {
        let cache = ClientCache::new();
        let started = Instant::now();
        let results = Self::execute(&cache, settings, method, &args, data).await?;

        for value in &results {
            println!("{}", serde_json::to_string_pretty(value)?);
        }

        let stats = cache.stats();
        eprintln!(
            "{} {}",
            ColoredOutput::success("done"),
            ColoredOutput::dim(&format!(
                "{} call(s) in {}, clients built: {}, cache hits: {}",
                results.len(),
                format_duration(started.elapsed()),
                stats.builds,
                stats.hits
            ))
        );
        Ok(())
    }

    /// Run the call `args.repeat` times through `cache` and return the decoded bodies
    pub async fn execute(
        cache: &ClientCache,
        mut settings: ClientSettings,
        method: Method,
        args: &CallArgs,
        data: Option<String>,
    ) -> CliResult<Vec<JsonValue>> {
        Self::apply_args(&mut settings, args);
        settings.validate()?;

        let endpoint = args
            .endpoint
            .clone()
            .or_else(|| settings.endpoint.clone())
            .ok_or_else(|| {
                CliError::InvalidArgument(
                    "no endpoint: pass --endpoint or set it in the settings file".to_string(),
                )
            })?;
        let body = data
            .map(|raw| serde_json::from_str::<JsonValue>(&raw))
            .transpose()?;

        cache.set_timeouts(settings.timeout_settings());

        let mut results = Vec::new();
        for attempt in 1..=args.repeat.max(1) {
            let handle = cache.get_or_build(settings.client_options(&endpoint))?;
            debug!("call {} via client built at {}", attempt, handle.built_at());

            let value = if args.stream {
                let mut stream = handle.stream_call::<JsonValue, JsonValue>(
                    method.clone(),
                    args.path.clone(),
                    body.clone(),
                )?;
                stream
                    .next()
                    .await
                    .ok_or_else(|| CliError::General("stream ended without a result".to_string()))??
            } else {
                match handle
                    .call_result::<JsonValue, JsonValue>(method.clone(), &args.path, body.as_ref())
                    .await
                {
                    ApiResult::Success(value) => value,
                    ApiResult::ApiError { status, body } => {
                        eprintln!(
                            "{} HTTP {} {}",
                            ColoredOutput::error("Error:"),
                            status,
                            body.unwrap_or_default()
                        );
                        return Err(CliError::CallFailed { status });
                    }
                    ApiResult::Error(e) => return Err(e.into()),
                }
            };
            results.push(value);
        }

        info!("{} {} finished", method, args.path);
        Ok(results)
    }

    fn apply_args(settings: &mut ClientSettings, args: &CallArgs) {
        if let Some(serialization) = args.serialization {
            settings.serialization = serialization.into();
        }
        if args.stream {
            settings.concurrency = ConcurrencyAdapter::Stream;
        }
        if args.log_body {
            settings.logging = true;
        }
        if let Some(secs) = args.connect_timeout {
            settings.timeouts.connect_secs = secs;
        }
        if let Some(secs) = args.read_timeout {
            settings.timeouts.read_secs = secs;
        }
        if let Some(secs) = args.write_timeout {
            settings.timeouts.write_secs = secs;
        }
    }
}
