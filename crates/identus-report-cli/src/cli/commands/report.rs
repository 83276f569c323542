use std::time::Duration;

use identus_report::config::parse_site_url;
use identus_report::{Environment, PipelineConfig, ReportError, ReportPipeline, RunStatus};

use crate::cli::args::ReportArgs;
use crate::exit_codes;

pub async fn run(args: ReportArgs) -> anyhow::Result<i32> {
    let Some(blob) = args.environment.as_deref() else {
        eprintln!("error: no environment given (set ENV or pass --env)");
        return Ok(exit_codes::CONFIG_ERROR);
    };

    let env = match Environment::decode(blob) {
        Ok(env) => env,
        Err(e) => return Ok(config_error(&e)),
    };
    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => return Ok(config_error(&e)),
    };

    let pipeline = match ReportPipeline::from_config(config) {
        Ok(pipeline) => pipeline,
        Err(e) => return Ok(config_error(&e)),
    };

    let outcome = pipeline.run(&env).await;
    let code = match outcome.status() {
        RunStatus::Passed => exit_codes::SUCCESS,
        RunStatus::TestsFailed => exit_codes::TEST_FAILURE,
        RunStatus::StepFailed => exit_codes::PIPELINE_ERROR,
        RunStatus::NotificationFailed => exit_codes::NOTIFICATION_FAILED,
    };
    if let Some(e) = &outcome.step_error {
        eprintln!("error: {e}");
    }
    if let Some(e) = outcome.notification.error() {
        eprintln!("error: {e}");
    }
    println!("{}", outcome.report_url);
    Ok(code)
}

fn config_error(e: &ReportError) -> i32 {
    eprintln!("error: {e}");
    exit_codes::CONFIG_ERROR
}

fn build_config(args: &ReportArgs) -> Result<PipelineConfig, ReportError> {
    let mut config = PipelineConfig::from_env()?;
    if let Some(path) = &args.site_root {
        config = config.with_site_root(path);
    }
    if let Some(path) = &args.work_root {
        config = config.with_work_root(path);
    }
    if let Some(url) = &args.site_url {
        config = config.with_site_url(parse_site_url(url)?);
    }
    if let Some(url) = &args.workflow_url {
        config = config.with_workflow_url(url);
    }
    if let Some(renderer) = &args.renderer {
        config = config.with_renderer(renderer);
    }
    if let Some(secs) = args.renderer_timeout {
        config = config.with_renderer_timeout(Some(Duration::from_secs(secs)));
    }
    if let Some(policy) = &args.dedup_policy {
        config = config.with_dedup_policy(policy.parse()?);
    }
    if let Some(limit) = args.history_limit {
        config = config.with_history_limit(limit);
    }
    if args.no_notify {
        tracing::info!("failure notifications disabled by --no-notify");
        config = config.with_slack_webhook(None);
    }
    Ok(config)
}
