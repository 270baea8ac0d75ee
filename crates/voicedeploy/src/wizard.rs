//! Interactive deployment wizard (`voicedeploy` with no subcommand).
//!
//! Walks through the instance, language, screen-pop and survey choices,
//! saves them into the working directory, then deploys the stack.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::{Confirm, Input, Select};

use voicedeploy_connect::{PermissionUpdate, RemoteLookup};
use voicedeploy_flows::{region_for_language, FeatureSet, InboundTemplate, DEFAULT_LANGUAGE};
use voicedeploy_logging::{LogEvent, LogFormat, Logger};
use voicedeploy_stack::Operation;
use voicedeploy_store::{
    stack_name_for, InstanceReference, SecurityProfileReference, SurveyMessages, TenantConfig,
    DEFAULT_STACK_NAME, ROSTER_FILE,
};

use crate::output::{self, Cancelled};
use crate::pipeline::{open_run_logger, Pipeline};

const DEFAULT_DESCRIPTION: &str = "Voice channel deployment";

struct VoiceChoice {
    language: String,
    voice: String,
    region: &'static str,
}

pub async fn run_wizard(pipeline: &Pipeline, lookup: &RemoteLookup, format: LogFormat) -> Result<i32> {
    output::banner();
    let tool = pipeline.tool();
    pipeline.ensure_tool(tool.as_ref()).await?;
    let logger = Logger::new(format);

    match collect(pipeline, lookup, &logger).await {
        Ok(()) => {}
        Err(e) if e.is::<Cancelled>() => {
            eprintln!("  Cancelled.");
            return Ok(0);
        }
        Err(e) => return Err(e),
    }

    let params = pipeline.parameters()?;
    let logger = open_run_logger(format, Operation::Deploy, &params.stack_name);
    let config = pipeline.build(&params, tool.as_ref(), &logger)?;

    logger.log(&LogEvent::OperationStarted {
        operation: Operation::Deploy.to_string(),
        tenant_name: params.tenant_name.clone(),
        stack_name: params.stack_name.clone(),
        working_dir: pipeline.settings().working_dir.clone(),
    });

    let interrupted = install_interrupt_handler()?;
    let outcome = pipeline
        .run(tool.as_ref(), Operation::Deploy, &config, logger, interrupted)
        .await?;

    output::print_outcome(&outcome);
    Ok(outcome.exit_code())
}

/// Ctrl+C stops the stack watch; the tool process finishes on its own.
pub fn install_interrupt_handler() -> Result<Arc<AtomicBool>> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted. Stopping the stack watch...");
        flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;
    Ok(interrupted)
}

async fn collect(pipeline: &Pipeline, lookup: &RemoteLookup, logger: &Logger) -> Result<()> {
    let (instance, _profile) = step_instance(lookup, logger).await?;
    let choice = step_language(pipeline)?;
    let screen_pop = step_screen_pop()?;
    let survey = step_survey(pipeline, choice.region)?;
    step_review(pipeline, &instance, &choice, FeatureSet::new(screen_pop, survey))
}

fn confirm(prompt: &str, default: bool) -> Result<()> {
    if Confirm::new().with_prompt(prompt).default(default).interact()? {
        Ok(())
    } else {
        Err(Cancelled.into())
    }
}

fn required_text(prompt: &str, default: Option<String>) -> Result<String> {
    let mut input = Input::<String>::new().with_prompt(prompt);
    if let Some(default) = default {
        input = input.default(default);
    }
    let value = input
        .validate_with(|value: &String| -> Result<(), &'static str> {
            if value.trim().is_empty() {
                Err("Value cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    Ok(value.trim().to_string())
}

async fn step_instance(
    lookup: &RemoteLookup,
    logger: &Logger,
) -> Result<(InstanceReference, SecurityProfileReference)> {
    output::header(1, "Confirm the Amazon Connect instance");

    let cached = lookup.cached_instance().unwrap_or_default();
    let identifier = required_text(
        "Amazon Connect instance ARN (or ID)",
        cached.map(|instance| instance.arn),
    )?;

    eprintln!("  {}", "Verifying Connect instance...".dimmed());
    let instance = lookup
        .resolve_instance(&identifier)
        .await
        .context("Failed to verify the Connect instance")?;
    logger.log(&LogEvent::InstanceVerified {
        id: instance.id.clone(),
        arn: instance.arn.clone(),
    });

    let profile = lookup
        .resolve_security_profile(&instance)
        .await
        .context("Failed to find the Agent security profile")?;
    logger.log(&LogEvent::ProfileResolved {
        name: profile.name.clone(),
        arn: profile.arn.clone(),
    });

    match lookup.widen_permissions(&instance, &profile, &[]).await {
        PermissionUpdate::Applied(permissions) => logger.log(&LogEvent::PermissionsUpdated {
            count: permissions.len(),
        }),
        PermissionUpdate::Degraded(reason) => {
            logger.log(&LogEvent::PermissionsDegraded { reason })
        }
    }

    confirm("Continue with this Connect instance?", true)?;
    Ok((instance, profile))
}

fn step_language(pipeline: &Pipeline) -> Result<VoiceChoice> {
    output::header(2, "Choose the IVR language and voice");

    let languages = pipeline.catalog().languages()?;
    let categories = languages.categories();
    if categories.is_empty() {
        anyhow::bail!("The language list is empty");
    }

    let items: Vec<String> = categories
        .iter()
        .map(|category| {
            let shown: Vec<&str> = category.variants.iter().take(3).map(String::as_str).collect();
            let more = if category.variants.len() > 3 { ", ..." } else { "" };
            format!("{} ({}{})", category.label, shown.join(", "), more)
        })
        .collect();
    let default_category = categories
        .iter()
        .position(|c| c.variants.iter().any(|v| v == DEFAULT_LANGUAGE))
        .unwrap_or(0);

    let picked = Select::new()
        .with_prompt("Language")
        .items(&items)
        .default(default_category)
        .interact()?;
    let variants = &categories[picked].variants;

    let language = if variants.len() == 1 {
        variants[0].clone()
    } else {
        let default_variant = variants
            .iter()
            .position(|v| v == DEFAULT_LANGUAGE)
            .unwrap_or(0);
        let index = Select::new()
            .with_prompt("Variant")
            .items(variants)
            .default(default_variant)
            .interact()?;
        variants[index].clone()
    };

    let voices = languages.voices(&language);
    if voices.is_empty() {
        anyhow::bail!("No voices listed for {}", language);
    }
    let voice_items: Vec<String> = voices
        .iter()
        .map(|v| format!("{} ({})", v.voice, v.gender))
        .collect();
    let index = Select::new()
        .with_prompt("Voice")
        .items(&voice_items)
        .default(0)
        .interact()?;

    let choice = VoiceChoice {
        region: region_for_language(&language),
        voice: voices[index].voice.clone(),
        language,
    };

    output::summary("Language", &choice.language);
    output::summary("Voice", &choice.voice);
    confirm(
        &format!("Use {} / {}?", choice.language, choice.voice),
        true,
    )?;
    Ok(choice)
}

fn step_screen_pop() -> Result<bool> {
    output::header(3, "Screen pop");
    eprintln!("  Shows the caller's customer profile to the agent when a call is answered.");
    eprintln!("  Requires Amazon Connect Customer Profiles to be enabled.");
    eprintln!();

    let enable = Confirm::new()
        .with_prompt("Deploy the screen-pop flow?")
        .default(true)
        .interact()?;
    output::summary("Screen pop", output::enabled(enable));
    Ok(enable)
}

fn step_survey(pipeline: &Pipeline, region: &str) -> Result<bool> {
    output::header(4, "Post-call survey");
    eprintln!("  Plays a rating prompt after the call; callers press 1-3 to score it.");
    eprintln!();

    let enable = Confirm::new()
        .with_prompt("Deploy the survey flow?")
        .default(true)
        .interact()?;

    if enable {
        let messages = pipeline.seed_survey_messages(region)?;
        output::summary("Survey prompt", output::preview(&messages.survey_message, 50));
        output::summary(
            "Survey feedback",
            output::preview(&messages.survey_message_feedback, 50),
        );
    } else {
        pipeline.store().remove::<SurveyMessages>()?;
        output::summary("Survey", output::enabled(false));
    }
    Ok(enable)
}

fn step_review(
    pipeline: &Pipeline,
    instance: &InstanceReference,
    choice: &VoiceChoice,
    features: FeatureSet,
) -> Result<()> {
    output::header(5, "Review and deploy");

    let tenant_name = required_text("Tenant name", Some(DEFAULT_STACK_NAME.to_string()))?;
    let stack_name = stack_name_for(&tenant_name);
    if stack_name != tenant_name {
        output::note(format!(
            "Stack name set to {} (the tenant name '{}' is used for Connect resources)",
            stack_name, tenant_name
        ));
    }
    let description: String = Input::new()
        .with_prompt("Tenant description (optional)")
        .default(DEFAULT_DESCRIPTION.to_string())
        .allow_empty(true)
        .interact_text()?;

    let ivr = pipeline.seed_ivr_messages(choice.region)?;
    let hours = pipeline.seed_hours(choice.region, true)?;

    eprintln!();
    output::summary("Connect instance", &instance.arn);
    output::summary("Voice", &choice.voice);
    output::summary("Screen pop", output::enabled(features.screen_pop));
    output::summary("Survey", output::enabled(features.survey));
    output::summary("Inbound flow", InboundTemplate::select(features));
    output::summary("Tenant", &tenant_name);
    if stack_name != tenant_name {
        output::summary("Stack", &stack_name);
    }
    output::summary("Agents", ROSTER_FILE);
    output::summary("Welcome message", output::preview(&ivr.welcome_message, 40));
    output::summary("Closed message", output::preview(&ivr.open_hour_message, 40));
    output::summary("Hours", format!("{} ({})", hours.name, hours.time_zone));
    output::summary("Tool", pipeline.settings().tool);
    eprintln!();

    confirm("Start the deployment?", true)?;

    pipeline.store().save(&TenantConfig {
        tenant_name,
        stack_name: Some(stack_name),
        tenant_description: description.trim().to_string(),
        tts_voice: choice.voice.clone(),
        deploy_survey_flow: features.survey,
        deploy_screen_flow: features.screen_pop,
    })?;
    if pipeline.seed_agents()? {
        output::note(format!("Copied the sample roster to {}", ROSTER_FILE));
    }
    Ok(())
}
