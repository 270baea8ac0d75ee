//! `voicedeploy destroy`: tear down a tenant's stack.

use anyhow::Result;
use dialoguer::{Confirm, Input};

use voicedeploy_logging::{LogEvent, LogFormat};
use voicedeploy_stack::Operation;
use voicedeploy_store::{stack_name_for, DeployParameters, TenantConfig, DEFAULT_STACK_NAME};

use crate::output;
use crate::pipeline::{open_run_logger, Pipeline};
use crate::wizard::install_interrupt_handler;

/// Tenant and stack to tear down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub tenant_name: String,
    pub stack_name: String,
}

/// Reuse the saved stack name when the tenant matches the last deployment;
/// otherwise derive it from the tenant name.
pub fn target_for(tenant_name: &str, saved: Option<&TenantConfig>) -> Target {
    let tenant_name = tenant_name.trim().to_string();
    let stack_name = match saved {
        Some(config) if config.tenant_name == tenant_name => config.effective_stack_name(),
        _ => stack_name_for(&tenant_name),
    };
    Target {
        tenant_name,
        stack_name,
    }
}

pub async fn handle_destroy(
    pipeline: &Pipeline,
    tenant: Option<String>,
    assume_yes: bool,
    format: LogFormat,
) -> Result<i32> {
    output::banner();
    let tool = pipeline.tool();
    pipeline.ensure_tool(tool.as_ref()).await?;

    let saved = pipeline.store().load_optional::<TenantConfig>()?;
    let tenant_name = match tenant {
        Some(name) => name,
        None => {
            let default = saved
                .as_ref()
                .map(|config| config.tenant_name.clone())
                .unwrap_or_else(|| DEFAULT_STACK_NAME.to_string());
            Input::<String>::new()
                .with_prompt("Tenant to destroy")
                .default(default)
                .interact_text()?
        }
    };
    if tenant_name.trim().is_empty() {
        anyhow::bail!("Tenant name cannot be empty");
    }
    let target = target_for(&tenant_name, saved.as_ref());

    eprintln!();
    output::warning(format!(
        "This deletes stack {} and every Connect resource it created for {}.",
        target.stack_name, target.tenant_name
    ));
    if !assume_yes {
        let proceed = Confirm::new()
            .with_prompt("Destroy the stack?")
            .default(false)
            .interact()?;
        if !proceed {
            eprintln!("  Cancelled.");
            return Ok(0);
        }
    }

    let params = DeployParameters::for_destroy(&target.tenant_name, &target.stack_name);
    let (config, placeholders) = pipeline.prepare_destroy(&params, tool.as_ref())?;

    let logger = open_run_logger(format, Operation::Destroy, &target.stack_name);
    logger.log(&LogEvent::OperationStarted {
        operation: Operation::Destroy.to_string(),
        tenant_name: target.tenant_name.clone(),
        stack_name: target.stack_name.clone(),
        working_dir: pipeline.settings().working_dir.clone(),
    });

    let interrupted = install_interrupt_handler()?;
    let result = pipeline
        .run(tool.as_ref(), Operation::Destroy, &config, logger, interrupted)
        .await;
    pipeline.remove_placeholders(&placeholders);

    let outcome = result?;
    output::print_outcome(&outcome);
    Ok(outcome.exit_code())
}
