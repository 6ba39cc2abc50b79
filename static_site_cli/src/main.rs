mod cli;

use std::ffi::OsString;

use anyhow::Context;
use cfn_stack::{Deployer, Template};
use clap::Parser;
use static_site::deployment::DeploymentRunner;
use static_site::{aws, build, AwsLookupResolver, LookupContext, ResourceGraph, StaticSiteConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, LogFormat};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Environment variables whose name and value are both UTF-8. Anything else
/// can't be a config override and is skipped.
fn utf8_vars<I>(vars: I) -> impl Iterator<Item = (String, String)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}

/// Fills in lookups the context file doesn't have yet and saves it.
async fn resolve_lookups(
    cli: &Cli,
    graph: &ResourceGraph,
    ctx: &mut LookupContext,
    offline: bool,
) -> anyhow::Result<()> {
    if !offline && !ctx.missing(graph).is_empty() {
        let sdk_config = aws::load_sdk_config(graph.region.clone()).await;
        let resolved = AwsLookupResolver::new(&sdk_config).resolve_missing(graph, ctx).await?;
        if resolved > 0 {
            ctx.save(&cli.context)
                .with_context(|| format!("Failed to save {}", cli.context.display()))?;
        }
    }
    ctx.ensure_resolved(graph)?;
    Ok(())
}

async fn synthesize(cli: &Cli, graph: &ResourceGraph, offline: bool) -> anyhow::Result<Template> {
    let mut ctx = LookupContext::load(&cli.context)?;
    resolve_lookups(cli, graph, &mut ctx, offline).await?;
    Ok(graph.to_template(&ctx)?)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = StaticSiteConfig::load(&cli.config)?;
    config.apply_env_overrides(utf8_vars(std::env::vars_os()));
    let graph = build(&config)?;
    tracing::debug!(stack = %graph.stack_name, resources = graph.resources().len(), "built resource graph");

    match &cli.command {
        Command::Synth { out, offline } => {
            let template = synthesize(&cli, &graph, *offline).await?;
            let body = template.to_json_pretty()?;
            match out {
                Some(path) => {
                    std::fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))?;
                    tracing::info!(path = %path.display(), "wrote template");
                }
                None => println!("{body}"),
            }
        }
        Command::Deploy { skip_upload } => {
            let template = synthesize(&cli, &graph, false).await?;
            let sdk_config = aws::load_sdk_config(graph.region.clone()).await;
            let outputs = Deployer::new(&sdk_config)
                .deploy(&graph.stack_name, &template, &graph.tags)
                .await?;
            for (key, value) in &outputs {
                println!("{key} = {value}");
            }
            match graph.deployment() {
                Some(directive) if !skip_upload => {
                    DeploymentRunner::new(&sdk_config).run(directive, &outputs).await?;
                }
                _ => tracing::info!("skipping site upload"),
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_format);
    run(cli).await
}
