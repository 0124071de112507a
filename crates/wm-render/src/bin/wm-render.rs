//! `wm-render`: render pages, cards and charts of a YAML world file

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgGroup, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;
use wm_cache::RenderableId;
use wm_query::SelectParser;
use wm_render::{ContentRenderer, JsonChartBackend, MemoryWorld, RenderConfig, Services};

fn target_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("world")
                .long("world")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("YAML file describing projects, pages and cards"),
        )
        .arg(
            Arg::new("project")
                .long("project")
                .required(true)
                .help("Project identifier"),
        )
        .arg(Arg::new("page").long("page").help("Page name"))
        .arg(
            Arg::new("card")
                .long("card")
                .value_parser(value_parser!(u64))
                .help("Card number"),
        )
        .group(
            ArgGroup::new("renderable")
                .args(["page", "card"])
                .required(true),
        )
}

fn cli() -> Command {
    Command::new("wm-render")
        .version(wm_render::VERSION)
        .about("Expand wiki macros and render charts")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(target_args(
            Command::new("render").about("Print the macro-expanded content of a page or card"),
        ))
        .subcommand(
            target_args(Command::new("chart").about("Print the artifact of one chart"))
                .arg(
                    Arg::new("type")
                        .long("type")
                        .required(true)
                        .help("Chart directive name, e.g. pie-chart"),
                )
                .arg(
                    Arg::new("position")
                        .long("position")
                        .default_value("1")
                        .value_parser(value_parser!(usize))
                        .help("Position among charts of that type"),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn renderable(args: &ArgMatches) -> anyhow::Result<RenderableId> {
    let project = args
        .get_one::<String>("project")
        .context("--project is required")?;
    if let Some(page) = args.get_one::<String>("page") {
        return Ok(RenderableId::page(project.as_str(), page.as_str()));
    }
    let card = args
        .get_one::<u64>("card")
        .context("one of --page or --card is required")?;
    Ok(RenderableId::card(project.as_str(), *card))
}

fn renderer(args: &ArgMatches, config: &RenderConfig) -> anyhow::Result<ContentRenderer> {
    let path = args
        .get_one::<PathBuf>("world")
        .context("--world is required")?;
    let world = Arc::new(
        MemoryWorld::from_path(path)
            .with_context(|| format!("loading world {}", path.display()))?,
    );
    let services = Services::new(world.clone(), world.clone(), Arc::new(SelectParser));
    Ok(ContentRenderer::new(
        config,
        services,
        world,
        Arc::new(JsonChartBackend),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("json-logs"));

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => RenderConfig::from_path(path)?,
        None => RenderConfig::default(),
    };

    match matches.subcommand() {
        Some(("render", args)) => {
            let id = renderable(args)?;
            let rendered = renderer(args, &config)?.render(&id).await?;
            println!("{}", rendered.content);
            for err in &rendered.errors {
                eprintln!("{err}");
            }
            if !rendered.charts.is_empty() {
                eprintln!("{} chart(s):", rendered.charts.len());
                for chart in &rendered.charts {
                    eprintln!("  {} #{} -> {}", chart.chart_type, chart.position, chart.url);
                }
            }
        }
        Some(("chart", args)) => {
            let id = renderable(args)?;
            let chart_type = args
                .get_one::<String>("type")
                .context("--type is required")?;
            let position = args.get_one::<usize>("position").copied().unwrap_or(1);
            let artifact = renderer(args, &config)?
                .chart(&id, chart_type, position)
                .await?;
            tracing::info!(content_type = artifact.content_type(), "chart rendered");
            println!("{}", String::from_utf8_lossy(artifact.bytes()));
        }
        _ => {}
    }
    Ok(())
}
