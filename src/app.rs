use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::controller::{Controller, ControllerOptions, RefreshOutcome};
use crate::gateway::{self, HttpGateway};
use crate::model::Field;
use crate::output::{self, OutputFormat};
use crate::pipeline::{SortDirection, SortSpec};
use crate::shell::Shell;

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ListRequest {
    search: String,
    sort: Option<SortSpec>,
    page: usize,
}

#[derive(Clone, Debug)]
struct RunConfig {
    base_url: String,
    timeout: u64,
    verbose: u8,
    no_color: bool,
    refresh_on_failure: bool,
    output_format: OutputFormat,
    list: Option<ListRequest>,
}

fn build_run_config(
    args: CliArgs,
    cfg: ConfigFile,
    env_base_url: Option<String>,
) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = if args.color {
        false
    } else {
        args.no_color || cfg.no_color.unwrap_or(false)
    };

    let base_url = args
        .base_url
        .or(env_base_url)
        .or(cfg.base_url)
        .map(|u| gateway::normalize_base_url(&u))
        .filter(|u| !u.is_empty())
        .ok_or_else(|| {
            format!(
                "no API base URL: pass --base-url, set {}, or set base_url in the config file",
                config::BASE_URL_ENV_VARS[0]
            )
        })?;

    let verbose = if args.verbose > 0 {
        args.verbose
    } else {
        cfg.verbose.unwrap_or(0)
    };

    let timeout = args.timeout.or(cfg.timeout).unwrap_or(10);
    if timeout == 0 {
        return Err("invalid timeout, expected a positive number of seconds".to_string());
    }

    let refresh_on_failure = if args.no_refresh_on_failure {
        false
    } else {
        cfg.refresh_on_failure.unwrap_or(true)
    };

    let output_format_raw = args
        .output_format
        .or(cfg.output_format)
        .unwrap_or_else(|| "text".to_string());
    let output_format = OutputFormat::parse(&output_format_raw)
        .ok_or_else(|| format!("invalid output format '{output_format_raw}'"))?;

    let list = if args.list {
        let sort = match args.sort.as_deref() {
            Some(raw) => {
                let field =
                    Field::parse(raw).ok_or_else(|| format!("invalid --sort '{raw}'"))?;
                Some(SortSpec {
                    field,
                    direction: if args.desc {
                        SortDirection::Descending
                    } else {
                        SortDirection::Ascending
                    },
                })
            }
            None => None,
        };
        Some(ListRequest {
            search: args.search.unwrap_or_default(),
            sort,
            page: args.page.unwrap_or(1),
        })
    } else {
        None
    };

    Ok(RunConfig {
        base_url,
        timeout,
        verbose,
        no_color,
        refresh_on_failure,
        output_format,
        list,
    })
}

fn init_tracing(verbose: u8, no_color: bool) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("stockview={level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(!no_color)
        .try_init();
}

async fn run_list<G: gateway::Gateway>(
    controller: &mut Controller<G>,
    request: &ListRequest,
    format: OutputFormat,
) -> Result<(), String> {
    if let RefreshOutcome::Failed(e) = controller.refresh().await {
        return Err(format!("failed to fetch products: {e}"));
    }

    controller.set_search(&request.search);
    if let Some(spec) = request.sort {
        controller.click_header(spec.field);
        if spec.direction == SortDirection::Descending {
            controller.click_header(spec.field);
        }
    }
    if !controller.goto_page(request.page) {
        return Err(format!(
            "page {} out of range (1-{})",
            request.page,
            controller.page().total_pages.max(1)
        ));
    }

    let state = controller.state();
    match format {
        OutputFormat::Text => print!("{}", output::render_table(&state.page(), &state.view)),
        OutputFormat::Json => {
            use std::io::Write;
            let body = output::render_json(&state.page(), &state.view)?;
            std::io::stdout()
                .write_all(&body)
                .map_err(|e| format!("failed to write output: {e}"))?;
        }
    }
    Ok(())
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }

    let gateway = HttpGateway::new(&run.base_url, run.timeout).map_err(|e| e.to_string())?;
    let mut controller = Controller::new(
        gateway,
        ControllerOptions {
            refresh_on_failure: run.refresh_on_failure,
        },
    );

    if let Some(request) = run.list.as_ref() {
        return run_list(&mut controller, request, run.output_format).await;
    }

    println!("{}", "Product".bold());
    format_kv_line("API", controller.gateway().base_url());
    format_kv_line("Timeout", &format!("{}s", run.timeout));
    format_kv_line("Refresh", format_bool(run.refresh_on_failure));
    println!();

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut shell = Shell::new(&mut controller, stdin, std::io::stdout(), true);
    shell.refresh().await?;
    shell.run().await
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => {
                print!("{}", e.render());
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    let (config_path, explicit) = match args.config.as_deref() {
        Some(p) => (Some(config::expand_tilde(p)), true),
        None => (config::default_config_path(), false),
    };

    if args.init_config {
        let path = config_path.ok_or_else(|| "cannot determine config path".to_string())?;
        if config::ensure_default_config_file(&path)? {
            format_kv_line("Config", &format!("written to {}", path.display()));
        } else {
            format_kv_line("Config", &format!("{} already exists", path.display()));
        }
        return Ok(());
    }

    let cfg = match config_path.as_ref() {
        Some(path) => config::load_config(path, !explicit)?,
        None => ConfigFile::default(),
    };

    let run = build_run_config(args, cfg, config::base_url_from_env())?;
    init_tracing(run.verbose, run.no_color);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}
