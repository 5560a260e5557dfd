use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Mutex;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use pansec::collectors::tools::{self, find_tool, ToolStatus};
use pansec::collectors::{Platform, ScanContext};
use pansec::config::{Config, DEFAULT_CONFIG_FILE};
use pansec::error::PanSecError;
use pansec::installer::Installer;
use pansec::output::{console, OutputFormat};
use pansec::process::{CommandRunner, SystemRunner};
use pansec::session::{Session, TargetOperation};
use pansec::ScanOptions;

#[derive(Parser)]
#[command(
    name = "pansec",
    about = "Localhost/LAN security posture checker",
    version
)]
struct Cli {
    /// Config file path
    #[arg(long, short = 'c', global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Also append logs to this file name inside the logs directory
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full security scan and write a report
    Scan {
        /// Directory for the rendered report (overrides config)
        #[arg(long, short = 'o', env = "PAN_SEC_REPORTS_DIR")]
        reports_dir: Option<PathBuf>,

        /// Report format (html, json)
        #[arg(long, short = 'f', default_value = "html")]
        format: String,

        /// Skip nmap host discovery
        #[arg(long)]
        skip_network: bool,

        /// Skip the security tool inventory
        #[arg(long)]
        skip_tools: bool,
    },

    /// Inspect, install or remove security tools
    Tools {
        #[command(subcommand)]
        action: ToolsAction,
    },

    /// Run an operation against a target host
    Op {
        operation: OpKind,

        /// Target host or IP
        #[arg(long, short = 't', default_value = "127.0.0.1")]
        target: String,
    },

    /// Generate a starter pansec.toml config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum ToolsAction {
    /// Show installed and missing tools
    List,
    /// Install a tool with the system package manager
    Install { name: String },
    /// Remove a tool with the system package manager
    Uninstall { name: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum OpKind {
    /// nmap fast scan
    Quick,
    /// nmap aggressive scan
    Full,
    /// nikto web scan
    Web,
    /// ICMP ping
    Ping,
}

impl From<OpKind> for TargetOperation {
    fn from(kind: OpKind) -> Self {
        match kind {
            OpKind::Quick => Self::QuickScan,
            OpKind::Full => Self::FullScan,
            OpKind::Web => Self::WebScan,
            OpKind::Ping => Self::Ping,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn run(cli: Cli) -> Result<i32, PanSecError> {
    if let Commands::Init { force } = cli.command {
        return cmd_init(&cli.config, force);
    }

    // Config errors must surface before any probe runs.
    let config = Config::resolve(&cli.config)?;
    init_logging(cli.verbose, &config, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Scan {
            reports_dir,
            format,
            skip_network,
            skip_tools,
        } => cmd_scan(config, reports_dir, format, skip_network, skip_tools),
        Commands::Tools { action } => cmd_tools(&config, action),
        Commands::Op { operation, target } => cmd_op(&config, operation, target),
        Commands::Init { .. } => unreachable!("handled above"),
    }
}

fn init_logging(verbose: u8, config: &Config, log_file: Option<&str>) -> Result<(), PanSecError> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = match log_file {
        Some(name) => {
            std::fs::create_dir_all(&config.paths.logs_dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(config.paths.logs_dir.join(name))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

fn cmd_scan(
    mut config: Config,
    reports_dir: Option<PathBuf>,
    format_str: String,
    skip_network: bool,
    skip_tools: bool,
) -> Result<i32, PanSecError> {
    let format = OutputFormat::from_str_lenient(&format_str).unwrap_or_else(|| {
        eprintln!("Warning: unknown format '{}', using html", format_str);
        OutputFormat::Html
    });
    if let Some(dir) = reports_dir {
        config.paths.reports_dir = dir;
    }

    let options = ScanOptions {
        skip_network,
        skip_tools,
    };

    println!("Starting security scan...");
    let report = pansec::scan(&config, &options);
    let path = pansec::write_report(&report, format, &config.paths.reports_dir)?;
    print!("{}", console::render(&report, Some(&path)));

    // Findings are data, not a failed scan.
    Ok(0)
}

fn cmd_tools(config: &Config, action: ToolsAction) -> Result<i32, PanSecError> {
    let runner = SystemRunner;
    let platform = Platform::current();

    match action {
        ToolsAction::List => {
            let ctx = ScanContext::new(config, &runner);
            let assessment = tools::assess(&ctx);
            println!(
                "{:<12} {:<10} {:<12} {:<12} VERSION",
                "TOOL", "CATEGORY", "STATUS", "PACKAGE"
            );
            println!("{}", "-".repeat(80));
            for info in &assessment.tools {
                let package = find_tool(&info.name)
                    .map(|t| t.package_name())
                    .unwrap_or("-");
                println!(
                    "{:<12} {:<10} {:<12} {:<12} {}",
                    info.name,
                    info.category.to_string(),
                    info.status.to_string(),
                    package,
                    info.version.as_deref().unwrap_or("-"),
                );
            }
            println!(
                "\n{} of {} tools missing",
                assessment.missing_count(),
                assessment.tools.len()
            );
            Ok(0)
        }
        ToolsAction::Install { name } => {
            let Some(tool) = find_tool(&name) else {
                return Ok(unknown_tool(&name));
            };
            if runner.which(tool.name).is_some() {
                println!("{} is already {}", tool.name, ToolStatus::Installed);
                return Ok(0);
            }
            let ok = Installer::new(platform, &runner).install(tool);
            report_install(ok, "Installed", tool.package_name())
        }
        ToolsAction::Uninstall { name } => {
            let Some(tool) = find_tool(&name) else {
                return Ok(unknown_tool(&name));
            };
            let ok = Installer::new(platform, &runner).uninstall(tool);
            report_install(ok, "Uninstalled", tool.package_name())
        }
    }
}

fn unknown_tool(name: &str) -> i32 {
    eprintln!("Unknown tool '{}'. Run `pansec tools list` for the catalog.", name);
    1
}

fn report_install(ok: bool, verb: &str, package: &str) -> Result<i32, PanSecError> {
    if ok {
        println!("{} {}", verb, package);
        Ok(0)
    } else {
        Err(PanSecError::Installer(format!(
            "package manager could not process '{}' (see log output)",
            package
        )))
    }
}

fn cmd_op(config: &Config, kind: OpKind, target: String) -> Result<i32, PanSecError> {
    let session = Session::new(target)?;
    let op = TargetOperation::from(kind);
    let runner = SystemRunner;

    println!("Running {} against {}", op.command(session.target()), session.target());
    let out = session.run(op, &runner, config)?;
    if !out.stdout.is_empty() {
        println!("{}", out.stdout);
    }
    if !out.stderr.is_empty() {
        eprintln!("{}", out.stderr);
    }
    Ok(if out.success() { 0 } else { 1 })
}

fn cmd_init(path: &Path, force: bool) -> Result<i32, PanSecError> {
    if path.exists() && !force {
        eprintln!("{} already exists. Use --force to overwrite.", path.display());
        return Ok(1);
    }

    std::fs::write(path, Config::starter_toml())?;
    println!("Created {}", path.display());

    Ok(0)
}
