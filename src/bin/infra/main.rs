mod args;
mod config;
mod fixture;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{Level, info, level_filters::LevelFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use infra::activation::{activate_recursively, deactivate_recursively};
use infra::entrypoint::EntryPointTable;
use infra::error::Error;
use infra::hooks::Hooks;
use infra::registry::Registry;
use infra::requirement::parse_requirement;
use infra::scanner::{ArtifactOpener, scan_directories};

use args::ParamSpec;
use config::parse_config;
use fixture::{DirArtifact, PropertiesExtractor};

const PARAMS: &[ParamSpec] = &[
    ParamSpec::value("dir", Some('d'), true),
    ParamSpec::value("module", Some('m'), true),
    ParamSpec::value("class", Some('c'), false),
    ParamSpec::value("method", None, false),
];

/// Lightweight module manager: resolve, activate, and invoke a module graph.
#[derive(Clone, Debug, Parser)]
#[command(version)]
struct HostArgs {
    /// Path to the `infra!name` configuration file.
    #[arg(long, default_value = "infra.conf")]
    config: PathBuf,
    /// Set the log filtering level.
    #[arg(name = "loglevel", long, default_value_t = Level::INFO)]
    log_level: Level,
    /// Use verbose output, equivalent to overriding log level to DEBUG.
    #[arg(short, long)]
    verbose: bool,
    /// Use noisy output, equivalent to overriding log level to TRACE.
    #[arg(short, long)]
    noisy: bool,
    /// `--dir`/`-d`, `--module`/`-m`, `--class`/`-c`, `--method`, and
    /// anything past the first unrecognized token (passed through verbatim
    /// to the invoked entry point).
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    rest: Vec<String>,
}

struct DirOpener;
impl ArtifactOpener for DirOpener {
    fn open(&self, path: &std::path::Path) -> std::io::Result<Arc<dyn infra::artifact::Artifact>> {
        Ok(DirArtifact::open(path.to_path_buf()))
    }
}

fn run(host: HostArgs) -> Result<i32, Error> {
    let parsed = args::parse(PARAMS, &host.rest).map_err(|message| Error::BadRequirementSyntax {
        input: host.rest.join(" "),
        pos: 0,
        message,
    })?;

    let cfg = match std::fs::read_to_string(&host.config) {
        Ok(text) => parse_config(&text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %host.config.display(), "no config file found, using CLI arguments only");
            config::Config::default()
        }
        Err(e) => {
            return Err(Error::ArtifactUnreadable {
                name: host.config.display().to_string(),
                cause: Box::new(e),
            });
        }
    };

    let mut directories: Vec<PathBuf> = cfg.directories;
    directories.extend(parsed.values("dir").iter().map(PathBuf::from));
    if directories.is_empty() {
        directories = infra::scanner::default_search_paths();
    }

    let mut root_modules = cfg.root_modules;
    root_modules.extend(parsed.values("module").iter().cloned());

    let registry = Registry::new();
    let metas = scan_directories(&directories, &DirOpener, &PropertiesExtractor)?;
    let count = metas.len();
    for meta in metas {
        registry.index(meta);
    }
    info!(count, "indexed modules");

    for (req, key, value) in &cfg.settings {
        registry.set_setting(req, key.clone(), value.clone());
    }

    let hooks = Hooks::new();
    let mut roots = Vec::new();
    for spec in &root_modules {
        let req = parse_requirement(spec)?;
        let meta = registry.single_candidate(&req)?;
        let module = registry.resolve(meta, true)?;
        activate_recursively(&registry, &module, &hooks)?;
        roots.push(module);
    }

    let class = parsed.value("class").map(str::to_string).or(cfg.run_class);
    let method = parsed.value("method").map(str::to_string).or(cfg.run_method);
    let mut invoke_args = cfg.run_args;
    invoke_args.extend(parsed.passthrough.iter().cloned());

    let table = EntryPointTable::new();
    let mut exit_code = 0;
    if let Some(root) = roots.first() {
        exit_code = table.invoke(&root.meta, class.as_deref(), method.as_deref(), &invoke_args)?;
    }

    for root in roots.iter().rev() {
        deactivate_recursively(&registry, root, &hooks);
    }

    Ok(exit_code)
}

fn main() {
    let host = HostArgs::parse();
    let log_level = if host.noisy {
        Level::TRACE
    } else if host.verbose {
        Level::DEBUG
    } else {
        host.log_level
    };
    tracing_subscriber::registry()
        .with(LevelFilter::from_level(log_level))
        .with(fmt::layer())
        .init();

    match run(host) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}", e.render_chain());
            std::process::exit(1);
        }
    }
}
