use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pbgen_compiler::{
    backends::{java, rust, JavaBackend, RustBackend},
    Backend, CompileStats, Compiler, CompilerConfig, GenError, Loader, TextLoader,
};

#[derive(Parser)]
#[command(name = "pbgen")]
#[command(about = "Generate Java or Rust sources from .proto schemas", long_about = None)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Lang {
    Java,
    Rust,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate sources for every schema file under the given roots
    Gen {
        /// Target language
        #[arg(short, long, value_enum)]
        lang: Lang,

        /// Schema root; imports and skip patterns are relative to it
        #[arg(short, long)]
        proto_dir: PathBuf,

        /// Output root (overrides the config file)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Skip files whose relative path starts with this pattern (`*` matches within a segment)
        #[arg(short, long)]
        skip: Vec<String>,

        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file extension, including the dot
        #[arg(short, long)]
        ext: Option<String>,

        /// Schema files or directories; relative paths resolve against `--proto-dir`
        #[arg(required = true)]
        roots: Vec<PathBuf>,
    },

    /// Print a loaded schema file as JSON
    Dump {
        /// Schema root
        #[arg(short, long)]
        proto_dir: PathBuf,

        /// Schema file, relative to `--proto-dir` or absolute
        file: PathBuf,
    },
}

fn init_tracing(cli: &Cli) {
    let default = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

fn run<B: Backend>(
    loader: TextLoader,
    backend: B,
    config: &CompilerConfig,
    roots: &[PathBuf],
) -> Result<CompileStats, GenError> {
    Compiler::with_config(loader, backend, config)?.compile(roots)
}

fn main() -> Result<(), GenError> {
    let cli = Cli::parse();
    init_tracing(&cli);

    match cli.command {
        Commands::Gen { lang, proto_dir, out, skip, config, ext, roots } => {
            let mut config = match &config {
                Some(path) => CompilerConfig::from_path(path)?,
                None => CompilerConfig::default(),
            };
            if let Some(out) = out {
                config.out_dir = out;
            }
            if ext.is_some() {
                config.file_ext = ext;
            }
            config.skip.extend(skip);

            let loader = TextLoader::new(&proto_dir)?;
            let roots: Vec<PathBuf> = roots
                .iter()
                .map(|root| resolve_root(loader.proto_dir(), root))
                .collect();

            let stats = match lang {
                Lang::Java => {
                    let backend = JavaBackend::new(config.output(java::FILE_EXT)?);
                    run(loader, backend, &config, &roots)?
                }
                Lang::Rust => {
                    let backend = RustBackend::new(config.output(rust::FILE_EXT)?);
                    run(loader, backend, &config, &roots)?
                }
            };

            info!(
                files = stats.files,
                messages = stats.messages,
                enums = stats.enums,
                skipped = stats.skipped_files,
                "done"
            );
            println!(
                "Compiled {} files ({} messages, {} enums), skipped {} → {}",
                stats.files,
                stats.messages,
                stats.enums,
                stats.skipped_files,
                config.out_dir.display()
            );
            Ok(())
        }

        Commands::Dump { proto_dir, file } => {
            let mut loader = TextLoader::new(&proto_dir)?;
            let path = resolve_root(loader.proto_dir(), &file);
            let id = loader.load_abspath(&path)?;
            let json = serde_json::to_string_pretty(loader.graph().proto(id))?;
            println!("{}", json);
            Ok(())
        }
    }
}

fn resolve_root(proto_dir: &Path, root: &Path) -> PathBuf {
    if root.is_absolute() {
        root.to_path_buf()
    } else {
        proto_dir.join(root)
    }
}
