#![forbid(unsafe_code)]

//! transformable CLI: serialize XML documents through chains of rule sheets.

use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;
use transformable::{
    Charset, Error, MediaType, Output, ProgramSlot, Transformable, TransformSettings,
    TransformableDocument,
};
use transformable::engine::Engines;

#[derive(Parser)]
#[command(
    name = "transformable",
    about = "Serialize XML documents through chains of compiled transforms",
    version
)]
struct Cli {
    /// Log debug diagnostics to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a document through a transform chain
    Render {
        /// Input XML file
        input: PathBuf,

        #[command(flatten)]
        chain: ChainArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the content type a transform chain would produce
    ContentType {
        #[command(flatten)]
        chain: ChainArgs,
    },

    /// Show engine capabilities
    Info,
}

#[derive(Args)]
struct ChainArgs {
    /// Rule sheet to apply, in order; `-` leaves the slot empty
    #[arg(short, long = "rules", value_name = "FILE")]
    rules: Vec<String>,

    /// Parameter bound on every stage (NAME=VALUE)
    #[arg(short, long = "param", value_name = "NAME=VALUE")]
    param: Vec<String>,

    /// Output media type
    #[arg(long)]
    media_type: Option<String>,

    /// Output character encoding
    #[arg(long)]
    encoding: Option<String>,

    /// Document type system identifier
    #[arg(long)]
    system_id: Option<String>,

    /// Document type public identifier
    #[arg(long)]
    public_id: Option<String>,

    /// Indent element-only content
    #[arg(long)]
    indent: bool,

    /// Omit the XML declaration
    #[arg(long)]
    omit_declaration: bool,

    /// Prefer the incremental engine
    #[arg(long)]
    incremental: bool,
}

impl ChainArgs {
    fn apply(&self, settings: &TransformSettings) -> Result<(), Error> {
        if !self.rules.is_empty() {
            let slots = self
                .rules
                .iter()
                .map(|rules| compile(settings.engines(), rules))
                .collect::<Result<Vec<ProgramSlot>, Error>>()?;
            settings.set_transformations(Some(slots));
        }
        for param in &self.param {
            let (name, value) = param.split_once('=').ok_or_else(|| {
                Error::Other(format!("invalid parameter: {param} (expected NAME=VALUE)"))
            })?;
            settings.set_parameter(name, value);
        }
        if let Some(media_type) = &self.media_type {
            settings.set_media_type(Some(MediaType::parse(media_type)?));
        }
        if let Some(encoding) = &self.encoding {
            settings.set_encoding(Some(Charset::for_name(encoding)?));
        }
        settings.set_system_id(self.system_id.clone());
        settings.set_public_id(self.public_id.clone());
        settings.set_indent(self.indent);
        settings.set_omit_declaration(self.omit_declaration);
        settings.set_incremental(self.incremental);
        Ok(())
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Render {
            input,
            chain,
            output,
        } => cmd_render(&input, &chain, output),
        Commands::ContentType { chain } => cmd_content_type(&chain),
        Commands::Info => cmd_info(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .ok();
}

fn cmd_render(input: &Path, chain: &ChainArgs, output: Option<PathBuf>) -> Result<(), Error> {
    let data = std::fs::read(input)
        .map_err(|e| Error::Other(format!("{}: {e}", input.display())))?;
    let doc = TransformableDocument::parse_bytes(&data)?;
    chain.apply(doc.settings())?;
    tracing::debug!(input = %input.display(), "rendering");

    match output {
        Some(path) => {
            let file = File::create(&path)
                .map_err(|e| Error::Other(format!("{}: {e}", path.display())))?;
            let mut out = BufWriter::new(file);
            doc.transform(Output::stream(&mut out))?;
            out.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            doc.transform(Output::stream(&mut out))?;
        }
    }
    Ok(())
}

fn cmd_content_type(chain: &ChainArgs) -> Result<(), Error> {
    let settings = TransformSettings::new();
    chain.apply(&settings)?;
    match settings.content_type()? {
        Some(content_type) => println!("{content_type}"),
        None => println!("(none)"),
    }
    Ok(())
}

fn cmd_info() -> Result<(), Error> {
    let engines = Engines::shared();
    println!("transformable {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Engine: {}", engines.engine_name()?);
    println!("  XHTML output:          {}", yes_no(engines.supports_xhtml_output()));
    println!("  Incremental processing: {}", yes_no(engines.supports_incremental()));
    println!();
    println!("Rule sheet instructions:");
    println!("  output, param, append-text, rename, set-attribute, strip");
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn compile(engines: &Engines, rules: &str) -> Result<ProgramSlot, Error> {
    if rules == "-" {
        return Ok(None);
    }
    let path = Path::new(rules);
    let source = read_file(path)?;
    let system_id = path.display().to_string();
    engines.compile(&source, Some(&system_id)).map(Some)
}

fn read_file(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path)
        .map_err(|e| Error::Other(format!("{}: {e}", path.display())))
}
