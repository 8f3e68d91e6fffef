use std::path::Path;
use std::path::PathBuf;

use clap::Parser;

use augscript::aug;
use augscript::config::{self, Options};
use augscript::explain;
use augscript::suggest;

#[derive(Parser)]
#[command(
    name = "augscript",
    version,
    about = "Emit an augtool set-script that rebuilds a config file with stable, content-based paths"
)]
struct Cli {
    /// Configuration file to read (must be covered by an Augeas lens)
    file: Option<PathBuf>,

    /// Pad predicate values and separate sibling blocks with blank lines
    #[arg(long)]
    pretty: bool,

    /// Relax predicate values into prefix regexps of at least LEN characters
    #[arg(
        long,
        value_name = "LEN",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "8"
    )]
    regexp: Option<usize>,

    /// Address numbered entries as /*/ instead of /seq::*/
    #[arg(long)]
    noseq: bool,

    /// Rename the loaded subtree to this absolute path before emission
    #[arg(long, value_name = "PATH")]
    target: Option<String>,

    /// Lens module to apply instead of autodetection (e.g. "Hosts")
    #[arg(long, value_name = "LENS")]
    lens: Option<String>,

    /// Additional lens search directory (repeatable)
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    include: Vec<String>,

    /// Print the disambiguation analysis as JSON instead of the script
    #[arg(long)]
    explain: bool,

    /// Show subprocess and resolution details
    #[arg(short, long)]
    verbose: bool,
}

fn build_options(cli: &Cli) -> Options {
    let mut opts = Options {
        pretty: cli.pretty,
        regexp: cli.regexp,
        noseq: cli.noseq,
        target: cli.target.clone(),
        lens: cli.lens.clone(),
        lens_dirs: cli.include.clone(),
        verbose: cli.verbose,
    };
    opts.apply_user_config(&config::load_user_config());
    opts
}

fn cmd_suggest(file: &Path, cli: &Cli) -> anyhow::Result<i32> {
    let opts = build_options(cli);
    if let Some(target) = &opts.target
        && !target.starts_with('/')
    {
        anyhow::bail!("--target must be an absolute path, got {target}");
    }

    let pairs = aug::read_tree(file, &opts)?;
    if cli.verbose {
        eprintln!("[augscript] {} entries read", pairs.len());
    }

    if cli.explain {
        explain::print_json(&explain::analyze_pairs(&pairs, &opts));
    } else {
        print!("{}", suggest::render_script(&pairs, &opts));
    }
    Ok(0)
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match &cli.file {
        Some(file) => cmd_suggest(file, &cli).unwrap_or_else(|e| {
            eprintln!("[augscript] error: {e:#}");
            1
        }),
        None => {
            eprintln!("[augscript] error: no input file given");
            1
        }
    };
    std::process::exit(exit_code);
}
