use camino::Utf8Path;
use pdp8_emulator::{load, runtime::Memory, Radix};
use tracing::info;

mod completion;
mod dump;
mod run;

#[derive(clap::Subcommand, Debug)]
pub enum Subcommand {
    /// Load and run a program
    Run(self::run::RunOpt),

    /// Show the content of an object file, disassembled
    Dump(self::dump::DumpOpt),

    /// Generate shell completions
    Completion(self::completion::CompletionOpt),
}

impl Subcommand {
    /// Run a subcommand
    pub fn exec(self) -> anyhow::Result<()> {
        match self {
            Self::Run(opt) => opt.exec(),
            Self::Dump(opt) => opt.exec(),
            Self::Completion(opt) => opt.exec(),
        }
    }
}

/// Read and load an object file
///
/// Load errors are rendered with the offending token highlighted.
fn load_object(path: &Utf8Path, octal: bool) -> anyhow::Result<Memory> {
    let radix = if octal { Radix::Octal } else { Radix::Hexadecimal };
    info!(%path, ?radix, "Loading object file");
    let source = std::fs::read_to_string(path)?;

    load(&source, radix).map_err(|e| {
        let report = miette::Report::new(e).with_source_code(
            miette::NamedSource::new(path.as_str(), source.clone()),
        );
        eprintln!("{report:?}");
        anyhow::anyhow!("could not load {path}")
    })
}

/// Print every non-zero word of memory, in octal
fn print_memory(memory: &Memory) {
    for (address, word) in memory.non_zero() {
        println!("{address:04o}: {word:04o}");
    }
}
