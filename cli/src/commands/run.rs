use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, ValueHint};
use pdp8_emulator::parser::literal::parse_word;
use pdp8_emulator::Computer;
use tracing::info;

use super::{load_object, print_memory};
use crate::interactive::run_interactive;

#[derive(Parser, Debug)]
pub struct RunOpt {
    /// Input object file
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,

    /// Read the object file as octal instead of hexadecimal
    #[clap(short, long, action = ArgAction::SetTrue)]
    octal: bool,

    /// Value of the switch register
    #[clap(short, long, value_parser = parse_word, default_value = "0")]
    switches: u16,

    /// Stop after this many instruction cycles if the program did not halt
    #[clap(short, long, value_parser)]
    max_cycles: Option<u64>,

    /// Run the program in interactive mode
    #[clap(short, long, action = ArgAction::SetTrue)]
    interactive: bool,

    /// Do not dump the memory at the end of the program
    #[clap(long, action = ArgAction::SetTrue)]
    no_dump: bool,
}

impl RunOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        let memory = load_object(&self.input, self.octal)?;

        let mut computer = Computer::new(memory);
        computer.registers.sr = self.switches;
        computer.cycle_limit = self.max_cycles;

        info!("Running program");
        let res = if self.interactive {
            run_interactive(&mut computer);
            Ok(())
        } else {
            computer.run()
        };

        info!(registers = %computer.registers, "End of program");

        // The report is printed even if the program did not halt
        println!("{}", computer.statistics);
        if !self.no_dump {
            println!();
            print_memory(&computer.memory);
        }

        res?;
        Ok(())
    }
}
