use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, ValueHint};
use pdp8_emulator::constants::mask;
use pdp8_emulator::runtime::{Instruction, Memory};

use super::load_object;

#[derive(Parser, Debug)]
pub struct DumpOpt {
    /// Input object file
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,

    /// Read the object file as octal instead of hexadecimal
    #[clap(short, long, action = ArgAction::SetTrue)]
    octal: bool,
}

/// Disassemble the non-zero words of memory
///
/// The word following a floating point IOT is shown as a pointer.
fn disassemble(memory: &Memory) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pointer = None;

    for (address, word) in memory.non_zero() {
        if pointer.take() == Some(address) {
            lines.push(format!("{address:04o}: {word:04o}    -> {word:04o}"));
            continue;
        }

        let instruction = Instruction::decode(word);
        if let Instruction::Iot(iot) = instruction {
            if iot.has_operand() {
                pointer = Some(mask(address + 1));
            }
        }

        lines.push(format!("{address:04o}: {word:04o}    {instruction}"));
    }

    lines
}

impl DumpOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        let memory = load_object(&self.input, self.octal)?;

        for line in disassemble(&memory) {
            println!("{line}");
        }

        Ok(())
    }
}
