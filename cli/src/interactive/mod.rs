//! Interactive debugger for the `run --interactive` command.
//!
//! Lines are read with rustyline and split with `shell-words`, then parsed as a clap
//! `Command`. The session keeps the breakpoints and the position of the `list` command between
//! two lines.

use std::collections::BTreeSet;

use clap::{Parser, ValueEnum};
use pdp8_emulator::constants::{self as C, mask};
use pdp8_emulator::parser::literal::parse_word;
use pdp8_emulator::runtime::{Computer, Float, Instruction, Reg, Status};
use rustyline::{Behavior, CompletionType, Config, EditMode, Editor};
use tracing::{debug, info, warn};

mod helper;
mod parse;
use self::helper::RunHelper;

static HELP: &str = r#"
Numbers can be written in octal (0o17), hexadecimal (0xf), binary (0b1111) or decimal.
Run "help [command]" for command-specific help.
An empty line re-runs the last valid command."#;

#[derive(Parser, Clone, Debug)]
#[clap(
    help_template = "{about}\n\nCOMMANDS:\n{subcommands}\n{after-help}",
    after_help = HELP,
    disable_version_flag = true,
    infer_subcommands = true,
    no_binary_name = true,
)]
/// Interactive mode commands
enum Command {
    /// Execute the next instructions
    #[command(alias = "s")]
    Step {
        /// Number of steps to execute
        #[clap(value_parser, default_value = "1")]
        number: u64,
    },

    /// Exit the emulator
    Exit,

    /// Show the state of registers
    Registers {
        #[clap(value_parser)]
        register: Option<Reg>,
    },

    /// Show the content of a block in memory
    Memory {
        /// The address to show
        #[clap(value_parser = parse_word)]
        address: C::Address,

        /// Number of memory words to show
        #[clap(value_parser, default_value = "1")]
        number: u16,
    },

    /// Set a value in memory or in a register
    Set {
        /// The address or register to set
        #[clap(value_parser)]
        target: parse::AssignmentTarget,

        /// The value to set. The floating accumulator also takes decimal floats.
        #[clap(value_parser)]
        value: parse::Value,
    },

    /// Change the interrupt flags
    Interrupt {
        #[clap(value_enum)]
        state: InterruptState,
    },

    /// Show the next few instructions
    List {
        /// Number of instructions to show
        #[clap(value_parser, default_value = "10")]
        number: u16,
    },

    /// Set a breakpoint
    Break {
        /// The address where to set the breakpoint
        #[clap(value_parser = parse_word)]
        address: C::Address,
    },

    /// Remove a breakpoint
    Unbreak {
        /// The address of the breakpoint to remove
        #[clap(value_parser = parse_word)]
        address: C::Address,
    },

    /// Continue the program until the next breakpoint or halt
    Continue,

    /// Show informations about the current debugging session
    Info {
        #[clap(subcommand)]
        sub: Option<InfoCommand>,
    },
}

#[derive(Parser, Clone, Debug)]
enum InfoCommand {
    /// List active breakpoints
    Breakpoints,

    /// Show the instructions and clocks used since the beginning of the program
    Stats,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum InterruptState {
    /// Enable interrupts
    On,

    /// Disable interrupts
    Off,

    /// Request an interrupt
    Request,
}

/// Holds informations about a interactive session
#[derive(Debug, Default)]
struct Session {
    /// List of active breakpoints
    breakpoints: BTreeSet<C::Address>,

    /// Current address for the `list` command
    list_address: Option<C::Address>,
}

impl Session {
    /// Add a breakpoint
    fn add_breakpoint(&mut self, address: C::Address) {
        if self.breakpoints.insert(address) {
            info!("Setting a breakpoint at {address:04o}");
        } else {
            warn!("A breakpoint was already set at {address:04o}");
        }
    }

    /// Remove a breakpoint
    fn remove_breakpoint(&mut self, address: C::Address) {
        if self.breakpoints.remove(&address) {
            info!("Removing breakpoint at {address:04o}");
        } else {
            warn!("No breakpoint was set at {address:04o}");
        }
    }

    /// Checks if the given address has a breakpoint
    fn has_breakpoint(&self, address: C::Address) -> bool {
        self.breakpoints.contains(&address)
    }

    /// Reset the `list` command (after running an instruction)
    fn reset_list(&mut self) {
        self.list_address = None;
    }

    /// Offset the `list` command, returns the address to show
    fn offset_list(&mut self, computer: &Computer, offset: C::Address) -> C::Address {
        let addr = self.list_address.unwrap_or(computer.registers.pc);
        self.list_address = Some(mask(addr.wrapping_add(offset)));
        addr
    }

    /// Display the list of breakpoints
    fn display_breakpoints(&self, computer: &Computer) {
        match self.breakpoints.len() {
            0 => info!("No breakpoints"),
            1 => info!("1 breakpoint:"),
            x => info!("{x} breakpoints:"),
        }

        for &addr in &self.breakpoints {
            self.display_instruction(computer, addr);
        }
    }

    /// Display an instruction at specified address
    fn display_instruction(&self, computer: &Computer, address: C::Address) {
        let is_current_line = computer.registers.pc == address;
        let has_breakpoint = self.has_breakpoint(address);

        let gutter = match (has_breakpoint, is_current_line) {
            (true, true) => "B>",
            (true, false) => "B ",
            (false, true) => " >",
            (false, false) => "  ",
        };

        if let Ok(word) = computer.memory.get(address) {
            info!(
                "{:<2} {:04o}    {:04o}    {}",
                gutter,
                address,
                word,
                Instruction::decode(word)
            );
        } else {
            info!("{:<2} {:04o}    –", gutter, address);
        }
    }

    /// Display the execution statistics
    fn display_stats(computer: &Computer) {
        for line in computer.statistics.to_string().lines() {
            info!("{line}");
        }
    }
}

/// Show a register, the floating accumulator being also shown as a float
fn display_register(computer: &Computer, reg: Reg) {
    let value = computer.registers.get(reg);
    match reg {
        Reg::FPAC => info!("Register {reg} = {value:08x} ({})", Float::from_bits(value)),
        Reg::L => info!("Register {reg} = {value}"),
        reg => info!("Register {reg} = {value:04o}"),
    }
}

/// Execute one instruction, returns `false` if the computer halted
fn step(computer: &mut Computer) -> bool {
    if let Err(e) = computer.step() {
        warn!(error = &e as &dyn std::error::Error, "Could not step");
        return false;
    }

    if !computer.registers.running() {
        info!(pc = format_args!("{:04o}", computer.registers.pc), "Halted");
        return false;
    }

    true
}

#[allow(clippy::too_many_lines)]
pub(crate) fn run_interactive(computer: &mut Computer) {
    info!("Running in interactive mode. Type \"help\" to list available commands.");
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .behavior(Behavior::PreferTerm)
        .auto_add_history(true)
        .build();

    let mut session = Session::default();

    let h: RunHelper<Command> = RunHelper::new();
    let mut rl = match Editor::with_config(config) {
        Ok(rl) => rl,
        Err(e) => {
            warn!(error = &e as &dyn std::error::Error, "Could not initialize terminal input");
            return;
        }
    };
    rl.set_helper(Some(h));

    let mut last_command: Option<Command> = None;

    'read: loop {
        // A macro to unwrap an error, log it and continue the loop
        macro_rules! warn_and_continue {
            ($e:expr) => {
                match $e {
                    Ok(o) => o,
                    Err(e) => {
                        tracing::warn!(error = %e);
                        continue 'read;
                    }
                }
            };
        }

        let Ok(readline) = rl.readline(">> ") else {
            info!("EOF, exitting");
            return;
        };

        let command = if readline.trim().is_empty() {
            if let Some(command) = &last_command {
                command.clone()
            } else {
                info!("Type \"help\" to get the list of available commands");
                continue 'read;
            }
        } else {
            let Ok(words) = shell_words::split(readline.as_str()) else {
                warn!("Invalid input");
                continue 'read;
            };

            let command = warn_and_continue!(Command::try_parse_from(words));
            last_command = Some(command.clone());
            command
        };

        debug!("Executing command: {:?}", command);

        let halted = !computer.registers.running();
        match (command, halted) {
            (Command::Exit, _) => break,
            (Command::Step { number }, false) => {
                session.reset_list();

                for _ in 0..number {
                    if !step(computer) {
                        continue 'read;
                    }
                }

                session.display_instruction(computer, computer.registers.pc);
            }

            (Command::Registers { register }, _) => {
                if let Some(reg) = register {
                    display_register(computer, reg);
                } else {
                    info!("Registers: {}", computer.registers);
                }
            }

            (Command::Memory { address, number }, _) => {
                for i in 0..number {
                    let address = mask(address.wrapping_add(i));
                    let word = warn_and_continue!(computer.memory.get(address));
                    info!("{address:04o}: {word:04o}");
                }
            }

            (Command::Set { target, value }, _) => match target {
                parse::AssignmentTarget::Address(address) => {
                    let word = warn_and_continue!(value.word());
                    info!("Setting memory at address {address:04o} to {word:04o}");
                    warn_and_continue!(computer.memory.set(address, word));
                }

                parse::AssignmentTarget::Register(Reg::FPAC) => {
                    let bits = value.float_bits();
                    info!("Setting register FPAC to {}", Float::from_bits(bits));
                    computer.registers.set(Reg::FPAC, bits);
                }

                parse::AssignmentTarget::Register(reg) => {
                    let word = warn_and_continue!(value.word());
                    info!("Setting register {reg} to {value}");
                    computer.registers.set(reg, word.into());
                }
            },

            (Command::Interrupt { state }, _) => {
                let status = &mut computer.registers.status;
                match state {
                    InterruptState::On => status.insert(Status::INTERRUPTS_ON),
                    InterruptState::Off => status.remove(Status::INTERRUPTS_ON),
                    InterruptState::Request => status.insert(Status::INTERRUPT_REQUEST),
                }
                info!(status = ?computer.registers.status, "Interrupt flags changed");
            }

            (Command::List { number }, _) => {
                let addr = session.offset_list(computer, number);
                for i in 0..number {
                    let addr = mask(addr.wrapping_add(i));
                    session.display_instruction(computer, addr);
                }
            }

            (Command::Break { address }, _) => {
                session.add_breakpoint(address);
            }

            (Command::Unbreak { address }, _) => {
                session.remove_breakpoint(address);
            }

            (Command::Continue, false) => loop {
                if !step(computer) {
                    continue 'read;
                }

                if session.has_breakpoint(computer.registers.pc) {
                    info!("Stopped at a breakpoint");
                    session.display_instruction(computer, computer.registers.pc);
                    break;
                }
            },

            (Command::Info { sub }, _) => match sub {
                Some(InfoCommand::Breakpoints) => {
                    session.display_breakpoints(computer);
                }
                Some(InfoCommand::Stats) => {
                    Session::display_stats(computer);
                }
                None => {
                    session.display_breakpoints(computer);
                    info!("–");
                    Session::display_stats(computer);
                }
            },

            (_, true) => {
                // Computer is halted but the user asked to continue, we just warn
                warn!("Computer is halted. Use \"exit\" to quit");
            }
        }
    }
}
