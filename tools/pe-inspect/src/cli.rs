//! Command line parsing and [`Config`] construction.

use std::{num::ParseIntError, path::PathBuf};

use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command, builder::PossibleValuesParser};
use log::LevelFilter;

/// The report to produce.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Action {
    /// Print a summary of the headers.
    Info,
    /// Print the section table.
    Sections,
    /// Translate an address between its RVA, VA and file offset forms.
    Convert(Address),
    /// Print the export directory.
    Exports,
    /// Print the imported libraries and functions.
    Imports,
    /// Print the CLR runtime header.
    DotNet,
    /// Print the data directories along with the TLS and load configuration directories.
    Directories,
}

/// An address handed to [`Action::Convert`].
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Address {
    /// A relative virtual address.
    Rva(u32),
    /// A virtual address.
    Va(u64),
    /// A file offset.
    Offset(u32),
}

/// Everything `pe-inspect` needs to run.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Config {
    /// The image to inspect.
    pub file: PathBuf,
    /// The most verbose level of log messages to print.
    pub log_level: LevelFilter,
    /// The report to produce.
    pub action: Action,
}

/// Parses `pe-inspect`'s arguments to construct a [`Config`].
pub fn get_config() -> Config {
    parse_matches(&command_parser().get_matches())
}

/// Constructs a [`Config`] from already parsed `matches`.
fn parse_matches(matches: &ArgMatches) -> Config {
    let file = matches
        .get_one::<PathBuf>("file")
        .cloned()
        .unwrap_or_else(|| unreachable!("`file` is a required argument"));

    let verbosity = matches.get_count("verbose");
    let log_level = match verbosity {
        0 => matches
            .get_one::<String>("log-level")
            .and_then(|level| level.parse().ok())
            .unwrap_or(LevelFilter::Warn),
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let Some((subcommand_name, subcommand_matches)) = matches.subcommand() else {
        unreachable!("subcommand is required");
    };
    let action = match subcommand_name {
        "info" => Action::Info,
        "sections" => Action::Sections,
        "convert" => Action::Convert(parse_address(subcommand_matches)),
        "exports" => Action::Exports,
        "imports" => Action::Imports,
        "dotnet" => Action::DotNet,
        "directories" => Action::Directories,
        _ => unreachable!("unexpected subcommand: {subcommand_name:?}"),
    };

    Config {
        file,
        log_level,
        action,
    }
}

/// Extracts the [`Address`] of a `convert` invocation.
fn parse_address(matches: &ArgMatches) -> Address {
    if let Some(rva) = matches.get_one::<u32>("rva") {
        Address::Rva(*rva)
    } else if let Some(va) = matches.get_one::<u64>("va") {
        Address::Va(*va)
    } else if let Some(offset) = matches.get_one::<u32>("offset") {
        Address::Offset(*offset)
    } else {
        unreachable!("one of `rva`, `va` or `offset` is required")
    }
}

/// Parses a decimal or `0x` prefixed hexadecimal number.
fn parse_number(value: &str) -> Result<u64, ParseIntError> {
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    }
}

/// Parses a 32-bit decimal or `0x` prefixed hexadecimal number.
fn parse_number_32(value: &str) -> Result<u32, String> {
    let value = parse_number(value).map_err(|error| error.to_string())?;
    u32::try_from(value).map_err(|_| format!("{value:#x} does not fit in 32 bits"))
}

/// Returns the command parser for all [`Action`]s.
fn command_parser() -> Command {
    let file = Arg::new("file")
        .long("file")
        .short('f')
        .env("PE_INSPECT_FILE")
        .value_parser(clap::value_parser!(PathBuf))
        .required(true)
        .help("The PE image to inspect");

    let verbose = Arg::new("verbose")
        .long("verbose")
        .short('v')
        .action(ArgAction::Count)
        .global(true)
        .help("Print more log messages, repeat for more detail");

    let log_level = Arg::new("log-level")
        .long("log-level")
        .env("PE_INSPECT_LOG")
        .value_parser(PossibleValuesParser::new([
            "off", "error", "warn", "info", "debug", "trace",
        ]))
        .global(true)
        .help("The most verbose level of log messages to print when `-v` is absent");

    Command::new("pe-inspect")
        .about("Prints the structure of PE32 and PE32+ images")
        .arg(file)
        .arg(verbose)
        .arg(log_level)
        .subcommand(Command::new("info").about("Prints a summary of the headers"))
        .subcommand(Command::new("sections").about("Prints the section table"))
        .subcommand(convert_parser())
        .subcommand(Command::new("exports").about("Prints the exported functions"))
        .subcommand(Command::new("imports").about("Prints the imported libraries and functions"))
        .subcommand(Command::new("dotnet").about("Prints the CLR runtime header"))
        .subcommand(
            Command::new("directories")
                .about("Prints the data directories and the TLS and load configuration data"),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
}

/// Returns the command parser for an [`Action::Convert`].
fn convert_parser() -> Command {
    let rva = Arg::new("rva")
        .long("rva")
        .value_parser(parse_number_32)
        .help("A relative virtual address");

    let va = Arg::new("va")
        .long("va")
        .value_parser(parse_number)
        .help("A virtual address");

    let offset = Arg::new("offset")
        .long("offset")
        .value_parser(parse_number_32)
        .help("A file offset");

    Command::new("convert")
        .about("Translates an address between its RVA, VA and file offset forms")
        .arg(rva)
        .arg(va)
        .arg(offset)
        .group(
            ArgGroup::new("address")
                .args(["rva", "va", "offset"])
                .required(true),
        )
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use log::LevelFilter;

    use super::{Action, Address, command_parser, parse_matches, parse_number};

    fn parse(arguments: &[&str]) -> super::Config {
        let matches = command_parser()
            .try_get_matches_from(arguments)
            .unwrap();
        parse_matches(&matches)
    }

    #[test]
    fn verify_command() {
        command_parser().debug_assert();
    }

    #[test]
    fn numbers_accept_hex_and_decimal() {
        assert_eq!(parse_number("0x1000"), Ok(0x1000));
        assert_eq!(parse_number("4096"), Ok(4096));
        assert!(parse_number("0xZZ").is_err());
    }

    #[test]
    fn convert_takes_one_address() {
        let config = parse(&["pe-inspect", "--file", "a.exe", "convert", "--va", "0x401000"]);

        assert_eq!(config.file, PathBuf::from("a.exe"));
        assert_eq!(config.action, Action::Convert(Address::Va(0x0040_1000)));

        assert!(
            command_parser()
                .try_get_matches_from(["pe-inspect", "--file", "a.exe", "convert"])
                .is_err()
        );
        assert!(
            command_parser()
                .try_get_matches_from([
                    "pe-inspect", "--file", "a.exe", "convert", "--rva", "1", "--offset", "2"
                ])
                .is_err()
        );
    }

    #[test]
    fn verbosity_selects_level() {
        let config = parse(&["pe-inspect", "-f", "a.dll", "imports", "-vv"]);

        assert_eq!(config.action, Action::Imports);
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn rva_must_fit_in_32_bits() {
        assert!(
            command_parser()
                .try_get_matches_from([
                    "pe-inspect", "--file", "a.exe", "convert", "--rva", "0x100000000"
                ])
                .is_err()
        );
    }
}
