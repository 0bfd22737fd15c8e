use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "nvfdt",
    about = "Inspect FDT images as named storage cells",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Layer configuration (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the cells of an image
    Cells(CellsArgs),
    /// Read one cell
    Read(ReadArgs),
    /// Validate an image and show its header
    Check(CheckArgs),
}

#[derive(Args)]
pub struct CellsArgs {
    pub image: PathBuf,
}

#[derive(Args)]
pub struct ReadArgs {
    pub image: PathBuf,
    /// Cell name
    pub cell: String,
    /// Read only this many leading bytes
    #[arg(short, long)]
    pub length: Option<usize>,
}

#[derive(Args)]
pub struct CheckArgs {
    pub image: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_read_with_length() {
        let cli = Cli::try_parse_from(["nvfdt", "read", "eeprom.bin", "mac-address", "-l", "3"]).unwrap();
        match cli.command {
            Command::Read(args) => {
                assert_eq!(args.image, PathBuf::from("eeprom.bin"));
                assert_eq!(args.cell, "mac-address");
                assert_eq!(args.length, Some(3));
            }
            _ => panic!("expected read"),
        }
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "nvfdt", "cells", "eeprom.bin", "--format", "json", "--config", "layer.toml", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("layer.toml")));
    }

    #[test]
    fn missing_image_is_an_error() {
        assert!(Cli::try_parse_from(["nvfdt", "check"]).is_err());
    }
}
