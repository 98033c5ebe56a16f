// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line surface of the `pagewerk` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "pagewerk", version, about = "OCR images and assemble searchable PDFs")]
pub struct Cli {
    /// JSON worker configuration file
    #[arg(long, env = "PAGEWERK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the recognition models
    #[arg(long, env = "PAGEWERK_DATAPATH")]
    pub data_path: Option<PathBuf>,

    /// Languages to load, e.g. `--lang eng`
    #[arg(long = "lang", default_value = "eng")]
    pub langs: Vec<String>,

    /// Engine variables as NAME=VALUE, applied at init
    #[arg(long = "var", value_parser = parse_variable)]
    pub variables: Vec<(String, String)>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Recognize a single image and print its text
    Recognize(RecognizeArgs),
    /// Recognize several images into one PDF
    Pages(PagesArgs),
}

#[derive(Parser, Debug)]
pub struct RecognizeArgs {
    pub image: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Page segmentation mode (0-13)
    #[arg(long)]
    pub page_mode: Option<i32>,

    /// Source resolution in pixels per inch
    #[arg(long)]
    pub resolution: Option<i32>,

    /// Also print orientation and script detection as JSON
    #[arg(long)]
    pub osd: bool,

    /// Show a progress bar on stderr
    #[arg(long)]
    pub progress: bool,
}

#[derive(Parser, Debug)]
pub struct PagesArgs {
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Output path without extension
    #[arg(long, short)]
    pub output: PathBuf,

    #[arg(long, default_value = "Pagewerk document")]
    pub title: String,

    /// Per-page timeout in milliseconds; 0 disables it
    #[arg(long, default_value_t = 0)]
    pub timeout: u32,

    /// Write text-only pages without the scanned image
    #[arg(long)]
    pub textonly: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Hocr,
    Tsv,
    Unlv,
    Alto,
    Page,
    Box,
    LstmBox,
    WordStrBox,
}

fn parse_variable(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() && !value.is_empty() => {
            Ok((name.to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}
