// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand handlers. Each drives one `OcrWorker` through the same command
// sequence a host binding would use, awaiting every completion.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use pagewerk_core::error::{CommandError, PagewerkError};
use pagewerk_core::progress::Progress;
use pagewerk_core::types::{InitOptions, ProcessPagesOptions};
use pagewerk_core::value::Value;
use pagewerk_worker::{Completion, ImageInput, OcrWorker};
use thiserror::Error;
use tracing::{debug, info};

use crate::args::{Cli, OutputFormat, PagesArgs, RecognizeArgs};

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Setup(#[from] PagewerkError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("{method} returned {value:?}")]
    UnexpectedValue { method: &'static str, value: Value },

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),

    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CliResult<T> = Result<T, CliError>;

/// Options for `init` built from the global flags.
pub fn init_options(cli: &Cli) -> InitOptions {
    let (vars_vec, vars_values) = cli.variables.iter().cloned().unzip();
    InitOptions {
        data_path: cli
            .data_path
            .as_ref()
            .map(|path| path.to_string_lossy().into_owned()),
        langs: cli.langs.clone(),
        vars_vec,
        vars_values,
        ..Default::default()
    }
}

pub async fn recognize(
    worker: &OcrWorker,
    init: InitOptions,
    args: RecognizeArgs,
) -> CliResult<()> {
    let image = read_file(&args.image)?;
    worker.init(init).await?;

    if let Some(mode) = args.page_mode {
        worker.set_page_mode(mode).await?;
    }
    worker.set_image(ImageInput::Encoded(image)).await?;
    if let Some(ppi) = args.resolution {
        worker.set_source_resolution(ppi).await?;
    }

    if args.progress {
        let label = file_label(&args.image);
        let (completion, progress) = worker.recognize_with_progress();
        with_progress_bar(&label, completion, progress).await?;
    } else {
        worker.recognize().await?;
    }

    let text = expect_string(text_in_format(worker, args.format).await?, "text output")?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        writeln!(stdout)?;
    }

    if args.osd {
        let osd = worker.detect_orientation_script().await?;
        writeln!(stdout, "{}", serde_json::to_string_pretty(&osd)?)?;
    }

    let confidence = worker.mean_text_conf().await?;
    info!(confidence = ?confidence.as_int(), "Recognition complete");
    Ok(())
}

fn text_in_format(worker: &OcrWorker, format: OutputFormat) -> Completion {
    match format {
        OutputFormat::Text => worker.get_utf8_text(),
        OutputFormat::Hocr => worker.get_hocr_text(0),
        OutputFormat::Tsv => worker.get_tsv_text(0),
        OutputFormat::Unlv => worker.get_unlv_text(),
        OutputFormat::Alto => worker.get_alto_text(0),
        OutputFormat::Page => worker.get_page_text(0),
        OutputFormat::Box => worker.get_box_text(0),
        OutputFormat::LstmBox => worker.get_lstm_box_text(0),
        OutputFormat::WordStrBox => worker.get_word_str_box_text(0),
    }
}

pub async fn pages(worker: &OcrWorker, init: InitOptions, args: PagesArgs) -> CliResult<()> {
    worker.init(init).await?;

    let document = worker.document();
    document
        .begin(ProcessPagesOptions {
            output_base: Some(args.output.to_string_lossy().into_owned()),
            title: args.title,
            timeout: args.timeout,
            textonly: args.textonly,
        })
        .await?;

    for path in &args.images {
        let data = match read_file(path) {
            Ok(data) => data,
            Err(err) => {
                document.abort(Some(err.to_string())).await?;
                return Err(err);
            }
        };
        let filename = Some(path.to_string_lossy().into_owned());
        let (completion, progress) = document.add_page_with_progress(data, filename);
        if let Err(err) = with_progress_bar(&file_label(path), completion, progress).await {
            document.abort(Some(err.to_string())).await?;
            return Err(err);
        }
    }

    let written = expect_string(document.finish().await?, "finishProcessPages")?;
    info!(path = %written, pages = args.images.len(), "Document written");
    println!("{written}");
    Ok(())
}

/// Await `completion` while drawing its progress updates on stderr.
async fn with_progress_bar(
    label: &str,
    completion: Completion,
    mut progress: Progress,
) -> CliResult<Value> {
    let draw = async {
        let mut stderr = io::stderr();
        while let Some(info) = progress.next().await {
            let _ = write!(stderr, "\r{label}: {}", progress_bar(info.percent));
            let _ = stderr.flush();
        }
        let _ = writeln!(stderr);
    };
    let (outcome, ()) = tokio::join!(completion, draw);
    Ok(outcome?)
}

/// Fixed-width bar such as `[██████▒▒▒▒] 60%`.
pub fn progress_bar(percent: i32) -> String {
    const WIDTH: usize = 30;
    let percent = percent.clamp(0, 100);
    let filled = WIDTH * percent as usize / 100;
    format!(
        "[{}{}] {percent:>3}%",
        "█".repeat(filled),
        "▒".repeat(WIDTH - filled)
    )
}

fn read_file(path: &Path) -> CliResult<Vec<u8>> {
    debug!(path = %path.display(), "Reading input");
    std::fs::read(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn expect_string(value: Value, method: &'static str) -> CliResult<String> {
    match value {
        Value::String(text) => Ok(text),
        value => Err(CliError::UnexpectedValue { method, value }),
    }
}
