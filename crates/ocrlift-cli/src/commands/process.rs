//! Process command - recognize an image or PDF and extract a field.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info};

use ocrlift_core::pipeline::JobId;
use ocrlift_core::{
    JobKind, JobObserver, JobStatus, LopdfRenderer, Orchestrator, PureOcrFactory, RecognitionJob,
};

use super::{RuleArgs, load_config};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tif", "tiff", "webp"];

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (image or PDF)
    #[arg(required = true)]
    input: PathBuf,

    /// How to read the input
    #[arg(short, long, value_enum, default_value = "auto")]
    kind: InputKind,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// PDF rendering scale
    #[arg(long)]
    scale: Option<f32>,

    #[command(flatten)]
    rule: RuleArgs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum InputKind {
    /// Decide from the file extension
    Auto,
    /// Single image
    Image,
    /// PDF document
    Pdf,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

/// A finished job as written to the output.
#[derive(Serialize)]
struct ProcessReport<'a> {
    file: String,
    processed_at: DateTime<Utc>,
    #[serde(flatten)]
    job: &'a RecognitionJob,
}

/// Mirrors job progress on a progress bar.
struct ProgressObserver {
    pb: ProgressBar,
}

impl JobObserver for ProgressObserver {
    fn status_changed(&mut self, _job: JobId, status: JobStatus) {
        if status == JobStatus::Running {
            self.pb.set_message("Running OCR...");
        }
    }

    fn page_started(&mut self, _job: JobId, page: u32, total: u32) {
        self.pb.set_length(u64::from(total));
        self.pb.set_position(u64::from(page - 1));
        self.pb.set_message(format!("Recognizing page {}/{}", page, total));
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(model_dir) = &args.model_dir {
        config.ocr.model_dir = model_dir.clone();
    }
    if let Some(scale) = args.scale {
        config.pdf.render_scale = scale;
    }
    config.extraction.rule = args.rule.resolve(&config);

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let kind = job_kind(&args.input, args.kind)?;
    let data = fs::read(&args.input)?;

    info!("Processing {} file: {}", kind, args.input.display());

    let pb = ProgressBar::new(1);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {msg}")?
            .progress_chars("##-"),
    );

    let observer_pb = pb.clone();
    let job = tokio::task::spawn_blocking(move || -> anyhow::Result<RecognitionJob> {
        let factory = PureOcrFactory::new(config.ocr.clone());
        let mut orchestrator = Orchestrator::from_config(factory, LopdfRenderer::new(), &config)?;
        let mut observer = ProgressObserver { pb: observer_pb };

        let job = match kind {
            JobKind::Image => orchestrator.run_image_job(&data, &mut observer),
            JobKind::Pdf => orchestrator.run_pdf_job(&data, &mut observer),
        };
        orchestrator.shutdown();
        Ok(job)
    })
    .await??;

    pb.finish_and_clear();

    let report = ProcessReport {
        file: args.input.display().to_string(),
        processed_at: Utc::now(),
        job: &job,
    };
    let output = format_report(&report, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    if job.status == JobStatus::Failed {
        anyhow::bail!("{}", job.text);
    }

    Ok(())
}

/// Pick the pipeline for `path`.
fn job_kind(path: &Path, requested: InputKind) -> anyhow::Result<JobKind> {
    match requested {
        InputKind::Image => return Ok(JobKind::Image),
        InputKind::Pdf => return Ok(JobKind::Pdf),
        InputKind::Auto => {}
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if extension == "pdf" {
        Ok(JobKind::Pdf)
    } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        Ok(JobKind::Image)
    } else {
        anyhow::bail!(
            "Unsupported file format: {:?}. Use --kind image or --kind pdf.",
            extension
        )
    }
}

fn format_report(report: &ProcessReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Csv => format_csv(report),
        OutputFormat::Text => Ok(format_text(report)),
    }
}

fn format_csv(report: &ProcessReport) -> anyhow::Result<String> {
    let job = report.job;
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["file", "kind", "status", "pages", "field", "date_time", "message"])?;

    let (field, date_time, message) = match &job.extraction {
        Some(ocrlift_core::Extraction::Found { value, date_time }) => (
            value.clone(),
            date_time.map(|dt| dt.to_string()).unwrap_or_default(),
            String::new(),
        ),
        Some(ocrlift_core::Extraction::NotFound { message }) => {
            (String::new(), String::new(), message.clone())
        }
        None => (String::new(), String::new(), job.text.clone()),
    };

    wtr.write_record([
        report.file.as_str(),
        &job.kind.to_string(),
        &job.status.to_string(),
        &job.pages.to_string(),
        &field,
        &date_time,
        &message,
    ])?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(report: &ProcessReport) -> String {
    let job = report.job;
    let mut output = String::new();

    output.push_str(&format!("File: {}\n", report.file));
    output.push_str(&format!("Kind: {}\n", job.kind));
    output.push_str(&format!("Status: {}\n", job.status));
    output.push_str(&format!("Pages: {}\n", job.pages));
    output.push('\n');

    output.push_str("Recognized text:\n");
    for line in job.text.lines() {
        output.push_str(&format!("  {}\n", line));
    }

    if let Some(extraction) = &job.extraction {
        output.push('\n');
        output.push_str(&format!("Extracted: {}\n", extraction.display_text()));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_kind_from_extension() {
        assert_eq!(job_kind(Path::new("scan.PDF"), InputKind::Auto).unwrap(), JobKind::Pdf);
        assert_eq!(job_kind(Path::new("shot.jpeg"), InputKind::Auto).unwrap(), JobKind::Image);
        assert_eq!(job_kind(Path::new("notes.txt"), InputKind::Pdf).unwrap(), JobKind::Pdf);
        assert!(job_kind(Path::new("notes.txt"), InputKind::Auto).is_err());
    }
}
