//! QreSpec CLI - Bridge interface for tooling
//!
//! Commands: sample, audit, fingerprint, render
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on audit failure or unreadable input

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use qrespec_core::{
    hashing, interchange, BuildPipeline, Document, GridSurface, Module, NewQuestion,
    NonAdcFlag, ProgFlagEntry, QreResult, QuestionBlock, QuestionType, RecordingSurface, Response,
    ResponseCode, ResponseFlag, RoutingFlag, Section, SpecConfig,
};

#[derive(Parser)]
#[command(name = "qrespec-cli")]
#[command(about = "QreSpec CLI - Questionnaire Specification Generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON build config
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a small demonstration document
    Sample,

    /// Audit a document
    Audit {
        /// Interchange JSON document
        input: PathBuf,
    },

    /// Print document and content fingerprints
    Fingerprint {
        /// Interchange JSON document
        input: PathBuf,
    },

    /// Lay a document out and print the result
    Render {
        /// Interchange JSON document
        input: PathBuf,

        #[arg(short, long, value_enum, default_value_t = RenderFormat::Ops)]
        format: RenderFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RenderFormat {
    /// Every surface call, in order
    Ops,
    /// Final page contents
    Grid,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match SpecConfig::load_or_default(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => return fail(format!("Failed to load config: {e}")),
    };
    let pipeline = BuildPipeline::new(config);

    match cli.command {
        Commands::Sample => {
            let doc = match sample_document() {
                Ok(d) => d,
                Err(e) => return fail(format!("Failed to build sample: {e}")),
            };
            match interchange::to_value(&doc) {
                Ok(value) => emit(&value, ExitCode::SUCCESS),
                Err(e) => fail(e),
            }
        }

        Commands::Audit { input } => {
            let doc = match load(&input) {
                Ok(d) => d,
                Err(code) => return code,
            };
            let result = pipeline.audit(&doc);
            let code = if result.valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            };
            emit(&result, code)
        }

        Commands::Fingerprint { input } => {
            let doc = match load(&input) {
                Ok(d) => d,
                Err(code) => return code,
            };
            let fingerprints = hashing::document_fingerprint(&doc)
                .and_then(|full| Ok((full, hashing::content_fingerprint(&doc)?)));
            match fingerprints {
                Ok((document, content)) => emit(
                    &serde_json::json!({ "document": document, "content": content }),
                    ExitCode::SUCCESS,
                ),
                Err(e) => fail(e),
            }
        }

        Commands::Render { input, format } => {
            let doc = match load(&input) {
                Ok(d) => d,
                Err(code) => return code,
            };
            match format {
                RenderFormat::Ops => {
                    let mut surface = RecordingSurface::new();
                    match pipeline.build(&doc, &mut surface) {
                        Ok(report) => emit(
                            &serde_json::json!({ "report": report, "ops": surface.ops() }),
                            ExitCode::SUCCESS,
                        ),
                        Err(e) => fail(e),
                    }
                }
                RenderFormat::Grid => {
                    let mut surface = GridSurface::new();
                    match pipeline.build(&doc, &mut surface) {
                        Ok(report) => emit(
                            &serde_json::json!({ "report": report, "pages": surface.pages() }),
                            ExitCode::SUCCESS,
                        ),
                        Err(e) => fail(e),
                    }
                }
            }
        }
    }
}

fn load(path: &Path) -> Result<Document, ExitCode> {
    interchange::load(path).map_err(|e| fail(format!("Invalid document: {e}")))
}

fn emit<T: Serialize>(value: &T, code: ExitCode) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            code
        }
        Err(e) => fail(e),
    }
}

fn fail(error: impl ToString) -> ExitCode {
    let output = serde_json::json!({ "success": false, "error": error.to_string() });
    println!("{output}");
    ExitCode::from(2)
}

fn sample_document() -> QreResult<Document> {
    let mut doc = Document::new("Streaming Habits", "Wave 1 tracker", "Acme Media");
    let root = doc.questionnaire().id();

    let module = Module::new(doc.ids_mut(), root, 1, "Screener");
    let module = doc.push_child(module)?;
    let section = Section::new(doc.ids_mut(), module, "A", "Viewing");
    let section = doc.push_child(section)?;

    let frequency = QuestionBlock::new(
        doc.ids_mut(),
        section,
        NewQuestion {
            qnum: "S1".into(),
            title: "Frequency".into(),
            base_label: "Total".into(),
            base_definition: "All respondents".into(),
            question_text: "How often do you stream video?".into(),
            question_type: QuestionType::SingleCode,
            prog_flags_non_adc: Some(vec![ProgFlagEntry::plain(NonAdcFlag::NoRandomizeRows)]),
            routing_flag: RoutingFlag::SkipTo,
            routing_target: Some("S3".into()),
            ..NewQuestion::default()
        },
    );
    let frequency = doc.push_child(frequency)?;
    let answers = [
        (1, "Daily", vec![]),
        (2, "Weekly", vec![]),
        (3, "Rarely", vec![ResponseFlag::TermSelected]),
        (ResponseCode::BLANK, "", vec![ResponseFlag::Idk]),
    ];
    for (code, text, flags) in answers {
        let response = Response::new(doc.ids_mut(), frequency, code, text, &flags)?;
        doc.push_child(response)?;
    }

    let services = QuestionBlock::new(
        doc.ids_mut(),
        section,
        NewQuestion {
            qnum: "S2".into(),
            title: "Services".into(),
            question_text: "Which services do you pay for?".into(),
            question_type: QuestionType::MultiTextField,
            prog_flags_non_adc: Some(vec![
                ProgFlagEntry::count(NonAdcFlag::ShowNumBoxes, 3),
                ProgFlagEntry::plain(NonAdcFlag::CodeOE),
            ]),
            ..NewQuestion::default()
        },
    );
    let services = doc.push_child(services)?;
    let response = Response::new(
        doc.ids_mut(),
        services,
        ResponseCode::BLANK,
        "",
        &[ResponseFlag::OpenEnd],
    )?;
    doc.push_child(response)?;

    Ok(doc)
}
