//! Replay a JSONL script of frames and controls through one session and
//! print every decision as a JSON line.
//!
//! ```text
//! {"op": "frame", "label": "HOLA", "confidence": 0.9}
//! {"op": "frame", "probs": [0.1, 0.7, 0.2], "values": [... 226 floats ...]}
//! {"op": "absent"}
//! {"op": "accept", "word": "HOLA"}
//! {"op": "setContext", "name": "Colores", "manual": true}
//! {"op": "reset"}
//! {"op": "stats"}
//! ```
//!
//! Frames without `values` use a centred, well-framed pose.

use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use signa_core::{
    frame::{pose, FRAME_LEN, POSE_STRIDE},
    inference::stub::ScriptedClassifier,
    stabilizer::preset_catalog,
    CategoryTable, ClassifierHandle, LabelSet, Session, SessionConfig, StabilizerPreset,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Args {
    labels: PathBuf,
    script: Option<PathBuf>,
    config: Option<PathBuf>,
    preset: Option<StabilizerPreset>,
    categories: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
enum Step {
    Frame {
        #[serde(default)]
        values: Option<Vec<f32>>,
        #[serde(default)]
        probs: Option<Vec<f32>>,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        confidence: Option<f32>,
    },
    Absent,
    Accept {
        word: String,
    },
    SetContext {
        #[serde(default)]
        name: Option<String>,
        #[serde(default = "default_manual")]
        manual: bool,
    },
    Reset,
    Stats,
}

fn default_manual() -> bool {
    true
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
enum Output<'a> {
    #[serde(rename_all = "camelCase")]
    Decision {
        line: usize,
        #[serde(flatten)]
        decision: &'a signa_core::Decision,
    },
    #[serde(rename_all = "camelCase")]
    Accepted {
        line: usize,
        word: &'a str,
        context: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ContextAck {
        line: usize,
        current_context: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ResetAck { line: usize },
    #[serde(rename_all = "camelCase")]
    Stats {
        line: usize,
        stats: &'a signa_core::SessionStats,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("signa=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("replay failed: {e:#}");
        std::process::exit(1);
    }
}

fn parse_args() -> anyhow::Result<Args> {
    let mut labels: Option<PathBuf> = None;
    let mut script: Option<PathBuf> = None;
    let mut config: Option<PathBuf> = None;
    let mut preset: Option<StabilizerPreset> = None;
    let mut categories: Option<PathBuf> = None;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        let mut value = |name: &str| {
            it.next()
                .map(PathBuf::from)
                .ok_or_else(|| anyhow!("missing value for {name}"))
        };
        match arg.as_str() {
            "--labels" => labels = Some(value("--labels")?),
            "--script" => script = Some(value("--script")?),
            "--config" => config = Some(value("--config")?),
            "--categories" => categories = Some(value("--categories")?),
            "--preset" => {
                let name = value("--preset")?;
                let name = name.to_string_lossy();
                preset = Some(
                    StabilizerPreset::from_name(&name)
                        .ok_or_else(|| anyhow!("unknown preset '{name}'"))?,
                );
            }
            "--presets" => {
                println!("{}", serde_json::to_string_pretty(&preset_catalog())?);
                std::process::exit(0);
            }
            "--help" | "-h" => {
                println!(
                    "Usage: signa-replay --labels <labels.json> [--script <steps.jsonl>] \\
  [--config <session.json> | --preset <name>] [--categories <categories.json>]\n\
       signa-replay --presets\n\
  Reads the script from stdin when --script is omitted."
                );
                std::process::exit(0);
            }
            other => bail!("unknown argument: {other}"),
        }
    }

    if config.is_some() && preset.is_some() {
        bail!("--config and --preset are mutually exclusive");
    }

    Ok(Args {
        labels: labels.ok_or_else(|| anyhow!("--labels is required"))?,
        script,
        config,
        preset,
        categories,
    })
}

fn run() -> anyhow::Result<()> {
    let args = parse_args()?;

    let labels = LabelSet::load(&args.labels)
        .with_context(|| format!("loading labels from {}", args.labels.display()))?;
    let categories = match &args.categories {
        Some(path) => CategoryTable::load(path)
            .with_context(|| format!("loading categories from {}", path.display()))?,
        None => CategoryTable::new(),
    };
    let mut config = match (&args.config, args.preset) {
        (Some(path), _) => SessionConfig::load_or_default(path),
        (None, Some(preset)) => SessionConfig::with_preset(preset),
        (None, None) => SessionConfig::default(),
    };
    config.apply_env_overrides()?;

    let script = ScriptedClassifier::new(labels.len());
    let mut session = Session::new(
        config,
        ClassifierHandle::new(script.clone()),
        None,
        labels.clone(),
        Arc::new(categories),
    )?;
    info!(labels = labels.len(), "replay session ready");

    let input: Box<dyn BufRead> = match &args.script {
        Some(path) => Box::new(BufReader::new(
            std::fs::File::open(path)
                .with_context(|| format!("opening script {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut confirmed = 0usize;

    for (index, line) in input.lines().enumerate() {
        let line_no = index + 1;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let step: Step = serde_json::from_str(trimmed)
            .with_context(|| format!("line {line_no}: invalid step"))?;

        let output = match step {
            Step::Frame {
                values,
                probs,
                label,
                confidence,
            } => {
                match (probs, label) {
                    (Some(probs), _) => script.set(probs),
                    (None, Some(name)) => {
                        let index = labels
                            .index_of(&name)
                            .ok_or_else(|| anyhow!("line {line_no}: unknown label '{name}'"))?;
                        script.set_peak(index, confidence.unwrap_or(1.0));
                    }
                    (None, None) => {}
                }
                let values = values.unwrap_or_else(framed_pose);
                let decision = session.ingest(&values);
                if decision.is_confirmed() {
                    confirmed += 1;
                }
                serde_json::to_string(&Output::Decision {
                    line: line_no,
                    decision: &decision,
                })?
            }
            Step::Absent => {
                let decision = session.ingest(&vec![0.0; FRAME_LEN]);
                serde_json::to_string(&Output::Decision {
                    line: line_no,
                    decision: &decision,
                })?
            }
            Step::Accept { word } => {
                let context = session.accept(&word)?;
                serde_json::to_string(&Output::Accepted {
                    line: line_no,
                    word: word.trim(),
                    context,
                })?
            }
            Step::SetContext { name, manual } => {
                let current_context = session.set_context(name.as_deref(), manual)?;
                serde_json::to_string(&Output::ContextAck {
                    line: line_no,
                    current_context,
                })?
            }
            Step::Reset => {
                session.reset();
                serde_json::to_string(&Output::ResetAck { line: line_no })?
            }
            Step::Stats => {
                let stats = session.stats();
                serde_json::to_string(&Output::Stats {
                    line: line_no,
                    stats: &stats,
                })?
            }
        };
        writeln!(out, "{output}")?;
    }

    let stats = session.stats();
    info!(
        frames = stats.total_frames,
        confirmed,
        history = stats.word_history.len(),
        "replay finished"
    );
    Ok(())
}

/// Shoulders 0.3 apart at full visibility: framing `OK`.
fn framed_pose() -> Vec<f32> {
    let mut values = vec![0.0; FRAME_LEN];
    let left = pose::LEFT_SHOULDER * POSE_STRIDE;
    let right = pose::RIGHT_SHOULDER * POSE_STRIDE;
    values[left..left + POSE_STRIDE].copy_from_slice(&[0.35, 0.5, 0.0, 0.99]);
    values[right..right + POSE_STRIDE].copy_from_slice(&[0.65, 0.5, 0.0, 0.99]);
    values
}
