//! `tabmatch run` / `validate` / `presets`.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use serde::Serialize;

use tabmatch_io::target::{sibling_path, supports_append, write_output, OutputTarget, WrittenFile};
use tabmatch_io::xlsx::read_sheets;
use tabmatch_recon::config::{DuplicatePolicy, MatchMode, OutputMode, Preset, ReconConfig, TargetKind};
use tabmatch_recon::model::{ReconMeta, ReconSummary};
use tabmatch_recon::output::plan_output;
use tabmatch_recon::ReconError;

use crate::exit_codes::{recon_exit_code, EXIT_ERROR, EXIT_INVALID_CONFIG, EXIT_USAGE};
use crate::CliError;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModeArg {
    OneToOne,
    ManyToOne,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DuplicateArg {
    Skip,
    Flag,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputModeArg {
    Combined,
    MatchedOnly,
    Separate,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Workbook holding both sheets
    #[arg(default_value = "compare.xlsx")]
    pub input: PathBuf,

    /// Output workbook (default: <input stem>_merged.xlsx)
    #[arg(conflicts_with = "append")]
    pub output: Option<PathBuf>,

    /// TOML config file
    #[arg(long, short = 'c', conflicts_with = "preset")]
    pub config: Option<PathBuf>,

    /// Built-in key preset: a, b or c (default: a)
    #[arg(long, value_parser = parse_preset)]
    pub preset: Option<Preset>,

    /// Matching mode
    #[arg(long)]
    pub mode: Option<ModeArg>,

    /// What one-to-one matching does with an already-matched GITHUB record
    #[arg(long)]
    pub on_duplicate: Option<DuplicateArg>,

    /// Which sheets to write
    #[arg(long)]
    pub output_mode: Option<OutputModeArg>,

    /// Write the output sheets into the input workbook
    #[arg(long)]
    pub append: bool,

    /// Print summary + meta as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

fn parse_preset(s: &str) -> Result<Preset, String> {
    Preset::parse(s).ok_or_else(|| format!("unknown preset \"{s}\" (expected a, b or c)"))
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::MissingSheet { .. } => {
                Some("set [sheets] left/right in a --config file".to_string())
            }
            ReconError::MissingRequiredField { .. } => {
                Some("try another --preset, or name the key columns in a --config file".to_string())
            }
            _ => None,
        };
        CliError {
            code: recon_exit_code(&err),
            message: err.to_string(),
            hint,
        }
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RunReport<'a> {
    meta: &'a ReconMeta,
    summary: &'a ReconSummary,
    outputs: Vec<OutputReport>,
}

#[derive(Serialize)]
struct OutputReport {
    path: String,
    sheets: Vec<String>,
}

impl From<WrittenFile> for OutputReport {
    fn from(file: WrittenFile) -> Self {
        Self {
            path: file.path.display().to_string(),
            sheets: file.sheets,
        }
    }
}

fn load_config(path: &Path) -> Result<ReconConfig, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|e| CliError {
        code: EXIT_INVALID_CONFIG,
        message: format!("cannot read config {}: {e}", path.display()),
        hint: None,
    })?;
    Ok(ReconConfig::from_toml(&raw)?)
}

/// Config file or preset, with command-line overrides applied and re-validated.
fn resolve_config(args: &RunArgs) -> Result<ReconConfig, CliError> {
    let mut config = match (&args.config, args.preset) {
        (Some(path), _) => load_config(path)?,
        (None, Some(preset)) => preset.config(),
        (None, None) => Preset::A.config(),
    };

    if let Some(mode) = args.mode {
        config.matching.mode = match mode {
            ModeArg::OneToOne => MatchMode::OneToOne,
            ModeArg::ManyToOne => MatchMode::ManyToOne,
        };
    }
    if let Some(policy) = args.on_duplicate {
        config.matching.on_duplicate = match policy {
            DuplicateArg::Skip => DuplicatePolicy::Skip,
            DuplicateArg::Flag => DuplicatePolicy::Flag,
        };
    }
    if let Some(mode) = args.output_mode {
        config.output.mode = match mode {
            OutputModeArg::Combined => OutputMode::SingleCombinedSheet,
            OutputModeArg::MatchedOnly => OutputMode::MatchedOnly,
            OutputModeArg::Separate => OutputMode::MatchedPlusUnmatchedSeparate,
        };
    }
    if args.append {
        config.output.target = TargetKind::AppendToSource;
    } else if args.output.is_some() {
        config.output.target = TargetKind::NewFile;
    }

    config.validate()?;
    Ok(config)
}

fn resolve_target(args: &RunArgs, config: &ReconConfig) -> Result<OutputTarget, CliError> {
    if config.output.target == TargetKind::AppendToSource {
        if !supports_append(&args.input) {
            return Err(CliError {
                code: EXIT_USAGE,
                message: format!("cannot append to {}: not an .xlsx workbook", args.input.display()),
                hint: Some("drop --append to write a new .xlsx workbook instead".to_string()),
            });
        }
        return Ok(OutputTarget::AppendSheetToSource(args.input.clone()));
    }

    let path = args
        .output
        .clone()
        .unwrap_or_else(|| sibling_path(&args.input, "_merged"));
    if path == args.input {
        return Err(CliError {
            code: EXIT_USAGE,
            message: format!("output {} is the input workbook", path.display()),
            hint: Some("use --append to add the merged sheet to the input".to_string()),
        });
    }
    Ok(OutputTarget::NewFile(path))
}

pub fn cmd_run(args: RunArgs, quiet: bool) -> Result<(), CliError> {
    let config = resolve_config(&args)?;
    let target = resolve_target(&args, &config)?;

    let mut sets = read_sheets(
        &args.input,
        &[config.sheets.left.as_str(), config.sheets.right.as_str()],
    )?;
    let (Some(right), Some(left)) = (sets.pop(), sets.pop()) else {
        return Err(CliError {
            code: EXIT_ERROR,
            message: "workbook reader returned fewer sheets than requested".to_string(),
            hint: None,
        });
    };

    let result = tabmatch_recon::run(&config, &left, &right)?;
    let plan = plan_output(&config, &left, &right, &result.merged);
    let written = write_output(&target, &plan, config.output.unmatched_file.as_deref())?;

    if !quiet {
        print_summary(&result.meta, &result.summary, &written);
    }

    if args.json {
        let report = RunReport {
            meta: &result.meta,
            summary: &result.summary,
            outputs: written.into_iter().map(OutputReport::from).collect(),
        };
        let json = serde_json::to_string_pretty(&report).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("JSON serialization error: {e}"),
            hint: None,
        })?;
        println!("{json}");
    }

    Ok(())
}

fn print_summary(meta: &ReconMeta, s: &ReconSummary, written: &[WrittenFile]) {
    eprintln!(
        "{} vs {}: {} matched, {} duplicates, {} unmatched {}, {} unmatched {} ({} rows)",
        meta.left_sheet,
        meta.right_sheet,
        s.matched,
        s.duplicates,
        s.unmatched_left,
        meta.left_sheet,
        s.unmatched_right,
        meta.right_sheet,
        s.output_rows,
    );
    for file in written {
        eprintln!("wrote {} [{}]", file.path.display(), file.sheets.join(", "));
    }
}

// ---------------------------------------------------------------------------
// validate / presets
// ---------------------------------------------------------------------------

pub fn cmd_validate(config: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config)?;
    let keys: Vec<String> = config
        .keys
        .iter()
        .map(|k| format!("{} = {}", k.left, k.right))
        .collect();
    eprintln!(
        "ok: {} ({} vs {}; keys: {}; {}, duplicates: {})",
        config.name,
        config.sheets.left,
        config.sheets.right,
        keys.join(", "),
        config.matching.mode,
        config.matching.on_duplicate,
    );
    Ok(())
}

#[derive(Serialize)]
struct PresetReport {
    name: &'static str,
    keys: Vec<tabmatch_recon::model::KeyPair>,
}

pub fn cmd_presets(json: bool) -> Result<(), CliError> {
    let presets: Vec<PresetReport> = Preset::ALL
        .iter()
        .map(|p| PresetReport {
            name: p.name(),
            keys: p.config().keys,
        })
        .collect();

    if json {
        let out = serde_json::to_string_pretty(&presets).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("JSON serialization error: {e}"),
            hint: None,
        })?;
        println!("{out}");
        return Ok(());
    }

    for preset in &presets {
        let keys: Vec<String> = preset
            .keys
            .iter()
            .map(|k| format!("\"{}\" = \"{}\"", k.left, k.right))
            .collect();
        println!("{}  {}", preset.name, keys.join(", "));
    }
    Ok(())
}
