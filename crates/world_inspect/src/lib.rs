use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;
use world_format::{
    ChecksumPolicy, CodecConfig, FormatFeatures, LoadedWorld, WorldCodec, WorldSummary,
};

#[derive(Debug, Clone, Default)]
pub struct CommonOptions {
    pub json: bool,
    pub config_path: Option<PathBuf>,
    /// Overrides the policy from the config file.
    pub checksum_policy: Option<ChecksumPolicy>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Summary { path: PathBuf },
    Validate { path: PathBuf },
    Resave {
        path: PathBuf,
        version: u32,
        out: PathBuf,
    },
    Versions,
}

#[derive(Debug, Serialize)]
struct InspectReport {
    summary: WorldSummary,
    warnings: Vec<String>,
    issues: Vec<String>,
}

#[derive(Debug, Serialize)]
struct VersionRow {
    version: u32,
    tile_rle: bool,
    wiring: bool,
    paint: bool,
    honey: bool,
    checksum_footer: bool,
    block_shapes: bool,
    extra_wires: bool,
    wide_block_ids: bool,
    chest_names: bool,
    chest_capacity: usize,
    sign_text_limit: usize,
}

impl From<FormatFeatures> for VersionRow {
    fn from(features: FormatFeatures) -> Self {
        Self {
            version: features.version,
            tile_rle: features.tile_rle,
            wiring: features.wiring,
            paint: features.paint,
            honey: features.honey,
            checksum_footer: features.checksum_footer,
            block_shapes: features.block_shapes,
            extra_wires: features.extra_wires,
            wide_block_ids: features.wide_block_ids,
            chest_names: features.chest_names,
            chest_capacity: features.chest_capacity,
            sign_text_limit: features.sign_text_limit,
        }
    }
}

pub fn parse_checksum_policy(raw: &str) -> Result<ChecksumPolicy, String> {
    match raw {
        "warn" => Ok(ChecksumPolicy::Warn),
        "reject" => Ok(ChecksumPolicy::Reject),
        "skip" => Ok(ChecksumPolicy::Skip),
        other => Err(format!(
            "invalid checksum policy '{other}' (expected warn, reject or skip)"
        )),
    }
}

pub fn parse_codec_config_json(raw: &str) -> Result<CodecConfig, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, CodecConfig>(&mut deserializer) {
        Ok(config) => Ok(config),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse codec config: {source}"))
            } else {
                Err(format!("parse codec config at {path}: {source}"))
            }
        }
    }
}

fn load_codec_config(path: &Path) -> Result<CodecConfig, String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("read config '{}': {error}", path.display()))?;
    parse_codec_config_json(&raw)
}

fn build_codec(opts: &CommonOptions) -> Result<WorldCodec, String> {
    let mut config = match &opts.config_path {
        Some(path) => load_codec_config(path)?,
        None => CodecConfig::default(),
    };
    if let Some(policy) = opts.checksum_policy {
        config.checksum_policy = policy;
    }
    Ok(WorldCodec::new(config))
}

fn load_world(codec: &WorldCodec, path: &Path) -> Result<LoadedWorld, String> {
    codec
        .load_from_path(path)
        .map_err(|error| format!("load '{}': {error}", path.display()))
}

fn report_for(loaded: &LoadedWorld) -> InspectReport {
    InspectReport {
        summary: loaded.world.summary(),
        warnings: loaded.warnings.iter().map(ToString::to_string).collect(),
        issues: loaded
            .world
            .validate()
            .iter()
            .map(ToString::to_string)
            .collect(),
    }
}

fn write_out<W: Write>(stdout: &mut W, text: &str) -> Result<(), String> {
    writeln!(stdout, "{text}").map_err(|error| format!("write output: {error}"))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|error| format!("encode json: {error}"))
}

fn render_summary(report: &InspectReport) -> String {
    let summary = &report.summary;
    let mut lines = vec![
        format!("name:      {}", summary.name),
        format!("version:   {}", summary.format_version),
        format!("world id:  {}", summary.world_id),
        format!("size:      {} x {}", summary.width, summary.height),
        format!("spawn:     ({}, {})", summary.spawn_x, summary.spawn_y),
        format!(
            "tiles:     {} blocks, {} walls, {} liquid, {} wired",
            summary.block_tiles, summary.wall_tiles, summary.liquid_tiles, summary.wired_tiles
        ),
        format!(
            "entities:  {} chests, {} signs, {} npcs ({} homeless)",
            summary.chest_count, summary.sign_count, summary.npc_count, summary.homeless_npc_count
        ),
    ];
    lines.extend(report.warnings.iter().map(|w| format!("warning:   {w}")));
    lines.join("\n")
}

/// Runs one command, writing its report to `stdout`.
///
/// `Validate` fails when the world has consistency issues, so scripts can
/// branch on the exit status.
pub fn run<W: Write>(kind: CommandKind, opts: CommonOptions, stdout: &mut W) -> Result<(), String> {
    match kind {
        CommandKind::Summary { path } => {
            let codec = build_codec(&opts)?;
            let report = report_for(&load_world(&codec, &path)?);
            let text = if opts.json {
                to_json(&report)?
            } else {
                render_summary(&report)
            };
            write_out(stdout, &text)
        }
        CommandKind::Validate { path } => {
            let codec = build_codec(&opts)?;
            let report = report_for(&load_world(&codec, &path)?);
            if opts.json {
                write_out(stdout, &to_json(&report)?)?;
            } else if report.issues.is_empty() {
                write_out(stdout, "ok")?;
            } else {
                for issue in &report.issues {
                    write_out(stdout, issue)?;
                }
            }
            if report.issues.is_empty() {
                Ok(())
            } else {
                Err(format!("{} validation issue(s)", report.issues.len()))
            }
        }
        CommandKind::Resave { path, version, out } => {
            let codec = build_codec(&opts)?;
            let loaded = load_world(&codec, &path)?;
            codec
                .save_to_path(&loaded.world, version, &out)
                .map_err(|error| format!("save '{}': {error}", out.display()))?;
            info!(
                from = loaded.world.version(),
                to = version,
                out = %out.display(),
                "world_resaved"
            );
            write_out(
                stdout,
                &format!(
                    "wrote '{}' as version {version} (was {})",
                    out.display(),
                    loaded.world.version()
                ),
            )
        }
        CommandKind::Versions => {
            let rows = FormatFeatures::all()
                .into_iter()
                .map(VersionRow::from)
                .collect::<Vec<_>>();
            if opts.json {
                return write_out(stdout, &to_json(&rows)?);
            }
            for row in rows {
                write_out(
                    stdout,
                    &format!(
                        "v{}: chests {} slots, signs {} bytes, rle={} wiring={} paint={} honey={} footer={} shapes={} wires={} wide_ids={} chest_names={}",
                        row.version,
                        row.chest_capacity,
                        row.sign_text_limit,
                        row.tile_rle,
                        row.wiring,
                        row.paint,
                        row.honey,
                        row.checksum_footer,
                        row.block_shapes,
                        row.extra_wires,
                        row.wide_block_ids,
                        row.chest_names,
                    ),
                )?;
            }
            Ok(())
        }
    }
}
