//! Command-line front end for temporal literal handling
//!
//! Parses literals, decodes stored keys and rounds values, printing the
//! numeric form alongside the encoded bytes.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use octofhir_temporal::context::parse_timestamp_with;
use octofhir_temporal::{
    Granularity, LogicalType, ParsedTemporal, RoundingMode, SortOrder, TemporalConfig,
    TemporalContext, TemporalKind, Timezone, round_instant,
};
use std::fs;

#[derive(Parser)]
#[command(name = "octofhir-temporal")]
#[command(about = "Parse, encode and round SQL temporal literals")]
#[command(version)]
#[command(author = "OctoFHIR Team <funyloony@gmail.com>")]
struct Cli {
    /// JSON file with session settings (timezone and patterns)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a literal and show its numeric form and encoding
    Parse {
        /// Literal text, e.g. "2024-05-16 13:45:30.5"
        literal: String,
        /// Logical type of the literal
        #[arg(short = 't', long = "type", default_value = "TIMESTAMP")]
        logical_type: LogicalType,
        /// Pattern overriding the session default for the type
        #[arg(short, long)]
        format: Option<String>,
        /// Zone the literal is interpreted in
        #[arg(short = 'z', long)]
        timezone: Option<String>,
        /// Show the descending encoding
        #[arg(long)]
        desc: bool,
    },
    /// Decode a hex-encoded key
    Decode {
        /// Encoded bytes as hex
        hex: String,
        /// Logical type the bytes were written as
        #[arg(short = 't', long = "type", default_value = "TIMESTAMP")]
        logical_type: LogicalType,
        /// Bytes were written in descending order
        #[arg(long)]
        desc: bool,
    },
    /// Round a timestamp literal down (or up) to a calendar unit
    Floor {
        /// Timestamp literal
        literal: String,
        /// Unit to round to (MILLISECOND .. YEAR)
        #[arg(short, long)]
        unit: Granularity,
        /// Round up instead of down
        #[arg(long)]
        ceil: bool,
        /// Zone the literal is read and the calendar computed in
        #[arg(short = 'z', long)]
        timezone: Option<String>,
    },
}

fn main() -> Result<()> {
    // Setup human-panic for better error messages
    human_panic::setup_panic!();
    env_logger::init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let ctx = TemporalContext::new(config).context("Invalid session configuration")?;

    match cli.command {
        Commands::Parse {
            literal,
            logical_type,
            format,
            timezone,
            desc,
        } => handle_parse(
            &ctx,
            &literal,
            logical_type,
            format.as_deref(),
            timezone.as_deref(),
            desc,
        ),
        Commands::Decode {
            hex,
            logical_type,
            desc,
        } => handle_decode(&ctx, &hex, logical_type, desc),
        Commands::Floor {
            literal,
            unit,
            ceil,
            timezone,
        } => handle_floor(&ctx, &literal, unit, ceil, timezone.as_deref()),
    }
}

fn load_config(path: Option<&str>) -> Result<TemporalConfig> {
    let Some(path) = path else {
        return Ok(TemporalConfig::default());
    };
    let json = fs::read_to_string(path).with_context(|| format!("Error reading file '{path}'"))?;
    TemporalConfig::from_json(&json).with_context(|| format!("Error parsing config '{path}'"))
}

fn order(desc: bool) -> SortOrder {
    if desc { SortOrder::Desc } else { SortOrder::Asc }
}

fn handle_parse(
    ctx: &TemporalContext,
    literal: &str,
    logical_type: LogicalType,
    format: Option<&str>,
    timezone: Option<&str>,
    desc: bool,
) -> Result<()> {
    let value = match format {
        None => ctx.parse_literal(literal, logical_type, timezone)?,
        Some(_) => {
            let parser = ctx.get_date_time_parser(format, logical_type, timezone)?;
            if logical_type.temporal_kind() == Some(TemporalKind::Timestamp) {
                parse_timestamp_with(&parser, literal)?
            } else {
                ParsedTemporal::from_millis(parser.parse_date_time(literal)?)
            }
        }
    };

    let codec = ctx.get_codec_for(logical_type)?;
    let bytes = codec
        .encode_with_order(&value, order(desc))
        .with_context(|| format!("Cannot encode '{literal}' as {logical_type}"))?;

    println!("Literal: {literal}");
    println!("Type:    {logical_type}");
    println!("Millis:  {}", value.millis());
    println!("Nanos:   {}", value.nanos());
    println!("UTC:     {value}");
    println!("Encoded: {}", hex::encode(bytes));
    Ok(())
}

fn handle_decode(
    ctx: &TemporalContext,
    encoded: &str,
    logical_type: LogicalType,
    desc: bool,
) -> Result<()> {
    let bytes = hex::decode(encoded.trim()).with_context(|| format!("Invalid hex '{encoded}'"))?;
    let codec = ctx.get_codec_for(logical_type)?;
    let value = codec.decode_with_order(&bytes, order(desc))?;

    println!("Millis:  {}", value.millis());
    println!("Nanos:   {}", value.nanos());
    println!("UTC:     {value}");
    println!(
        "Literal: {} ({})",
        ctx.format_literal(&value, logical_type)?,
        ctx.default_timezone()
    );
    Ok(())
}

fn handle_floor(
    ctx: &TemporalContext,
    literal: &str,
    unit: Granularity,
    ceil: bool,
    timezone: Option<&str>,
) -> Result<()> {
    let zone = match timezone {
        Some(id) => Timezone::parse(id)?,
        None => *ctx.default_timezone(),
    };
    let value = ctx.parse_literal(literal, LogicalType::Timestamp, timezone)?;
    let mode = if ceil {
        RoundingMode::Ceil
    } else {
        RoundingMode::Floor
    };

    let millis = round_instant(&value, unit, mode, &zone)?;
    let rounded = ParsedTemporal::from_millis(millis);
    let parser = ctx.get_parser(&ctx.config().timestamp_format, zone)?;

    println!("{mode}({unit}) in {zone}");
    println!("Millis:  {millis}");
    println!("UTC:     {rounded}");
    println!("Local:   {}", parser.format(millis)?);
    Ok(())
}
