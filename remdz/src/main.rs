use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use libmdz::{BandRange, Precision, Stage, WindowType};
use remdz::config::{self, Config};
use remdz::EncodeOptions;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "mdz")]
#[command(version)]
#[command(about = "MDCT lossy audio codec", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode an audio file to mdz records
    Encode {
        /// Input audio file (mp3, wav, flac, ogg, etc.)
        input: PathBuf,
        /// Output base name, the stage index and .npz get appended
        output: String,
        /// Write the record of every stage (0-4), not just the last
        #[arg(long)]
        generate_steps: bool,
        /// TOML config file (default: ./mdz.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Samples per MDCT block
        #[arg(long)]
        block_size: Option<usize>,
        /// Window (sine, vorbis, kbd)
        #[arg(long)]
        window: Option<WindowType>,
        /// First bin zeroed by band truncation
        #[arg(long)]
        cutoff: Option<usize>,
        /// Downcast precision (half, bfloat16, single, double, none)
        #[arg(long)]
        precision: Option<String>,
        /// Decimal digits kept by rounding
        #[arg(long)]
        decimals: Option<i32>,
        /// Magnitudes below this become zero
        #[arg(long)]
        threshold: Option<f64>,
        /// Skip band truncation
        #[arg(long)]
        no_truncate: bool,
        /// Skip decimal rounding
        #[arg(long)]
        no_round: bool,
        /// Skip thresholding
        #[arg(long)]
        no_threshold: bool,
    },
    /// Decode an mdz record to WAV
    Decode {
        /// Input .npz record
        input: PathBuf,
        /// Output WAV file
        output: PathBuf,
        /// Window the record was encoded with
        #[arg(long, default_value = "sine")]
        window: WindowType,
    },
    /// Subtract two audio files, writing <base>.wav and <base>.npz
    Residual {
        /// Audio to subtract from
        a: PathBuf,
        /// Audio to subtract
        b: PathBuf,
        /// Output base name
        output: String,
    },
    /// Show information about an mdz record
    Info {
        /// Input .npz record
        input: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encode {
            input,
            output,
            generate_steps,
            config,
            block_size,
            window,
            cutoff,
            precision,
            decimals,
            threshold,
            no_truncate,
            no_round,
            no_threshold,
        } => {
            let options = encode_options(EncodeArgs {
                config,
                generate_steps,
                block_size,
                window,
                cutoff,
                precision,
                decimals,
                threshold,
                no_truncate,
                no_round,
                no_threshold,
            })?;
            encode(&input, &output, &options)?;
        }
        Commands::Decode {
            input,
            output,
            window,
        } => {
            decode(&input, &output, window)?;
        }
        Commands::Residual { a, b, output } => {
            residual(&a, &b, &output)?;
        }
        Commands::Info { input, json } => {
            info(&input, json)?;
        }
    }

    Ok(())
}

struct EncodeArgs {
    config: Option<PathBuf>,
    generate_steps: bool,
    block_size: Option<usize>,
    window: Option<WindowType>,
    cutoff: Option<usize>,
    precision: Option<String>,
    decimals: Option<i32>,
    threshold: Option<f64>,
    no_truncate: bool,
    no_round: bool,
    no_threshold: bool,
}

/// config file first, then whatever was given on the command line
fn encode_options(args: EncodeArgs) -> Result<EncodeOptions> {
    let cfg = match config::find_config(args.config.clone()) {
        Some(path) => {
            let cfg = config::load_config(&path)?;
            log::info!("Loaded config from {}", path.display());
            cfg
        }
        None => Config::default(),
    };

    let mut codec = cfg.codec;

    if let Some(n) = args.block_size {
        codec.block_size = n;
    }
    if let Some(w) = args.window {
        codec.window = w;
    }
    if let Some(bin) = args.cutoff {
        codec.reduction.truncate = Some(BandRange::from_bin(bin));
    }
    if let Some(p) = args.precision {
        codec.reduction.precision = match p.to_lowercase().as_str() {
            "none" | "off" => None,
            other => Some(other.parse::<Precision>()?),
        };
    }
    if let Some(d) = args.decimals {
        codec.reduction.decimals = Some(d);
    }
    if let Some(t) = args.threshold {
        codec.reduction.threshold = Some(t);
    }
    if args.no_truncate {
        codec.reduction.truncate = None;
    }
    if args.no_round {
        codec.reduction.decimals = None;
    }
    if args.no_threshold {
        codec.reduction.threshold = None;
    }

    codec.validate().context("Invalid codec settings")?;

    Ok(EncodeOptions::new()
        .with_codec(codec)
        .with_steps(args.generate_steps || cfg.output.generate_steps))
}

fn encode(input: &Path, output: &str, options: &EncodeOptions) -> Result<()> {
    println!("Reading {}...", input.display());

    let waveform = remdz::audio::read_audio_file(input).context("Failed to read input file")?;

    println!("  Sample rate: {} Hz", waveform.sample_rate);
    println!("  Channels: {}", waveform.channels);
    println!("  Duration: {:.2}s", waveform.duration_secs());

    log::info!(
        "block size {}, {:?} window, reduction {:?}",
        options.codec.block_size,
        options.codec.window,
        options.codec.reduction
    );

    let pb = ProgressBar::new(Stage::ALL.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} stages {msg}")
            .context("Bad progress template")?
            .progress_chars("=>-"),
    );

    let result = remdz::encode_from_samples(&waveform, options, |stage| {
        pb.set_message(stage.name());
        pb.inc(1);
    })
    .context("Failed to encode audio")?;
    pb.finish_with_message("done");

    for (stage, bytes) in result.to_npz()? {
        let path = remdz::stage_file_name(output, stage);
        fs::write(&path, &bytes).with_context(|| format!("Failed to write {}", path))?;
        println!("  Stage {}: {} ({} bytes)", stage.index(), path, bytes.len());
    }

    if let Some(record) = result.final_record() {
        println!(
            "Done! {:.1}% of coefficients are zero",
            record.sparsity() * 100.0
        );
    }

    Ok(())
}

fn decode(input: &Path, output: &Path, window: WindowType) -> Result<()> {
    println!("Reading {}...", input.display());

    let npz = fs::read(input).context("Failed to read record")?;

    let record_info = remdz::get_record_info(&npz)?;
    println!("  Sample rate: {} Hz", record_info.sample_rate);
    println!("  Channels: {}", record_info.channels);
    println!("  Duration: {:.2}s", record_info.duration_secs);

    println!("Decoding...");

    let wav_bytes = remdz::decode_to_wav(&npz, window).context("Failed to decode record")?;

    fs::write(output, wav_bytes).context("Failed to write WAV file")?;

    println!("Done!");
    println!("  Output: {}", output.display());

    Ok(())
}

fn residual(a: &Path, b: &Path, output: &str) -> Result<()> {
    let a_bytes = fs::read(a).with_context(|| format!("Failed to read {}", a.display()))?;
    let b_bytes = fs::read(b).with_context(|| format!("Failed to read {}", b.display()))?;

    let diff = remdz::residual_from_audio(&a_bytes, &b_bytes)?;
    if diff.is_empty() {
        bail!("Residual is empty, one of the inputs has no samples");
    }

    let peak = diff.samples.iter().fold(0.0f64, |m, s| m.max(s.abs()));
    log::info!("residual peak {:.6}", peak);

    let wav_path = format!("{}.wav", output);
    remdz::audio::write_wav(Path::new(&wav_path), &diff)?;

    let npz_path = format!("{}.npz", output);
    fs::write(&npz_path, remdz::waveform_to_npz(&diff)?)
        .with_context(|| format!("Failed to write {}", npz_path))?;

    println!("Done!");
    println!("  Output: {}, {}", wav_path, npz_path);

    Ok(())
}

fn info(input: &Path, json: bool) -> Result<()> {
    let npz = fs::read(input).context("Failed to read record")?;
    let record_info = remdz::get_record_info(&npz)?;

    if json {
        let json_str =
            serde_json::to_string_pretty(&record_info).context("Failed to serialize info")?;
        println!("{}", json_str);
        return Ok(());
    }

    println!("mdz Record");
    println!("───────────────────────────────");
    println!("  Version:     {}", record_info.version);
    println!("  Sample rate: {} Hz", record_info.sample_rate);
    println!("  Channels:    {}", record_info.channels);
    println!("  Shape:       {:?}", record_info.shape);
    println!("  Dtype:       {}", record_info.dtype);
    println!("  Block size:  {}", record_info.bins.saturating_mul(2));
    println!("  Duration:    {:.2}s", record_info.duration_secs);
    println!("  File size:   {} bytes", record_info.file_size);
    println!("  Zeros:       {:.1}%", record_info.zero_fraction * 100.0);

    Ok(())
}
