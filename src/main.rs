use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};

use reelwright::{
    avi::AviInspection,
    config::Config,
    source::{expand_inputs, JPEG_EXTENSIONS, STILL_EXTENSIONS},
    ConversionEngine, ReelError,
};

#[derive(Parser)]
#[command(
    name = "reelwright",
    version,
    about = "Turn a sequence of still images into a video",
    long_about = "Reelwright stores JPEG images verbatim as Motion-JPEG frames in an AVI file, or hands any still images to FFmpeg for H.264/MP4 output."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Mux JPEG images into a Motion-JPEG AVI file
    Avi(ConvertArgs),

    /// Encode images into an H.264 MP4 file with FFmpeg
    Mp4(ConvertArgs),

    /// Print the headers and index of an AVI file
    Inspect {
        /// AVI file to read
        file: PathBuf,
    },
}

#[derive(Args)]
struct ConvertArgs {
    /// Output video file path
    #[arg(short, long)]
    output: PathBuf,

    /// Frames per second (overrides the configuration)
    #[arg(short, long)]
    fps: Option<u32>,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Image files in frame order, or a single directory of images
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let verbose = match &cli.command {
        Command::Avi(args) | Command::Mp4(args) => args.verbose,
        Command::Inspect { .. } => false,
    };

    // Initialize logging
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .init();

    info!("Starting Reelwright v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Avi(args) => convert(args, OutputKind::Avi).await,
        Command::Mp4(args) => convert(args, OutputKind::Mp4).await,
        Command::Inspect { file } => inspect(file),
    }
}

#[derive(Clone, Copy)]
enum OutputKind {
    Avi,
    Mp4,
}

async fn convert(args: ConvertArgs, kind: OutputKind) -> Result<()> {
    let mut config = match &args.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path).map_err(friendly)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };

    if let Some(fps) = args.fps {
        config.output.fps = fps;
    }

    let extensions = match kind {
        OutputKind::Avi => JPEG_EXTENSIONS,
        OutputKind::Mp4 => STILL_EXTENSIONS,
    };
    let paths = expand_inputs(&args.inputs, extensions).map_err(friendly)?;
    info!("Input: {} images", paths.len());
    info!("Output: {:?}", args.output);

    let engine = ConversionEngine::new(config);
    let video = match kind {
        OutputKind::Avi => engine.encode_images_to_avi(&paths, &args.output).await,
        OutputKind::Mp4 => engine.encode_images_to_mp4(&paths, &args.output).await,
    }
    .map_err(friendly)?;

    info!("Conversion complete! Output saved to: {:?}", video.path);
    Ok(())
}

fn inspect(file: PathBuf) -> Result<()> {
    let mut reader = BufReader::new(File::open(&file)?);
    let info = AviInspection::read(&mut reader).map_err(friendly)?;

    println!("{}", file.display());
    println!("  riff size        {}", info.riff_size);
    println!("  frames           {}", info.total_frames);
    println!("  dimensions       {}x{}", info.width, info.height);
    println!("  codec            {} / {}", info.codec, info.compression);
    println!("  rate             {}/{} ({:.3} fps)", info.rate, info.scale, info.fps());
    println!("  us per frame     {}", info.micro_sec_per_frame);
    println!("  max bytes/sec    {}", info.max_bytes_per_sec);
    println!("  buffer sizes     {} (avih) / {} (strh)", info.suggested_buffer_size, info.stream_suggested_buffer_size);
    println!("  movi size        {}", info.movi_size);
    println!("  index entries    {}", info.index.len());

    let payload: u64 = info.index.iter().map(|entry| u64::from(entry.size)).sum();
    println!("  payload bytes    {}", payload);
    Ok(())
}

fn friendly(err: ReelError) -> anyhow::Error {
    anyhow::anyhow!(err.user_message())
}
