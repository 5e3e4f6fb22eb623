use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use watermark_eraser::{
    AuthProvider, AuthState, CandidateFile, Config, FileSaveTarget, GateMode, GateView, ImageInfo,
    InputEvent, Level, Notification, Notifier, PlatformClient, ProcessingState, Services,
    UploadWorkflow,
};

#[derive(Parser)]
#[command(
    name = "watermark-eraser",
    about = "Remove watermarks from images with a hosted AI service",
    version,
    after_help = "Reads WATERMARK_ERASER_API_URL and WATERMARK_ERASER_API_KEY from the \
                  environment or a .env file.\n\n\
                  Images must be at most 10 MiB. Results are saved as \
                  {name}_watermark_removed.png."
)]
struct Cli {
    /// Input image file or directory
    input: PathBuf,

    /// Output directory (default: next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip the sign-in gate and assume the session is already established
    #[arg(long)]
    assume_auth: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

/// Prints notifications as toast-style lines on stderr.
struct StderrNotifier {
    quiet: bool,
}

impl Notifier for StderrNotifier {
    fn notify(&self, n: Notification) {
        match n.level {
            Level::Success if self.quiet => {}
            Level::Success => eprintln!("[OK] {}: {}", n.title, n.message),
            Level::Error => eprintln!("[FAIL] {}: {}", n.title, n.message),
        }
    }
}

fn init_tracing(cli: &Cli) {
    let default = if cli.verbose {
        "watermark_eraser=debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli);

    let mut config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    if cli.assume_auth {
        config.gate = GateMode::Assume;
    }

    if !cli.input.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input.display());
        process::exit(1);
    }

    let client = match PlatformClient::new(&config) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            eprintln!("Fatal: {e}");
            process::exit(1);
        }
    };

    let quiet = cli.quiet;
    client.subscribe(Box::new(move |state: &AuthState| {
        if quiet || state.is_loading {
            return;
        }
        match &state.user {
            Some(user) => eprintln!(
                "Signed in as {}",
                user.email.as_deref().unwrap_or(user.id.as_str())
            ),
            None => tracing::debug!("no active session"),
        }
    }));
    if let Err(e) = client.login().await {
        tracing::warn!(error = %e, "sign-in failed");
    }

    let mut workflow = UploadWorkflow::new(
        Services::shared(Arc::clone(&client)),
        Arc::new(StderrNotifier { quiet }),
    )
    .with_gate(config.gate);

    if workflow.gate_view() == GateView::SignIn {
        eprintln!("Error: You must be signed in. Check WATERMARK_ERASER_API_KEY.");
        process::exit(1);
    }

    if !quiet {
        workflow.observe(Box::new(|state: ProcessingState, progress: u8| {
            if state.is_busy() {
                eprintln!("  [{progress:>3}%] {state:?}");
            }
        }));
    }

    let inputs = if cli.input.is_dir() {
        match collect_images(&cli.input) {
            Ok(files) => files,
            Err(e) => {
                eprintln!("Error: Failed to read directory: {e}");
                process::exit(1);
            }
        }
    } else {
        vec![cli.input.clone()]
    };

    let mut success_count = 0u32;
    let mut fail_count = 0u32;

    for input in &inputs {
        let output_dir = match &cli.output {
            Some(o) => o.clone(),
            None => input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."))
                .to_path_buf(),
        };
        if run_one(&mut workflow, input, &output_dir, quiet).await {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if inputs.len() > 1 && !quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", inputs.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

/// Image files directly inside `dir`, sorted by name.
fn collect_images(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .filter(|p| watermark_eraser::file::is_supported_image(p))
        .collect();
    files.sort();
    Ok(files)
}

/// Select, process and download one file. Returns whether it succeeded.
async fn run_one(
    workflow: &mut UploadWorkflow,
    input: &Path,
    output_dir: &Path,
    quiet: bool,
) -> bool {
    let candidate = match CandidateFile::from_path(input) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[FAIL] {}: {e}", input.display());
            return false;
        }
    };
    let before = ImageInfo::probe(&candidate.bytes);

    if workflow.handle_input(InputEvent::Picked(candidate)).is_err() {
        return false;
    }

    if workflow.process().await != ProcessingState::Complete {
        return false;
    }

    let Some(result) = workflow.result().cloned() else {
        return false;
    };
    if !quiet {
        match before {
            Some(info) => eprintln!("  before: {} ({info})", result.original_url),
            None => eprintln!("  before: {}", result.original_url),
        }
        eprintln!("  after:  {}", result.processed_url);
    }

    workflow
        .download(&FileSaveTarget::new(output_dir))
        .await
        .is_some()
}
