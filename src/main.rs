use nexus_director::config::Settings;
use nexus_director::coordinator::CoordinatorBuilder;
use nexus_director::error::AppError;
use std::path::PathBuf;
use tracing::Level;

/// Config file path when none is given on the command line.
const CONFIG_ENV: &str = "DIRECTOR_CONFIG";

fn init_logging(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();
}

struct Args {
    config_path: Option<PathBuf>,
    once: bool,
}

fn parse_args() -> Args {
    let mut config_path = None;
    let mut once = false;
    for arg in std::env::args().skip(1) {
        if arg == "--once" {
            once = true;
        } else if config_path.is_none() {
            config_path = Some(PathBuf::from(arg));
        }
    }
    let config_path = config_path.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
    Args { config_path, once }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = parse_args();
    let settings = Settings::load(args.config_path.as_deref())?;
    init_logging(&settings.log_level);

    if args.once {
        let report = CoordinatorBuilder::new(settings).run_once()?;
        tracing::info!(
            "Single tick: {:?}, {:?}, {} intent(s)",
            report.status,
            report.phase,
            report.intents.len()
        );
        return Ok(());
    }

    let coordinator = CoordinatorBuilder::new(settings).build()?;
    tokio::signal::ctrl_c().await?;
    tracing::info!("Ctrl-C received, stopping director");
    coordinator.shutdown().await?;
    Ok(())
}
