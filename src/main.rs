use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hid_relay::config::AppConfig;
use hid_relay::gadget::GadgetManager;
use hid_relay::hotplug::UdevEventMonitor;
use hid_relay::relay::controller::{RelayController, RelaySettings};
use hid_relay::relay::shortcut::ShortcutToggler;
use hid_relay::relay::udc::UdcStateMonitor;
use hid_relay::relay::ActivationFlag;

/// Log level for the application
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// hid-relay command line arguments
#[derive(Parser, Debug)]
#[command(name = "hid-relay")]
#[command(version, about = "Relay evdev input devices to a USB HID gadget", long_about = None)]
struct CliArgs {
    /// Path to the JSON configuration file
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Device to relay: event node path, MAC address, or name fragment
    /// (repeatable, adds to the configured list)
    #[arg(short = 'i', long = "device", value_name = "ID")]
    devices: Vec<String>,

    /// Relay all input devices instead of an explicit list
    #[arg(short = 'A', long)]
    auto_discover: bool,

    /// Grab devices for exclusive access while relaying
    #[arg(short = 'g', long)]
    grab_devices: bool,

    /// Relay toggle shortcut, comma separated key names
    /// (e.g. "LEFTCTRL,RIGHTALT")
    #[arg(short = 's', long, value_name = "KEYS")]
    shortcut: Option<String>,

    /// UDC state file (overrides the configured path)
    #[arg(long, value_name = "FILE")]
    udc_state: Option<PathBuf>,

    /// List available input devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short = 'l', long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    init_logging(args.log_level, args.verbose);

    if args.list_devices {
        list_devices();
        return Ok(());
    }

    tracing::info!("Starting hid-relay v{}", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::load_or_default(args.config.as_deref())?;

    // CLI overrides on top of the file
    config.relay.devices.extend(args.devices);
    if args.auto_discover {
        config.relay.auto_discover = true;
    }
    if args.grab_devices {
        config.relay.grab_devices = true;
    }
    if let Some(shortcut) = args.shortcut {
        config.relay.shortcut_keys = shortcut
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
    }
    if let Some(udc_state) = args.udc_state {
        config.relay.udc_state_path = udc_state;
    }

    if config.relay.devices.is_empty() && !config.relay.auto_discover {
        tracing::warn!("no devices selected; pass --device or --auto-discover");
    }

    let gadgets = Arc::new(GadgetManager::new(config.hid.clone()));
    gadgets.enable_gadgets()?;

    let activation = Arc::new(ActivationFlag::new(true));
    let shortcut = Arc::new(ShortcutToggler::new(
        &config.relay.shortcut_keys,
        activation.clone(),
        gadgets.clone(),
    ));
    let settings = RelaySettings::from_config(&config.relay, &config.mover);
    let controller = Arc::new(RelayController::new(
        gadgets,
        activation.clone(),
        shortcut,
        config.mover.clone(),
        settings,
    ));
    let shutdown = controller.shutdown_token();

    let udc_monitor = UdcStateMonitor::new(
        activation,
        config.relay.udc_state_path.clone(),
        Duration::from_millis(config.relay.udc_poll_interval_ms),
    );
    tokio::spawn(udc_monitor.run(shutdown.clone()));

    let hotplug = UdevEventMonitor::new(controller.clone());
    let hotplug_cancel = shutdown.clone();
    // tokio-udev's monitor socket is not Send, so it cannot be moved onto the
    // multi-thread runtime with tokio::spawn; poll it on the main task
    // alongside the controller instead. Both futures stop on `shutdown`.
    let hotplug_task = async move {
        if let Err(e) = hotplug.run(hotplug_cancel).await {
            tracing::error!("hotplug monitor failed: {e}");
        }
    };

    tokio::spawn(wait_for_shutdown_signal(shutdown));

    tokio::join!(controller.run(), hotplug_task);
    Ok(())
}

async fn wait_for_shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
    }
    tracing::info!("shutdown signal received");
    shutdown.cancel();
}

fn list_devices() {
    let mut devices: Vec<_> = evdev::enumerate().collect();
    devices.sort_by(|a, b| a.0.cmp(&b.0));
    if devices.is_empty() {
        println!("no input devices found (are you root?)");
        return;
    }
    for (path, device) in devices {
        let name = device.name().unwrap_or("unknown");
        let uniq = device.unique_name().unwrap_or("");
        if uniq.is_empty() {
            println!("{}\t{}", path.display(), name);
        } else {
            println!("{}\t{}\t[{}]", path.display(), name, uniq);
        }
    }
}

fn init_logging(level: LogLevel, verbose_count: u8) {
    // Verbose count overrides log level
    let effective_level = match verbose_count {
        0 => level,
        1 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };

    let filter = match effective_level {
        LogLevel::Error => "hid_relay=error",
        LogLevel::Warn => "hid_relay=warn",
        LogLevel::Info => "hid_relay=info",
        LogLevel::Debug => "hid_relay=debug",
        LogLevel::Trace => "hid_relay=trace",
    };

    // Environment variable takes highest priority
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
    {
        eprintln!("failed to initialize tracing: {}", err);
    }
}
