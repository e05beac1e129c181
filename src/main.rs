use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use elster_rs::bus::slcan::{self, SlcanConfig};
use elster_rs::bus::{pump_frames, CanBus};
use elster_rs::catalogue::SIGNALS;
use elster_rs::config::Transport;
use elster_rs::logging::{init_logger_with_default, log_error, log_warn};
use elster_rs::sink::mqtt::MqttSink;
use elster_rs::sink::Naming;
use elster_rs::util::hex::decode_hex;
use elster_rs::{decode, encode_read, encode_write, log_info, Gateway, GatewayConfig, MonotonicClock};
use std::path::PathBuf;
use std::time::Duration;

/// Time the MQTT event loop gets to deliver the `offline` announcement.
const SHUTDOWN_FLUSH: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "elster-gateway")]
#[command(about = "Gateway between an Elster heat pump CAN bus and MQTT")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gateway
    Run {
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Serial port of the SLCAN adapter
        #[arg(short, long)]
        port: Option<String>,
        #[arg(short, long)]
        baudrate: Option<u32>,
        #[arg(long)]
        mqtt_host: Option<String>,
        #[arg(long)]
        mqtt_port: Option<u16>,
        /// Set this module's clock from the local time once polling starts
        #[arg(long, value_name = "MEMBER")]
        sync_clock: Option<String>,
    },
    /// Decode one frame, e.g. `decode 180 d2000e00dc0000`
    Decode { id: String, data: String },
    /// Print the read frame, or the write frame when a value is given
    Encode {
        member: String,
        signal: String,
        value: Option<String>,
    },
    /// List the signal catalogue
    Signals,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger_with_default("info");

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            port,
            baudrate,
            mqtt_host,
            mqtt_port,
            sync_clock,
        } => {
            let mut config = match config {
                Some(path) => GatewayConfig::load_from_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => GatewayConfig::default(),
            };
            if let Some(port) = port {
                config.bus.port = port;
            }
            if let Some(baudrate) = baudrate {
                config.bus.baudrate = baudrate;
            }
            if let Some(host) = mqtt_host {
                config.mqtt.host = host;
            }
            if let Some(port) = mqtt_port {
                config.mqtt.port = port;
            }
            run(config, sync_clock).await?;
        }
        Commands::Decode { id, data } => {
            let id = u16::from_str_radix(id.trim_start_matches("0x"), 16)
                .with_context(|| format!("invalid CAN identifier {id:?}"))?;
            let bytes = decode_hex(&data)?;
            let reading = decode(id, &bytes)?;
            println!(
                "{} {} {} = {}",
                reading.member.name,
                if reading.frame.is_read_request() { "read" } else { "value" },
                if reading.signal.is_sentinel() { "?" } else { reading.signal.name },
                reading.value
            );
        }
        Commands::Encode { member, signal, value } => {
            let frame = match value {
                Some(text) => encode_write(&member, &signal, &text)?,
                None => encode_read(&member, &signal)?,
            };
            println!("{}", hex::encode(frame));
        }
        Commands::Signals => {
            for signal in SIGNALS {
                println!(
                    "0x{:04X} {:<40} {}{}",
                    signal.index,
                    signal.name,
                    signal.value_type,
                    if signal.blacklisted { " (blacklisted)" } else { "" }
                );
            }
        }
    }

    Ok(())
}

async fn run(config: GatewayConfig, sync_clock: Option<String>) -> anyhow::Result<()> {
    let naming = Naming::from_config(&config);
    let sink = MqttSink::connect(&config.mqtt, &naming.availability_topic());

    match config.bus.transport {
        Transport::Slcan => {
            let slcan_config = SlcanConfig {
                port: config.bus.port.clone(),
                baudrate: config.bus.baudrate,
                bitrate: config.bus.bitrate,
                ..SlcanConfig::default()
            };
            let (bus, reader) = slcan::open(&slcan_config).await?;
            let gateway = Gateway::new(config, bus, sink, MonotonicClock::new())?;
            let ring = gateway.ring();
            tokio::spawn(async move {
                let e = pump_frames(reader, ring).await;
                log_error(&format!("SLCAN reader stopped: {e}"));
            });
            drive(gateway, sync_clock).await
        }
        #[cfg(all(target_os = "linux", feature = "socketcan"))]
        Transport::Socketcan => {
            use elster_rs::bus::socketcan::{spawn_reader, SocketCanBus};

            let bus = SocketCanBus::open(&config.bus.interface)?;
            let interface = config.bus.interface.clone();
            let gateway = Gateway::new(config, bus, sink, MonotonicClock::new())?;
            spawn_reader(&interface, gateway.ring())?;
            drive(gateway, sync_clock).await
        }
        #[cfg(not(all(target_os = "linux", feature = "socketcan")))]
        Transport::Socketcan => bail!("SocketCAN support requires Linux and the `socketcan` feature"),
    }
}

async fn drive<B: CanBus>(
    mut gateway: Gateway<B, MqttSink, MonotonicClock>,
    mut sync_clock: Option<String>,
) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(Duration::from_millis(gateway.config().tick_interval_ms));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                gateway.poll();
                if gateway.is_running() {
                    if let Some(member) = sync_clock.take() {
                        let now = chrono::Local::now();
                        let time = now.format("%H:%M:%S").to_string();
                        let date = now.format("%Y-%m-%d").to_string();
                        if let Err(e) = gateway
                            .update_time(&member, &time)
                            .and_then(|()| gateway.update_date(&member, &date))
                        {
                            log_warn(&format!("Clock sync of {member} failed: {e}"));
                        } else {
                            log_info(&format!("Setting {member} clock to {date} {time}"));
                        }
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log_info("Shutting down");
                gateway.shutdown();
                tokio::time::sleep(SHUTDOWN_FLUSH).await;
                break;
            }
        }
    }

    let stats = gateway.stats();
    log_info(&format!(
        "Received {} frames, sent {} requests, {} timeouts",
        stats.frames_received, stats.requests_sent, stats.timeouts
    ));
    Ok(())
}
