use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use velopod_lib::constants::DEFAULT_PORT;
use velopod_lib::simulator::DeviceState;
use velopod_lib::{HostDriver, NewtonSimulator, SerialChannel, Units, storage};

/// Tools for the Newton/PowerPod cycling power computer.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Serial port the device (or Isaac, when simulating) is on
    #[arg(long, default_value = DEFAULT_PORT)]
    port: String,

    #[command(flatten)]
    verbosity: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download every ride and save each as a raw device image
    GetRides {
        /// Directory to write powerpod.*.raw files into
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Print the ride directory
    List {
        /// Emit machine-readable JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print device identity and counters
    Info,
    /// Push the host's local clock to the device
    SetTime,
    /// Set the odometer, in kilometres
    SetOdometer { km: f64 },
    /// Set the display unit system
    SetUnits { units: UnitsArg },
    /// Erase all recorded rides
    EraseAll,
    /// Play the device against Isaac on the given port
    Simulate,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum UnitsArg {
    English,
    Metric,
}

impl From<UnitsArg> for Units {
    fn from(units: UnitsArg) -> Self {
        match units {
            UnitsArg::English => Units::English,
            UnitsArg::Metric => Units::Metric,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity.tracing_level_filter())
        .init();

    let channel = SerialChannel::open(&cli.port)
        .with_context(|| format!("opening serial port {}", cli.port))?;

    match cli.command {
        Command::Simulate => {
            let mut simulator = NewtonSimulator::new(channel, DeviceState::default());
            simulator.run()?;
            Ok(())
        }
        command => run_host_command(HostDriver::new(channel), command),
    }
}

fn run_host_command(mut driver: HostDriver<SerialChannel>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::GetRides { out_dir } => {
            let headers = driver.file_list()?;
            info!(rides = headers.len(), "ride directory read");
            for (index, header) in headers.iter().enumerate() {
                let ride = driver.file(index as i16)?;
                let path = storage::save_ride(&out_dir, &ride)?;
                println!(
                    "{}  {} records, {:.1} km",
                    path.display(),
                    ride.records.len(),
                    header.distance_metres / 1000.0
                );
            }
        }
        Command::List { json } => {
            let headers = driver.file_list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&headers)?);
            } else {
                for (index, header) in headers.iter().enumerate() {
                    let start = header
                        .start_time
                        .as_datetime()
                        .map(|dt| dt.to_string())
                        .unwrap_or_else(|| "<invalid time>".to_string());
                    println!(
                        "{index:3}  {start}  {:8.1} km",
                        header.distance_metres / 1000.0
                    );
                }
            }
        }
        Command::Info => {
            println!("Serial Number:    {}", driver.serial_number()?.formatted());
            println!("Firmware Version: {:.2}", driver.firmware_version()?);
            println!("Space Used:       {}%", driver.space_usage()?);
            let odometer = driver.odometer()?;
            println!("Odometer:         {:.1} km ({})", odometer.km(), odometer.units);
        }
        Command::SetTime => {
            driver.set_time_now()?;
            println!("Clock set.");
        }
        Command::SetOdometer { km } => {
            driver.set_odometer_km(km)?;
            println!("Odometer set to {km:.1} km.");
        }
        Command::SetUnits { units } => {
            driver.set_units(units.into())?;
            println!("Units set.");
        }
        Command::EraseAll => {
            driver.erase_all()?;
            println!("All rides erased.");
        }
        Command::Simulate => unreachable!("handled in main"),
    }
    Ok(())
}
