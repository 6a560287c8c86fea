//! Host-side reference tool for the cinder kernel.
//!
//! Derives the tick timing the firmware will program and prints the
//! peripheral bit map, so configuration changes can be sanity-checked
//! without flashing a board.

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};

use cinder_common::clock;
use cinder_hal::sysctl::Peripheral;
use cinder_hal::timg::alarm_ticks;

#[derive(Parser)]
#[command(about = "Timing and register reference tool for the cinder kernel")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the alarm threshold for a tick configuration.
    Timing {
        #[arg(long, default_value_t = clock::APB_CLK_HZ)]
        apb_hz: u32,
        #[arg(long, default_value_t = clock::TICK_PRESCALER)]
        prescaler: u32,
        #[arg(long, default_value_t = clock::TICK_HZ)]
        tick_hz: u32,
    },
    /// Print the peripheral clock/reset bit assignments.
    Periph,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Timing {
            apb_hz,
            prescaler,
            tick_hz,
        } => timing(apb_hz, prescaler, tick_hz),
        Commands::Periph => {
            periph();
            Ok(())
        }
    }
}

fn timing(apb_hz: u32, prescaler: u32, tick_hz: u32) -> Result<()> {
    // The divider field is 16 bits and treats 0 and 1 as reserved
    // encodings.
    if !(2..=0xffff).contains(&prescaler) {
        bail!("prescaler {} outside the hardware range 2..=65535", prescaler);
    }
    if tick_hz == 0 {
        bail!("tick rate must be non-zero");
    }

    let ticks = alarm_ticks(apb_hz, prescaler, tick_hz);
    if ticks == 0 {
        bail!(
            "tick rate {} Hz is faster than the prescaled clock {} Hz",
            tick_hz,
            apb_hz / prescaler
        );
    }
    if ticks > u32::MAX as u64 {
        bail!("alarm threshold {} does not fit the 32-bit alarm space", ticks);
    }

    let counter_hz = apb_hz as u64 / prescaler as u64;
    let actual_hz = counter_hz as f64 / ticks as f64;
    let error_ppm = (actual_hz - tick_hz as f64) / tick_hz as f64 * 1e6;

    println!("counter clock  : {} Hz", counter_hz);
    println!("alarm threshold: {}", ticks);
    println!("effective tick : {:.4} Hz ({:+.1} ppm)", actual_hz, error_ppm);
    Ok(())
}

fn periph() {
    println!("bit  peripheral");
    for peripheral in Peripheral::ALL {
        println!("{:>3}  {:?}", peripheral.mask().trailing_zeros(), peripheral);
    }
}
