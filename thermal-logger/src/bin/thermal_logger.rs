// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

use std::env;

use anyhow::{bail, Context, Result};
use mlx9064x::FrameRate;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;

use thermal_logger::camera::{self, Mlx90640Source};
use thermal_logger::sink::OutputTarget;
use thermal_logger::{parse_address, CsvSink, FrameStreamer, DEFAULT_EMISSIVITY_SCALE};

const USAGE: &str = "\
Usage: thermal-logger <I2C bus> [camera address] [options]

Reads frames from an MLX90640 and writes one CSV line per pixel
(frame,row,col,temperature) until stopped.

The camera address defaults to 0x33 and accepts 0x-prefixed hex or decimal.

Options:
    --frame-rate <hz>     Program the camera's frame rate (0.5 through 64)
    --emissivity <scale>  Temperature scale factor (default 0.98)
    --output <target>     '-' for stdout (the default) or a serial device path
    --frames <count>      Stop after this many frames instead of running forever
    -v                    Log everything
    -q                    Log only errors
";

struct Options {
    bus: String,
    address: u8,
    frame_rate: Option<FrameRate>,
    emissivity: f32,
    output: OutputTarget,
    frames: Option<u64>,
    log_level: LevelFilter,
}

fn parse_options() -> Result<Options> {
    let mut positional = Vec::new();
    let mut frame_rate = None;
    let mut emissivity = DEFAULT_EMISSIVITY_SCALE;
    let mut output = OutputTarget::Stdout;
    let mut frames = None;
    let mut log_level = LevelFilter::INFO;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--frame-rate" => {
                let value = args.next().context("--frame-rate needs a value")?;
                frame_rate = Some(camera::parse_frame_rate(&value)?);
            }
            "--emissivity" => {
                let value = args.next().context("--emissivity needs a value")?;
                let scale: f32 = value
                    .parse()
                    .ok()
                    .filter(|scale: &f32| scale.is_finite() && *scale > 0f32)
                    .with_context(|| format!("invalid emissivity scale {:?}", value))?;
                emissivity = scale;
            }
            "--output" => {
                let value = args.next().context("--output needs a value")?;
                output = OutputTarget::parse(&value);
            }
            "--frames" => {
                let value = args.next().context("--frames needs a value")?;
                frames = Some(
                    value
                        .parse()
                        .with_context(|| format!("invalid frame count {:?}", value))?,
                );
            }
            "-v" => log_level = LevelFilter::TRACE,
            "-q" => log_level = LevelFilter::ERROR,
            "--help" | "-h" => bail!("{}", USAGE),
            _ => positional.push(arg),
        }
    }

    let (bus, address) = match positional.as_slice() {
        [bus] => (bus.clone(), camera::DEFAULT_ADDRESS),
        [bus, address] => (bus.clone(), parse_address(address)?),
        _ => bail!("{}", USAGE),
    };
    Ok(Options {
        bus,
        address,
        frame_rate,
        emissivity,
        output,
        frames,
        log_level,
    })
}

fn main() -> Result<()> {
    let options = parse_options()?;
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_max_level(options.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut camera = Mlx90640Source::open(&options.bus, options.address)
        .context("is the camera connected and powered?")?;
    if let Some(frame_rate) = options.frame_rate {
        camera.set_frame_rate(frame_rate)?;
    }
    let poll_interval = camera.poll_interval();

    let mut streamer =
        FrameStreamer::new(camera, poll_interval).with_emissivity_scale(options.emissivity);
    let mut sink = CsvSink::new(options.output.open()?);
    sink.write_banner()?;

    let mut emitted = 0u64;
    while options.frames.map_or(true, |limit| emitted < limit) {
        match streamer.next_frame() {
            Ok(frame) => {
                sink.write_frame(&frame)?;
                emitted += 1;
            }
            // Only initialization failures are fatal; a bad frame is logged
            // and the loop keeps going.
            Err(error) => warn!(%error, "frame error"),
        }
    }
    info!(emitted, "done");
    Ok(())
}
