// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

use std::env;
use std::io::{self, BufReader, Write};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;

use thermal_logger::{average_map, capture, parse_seconds, ports, render};

const USAGE: &str = "\
Usage: thermal-capture [port] [options]

Reads the logger's CSV stream from a serial port, reassembles frames, and
prints them as temperature grids. With no port given, the first serial port
that looks like the logger (usbmodem/ttyACM) is used, waiting for it to
appear if necessary.

Options:
    --frames <count>    Number of frames to capture (default 10)
    --timeout <secs>    Per-frame deadline (default 3)
    --wait <secs>       How long to wait for a port to appear (default 10)
    --listen [secs]     Don't assemble frames, just echo raw lines (default 10s)
    --show-frames       Print every captured frame, not just the average
    -v                  Log everything
    -q                  Log only errors
";

/// Default discovery wait when no port is named.
const DEFAULT_PORT_WAIT: Duration = Duration::from_secs(10);

/// Serial read timeout; reads shorter than this just mean no data yet.
const READ_TIMEOUT: Duration = Duration::from_secs(1);

struct Options {
    port: Option<String>,
    frames: usize,
    timeout: Duration,
    wait: Duration,
    listen: Option<Duration>,
    show_frames: bool,
    log_level: LevelFilter,
}

fn parse_options() -> Result<Options> {
    let mut options = Options {
        port: None,
        frames: capture::DEFAULT_FRAME_COUNT,
        timeout: capture::DEFAULT_FRAME_TIMEOUT,
        wait: DEFAULT_PORT_WAIT,
        listen: None,
        show_frames: false,
        log_level: LevelFilter::INFO,
    };
    let mut args = env::args().skip(1).peekable();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--frames" => {
                let value = args.next().context("--frames needs a value")?;
                options.frames = value
                    .parse()
                    .with_context(|| format!("invalid frame count {:?}", value))?;
            }
            "--timeout" => {
                let value = args.next().context("--timeout needs a value")?;
                options.timeout = parse_seconds(&value)?;
            }
            "--wait" => {
                let value = args.next().context("--wait needs a value")?;
                options.wait = parse_seconds(&value)?;
            }
            "--listen" => {
                // The duration is optional; a following argument that parses
                // as seconds is taken as one.
                let duration = match args.peek().map(|next| parse_seconds(next)) {
                    Some(Ok(duration)) => {
                        args.next();
                        duration
                    }
                    _ => capture::DEFAULT_LISTEN_DURATION,
                };
                options.listen = Some(duration);
            }
            "--show-frames" => options.show_frames = true,
            "-v" => options.log_level = LevelFilter::TRACE,
            "-q" => options.log_level = LevelFilter::ERROR,
            "--help" | "-h" => bail!("{}", USAGE),
            _ if options.port.is_none() => options.port = Some(arg),
            _ => bail!("{}", USAGE),
        }
    }
    Ok(options)
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

    let port_name = match &options.port {
        Some(name) => name.clone(),
        None => {
            info!("looking for the logger's serial port");
            ports::wait_for_port(options.wait)?.port_name
        }
    };
    let port = ports::open_port(&port_name, READ_TIMEOUT)?;
    let reader = BufReader::new(port);
    let mut out = io::stdout().lock();

    if let Some(duration) = options.listen {
        info!(port = %port_name, ?duration, "listening");
        capture::listen(reader, duration, &mut out)?;
        return Ok(());
    }

    info!(port = %port_name, frames = options.frames, "capturing");
    let frames = capture::capture_frames(reader, options.frames, options.timeout)?;
    if frames.is_empty() {
        bail!("no frames captured; check the logger and its wiring");
    }

    if options.show_frames {
        for frame in &frames {
            writeln!(out, "Frame {}", frame.index)?;
            render::write_grid(&mut out, &frame.image)?;
            writeln!(out)?;
        }
    }
    let average = average_map(frames.iter()).context("a non-empty capture has an average")?;
    writeln!(out, "Average of {} frames:", frames.len())?;
    render::write_grid(&mut out, &average)?;
    Ok(())
}
