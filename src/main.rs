//! Command-line control for EDGE smart glasses.
//!
//! Usage:
//!   edge-glasses scan                       # find devices
//!   edge-glasses opacity 128                # set opacity (0-255)
//!   edge-glasses clear | dark               # clear / darken lenses
//!   edge-glasses hold 40                    # hold at duty cycle (0-100)
//!   edge-glasses session relax 10           # 10-min relax session
//!   edge-glasses resume | sleep
//!
//! Set `EDGE_GLASSES_ADDRESS` to skip the scan and connect to one device.

use anyhow::{bail, Context, Result};
use log::info;

use edge_glasses::prelude::*;

const USAGE: &str = "\
Commands:
  scan                       Scan for devices
  opacity <0-255>            Set opacity
  clear                      Clear lenses (opacity 0)
  dark                       Darken lenses (opacity 255)
  hold <0-100>               Hold at duty cycle %
  session <type> [minutes]   Start session (relax/focus/meditate/sleep)
  resume                     Resume/restart session
  sleep                      Put device to sleep";

/// A parsed command line, validated before any Bluetooth adapter is opened.
#[derive(Debug, PartialEq)]
enum Command {
    Scan,
    Opacity(i32),
    Clear,
    Dark,
    Hold(i32),
    Session(Preset, i32),
    Resume,
    Sleep,
    Help,
}

fn int_arg(args: &[String], i: usize, usage: &str) -> Result<i32> {
    let raw = args.get(i).with_context(|| format!("usage: edge-glasses {usage}"))?;
    raw.parse()
        .with_context(|| format!("'{raw}' is not a number (usage: edge-glasses {usage})"))
}

fn parse_command(args: &[String]) -> Result<Command> {
    let Some(cmd) = args.first().map(|c| c.to_lowercase()) else {
        return Ok(Command::Help);
    };
    Ok(match cmd.as_str() {
        "scan" => Command::Scan,
        "opacity" => Command::Opacity(int_arg(args, 1, "opacity <0-255>")?),
        "clear" => Command::Clear,
        "dark" => Command::Dark,
        "hold" => Command::Hold(int_arg(args, 1, "hold <0-100>")?),
        "session" => {
            let preset: Preset = args
                .get(1)
                .context("usage: edge-glasses session <type> [minutes]")?
                .parse()?;
            let minutes = match args.get(2) {
                Some(_) => int_arg(args, 2, "session <type> [minutes]")?,
                None => preset.default_duration(),
            };
            Command::Session(preset, minutes)
        }
        "resume" => Command::Resume,
        "sleep" => Command::Sleep,
        "help" | "-h" | "--help" => Command::Help,
        other => bail!("unknown command: {other}\n{USAGE}"),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── Logging ───────────────────────────────────────────────────────────────
    //   RUST_LOG=edge_glasses=debug edge-glasses opacity 128
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_command(&args)?;
    if command == Command::Help {
        println!("{USAGE}");
        return Ok(());
    }

    // ── Configuration ─────────────────────────────────────────────────────────
    let config = GlassesConfig {
        address: std::env::var("EDGE_GLASSES_ADDRESS").ok(),
        ..GlassesConfig::default()
    };

    let transport = BtleplugTransport::new().await?;

    if command == Command::Scan {
        info!("Scanning for EDGE Glasses …");
        let devices = Glasses::scan(&transport, config.scan_timeout).await?;
        if devices.is_empty() {
            println!("No devices found.");
        }
        for (i, d) in devices.iter().enumerate() {
            println!("  {}. {} [{}] RSSI: {}", i + 1, d.name, d.address, d.rssi);
        }
        return Ok(());
    }

    let mut glasses = Glasses::new(transport, config);

    match command {
        Command::Opacity(value) => {
            glasses
                .with_session(|g| Box::pin(async move { g.set_opacity(value).await }))
                .await?;
            println!("Opacity set to {value}");
        }
        Command::Clear => {
            glasses.with_session(|g| Box::pin(g.clear())).await?;
            println!("Lenses cleared");
        }
        Command::Dark => {
            glasses.with_session(|g| Box::pin(g.dark())).await?;
            println!("Lenses darkened");
        }
        Command::Hold(duty) => {
            glasses
                .with_session(|g| Box::pin(async move { g.hold(duty).await }))
                .await?;
            println!("Holding at {duty}%");
        }
        Command::Session(preset, minutes) => {
            glasses
                .with_session(|g| Box::pin(async move { g.start_preset(preset, minutes).await }))
                .await?;
            println!("Started {preset} session ({minutes} min)");
        }
        Command::Resume => {
            glasses.with_session(|g| Box::pin(g.resume())).await?;
            println!("Session resumed");
        }
        Command::Sleep => {
            glasses.with_session(|g| Box::pin(g.sleep())).await?;
            println!("Device sleeping");
        }
        Command::Scan | Command::Help => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Command> {
        let args: Vec<String> = line.split_whitespace().map(str::to_owned).collect();
        parse_command(&args)
    }

    #[test]
    fn help_and_empty_lines_need_no_adapter() {
        assert_eq!(parse("").unwrap(), Command::Help);
        for flag in ["help", "-h", "--help", "HELP"] {
            assert_eq!(parse(flag).unwrap(), Command::Help);
        }
    }

    #[test]
    fn unknown_command_is_rejected_with_usage() {
        let err = parse("blink 3").unwrap_err().to_string();
        assert!(err.contains("unknown command: blink"));
        assert!(err.contains("Commands:"));
    }

    #[test]
    fn arguments_are_validated_up_front() {
        assert_eq!(parse("opacity 128").unwrap(), Command::Opacity(128));
        assert!(parse("opacity").is_err());
        assert!(parse("hold lots").is_err());
        assert!(parse("session nap").is_err());
    }

    #[test]
    fn session_minutes_default_to_the_preset() {
        assert_eq!(parse("session relax").unwrap(), Command::Session(Preset::Relax, 10));
        assert_eq!(parse("session Sleep 20").unwrap(), Command::Session(Preset::Sleep, 20));
    }
}
