//! BswM host simulator.
//!
//! ```text
//!   topology.json ──▶ Topology::compile ──▶ Engine ◀── stdin commands
//!                                             │
//!                                             └──▶ LoggingBsw (log lines)
//! ```
//!
//! Usage: `bswm-sim <topology.json> [engine-config.json]`
//!
//! Commands, one per line:
//!
//! | Command                           | Effect                           |
//! |-----------------------------------|----------------------------------|
//! | `notify <source> <channel> <mode>`| key-based mode notification      |
//! | `request <user> <mode>`           | generic user request             |
//! | `cycle [n]`                       | run the main function `n` times  |
//! | `status`                          | print ports, timers and counters |
//! | `init` / `deinit`                 | lifecycle                        |
//! | `quit`                            | exit                             |
#![deny(unused_must_use)]

use std::io::{self, BufRead};

use anyhow::{Context, Result, anyhow, bail};
use log::{info, warn};

use bswm::adapters::LoggingBsw;
use bswm::modes::SourceKind;
use bswm::topology::{PortId, TimerId};
use bswm::{Engine, EngineConfig, PortKey, Topology};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Notify {
        source: SourceKind,
        channel: u32,
        mode: u32,
    },
    Request {
        user: u16,
        mode: u32,
    },
    Cycle(u32),
    Status,
    Init,
    Deinit,
    Quit,
}

fn parse_command(line: &str) -> Result<Option<Command>> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&verb, rest)) = words.split_first() else {
        return Ok(None);
    };
    let arg = |idx: usize, name: &str| {
        rest.get(idx)
            .copied()
            .ok_or_else(|| anyhow!("'{verb}' needs <{name}>"))
    };

    let command = match verb {
        "notify" => {
            let source = arg(0, "source")?;
            let source = source
                .parse::<SourceKind>()
                .with_context(|| format!("source '{source}'"))?;
            Command::Notify {
                source,
                channel: arg(1, "channel")?.parse().context("channel")?,
                mode: arg(2, "mode")?.parse().context("mode")?,
            }
        }
        "request" => Command::Request {
            user: arg(0, "user")?.parse().context("user")?,
            mode: arg(1, "mode")?.parse().context("mode")?,
        },
        "cycle" => match rest.first() {
            Some(n) => Command::Cycle(n.parse().context("cycle count")?),
            None => Command::Cycle(1),
        },
        "status" => Command::Status,
        "init" => Command::Init,
        "deinit" => Command::Deinit,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command '{other}'"),
    };
    Ok(Some(command))
}

fn print_status(engine: &Engine) {
    let topo = engine.topology();
    println!("initialized: {}", engine.is_initialized());
    for (idx, port) in topo.ports().iter().enumerate() {
        let id = PortId(idx as u16);
        let mode = engine
            .port_mode(id)
            .map_or_else(|| "-".to_owned(), |m| m.to_string());
        let timer = topo
            .timer_for_port(id)
            .map_or_else(String::new, |t| format!(" (timer #{})", t.0));
        println!(
            "  port #{idx:<3} {:<24} {}/{} = {}{}",
            port.name,
            port.source,
            port.channel,
            mode,
            timer
        );
    }
    for (idx, timer) in topo.timers().iter().enumerate() {
        if let Some(state) = engine.timer_state(TimerId(idx as u16)) {
            println!("  timer #{idx:<2} {:<24} {state:?}", timer.name);
        }
    }
    let groups = engine.groups();
    println!("  ipdu groups ({}): {:?}", topo.ipdu_group_count(), groups.vector);
    println!("  dm groups:   {:?}", groups.dm_vector);
    println!("  {:?}", engine.diagnostics());
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let topology_path = args
        .next()
        .context("usage: bswm-sim <topology.json> [engine-config.json]")?;

    let json = std::fs::read_to_string(&topology_path)
        .with_context(|| format!("reading {topology_path}"))?;
    let topology = Topology::from_json(&json).with_context(|| format!("parsing {topology_path}"))?;

    let config = match args.next() {
        Some(path) => {
            let text =
                std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str::<EngineConfig>(&text)
                .with_context(|| format!("parsing {path}"))?
        }
        None => EngineConfig::default(),
    };

    let engine =
        Engine::new(&topology, config).with_context(|| format!("compiling {topology_path}"))?;
    let bsw = LoggingBsw::new();
    engine.init();

    info!("bswm-sim ready; reading commands from stdin");
    for line in io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                warn!("{e:#}");
                continue;
            }
        };
        match command {
            Command::Notify {
                source,
                channel,
                mode,
            } => engine.notify_mode(&bsw, PortKey::new(source, channel), mode),
            Command::Request { user, mode } => engine.request_mode(&bsw, user, mode),
            Command::Cycle(n) => {
                for _ in 0..n {
                    engine.main_function(&bsw);
                }
            }
            Command::Status => print_status(&engine),
            Command::Init => engine.init(),
            Command::Deinit => engine.deinit(),
            Command::Quit => break,
        }
    }

    info!("bswm-sim done after {} collaborator calls", bsw.calls());
    Ok(())
}
