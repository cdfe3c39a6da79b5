//! asnmp-trapd: Receive SNMP traps and print them as metrics.
//!
//! Part of the async-snmp-trap CLI utilities.

use async_snmp_trap::TrapListener;
use async_snmp_trap::cli::args::{ListenArgs, LogArgs, V3Args, listener_config};
use clap::Parser;
use std::process::ExitCode;
use tokio::sync::mpsc;

/// Receive SNMP traps and print one `snmp_trap` line per trap on stdout.
#[derive(Debug, Parser)]
#[command(name = "asnmp-trapd", version, about)]
struct Args {
    #[command(flatten)]
    listen: ListenArgs,

    #[command(flatten)]
    v3: V3Args,

    #[command(flatten)]
    log: LogArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    args.log.init_tracing();

    let config = match listener_config(&args.listen, &args.v3) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut listener = TrapListener::with_snmptranslate(config, tx);
    if let Err(e) = listener.start().await {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    loop {
        tokio::select! {
            metric = rx.recv() => match metric {
                Some(metric) => println!("{}", metric),
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    eprintln!("Error: cannot wait for Ctrl-C: {}", e);
                }
                break;
            }
        }
    }

    listener.stop().await;
    // Traps handled while stopping
    while let Ok(metric) = rx.try_recv() {
        println!("{}", metric);
    }
    ExitCode::SUCCESS
}
