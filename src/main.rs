//! v4l2ucp: inspect and adjust the controls of video4linux2 devices.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};

use v4l2ucp::context;
use v4l2ucp::object::{Control, Item};
use v4l2ucp::prelude::*;

#[derive(Parser)]
#[command(
    name = "v4l2ucp",
    version,
    about = "Universal control panel for V4L2 devices"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List candidate device nodes
    List,
    /// Show driver, card, bus and capability information
    Info {
        #[arg(default_value = "/dev/video0")]
        device: PathBuf,
    },
    /// Show every control with its current value
    Controls {
        #[arg(default_value = "/dev/video0")]
        device: PathBuf,
        /// Print full descriptors instead of one line per control
        #[arg(long)]
        verbose: bool,
    },
    /// Read one control
    Get {
        device: PathBuf,
        /// Control id (decimal or 0x hex) or name
        control: String,
    },
    /// Write one control; integers are clamped and snapped to the step
    Set {
        device: PathBuf,
        control: String,
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },
    /// Trigger a button control
    Press { device: PathBuf, control: String },
    /// Restore driver defaults, for one control or all of them
    Reset {
        device: PathBuf,
        control: Option<String>,
    },
    /// Refresh all controls periodically and print the ones that change
    Watch {
        #[arg(default_value = "/dev/video0")]
        device: PathBuf,
        /// off, 1, 5, 10, 20 or 30 seconds
        #[arg(short, long, default_value = "5")]
        interval: Interval,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args.command) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(command: Command) -> v4l2ucp::Result<()> {
    match command {
        Command::List => {
            for node in context::enum_devices() {
                println!(
                    "{}\t{}",
                    node.path().display(),
                    node.name().unwrap_or_default()
                );
            }
            Ok(())
        }
        Command::Info { device } => {
            let session = Session::open(&device)?;
            print!("{}", session.capabilities());
            Ok(())
        }
        Command::Controls { device, verbose } => {
            let session = Session::open(&device)?;
            for item in session.entries() {
                match item {
                    Item::Class(desc) => println!("\n[{}]", desc.name),
                    Item::Control(control) if verbose => {
                        print!("{}", control.description());
                        println!("Value      : {}\n", control.value());
                    }
                    Item::Control(control) => println!("{}", line(control)),
                }
            }
            Ok(())
        }
        Command::Get { device, control } => {
            let mut session = Session::open(&device)?;
            let id = session.lookup(&control)?;
            session.refresh(id)?;
            if let Some(control) = session.control(id) {
                println!("{}", control.value());
            }
            Ok(())
        }
        Command::Set {
            device,
            control,
            value,
        } => {
            let mut session = Session::open(&device)?;
            let id = session.lookup(&control)?;
            session.apply(id, value)?;
            if let Some(control) = session.control(id) {
                println!("{}", line(control));
            }
            Ok(())
        }
        Command::Press { device, control } => {
            let session = Session::open(&device)?;
            let id = session.lookup(&control)?;
            match session.control(id) {
                Some(Control::Button(button)) => button.press(),
                Some(other) => Err(v4l2ucp::Error::UnknownKind {
                    id,
                    typ: other.description().typ,
                }),
                None => Err(v4l2ucp::Error::NoSuchControl(id)),
            }
        }
        Command::Reset { device, control } => {
            let mut session = Session::open(&device)?;
            match control {
                Some(control) => {
                    let id = session.lookup(&control)?;
                    session.reset(id)
                }
                None => {
                    let pass = session.reset_all();
                    println!(
                        "reset {} controls, {} failed",
                        pass.done.len(),
                        pass.failed.len()
                    );
                    Ok(())
                }
            }
        }
        Command::Watch { device, interval } => watch(&device, interval),
    }
}

fn watch(device: &Path, interval: Interval) -> v4l2ucp::Result<()> {
    let mut session = Session::open(device)?;
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst)).ok();
    }

    let mut last: Vec<(u32, Value)> = session
        .controls()
        .map(|c| (c.id(), c.value()))
        .collect();
    let mut ticker = Ticker::new(interval, Instant::now());
    log::info!("watching {} every {}", device.display(), interval);

    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if !ticker.is_due(now) {
            let nap = ticker
                .remaining(now)
                .unwrap_or(Duration::MAX)
                .min(Duration::from_millis(200));
            std::thread::sleep(nap);
            continue;
        }

        session.refresh_all();
        ticker.finished(Instant::now());

        for control in session.controls() {
            let value = control.value();
            let changed = last
                .iter_mut()
                .find(|(id, _)| *id == control.id())
                .map(|(_, prev)| {
                    let changed = *prev != value;
                    *prev = value.clone();
                    changed
                })
                .unwrap_or(false);
            if changed {
                println!("{}", line(control));
            }
        }
    }

    Ok(())
}

fn line(control: &Control) -> String {
    let desc = control.description();
    let state = if control.is_interactive() { "" } else { " (inactive)" };
    match control {
        Control::Integer(_) => format!(
            "{:#010x} {:<32} {:>8}  [{}..{} step {} default {}]{}",
            desc.id,
            desc.name,
            control.value().to_string(),
            desc.minimum,
            desc.maximum,
            desc.step,
            desc.default,
            state
        ),
        Control::Boolean(_) => format!(
            "{:#010x} {:<32} {:>8}  [default {}]{}",
            desc.id,
            desc.name,
            control.value().to_string(),
            desc.default != 0,
            state
        ),
        Control::Menu(menu) => {
            let items: Vec<String> = menu
                .items()
                .iter()
                .map(|(index, item)| format!("{}={}", index, item))
                .collect();
            format!(
                "{:#010x} {:<32} {}  [{}; default {}]{}",
                desc.id,
                desc.name,
                control.value(),
                items.join(", "),
                desc.default,
                state
            )
        }
        Control::Button(_) => format!("{:#010x} {:<32} (button){}", desc.id, desc.name, state),
        Control::Unknown(_) => format!(
            "{:#010x} {:<32} Unknown control ({})",
            desc.id, desc.name, desc.typ
        ),
    }
}
