use anyhow::{anyhow, bail, Result};
use colored::Colorize;
use framethreads::prelude::*;
use framethreads::{ENGINE_NAME, VERSION as LIB_VERSION};
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Scratch key every shell thread counts its invocations in.
const TICKS_KEY: &str = "ticks";

/// A custom helper struct for rustyline that enables syntax highlighting.
#[derive(Completer, Helper, Hinter, Validator)]
struct MyHighlighter;

impl Highlighter for MyHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            let colored_command = command.yellow().bold();
            let colored_rest = rest.yellow();
            Cow::Owned(format!("{} {}", colored_command, colored_rest))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }
    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    println!("{}", format!("  {} :: threadshell", ENGINE_NAME).cyan().bold());
    let version_string = format!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    println!("{}", "-----------------------------------------------------------------".dimmed());
    println!("{}", version_string);
    let license_blurb = "
    This software is provided 'as is', without warranty of any kind.
    Distributed under the MIT OR Apache-2.0 license. Use at your own risk.
    ";
    println!("{}", license_blurb.dimmed());
    println!("{}", "-----------------------------------------------------------------".dimmed());
}

/// The shell's state: a scheduler and the hand-cranked clock that feeds it.
struct Shell {
    scheduler: FrameScheduler,
    clock: FrameClock,
}

impl Shell {
    fn new(config: &ClockConfig) -> Self {
        Self {
            scheduler: FrameScheduler::new(),
            clock: FrameClock::new(config),
        }
    }

    fn thread(&self, args: &[&str]) -> Result<ThreadHandle> {
        let name = args.get(1).ok_or_else(|| anyhow!("missing thread name"))?;
        Ok(self.scheduler.get(name)?)
    }

    fn spawn(&self, args: &[&str]) -> Result<()> {
        let name = args
            .get(1)
            .ok_or_else(|| anyhow!("Usage: spawn <NAME> [PHASE] [START] [DURATION]"))?;
        let phase = match args.get(2) {
            Some(phase) => phase.parse::<Phase>()?,
            None => Phase::Update,
        };
        let start = parse_seconds(args.get(3), 0.0)?;
        let duration = parse_seconds(args.get(4), f64::INFINITY)?;

        let thread = self.scheduler.create_thread(*name, phase, start, duration, |ctx| {
            let me = ctx.thread();
            let ticks = me.property(TICKS_KEY).as_int();
            me.set_property(TICKS_KEY, ticks + 1);
        })?;
        for event in ThreadEvent::ALL {
            thread.on(event, move |t| {
                println!("<-- [{}] {}", t.name().yellow(), event.label().cyan());
            });
        }
        println!(
            "--> Spawned '{}' on {} (start in {}s, lasting {}s).",
            name, phase, start, duration
        );
        Ok(())
    }

    fn step(&mut self, args: &[&str]) -> Result<()> {
        let seconds = parse_seconds(args.get(1), 0.1)?;
        let frames = match args.get(2) {
            Some(frames) => frames
                .parse::<u32>()
                .map_err(|_| anyhow!("'{}' is not a frame count", frames))?,
            None => 1,
        };
        for _ in 0..frames {
            let step = self.clock.advance(seconds);
            self.scheduler.run_step(&step);
        }
        println!(
            "--> Ran {} frame(s); time is now {:.3}s.",
            frames,
            self.clock.time()
        );
        Ok(())
    }

    fn set(&self, args: &[&str]) -> Result<()> {
        let thread = self.thread(args)?;
        let (Some(key), Some(raw)) = (args.get(2), args.get(3)) else {
            bail!("Usage: set <NAME> <KEY> <VALUE>");
        };
        let value = parse_property(raw);
        println!("--> {}.{} = {:?}", thread.name(), key, value);
        thread.set_property(*key, value);
        Ok(())
    }

    fn get(&self, args: &[&str]) -> Result<()> {
        let thread = self.thread(args)?;
        let key = args.get(2).ok_or_else(|| anyhow!("Usage: get <NAME> <KEY>"))?;
        let value = thread.property(key);
        println!("--> {}.{} ({}) = {:?}", thread.name(), key, value.kind(), value);
        Ok(())
    }

    fn list(&self) {
        let threads = self.scheduler.names();
        if threads.is_empty() {
            println!("No threads registered.");
            return;
        }
        println!(
            "{}",
            format!(
                "  {:<16} {:<7} {:<8} {:<6} {:<7} {:>10} {:>8}",
                "NAME", "PHASE", "STATE", "PAUSED", "WAIT", "ENDS IN", "TICKS"
            )
            .dimmed()
        );
        for name in threads {
            let Some(thread) = self.scheduler.try_get(&name) else {
                continue;
            };
            let state = if thread.is_ended() {
                "ended".red()
            } else if thread.is_started() {
                "running".green()
            } else {
                "pending".normal()
            };
            println!(
                "  {:<16} {:<7} {:<8} {:<6} {:<7.2} {:>10.2} {:>8}",
                name,
                thread.phase().to_string(),
                state,
                thread.is_paused(),
                thread.wait_remaining(),
                thread.time_until_end(),
                thread.property(TICKS_KEY).as_int()
            );
        }
    }

    fn execute(&mut self, args: &[&str]) -> Result<bool> {
        let Some(command) = args.first() else {
            return Ok(true);
        };
        match *command {
            "spawn" => self.spawn(args)?,
            "pause" => self.thread(args)?.pause(),
            "resume" => self.thread(args)?.resume(),
            "wait" => {
                let seconds = args
                    .get(2)
                    .ok_or_else(|| anyhow!("Usage: wait <NAME> <SECONDS>"))?
                    .parse::<f64>()?;
                self.thread(args)?.wait(seconds)?;
            }
            "end" => self.thread(args)?.end(),
            "destroy" => self.thread(args)?.destroy(),
            "restart" => self.thread(args)?.restart(),
            "reset" => self.thread(args)?.restart_completely(),
            "keep" => {
                let thread = self.thread(args)?;
                match args.get(2) {
                    Some(&"on") => thread.set_destroy_when_ended(false),
                    Some(&"off") => thread.set_destroy_when_ended(true),
                    _ => bail!("Usage: keep <NAME> on|off"),
                }
                println!(
                    "--> '{}' destroy-when-ended: {}",
                    thread.name(),
                    thread.destroy_when_ended()
                );
            }
            "remove" => {
                let thread = self.thread(args)?;
                self.scheduler.remove(thread.name());
                println!("--> Removed '{}'.", thread.name());
            }
            "set" => self.set(args)?,
            "get" => self.get(args)?,
            "step" => self.step(args)?,
            "list" => self.list(),
            "time" => {
                let time = self.scheduler.time();
                println!(
                    "--> now {:.3}s, frame delta {:.3}s, fixed delta {:.3}s, {} frames run.",
                    time.now,
                    time.delta,
                    time.fixed_delta,
                    self.clock.frame_count()
                );
            }
            "clear" => {
                self.scheduler.clear_all();
                println!("--> All threads cleared.");
            }
            "help" => print_help(),
            "exit" => return Ok(false),
            other => println!("Unknown command: '{}'. Type 'help'.", other),
        }
        Ok(true)
    }
}

fn print_help() {
    println!("Available commands:");
    println!("  spawn <N> [PHASE] [START] [DUR] - Registers a thread (phase: update|late|fixed|gui).");
    println!("  pause|resume|end|destroy <N>    - Controls a thread.");
    println!("  restart <N> | reset <N>         - Restarts a thread (reset also clears its properties).");
    println!("  wait <N> <S>                    - Suspends a thread for S seconds.");
    println!("  keep <N> on|off                 - Keeps an ended thread registered (on) or not (off).");
    println!("  set <N> <KEY> <VALUE>           - Stores a scratch property.");
    println!("  get <N> <KEY>                   - Reads a scratch property.");
    println!("  remove <N>                      - Unregisters a thread without ending it.");
    println!("  step [SECONDS] [FRAMES]         - Advances the clock and runs frames.");
    println!("  list | time | clear             - Inspects or empties the registry.");
    println!("  exit                            - Quits the shell.");
}

fn parse_seconds(arg: Option<&&str>, default: f64) -> Result<f64> {
    match arg {
        Some(raw) => raw
            .parse::<f64>()
            .map_err(|_| anyhow!("'{}' is not a number of seconds", raw)),
        None => Ok(default),
    }
}

fn parse_property(raw: &str) -> Property {
    if let Ok(value) = raw.parse::<bool>() {
        Property::from(value)
    } else if let Ok(value) = raw.parse::<i32>() {
        Property::from(value)
    } else if let Ok(value) = raw.parse::<f32>() {
        Property::from(value)
    } else {
        Property::from(raw)
    }
}

fn main() -> Result<()> {
    print_banner();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let config = match env::args().nth(1) {
        Some(path) => ClockConfig::from_file(&path)?,
        None => ClockConfig {
            fixed_timestep: 0.1,
            max_fixed_steps: 64,
            ..Default::default()
        },
    };
    config.validate()?;
    info!(
        "Manual clock: fixed step {}s, at most {} fixed steps per frame.",
        config.fixed_timestep, config.max_fixed_steps
    );
    let mut shell = Shell::new(&config);

    let mut rl = Editor::new()?;
    let helper = MyHighlighter {};
    rl.set_helper(Some(helper));

    println!("{} shell is ready. Type 'help' for commands or 'exit' to quit.", ENGINE_NAME.cyan());

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        match rl.readline(&prompt) {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let args = line.split_whitespace().collect::<Vec<_>>();
                match shell.execute(&args) {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => println!("{} {}", "Error:".red().bold(), e),
                }
            }
            Err(_) => {
                println!("Exiting threadshell...");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell() -> Shell {
        Shell::new(&ClockConfig {
            fixed_timestep: 0.1,
            max_fixed_steps: 64,
            ..Default::default()
        })
    }

    #[test]
    fn test_parse_property_picks_the_narrowest_type() {
        assert_eq!(parse_property("true"), Property::Bool(true));
        assert_eq!(parse_property("42"), Property::Int(42));
        assert_eq!(parse_property("1.5"), Property::Float(1.5));
        assert_eq!(parse_property("hello"), Property::String("hello".to_string()));
    }

    #[test]
    fn test_spawn_step_and_list() {
        let mut shell = shell();
        assert!(shell.execute(&["spawn", "a", "update", "0", "1"]).unwrap());
        shell.execute(&["keep", "a", "on"]).unwrap();
        shell.execute(&["step", "0.25", "3"]).unwrap();
        let thread = shell.scheduler.get("a").unwrap();
        assert_eq!(thread.property(TICKS_KEY).as_int(), 3);

        shell.execute(&["step", "0.5", "1"]).unwrap();
        assert!(thread.is_ended());
        shell.list();

        shell.execute(&["reset", "a"]).unwrap();
        assert_eq!(thread.property(TICKS_KEY).as_int(), 0);
        assert!(!thread.is_ended());
    }

    #[test]
    fn test_errors_are_reported_not_fatal() {
        let mut shell = shell();
        assert!(shell.execute(&["pause", "ghost"]).is_err());
        assert!(shell.execute(&["spawn", "a", "nowhere"]).is_err());
        shell.execute(&["spawn", "a"]).unwrap();
        assert!(shell.execute(&["spawn", "a"]).is_err());
        assert!(shell.execute(&["wait", "a", "-2"]).is_err());
        assert!(!shell.execute(&["exit"]).unwrap());
    }
}
