use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::Arc;
use structopt::StructOpt;
use thiserror::Error;
use twolane::{DepthObserver, LaneKind, NoopObserver, Queue, StaticLane, TwoLaneQueue};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "twolane",
    about = "Drive a two lane queue with commands read from stdin"
)]
struct Config {
    /// Queue name used in logs and depth reports
    #[structopt(short, long, env = "TWOLANE_NAME", default_value = "twolane")]
    name: String,
    /// Items to fast-track before reading any commands
    #[structopt(short, long)]
    fast: Vec<String>,
    /// Log lane depths after every change
    #[structopt(long)]
    report_depth: bool,
    /// Log level
    #[structopt(short, long, env, default_value = "info")]
    log_level: log::LevelFilter,
}

type Items = TwoLaneQueue<String, StaticLane<String>>;

#[derive(Error, Debug, PartialEq, Eq)]
enum Error {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command {0:?}")]
    Unknown(String),
    #[error("Command {0:?} expects {1}")]
    Arguments(&'static str, &'static str),
    #[error("Failed to split command: {0}")]
    Split(#[from] shell_words::ParseError),
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Push(Vec<String>),
    Pop,
    Fast(String),
    Clear(String),
    Touch(String),
    Len,
    Where(String),
    List,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = shell_words::split(line)?.into_iter();
        let command = words.next().ok_or(Error::Empty)?;
        let args: Vec<String> = words.collect();

        let single = |name: &'static str, mut args: Vec<String>| match args.len() {
            1 => Ok(args.remove(0)),
            _ => Err(Error::Arguments(name, "exactly one item")),
        };
        let none = |name: &'static str, args: &[String]| {
            if args.is_empty() {
                Ok(())
            } else {
                Err(Error::Arguments(name, "no arguments"))
            }
        };

        match command.as_str() {
            "push" if args.is_empty() => Err(Error::Arguments("push", "at least one item")),
            "push" => Ok(Command::Push(args)),
            "pop" => none("pop", &args).map(|_| Command::Pop),
            "fast" => single("fast", args).map(Command::Fast),
            "clear" => single("clear", args).map(Command::Clear),
            "touch" => single("touch", args).map(Command::Touch),
            "len" => none("len", &args).map(|_| Command::Len),
            "where" => single("where", args).map(Command::Where),
            "list" => none("list", &args).map(|_| Command::List),
            _ => Err(Error::Unknown(command)),
        }
    }
}

struct LogObserver;

impl DepthObserver for LogObserver {
    fn set_depth(&self, queue: &str, lane: LaneKind, depth: usize) {
        log::info!("{} {} lane depth: {}", queue, lane, depth);
    }
}

fn run<W: Write>(
    queue: &mut Items,
    lane: &StaticLane<String>,
    command: Command,
    out: &mut W,
) -> io::Result<()> {
    match command {
        Command::Push(items) => {
            for item in items {
                match queue.push(item.clone()) {
                    Ok(()) => writeln!(out, "queued {}", item)?,
                    Err(e) => writeln!(out, "skipped {}: {}", item, e)?,
                }
            }
        }
        Command::Pop => match queue.pop() {
            Some(item) => writeln!(out, "{}", item)?,
            None => writeln!(out, "empty")?,
        },
        // Marking alone does not move a queued item, it has to be touched as well.
        Command::Fast(item) => {
            lane.mark_fast(item.clone());
            report_touch(queue.touch(&item), &item, out)?;
        }
        Command::Clear(item) => {
            lane.clear_fast(&item);
            report_touch(queue.touch(&item), &item, out)?;
        }
        Command::Touch(item) => report_touch(queue.touch(&item), &item, out)?,
        Command::Len => writeln!(
            out,
            "{} (fast {}, slow {})",
            queue.len(),
            queue.lane_len(LaneKind::Fast),
            queue.lane_len(LaneKind::Slow)
        )?,
        Command::Where(item) => match (queue.lane_of(&item), queue.position(&item)) {
            (Some(lane), Some(position)) => {
                writeln!(out, "{} lane, position {}", lane, position)?
            }
            _ => writeln!(out, "not queued")?,
        },
        Command::List => {
            for item in queue.iter() {
                let lane = queue.lane_of(item).map_or("?", |lane| lane.as_str());
                writeln!(out, "{} {}", lane, item)?;
            }
        }
    }
    Ok(())
}

fn report_touch<W: Write>(moved: Option<LaneKind>, item: &str, out: &mut W) -> io::Result<()> {
    match moved {
        Some(lane) => writeln!(out, "moved {} to the {} lane", item, lane),
        None => writeln!(out, "unchanged {}", item),
    }
}

fn main() -> anyhow::Result<()> {
    let config = Config::from_args();
    pretty_env_logger::formatted_timed_builder()
        .filter(None, config.log_level)
        .init();

    let lane = Arc::new(StaticLane::new());
    for item in config.fast {
        lane.mark_fast(item);
    }
    let observer: Arc<dyn DepthObserver> = if config.report_depth {
        Arc::new(LogObserver)
    } else {
        Arc::new(NoopObserver)
    };
    let mut queue = TwoLaneQueue::with_observer(config.name, lane.clone(), observer);
    log::info!("Reading commands for queue {:?}", queue.name());

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(command) => run(&mut queue, &lane, command, &mut out)?,
            Err(e) => log::warn!("Skipping {:?}: {}", line, e),
        }
        out.flush()?;
    }

    log::info!("Input closed with {} items left", queue.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(fast: &[&str], lines: &[&str]) -> String {
        let lane = Arc::new(StaticLane::new());
        for item in fast {
            lane.mark_fast(item.to_string());
        }
        let mut queue = TwoLaneQueue::new("test", lane.clone());
        let mut out = Vec::new();
        for line in lines {
            let command = line.parse().unwrap();
            run(&mut queue, &lane, command, &mut out).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            "push a 'b c'".parse::<Command>(),
            Ok(Command::Push(vec!["a".into(), "b c".into()]))
        );
        assert_eq!("pop".parse::<Command>(), Ok(Command::Pop));
        assert_eq!("fast a".parse::<Command>(), Ok(Command::Fast("a".into())));
        assert_eq!("  where a ".parse::<Command>(), Ok(Command::Where("a".into())));
        assert_eq!("".parse::<Command>(), Err(Error::Empty));
        assert_eq!(
            "push".parse::<Command>(),
            Err(Error::Arguments("push", "at least one item"))
        );
        assert_eq!(
            "touch a b".parse::<Command>(),
            Err(Error::Arguments("touch", "exactly one item"))
        );
        assert_eq!(
            "len now".parse::<Command>(),
            Err(Error::Arguments("len", "no arguments"))
        );
        assert_eq!(
            "peek".parse::<Command>(),
            Err(Error::Unknown("peek".into()))
        );
        assert!(matches!("push 'a".parse::<Command>(), Err(Error::Split(_))));
    }

    #[test]
    fn fast_tracks_a_queued_item() {
        let out = session(
            &["urgent"],
            &[
                "push a b urgent",
                "fast b",
                "where b",
                "len",
                "pop",
                "pop",
                "pop",
                "pop",
            ],
        );
        assert_eq!(
            out,
            "queued a\nqueued b\nqueued urgent\n\
             moved b to the fast lane\n\
             fast lane, position 1\n\
             3 (fast 2, slow 1)\n\
             urgent\nb\na\nempty\n"
        );
    }

    #[test]
    fn clear_and_duplicates() {
        let out = session(
            &["a"],
            &["push a b", "push a", "clear a", "clear a", "list"],
        );
        assert_eq!(
            out,
            "queued a\nqueued b\n\
             skipped a: Item is already queued in the fast lane\n\
             moved a to the slow lane\n\
             unchanged a\n\
             slow b\nslow a\n"
        );
    }
}
