use crate::config::BackendType;
use crate::epoch;
use crate::pass_core::{CycleRange, Selection, TimeRange};
use clap::{ArgGroup, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Re-segment altimetry granules into passes",
    long_about = "Reads granule paths (one per line) from standard input, merges their 1 Hz records \
                  across file boundaries and writes one output unit per pass.",
    group(ArgGroup::new("equator").multiple(false)),
    after_help = "Examples:\n  ls data/*_GDR_*.json | altipass --cycles 10,12\n  find in/ -name '*GDR*' | sort | altipass -v --ymd 20200101,20200201 --backend sqlite\n"
)]
pub struct Args {
    /// More output; repeat for trace level (RUST_LOG overrides)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Cycle range C0[,C1]; a single value selects one cycle
    #[arg(short, long, value_parser = parse_cycles)]
    pub cycles: Option<CycleRange>,

    /// Equator time range as ISO dates T0[,T1]
    #[arg(long, group = "equator", value_parser = parse_iso_range)]
    pub time: Option<TimeRange>,

    /// Equator time range as Modified Julian Days
    #[arg(long, group = "equator", value_parser = parse_mjd_range)]
    pub mjd: Option<TimeRange>,

    /// Equator time range as seconds since 1985-01-01
    #[arg(long, group = "equator", allow_hyphen_values = true, value_parser = parse_sec_range)]
    pub sec: Option<TimeRange>,

    /// Equator time range as YYYYMMDD[HHMMSS]
    #[arg(long, group = "equator", value_parser = parse_ymd_range)]
    pub ymd: Option<TimeRange>,

    /// Output backend
    #[arg(long, value_enum, default_value_t = BackendType::Jsonl)]
    pub backend: BackendType,
}

impl Args {
    pub fn selection(&self) -> Selection {
        Selection {
            cycles: self.cycles,
            equator_times: self.time.or(self.mjd).or(self.sec).or(self.ymd),
        }
    }

    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

fn split_pair(text: &str) -> (&str, Option<&str>) {
    match text.split_once(',') {
        Some((a, b)) => (a.trim(), Some(b.trim())),
        None => (text.trim(), None),
    }
}

pub fn parse_cycles(text: &str) -> Result<CycleRange, String> {
    let parse = |s: &str| {
        s.parse::<i32>()
            .map_err(|_| format!("invalid cycle number '{}'", s))
    };
    let (a, b) = split_pair(text);
    let first = parse(a)?;
    let last = match b {
        Some(b) => parse(b)?,
        None => first,
    };
    if last < first {
        return Err(format!("cycle range {}..{} is reversed", first, last));
    }
    Ok(CycleRange { first, last })
}

/// `T0[,T1]`; an open upper bound runs to the end of time
fn parse_time_range(text: &str, convert: fn(&str) -> Option<f64>, what: &str) -> Result<TimeRange, String> {
    let parse = |s: &str| convert(s).ok_or_else(|| format!("invalid {} '{}'", what, s));
    let (a, b) = split_pair(text);
    let start = parse(a)?;
    let end = match b {
        Some(b) => parse(b)?,
        None => f64::INFINITY,
    };
    if end < start {
        return Err(format!("{} range {} is reversed", what, text));
    }
    Ok(TimeRange { start, end })
}

pub fn parse_iso_range(text: &str) -> Result<TimeRange, String> {
    parse_time_range(text, epoch::parse_calendar, "date")
}

pub fn parse_mjd_range(text: &str) -> Result<TimeRange, String> {
    parse_time_range(text, |s| s.parse().ok().map(epoch::from_mjd), "MJD")
}

pub fn parse_sec_range(text: &str) -> Result<TimeRange, String> {
    parse_time_range(text, |s| s.parse().ok(), "sec85 time")
}

pub fn parse_ymd_range(text: &str) -> Result<TimeRange, String> {
    parse_time_range(text, epoch::parse_ymd, "YYYYMMDD date")
}
