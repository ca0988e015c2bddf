use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// NIC Savings Statistics - anonymous calculation recording and aggregate reporting
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Delay before the first metrics refresh tick
    #[clap(long, value_parser = parse_duration, default_value = crate::defaults::REFRESH_INITIAL_DELAY)]
    pub refresh_initial_delay: Duration,

    /// Interval between metrics refresh ticks
    #[clap(long, value_parser = parse_duration, default_value = crate::defaults::REFRESH_INTERVAL)]
    pub refresh_interval: Duration,

    /// Maximum age of the newest record for a refresh to still be worthwhile
    #[clap(long, value_parser = parse_duration, default_value = crate::defaults::STALENESS_THRESHOLD)]
    pub staleness_threshold: Duration,

    /// Time-to-live on the cross-instance refresh lock
    #[clap(long, value_parser = parse_duration, default_value = crate::defaults::LOCK_TTL)]
    pub lock_ttl: Duration,

    /// Key material for the session pseudonymisation hash
    #[clap(long, env = "SESSION_HASH_KEY", hide_env_values = true)]
    pub session_hash_key: String,

    /// Mirror each published metric snapshot to this JSON file
    #[clap(long)]
    pub snapshot_output: Option<PathBuf>,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,
}

/// Internal configuration driving the wired service.
#[derive(Clone, Debug)]
pub struct ServiceConfiguration {
    pub refresh_initial_delay: Duration,
    pub refresh_interval: Duration,
    pub staleness_threshold: Duration,
    pub lock_ttl: Duration,
    pub session_hash_key: String,
    pub snapshot_output: Option<PathBuf>,
}

impl From<&Args> for ServiceConfiguration {
    fn from(args: &Args) -> Self {
        Self {
            refresh_initial_delay: args.refresh_initial_delay,
            refresh_interval: args.refresh_interval,
            staleness_threshold: args.staleness_threshold,
            lock_ttl: args.lock_ttl,
            session_hash_key: args.session_hash_key.clone(),
            snapshot_output: args.snapshot_output.clone(),
        }
    }
}

/// Parse duration from string (e.g. "500ms", "10s", "5m", "1h").
/// A bare number is taken as seconds.
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Duration cannot be empty".to_string());
    }

    let (num_str, unit) = if let Some(stripped) = s.strip_suffix("ms") {
        (stripped, "ms")
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, "s")
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, "m")
    } else if let Some(stripped) = s.strip_suffix('h') {
        (stripped, "h")
    } else {
        (s, "s")
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number in duration: {}", num_str))?;
    if !num.is_finite() || num < 0.0 {
        return Err(format!("Duration must be a non-negative number: {}", s));
    }

    let duration = match unit {
        "ms" => Duration::from_millis(num as u64),
        "s" => Duration::from_secs_f64(num),
        "m" => Duration::from_secs_f64(num * 60.0),
        "h" => Duration::from_secs_f64(num * 3600.0),
        _ => return Err(format!("Invalid duration unit: {}", unit)),
    };

    Ok(duration)
}
