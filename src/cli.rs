use crate::config::HarnessConfig;
use crate::message::{BulkSendRequest, MessageFormat};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Broker round-trip harness - send a batch of messages through a broker and
/// report delivery latency and throughput
#[derive(Parser, Debug, Clone)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Number of messages to send
    #[clap(short = 'n', long, default_value_t = crate::defaults::BULK_COUNT)]
    pub count: usize,

    /// Content template; the literal {index} expands to the message number
    #[clap(short = 't', long, default_value = crate::defaults::BULK_TEMPLATE)]
    pub template: String,

    /// Payload encoding
    #[clap(short = 'f', long, value_enum, default_value = "text")]
    pub format: MessageFormat,

    /// Pause between messages in milliseconds
    #[clap(long, default_value_t = 0)]
    pub delay_ms: u64,

    /// Destination topic/queue (defaults to the harness queue)
    #[clap(long)]
    pub destination: Option<String>,

    /// Broker host (informational for the loopback demo)
    #[clap(long, default_value = "localhost")]
    pub host: String,

    /// Broker port
    #[clap(long, default_value_t = 5672)]
    pub port: u16,

    /// How long to wait for outstanding deliveries after the batch
    /// (e.g. "500ms", "2s", "1m")
    #[clap(long, value_parser = parse_duration, default_value = "2s")]
    pub settle: Duration,

    /// Write the final stats snapshot and bulk report to a JSON file
    #[clap(short = 'o', long)]
    pub output_file: Option<PathBuf>,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// Bulk request described by these arguments
    pub fn bulk_request(&self) -> BulkSendRequest {
        BulkSendRequest {
            count: self.count,
            template: self.template.clone(),
            format: self.format,
            delay_ms: self.delay_ms,
        }
    }

    /// Harness configuration described by these arguments
    pub fn harness_config(&self) -> HarnessConfig {
        let mut config = HarnessConfig {
            broker_host: self.host.clone(),
            broker_port: self.port,
            ..HarnessConfig::default()
        };
        if let Some(ref destination) = self.destination {
            config.default_destination = destination.clone();
        }
        config
    }
}

/// Parse a duration from a string (e.g. "500ms", "10s", "5m", "1h")
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
        (s, "s") // Default to seconds
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number in duration: {}", num_str))?;

    let duration = match unit {
        "ms" => Duration::from_millis(num as u64),
        "s" => Duration::from_secs(num as u64),
        "m" => Duration::from_secs((num * 60.0) as u64),
        "h" => Duration::from_secs((num * 3600.0) as u64),
        _ => return Err(format!("Invalid duration unit: {}", unit)),
    };

    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("10").unwrap(), Duration::from_secs(10));

        assert!(parse_duration("").is_err());
        assert!(parse_duration("invalid").is_err());
    }

    #[test]
    fn test_args_to_bulk_request() {
        let args = Args::parse_from(["demo", "-n", "7", "-t", "x-{index}", "--delay-ms", "5"]);
        let request = args.bulk_request();

        assert_eq!(request.count, 7);
        assert_eq!(request.template, "x-{index}");
        assert_eq!(request.delay_ms, 5);
        assert_eq!(request.format, MessageFormat::Text);
    }

    #[test]
    fn test_args_destination_overrides_config() {
        let args = Args::parse_from(["demo", "--destination", "alt.queue"]);
        assert_eq!(args.harness_config().default_destination, "alt.queue");

        let args = Args::parse_from(["demo"]);
        assert_eq!(
            args.harness_config().default_destination,
            crate::config::DEFAULT_QUEUE
        );
    }
}
