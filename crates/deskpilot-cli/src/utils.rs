use anyhow::{anyhow, Result};
use colored::Colorize;
use deskpilot::{GestureReport, Point};

pub fn init_logging(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Parse "x,y" screen coordinates. Either may be negative on multi-monitor setups.
pub fn parse_point(raw: &str) -> Result<Point> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| anyhow!("expected a point as \"x,y\", got '{raw}'"))?;
    let x: f64 = x
        .trim()
        .parse()
        .map_err(|_| anyhow!("bad x coordinate in '{raw}'"))?;
    let y: f64 = y
        .trim()
        .parse()
        .map_err(|_| anyhow!("bad y coordinate in '{raw}'"))?;
    Ok(Point::new(x, y))
}

pub fn print_report(action: &str, report: &GestureReport) {
    if report.is_partial() {
        println!(
            "{} {}: {} of {} events accepted",
            "!".yellow().bold(),
            action,
            report.accepted,
            report.submitted
        );
    } else {
        println!(
            "{} {} ({} events, {} batches)",
            "✓".green(),
            action,
            report.submitted,
            report.batches
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("10,20").unwrap(), Point::new(10.0, 20.0));
        assert_eq!(parse_point(" -1920 , 5.5 ").unwrap(), Point::new(-1920.0, 5.5));
        assert!(parse_point("10").is_err());
        assert!(parse_point("a,b").is_err());
    }
}
