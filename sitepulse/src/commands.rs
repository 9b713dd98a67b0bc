use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

/// Accepts sampling rates between 0.1 and 1.0 inclusive.
fn parse_sampling_rate(value: &str) -> Result<f64, String> {
    let rate: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if (0.1..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(format!("{} is not in 0.1..=1.0", rate))
    }
}

fn sitemap_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(--"no-recursive")
            .required(false)
            .help("Only read the root sitemap; do not follow sitemap indexes")
            .action(clap::ArgAction::SetTrue),
    )
    .arg(
        arg!(--"max-depth" <DEPTH>)
            .required(false)
            .help("How many levels of nested sitemap indexes to follow")
            .value_parser(clap::value_parser!(u64).range(1..=5))
            .default_value("3"),
    )
}

fn output_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(-o --"output" <PATH>)
            .required(false)
            .help("Save report to file (default: display to screen)")
            .value_parser(clap::value_parser!(std::path::PathBuf)),
    )
    .arg(
        arg!(-f --"format" <FORMAT>)
            .required(false)
            .help("Report format: text, json, csv")
            .value_parser(["text", "json", "csv"])
            .default_value("text"),
    )
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitepulse")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitepulse")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and progress output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Log every fetch, probe and redirect to stderr")
                .required(false)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(output_args(sitemap_args(
            command!("extract")
                .about("Resolve a sitemap (and any nested sitemap indexes) into a list of URLs")
                .arg(
                    arg!(-u --"url" <SITEMAP>)
                        .required(true)
                        .help("URL of the root sitemap")
                        .value_parser(clap::value_parser!(Url)),
                ),
        )))
        .subcommand(output_args(sitemap_args(
            command!("check")
                .about(
                    "Check the health of every URL in a sitemap or URL list: HTTP status, \
                redirects, TLS and timing.",
                )
                .arg(
                    arg!(-u --"url" <SITEMAP>)
                        .required(false)
                        .help("URL of the sitemap whose pages should be checked")
                        .value_parser(clap::value_parser!(Url))
                        .conflicts_with("hosts-file"),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of URLs to check")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("url"),
                )
                .arg(
                    arg!(-w --"workers" <NUM_WORKERS>)
                        .required(false)
                        .help("Maximum number of concurrent checks")
                        .value_parser(clap::value_parser!(u64).range(1..=30))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Per-URL timeout in seconds")
                        .value_parser(clap::value_parser!(u64).range(5..=60))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"sampling-rate" <RATE>)
                        .required(false)
                        .help("Fraction of URLs to check, between 0.1 and 1.0")
                        .value_parser(parse_sampling_rate)
                        .default_value("1.0"),
                )
                .arg(
                    arg!(--"batch-size" <SIZE>)
                        .required(false)
                        .help("Check URLs in sequential batches of this size (0 = no batching)")
                        .value_parser(clap::value_parser!(u64).range(0..=1000))
                        .default_value("0"),
                )
                .arg(
                    arg!(--"fail-on-unhealthy")
                        .required(false)
                        .help("Exit with status 2 when any URL is not healthy")
                        .action(clap::ArgAction::SetTrue),
                ),
        )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_rate_bounds() {
        assert_eq!(parse_sampling_rate("0.1"), Ok(0.1));
        assert_eq!(parse_sampling_rate("1"), Ok(1.0));
        assert!(parse_sampling_rate("0.05").is_err());
        assert!(parse_sampling_rate("1.5").is_err());
        assert!(parse_sampling_rate("half").is_err());
    }

    #[test]
    fn command_tree_is_consistent() {
        command_argument_builder().debug_assert();
    }

    #[test]
    fn check_defaults() {
        let matches = command_argument_builder()
            .try_get_matches_from(["sitepulse", "check", "-u", "https://example.com/sitemap.xml"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();

        assert_eq!(name, "check");
        assert_eq!(sub.get_one::<u64>("workers"), Some(&10));
        assert_eq!(sub.get_one::<u64>("timeout"), Some(&10));
        assert_eq!(sub.get_one::<f64>("sampling-rate"), Some(&1.0));
        assert_eq!(sub.get_one::<u64>("batch-size"), Some(&0));
        assert_eq!(sub.get_one::<u64>("max-depth"), Some(&3));
        assert_eq!(sub.get_one::<String>("format").map(String::as_str), Some("text"));
        assert!(!sub.get_flag("no-recursive"));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let cmd = command_argument_builder();
        for args in [
            vec!["sitepulse", "check", "-u", "https://e.com/s.xml", "-w", "31"],
            vec!["sitepulse", "check", "-u", "https://e.com/s.xml", "--timeout", "4"],
            vec!["sitepulse", "check", "-u", "https://e.com/s.xml", "--batch-size", "1001"],
            vec!["sitepulse", "extract", "-u", "https://e.com/s.xml", "--max-depth", "6"],
            vec!["sitepulse", "extract", "-u", "https://e.com/s.xml", "-f", "html"],
        ] {
            assert!(cmd.clone().try_get_matches_from(&args).is_err(), "{args:?}");
        }
    }

    #[test]
    fn url_and_hosts_file_conflict() {
        let result = command_argument_builder().try_get_matches_from([
            "sitepulse",
            "check",
            "-u",
            "https://example.com/sitemap.xml",
            "-H",
            "urls.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let matches = command_argument_builder()
            .try_get_matches_from(["sitepulse", "extract", "-u", "https://e.com/s.xml", "-q", "-v"])
            .unwrap();
        assert!(matches.get_flag("quiet"));
        assert!(matches.get_flag("verbose"));
    }
}
