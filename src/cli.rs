//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use beatmap_fetch::Mirror;
use clap::Parser;

/// Bulk-download osu! beatmap sets from a mirror.
///
/// Reads whitespace-separated beatmap set ids from INPUT and downloads each
/// one, a few at a time, retrying failed downloads after a fixed delay.
#[derive(Parser, Debug)]
#[command(name = "beatmap-fetch")]
#[command(author, version, about)]
pub struct Args {
    /// File containing beatmap set ids separated by whitespace
    pub input: PathBuf,

    /// Directory downloads are written to [default: .]
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Maximum concurrent downloads (1-100) [default: 5]
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,

    /// Attempts per id, first try included (1-10) [default: 3]
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_retries: Option<u8>,

    /// Seconds to wait before retrying a failed download (0-3600) [default: 30]
    #[arg(short = 'd', long, value_parser = clap::value_parser!(u64).range(0..=3600))]
    pub retry_delay: Option<u64>,

    /// Mirror preset (nerinyan, beatconnect, osu-direct, catboy, osu-ppy)
    #[arg(short, long, conflicts_with = "url_template")]
    pub mirror: Option<Mirror>,

    /// Custom download URL containing the literal `{id}` placeholder
    #[arg(short, long)]
    pub url_template: Option<String>,

    /// File extension for fallback filenames [default: osz]
    #[arg(short, long)]
    pub extension: Option<String>,

    /// Use server-suggested filenames without sanitizing them
    #[arg(long)]
    pub trust_server_filenames: bool,

    /// Skip ids already present in the output directory
    #[arg(long)]
    pub skip_existing: bool,

    /// Show a progress bar per download on stderr
    #[arg(short, long)]
    pub progress: bool,

    /// Write a JSON report of the run to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_minimal_args_parses_successfully() {
        let args = Args::try_parse_from(["beatmap-fetch", "ids.txt"]).unwrap();
        assert_eq!(args.input, PathBuf::from("ids.txt"));
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(args.concurrency.is_none());
        assert!(args.max_retries.is_none());
        assert!(args.mirror.is_none());
        assert!(!args.skip_existing);
        assert!(!args.trust_server_filenames);
        assert!(!args.progress);
    }

    #[test]
    fn test_cli_progress_flag() {
        let args = Args::try_parse_from(["beatmap-fetch", "-p", "ids.txt"]).unwrap();
        assert!(args.progress);
    }

    #[test]
    fn test_cli_missing_input_rejected() {
        let err = Args::try_parse_from(["beatmap-fetch"]).unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["beatmap-fetch", "-v", "ids.txt"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["beatmap-fetch", "-vv", "ids.txt"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["beatmap-fetch", "--quiet", "ids.txt"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["beatmap-fetch", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_concurrency_bounds() {
        let args = Args::try_parse_from(["beatmap-fetch", "-c", "100", "ids.txt"]).unwrap();
        assert_eq!(args.concurrency, Some(100));

        for bad in ["0", "101"] {
            let err = Args::try_parse_from(["beatmap-fetch", "-c", bad, "ids.txt"]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        }
    }

    #[test]
    fn test_cli_max_retries_zero_rejected() {
        let err = Args::try_parse_from(["beatmap-fetch", "-r", "0", "ids.txt"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_retry_delay_flag() {
        let args =
            Args::try_parse_from(["beatmap-fetch", "--retry-delay", "0", "ids.txt"]).unwrap();
        assert_eq!(args.retry_delay, Some(0));

        let err = Args::try_parse_from(["beatmap-fetch", "-d", "3601", "ids.txt"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_mirror_parses_preset_names() {
        let args = Args::try_parse_from(["beatmap-fetch", "-m", "catboy", "ids.txt"]).unwrap();
        assert_eq!(args.mirror, Some(Mirror::Catboy));

        let args =
            Args::try_parse_from(["beatmap-fetch", "--mirror", "osu_direct", "ids.txt"]).unwrap();
        assert_eq!(args.mirror, Some(Mirror::OsuDirect));
    }

    #[test]
    fn test_cli_unknown_mirror_rejected() {
        let err = Args::try_parse_from(["beatmap-fetch", "-m", "nowhere", "ids.txt"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_mirror_conflicts_with_url_template() {
        let err = Args::try_parse_from([
            "beatmap-fetch",
            "-m",
            "catboy",
            "-u",
            "https://example.com/{id}",
            "ids.txt",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_cli_output_and_report_paths() {
        let args = Args::try_parse_from([
            "beatmap-fetch",
            "-o",
            "Songs",
            "--report",
            "run.json",
            "--skip-existing",
            "ids.txt",
        ])
        .unwrap();
        assert_eq!(args.output_dir, Some(PathBuf::from("Songs")));
        assert_eq!(args.report, Some(PathBuf::from("run.json")));
        assert!(args.skip_existing);
    }
}
