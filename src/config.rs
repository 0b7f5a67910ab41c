// Application configuration: command-line options over environment
// variables over built-in defaults.
use getopts::{Fail, Options};
use std::path::PathBuf;

pub const INPUT_ENV: &str = "EAP_REPORT_INPUT";
pub const OUTPUT_DIR_ENV: &str = "EAP_REPORT_OUTPUT_DIR";
pub const SCHEMA_ENV: &str = "EAP_REPORT_SCHEMA";

pub const DEFAULT_INPUT: &str = "report.xml";
pub const DEFAULT_OUTPUT_DIR: &str = "dashboard_output";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub schema: Option<PathBuf>,
    /// Load and export once, without the interactive menu.
    pub batch: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Run(Config),
    /// Print the report schema in effect as TOML.
    PrintSchema(Option<PathBuf>),
    Usage,
}

pub fn get_opts() -> Options {
    let mut opts = Options::new();
    opts.optopt("i", "input", "report file to load", "FILE");
    opts.optopt("o", "output", "directory for dashboard exports", "DIR");
    opts.optopt("s", "schema", "TOML file overriding the report layout", "FILE");
    opts.optflag("", "batch", "load and export once, then exit");
    opts.optflag("", "print-schema", "print the report schema as TOML and exit");
    opts.optflag("h", "help", "print this help menu");
    opts
}

/// Parse `args` (program name first). `env` looks up environment
/// variables so callers can substitute their own source.
pub fn parse_options<F>(opts: &Options, args: &[String], env: F) -> Result<Command, Fail>
where
    F: Fn(&str) -> Option<String>,
{
    let matches = opts.parse(args.get(1..).unwrap_or_default())?;

    if matches.opt_present("h") {
        return Ok(Command::Usage);
    }

    let free = match matches.free.len() {
        0 => None,
        1 => Some(matches.free[0].clone()),
        _ => return Err(Fail::UnrecognizedOption(matches.free[1].clone())),
    };
    let flag_input = matches.opt_str("i");
    if let (Some(_), Some(extra)) = (&flag_input, &free) {
        return Err(Fail::UnrecognizedOption(extra.clone()));
    }

    let input = flag_input
        .or(free)
        .or_else(|| env(INPUT_ENV))
        .unwrap_or_else(|| DEFAULT_INPUT.to_string());
    let output_dir = matches
        .opt_str("o")
        .or_else(|| env(OUTPUT_DIR_ENV))
        .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string());
    let schema = matches
        .opt_str("s")
        .or_else(|| env(SCHEMA_ENV))
        .filter(|s| !s.is_empty())
        .map(PathBuf::from);

    if matches.opt_present("print-schema") {
        return Ok(Command::PrintSchema(schema));
    }

    Ok(Command::Run(Config {
        input: input.into(),
        output_dir: output_dir.into(),
        schema,
        batch: matches.opt_present("batch"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("eap_report")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn run(list: &[&str]) -> Config {
        match parse_options(&get_opts(), &args(list), no_env) {
            Ok(Command::Run(config)) => config,
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn defaults_without_args() {
        let config = run(&[]);
        assert_eq!(config.input, PathBuf::from(DEFAULT_INPUT));
        assert_eq!(config.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
        assert_eq!(config.schema, None);
        assert!(!config.batch);
    }

    #[test]
    fn help_short_and_long() {
        for flag in ["-h", "--help"] {
            let result = parse_options(&get_opts(), &args(&[flag]), no_env);
            assert_eq!(result, Ok(Command::Usage));
        }
    }

    #[test]
    fn free_argument_is_input() {
        let config = run(&["march.xml", "--batch", "-o", "out"]);
        assert_eq!(config.input, PathBuf::from("march.xml"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert!(config.batch);
    }

    #[test]
    fn long_options() {
        let config = run(&["--input", "a.xml", "--schema", "layout.toml"]);
        assert_eq!(config.input, PathBuf::from("a.xml"));
        assert_eq!(config.schema, Some(PathBuf::from("layout.toml")));
    }

    #[test]
    fn too_many_inputs() {
        let result = parse_options(&get_opts(), &args(&["a.xml", "b.xml"]), no_env);
        match result {
            Err(Fail::UnrecognizedOption(message)) => assert_eq!(message, "b.xml"),
            other => panic!("unexpected result: {other:?}"),
        }
        let result = parse_options(&get_opts(), &args(&["-i", "a.xml", "b.xml"]), no_env);
        assert!(matches!(result, Err(Fail::UnrecognizedOption(_))));
    }

    #[test]
    fn unknown_option_fails() {
        let result = parse_options(&get_opts(), &args(&["--bogus"]), no_env);
        assert!(matches!(result, Err(Fail::UnrecognizedOption(_))));
    }

    #[test]
    fn print_schema_carries_overrides() {
        let result = parse_options(&get_opts(), &args(&["--print-schema", "-s", "x.toml"]), no_env);
        assert_eq!(result, Ok(Command::PrintSchema(Some(PathBuf::from("x.toml")))));
    }

    #[test]
    fn environment_fills_gaps() {
        let env = |key: &str| match key {
            INPUT_ENV => Some("env.xml".to_string()),
            OUTPUT_DIR_ENV => Some("env_out".to_string()),
            SCHEMA_ENV => Some(String::new()),
            _ => None,
        };
        let result = parse_options(&get_opts(), &args(&["-o", "flag_out"]), env);
        let Ok(Command::Run(config)) = result else {
            panic!("expected a run command");
        };
        assert_eq!(config.input, PathBuf::from("env.xml"));
        assert_eq!(config.output_dir, PathBuf::from("flag_out"));
        assert_eq!(config.schema, None);
    }
}
