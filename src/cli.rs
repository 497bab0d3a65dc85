//! Command-line arguments for the `nova` binary.

use anyhow::{bail, Result};

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Make sure Audacity is up, open the pipes, then ask it to exit.
    Start,
    /// Run a scenario by file path or name.
    Render { scenario: String },
    /// Send one raw command and print the response.
    Send { command: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    pub command: CliCommand,
    pub verbose: bool,
    pub debug: bool,
}

pub const USAGE: &str = "\
usage: nova <command> [-v|--verbose] [--debug]

commands:
  start                 Start Audacity.
  render <scenario>     Render a scenario (JSON path or name).
  send <command...>     Send one script command and print the reply.";

impl Cli {
    /// Parse arguments, excluding the program name.
    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut verbose = false;
        let mut debug = false;
        let mut subcommand: Option<String> = None;
        let mut operands = Vec::new();

        for arg in args.into_iter().map(Into::into) {
            // Once `send` has its first word, everything belongs to the command
            let in_command_words = subcommand.as_deref() == Some("send") && !operands.is_empty();

            if !in_command_words && arg.starts_with('-') {
                match arg.as_str() {
                    "-v" | "--verbose" => verbose = true,
                    "--debug" => debug = true,
                    flag => bail!("Unknown option: {}\n\n{}", flag, USAGE),
                }
                continue;
            }

            if subcommand.is_none() {
                subcommand = Some(arg);
            } else {
                operands.push(arg);
            }
        }

        let mut operands = operands.into_iter();
        let command = match subcommand.as_deref() {
            Some("start") => CliCommand::Start,
            Some("render") => match operands.next() {
                Some(scenario) => CliCommand::Render { scenario },
                None => bail!("render needs a scenario\n\n{}", USAGE),
            },
            Some("send") => {
                let words: Vec<String> = operands.by_ref().collect();
                if words.is_empty() {
                    bail!("send needs a command\n\n{}", USAGE);
                }
                CliCommand::Send {
                    command: words.join(" "),
                }
            }
            Some(other) => bail!("Unimplemented command: {}\n\n{}", other, USAGE),
            None => bail!("{}", USAGE),
        };

        if let Some(extra) = operands.next() {
            bail!("Unexpected argument: {}\n\n{}", extra, USAGE);
        }

        Ok(Self {
            command,
            verbose,
            debug,
        })
    }

    /// Default tracing filter when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "nova=debug"
        } else if self.verbose {
            "nova=info"
        } else {
            "nova=warn"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_start_with_flags() {
        let cli = Cli::parse(["-v", "--debug", "start"]).unwrap();
        assert_eq!(cli.command, CliCommand::Start);
        assert!(cli.verbose);
        assert!(cli.debug);
        assert_eq!(cli.log_filter(), "nova=debug");
    }

    #[test]
    fn test_parse_render() {
        let cli = Cli::parse(["render", "seascape"]).unwrap();
        assert_eq!(
            cli.command,
            CliCommand::Render {
                scenario: "seascape".to_string()
            }
        );
        assert_eq!(cli.log_filter(), "nova=warn");
    }

    #[test]
    fn test_parse_send_joins_words() {
        let cli = Cli::parse(["--verbose", "send", "Select:", "Start=0", "End=0", "Track=1"]).unwrap();
        assert_eq!(
            cli.command,
            CliCommand::Send {
                command: "Select: Start=0 End=0 Track=1".to_string()
            }
        );
        assert_eq!(cli.log_filter(), "nova=info");
    }

    #[test]
    fn test_logging_flags_after_subcommand() {
        let cli = Cli::parse(["start", "--verbose"]).unwrap();
        assert_eq!(cli.command, CliCommand::Start);
        assert!(cli.verbose);

        let cli = Cli::parse(["render", "x", "--debug"]).unwrap();
        assert_eq!(
            cli.command,
            CliCommand::Render {
                scenario: "x".to_string()
            }
        );
        assert!(cli.debug);
    }

    #[test]
    fn test_send_keeps_dashes_inside_command() {
        let cli = Cli::parse(["send", "-v", "Echo:", "Delay=-1"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(
            cli.command,
            CliCommand::Send {
                command: "Echo: Delay=-1".to_string()
            }
        );

        let cli = Cli::parse(["send", "Select:", "--debug"]).unwrap();
        assert!(!cli.debug);
        assert_eq!(
            cli.command,
            CliCommand::Send {
                command: "Select: --debug".to_string()
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(Cli::parse(Vec::<String>::new()).is_err());
        assert!(Cli::parse(["launch"]).is_err());
        assert!(Cli::parse(["render"]).is_err());
        assert!(Cli::parse(["send"]).is_err());
        assert!(Cli::parse(["--quiet", "start"]).is_err());
        assert!(Cli::parse(["start", "extra"]).is_err());
        assert!(Cli::parse(["start", "--quiet"]).is_err());
    }
}
