use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use onigex::{
    Accuracy, OnigexError, Options, Pattern, Rules, Target, translate, translate_debug,
    translate_to_details,
};

#[derive(Parser)]
#[command(name = "onigex")]
#[command(about = "Onigex - translate Oniguruma patterns into ECMAScript patterns")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a pattern and print the result
    Convert {
        /// The Oniguruma pattern
        pattern: String,
        #[command(flatten)]
        options: TranslateArgs,
        /// Show every pipeline stage
        #[arg(short, long)]
        debug: bool,
        /// Print the compiled details as JSON
        #[arg(long, conflicts_with = "debug")]
        json: bool,
    },
    /// Test a pattern against input
    Test {
        /// The Oniguruma pattern
        pattern: String,
        /// The input string to test
        input: String,
        #[command(flatten)]
        options: TranslateArgs,
        /// Show detailed match information
        #[arg(short, long)]
        verbose: bool,
    },
    /// Find all matches in input
    Find {
        /// The Oniguruma pattern
        pattern: String,
        /// The input string
        input: String,
        #[command(flatten)]
        options: TranslateArgs,
    },
    /// Check if pattern matches
    Match {
        /// The Oniguruma pattern
        pattern: String,
        /// The input string
        input: String,
        #[command(flatten)]
        options: TranslateArgs,
    },
}

#[derive(Args)]
struct TranslateArgs {
    /// Oniguruma flags (any of i, m, x, D, S, W)
    #[arg(short, long, default_value = "")]
    flags: String,
    /// Target level: ES2018, ES2024, ES2025 or auto
    #[arg(short, long, default_value = "auto")]
    target: String,
    /// Fail instead of approximating
    #[arg(long)]
    strict: bool,
    /// Fail if the pattern needs the emulation wrapper
    #[arg(long)]
    avoid_emulation: bool,
    /// Maximum depth for recursion emulation
    #[arg(long, default_value_t = onigex::options::DEFAULT_RECURSION_LIMIT)]
    recursion_limit: u32,
    /// `^` and `$` match only at the string boundaries
    #[arg(long)]
    singleline: bool,
    /// `\b` and `\B` use ASCII word characters
    #[arg(long)]
    ascii_word_boundaries: bool,
}

impl TranslateArgs {
    fn to_options(&self) -> Result<Options, OnigexError> {
        Ok(Options {
            accuracy: if self.strict {
                Accuracy::Strict
            } else {
                Accuracy::Default
            },
            avoid_emulation: self.avoid_emulation,
            flags: self.flags.clone(),
            rules: Rules {
                recursion_limit: self.recursion_limit,
                singleline: self.singleline,
                ascii_word_boundaries: self.ascii_word_boundaries,
                ..Rules::default()
            },
            target: Target::parse(&self.target)?,
            ..Options::default()
        })
    }
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            pattern,
            options,
            debug,
            json,
        } => cmd_convert(&pattern, &options, debug, json),
        Commands::Test {
            pattern,
            input,
            options,
            verbose,
        } => cmd_test(&pattern, &input, &options, verbose),
        Commands::Find {
            pattern,
            input,
            options,
        } => cmd_find(&pattern, &input, &options),
        Commands::Match {
            pattern,
            input,
            options,
        } => cmd_match(&pattern, &input, &options),
    }
}

fn fail(error: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), error);
    std::process::exit(1);
}

fn compile(pattern: &str, args: &TranslateArgs) -> Box<dyn Pattern> {
    args.to_options()
        .and_then(|options| translate(pattern, &options))
        .unwrap_or_else(|e| fail(e))
}

fn cmd_convert(pattern: &str, args: &TranslateArgs, debug: bool, json: bool) {
    let options = args.to_options().unwrap_or_else(|e| fail(e));

    if json {
        let details = translate_to_details(pattern, &options).unwrap_or_else(|e| fail(e));
        match serde_json::to_string_pretty(&details) {
            Ok(text) => println!("{}", text),
            Err(e) => fail(e),
        }
        return;
    }

    println!("{}", "Converting pattern...".bold());
    println!("  Input:  {}", pattern.cyan());
    println!();

    if debug {
        match translate_debug(pattern, &options) {
            Ok(result) => result.report(),
            Err(e) => fail(e),
        }
        return;
    }

    match translate_to_details(pattern, &options) {
        Ok(details) => {
            println!("{}", "Output:".bold());
            println!("  /{}/{}", details.pattern.green(), details.flags.yellow());
            if let Some(config) = &details.options {
                println!();
                println!("{}", "Emulation:".bold());
                if !config.hidden_captures.is_empty() {
                    println!("  Hidden captures: {:?}", config.hidden_captures);
                }
                for (destination, sources) in &config.transfers {
                    println!("  Transfer: {:?} -> {}", sources, destination);
                }
                if let Some(strategy) = config.strategy {
                    println!("  Strategy: {}", strategy.to_string().magenta());
                }
                if config.lazy_compile {
                    println!("  Lazy compile: {}", "yes".cyan());
                }
            }
        }
        Err(e) => fail(e),
    }
}

fn cmd_test(pattern: &str, input: &str, args: &TranslateArgs, verbose: bool) {
    println!("{}", "Testing pattern...".bold());
    println!("  Pattern: {}", pattern.cyan());
    println!("  Input:   {}", input.yellow());
    println!();

    let regex = compile(pattern, args);

    match regex.find_at(input, 0) {
        Ok(Some(m)) => {
            println!("{}", "✓ Match found!".green().bold());
            println!("  Position: {}..{}", m.start, m.end);
            println!("  Match:    {}", m.as_str(input).green());

            if verbose && !m.is_empty() {
                println!();
                println!("{}", "Capture groups:".bold());
                let names = regex.capture_names();
                for (idx, group) in m.iter().enumerate() {
                    let label = match names.get(idx).cloned().flatten() {
                        Some(name) => format!("{} ({})", idx + 1, name),
                        None => (idx + 1).to_string(),
                    };
                    match group {
                        Some(range) => println!(
                            "  Group {}: {}..{} = {}",
                            label,
                            range.start,
                            range.end,
                            input[range.clone()].green()
                        ),
                        None => println!("  Group {}: {}", label, "unmatched".dimmed()),
                    }
                }
            }
        }
        Ok(None) => println!("{}", "✗ No match".red()),
        Err(e) => fail(e),
    }
}

fn cmd_find(pattern: &str, input: &str, args: &TranslateArgs) {
    let regex = compile(pattern, args);
    let matches = regex.find_all(input).unwrap_or_else(|e| fail(e));

    if matches.is_empty() {
        println!("{}", "No matches found".red());
    } else {
        println!(
            "{} {}",
            "Found".bold(),
            format!("{} match(es)", matches.len()).green()
        );
        println!();

        for (i, m) in matches.iter().enumerate() {
            println!(
                "  [{}] {}..{} = {}",
                i + 1,
                m.start,
                m.end,
                m.as_str(input).green()
            );
        }
    }
}

fn cmd_match(pattern: &str, input: &str, args: &TranslateArgs) {
    let regex = compile(pattern, args);

    if regex.test(input).unwrap_or_else(|e| fail(e)) {
        println!("{}", "true".green());
        std::process::exit(0);
    } else {
        println!("{}", "false".red());
        std::process::exit(1);
    }
}
