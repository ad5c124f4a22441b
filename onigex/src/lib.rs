//! Onigex Library
//!
//! Translates Oniguruma patterns into ECMAScript patterns for the `regress` engine,
//! with a thin match-time wrapper for the constructs the engine cannot express.
//!
//! ```
//! use onigex::{Options, translate};
//!
//! let pattern = translate(r"(?<word>\w++)!", &Options::default()).unwrap();
//! let found = pattern.exec("hey!").unwrap().unwrap();
//! assert_eq!(found.named_group_str("hey!", "word"), Some("hey"));
//! ```

pub mod ast;
pub mod capability;
pub mod details;
pub mod error;
pub mod generate;
pub mod groups;
pub mod ir;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod pattern;
pub mod postprocess;
pub mod transform;
pub mod unicode;

pub use details::{CompiledDetails, EmulationConfig, translate_to_details};
pub use error::{OnigexError, Result};
pub use ir::Strategy;
pub use options::{Accuracy, Options, Rules, Target};
pub use parser::{ParseOptions, SourceAst, parse};
pub use pattern::{Captures, EmulatedPattern, NativePattern, Pattern};
pub use postprocess::{CaptureMeta, Rewritten, atomic, possessive, recursion};

/// Translate a pattern and compile it into a pattern object
///
/// Returns a [`NativePattern`] when the emitted pattern needs no help at match time,
/// and an [`EmulatedPattern`] otherwise.
pub fn translate(pattern: &str, options: &Options) -> Result<Box<dyn Pattern>> {
    crate::pattern::from_details(translate_to_details(pattern, options)?)
}

/// Translate with every intermediate stage kept for inspection
pub fn translate_debug(pattern: &str, options: &Options) -> Result<TranslateReport> {
    let stages = details::run(pattern, options)?;
    Ok(TranslateReport {
        input: pattern.to_string(),
        source_ast: format!("{:?}", stages.source.root),
        ir: format!("{:?}", stages.ir.root),
        generated: stages.generated.pattern,
        details: stages.details,
    })
}

/// Result of a translation with debug information
#[derive(Debug, Clone)]
pub struct TranslateReport {
    /// The original input pattern
    pub input: String,
    /// The source AST (debug format)
    pub source_ast: String,
    /// The intermediate AST (debug format)
    pub ir: String,
    /// Generator output before postprocessing
    pub generated: String,
    /// Final result
    pub details: CompiledDetails,
}

impl TranslateReport {
    /// Print a formatted report of the translation
    pub fn report(&self) {
        println!("Translation Report");
        println!("==================");
        println!("Input:     {}", self.input);
        println!("AST:       {}", self.source_ast);
        println!("IR:        {}", self.ir);
        println!("Generated: {}", self.generated);
        println!("Output:    {}", self.details.pattern);
        println!("Flags:     {}", self.details.flags);
        match &self.details.options {
            None => println!("Emulation: none"),
            Some(config) => {
                println!("Hidden:    {:?}", config.hidden_captures);
                println!("Transfers: {:?}", config.transfers);
                if let Some(strategy) = config.strategy {
                    println!("Strategy:  {}", strategy);
                }
                println!("Lazy:      {}", config.lazy_compile);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_to_end() {
        let options = Options {
            target: Some(Target::Es2018),
            ..Options::default()
        };
        let pattern = translate("(?<n>a)b", &options).unwrap();
        assert_eq!(pattern.source(), "(?<n>a)b");
        assert!(pattern.test("xab").unwrap());
    }

    #[test]
    fn test_emulated_end_to_end() {
        let pattern = translate("(?>a+)b", &Options::default()).unwrap();
        assert_eq!(pattern.captures_len(), 0);
        assert!(pattern.test("aab").unwrap());
    }

    #[test]
    fn test_debug_report_keeps_stages() {
        let report = translate_debug("a++", &Options::default()).unwrap();
        assert_eq!(report.generated, "a++");
        assert_eq!(report.details.pattern, r"(?:(?=(a+))\1)");
        assert!(report.ir.contains("Possessive"));
    }
}
