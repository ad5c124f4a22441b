//! Compiled result assembler
//!
//! Runs the whole pipeline and bundles its output into [`CompiledDetails`]: a pattern
//! and flags for the host engine, plus the emulation settings the wrapper needs when
//! the pattern cannot be used as-is.

use crate::error::{OnigexError, Result};
use crate::generate::{GenerateOptions, Generated, generate};
use crate::ir::{self, Strategy};
use crate::options::{Options, ResolvedOptions};
use crate::parser::{ParseOptions, SourceAst, parse};
use crate::postprocess::postprocess;
use crate::transform::{TransformConfig, transform};

/// Settings for the emulation wrapper
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EmulationConfig {
    /// 1-based indices of captures hidden from match results, ascending
    pub hidden_captures: Vec<usize>,
    /// `(destination, sources)` pairs, ascending by destination
    pub transfers: Vec<(usize, Vec<usize>)>,
    /// Alternate match procedure
    pub strategy: Option<Strategy>,
    /// Compile on first use instead of at construction
    pub lazy_compile: bool,
}

/// Output of [`translate_to_details`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompiledDetails {
    pub pattern: String,
    pub flags: String,
    /// `None` when the pattern can be used directly
    pub options: Option<EmulationConfig>,
}

impl CompiledDetails {
    /// Whether the emulation wrapper is required
    pub fn needs_emulation(&self) -> bool {
        self.options.is_some()
    }
}

/// Every intermediate result of one translation
#[derive(Debug, Clone)]
pub(crate) struct Stages {
    pub source: SourceAst,
    pub ir: ir::Ast,
    pub generated: Generated,
    pub details: CompiledDetails,
}

/// Translate a pattern into host pattern text, flags and emulation settings
///
/// # Errors
/// `ConfigurationConflict` before anything is parsed, `Syntax` for malformed
/// patterns, `UnsupportedFeature`/`UnsupportedTarget` when the pattern cannot be
/// represented under the options.
pub fn translate_to_details(pattern: &str, options: &Options) -> Result<CompiledDetails> {
    Ok(run(pattern, options)?.details)
}

pub(crate) fn run(pattern: &str, options: &Options) -> Result<Stages> {
    let resolved = options.normalize()?;

    let source = parse(
        pattern,
        ParseOptions {
            flags: resolved.flags,
            capture_group: resolved.rules.capture_group,
            allow_orphan_backrefs: resolved.rules.allow_orphan_backrefs,
        },
    )?;
    let ir = transform(&source, &TransformConfig::from_options(&resolved))?;
    let generated = generate(&ir, &GenerateOptions::from_options(&resolved))?;
    let details = assemble(&generated, ir.strategy, &resolved)?;

    Ok(Stages {
        source,
        ir,
        generated,
        details,
    })
}

fn assemble(
    generated: &Generated,
    strategy: Option<Strategy>,
    options: &ResolvedOptions,
) -> Result<CompiledDetails> {
    let rewritten = postprocess(&generated.pattern, generated.meta.clone())?;

    let mut flags = String::with_capacity(generated.flags.len() + 2);
    if options.has_indices {
        flags.push('d');
    }
    if options.global {
        flags.push('g');
    }
    flags.push_str(&generated.flags);

    if options.avoid_emulation && !rewritten.meta.is_empty() {
        return Err(OnigexError::unsupported(
            "pattern requires the emulation wrapper",
        ));
    }

    let lazy_compile = options
        .lazy_compile_length
        .is_some_and(|length| rewritten.pattern.chars().count() >= length);
    let options = if rewritten.meta.is_empty() && strategy.is_none() && !lazy_compile {
        None
    } else {
        Some(EmulationConfig {
            hidden_captures: rewritten.meta.hidden.iter().copied().collect(),
            transfers: rewritten
                .meta
                .transfers
                .iter()
                .map(|(destination, sources)| (*destination, sources.clone()))
                .collect(),
            strategy,
            lazy_compile,
        })
    };

    Ok(CompiledDetails {
        pattern: rewritten.pattern,
        flags,
        options,
    })
}
