//! Semantic evaluation of parsed documents down to plain CSS:
//! variable scoping, conditional gates, class inheritance, selector
//! flattening, and value arithmetic.

pub mod block;
pub mod boolean;
pub mod colors;
pub mod context;
pub mod declarations;
pub mod inheritance;
pub mod scope;
pub mod selector;
pub mod term;

#[cfg(test)]
mod tests_integration;

pub use block::Evaluator;
pub use boolean::Truth;
pub use context::EvalContext;
pub use scope::{FrameKind, ScopeChain};

use cascata_common::{Diagnostics, ResourceLocator};
use cascata_parser::serializer::{serialize, Format};
use cascata_parser::{parse, ParseResult};

/// The rendered stylesheet plus everything reported along the way
#[derive(Debug)]
pub struct CompileResult {
    pub css: String,
    pub diagnostics: Diagnostics,
}

/// Parse and evaluate `source`, rendering the result in `format`.
/// Parse errors fail the compile; semantic problems are reported in
/// the result's diagnostics instead.
pub fn compile(source: &str, format: Format) -> ParseResult<CompileResult> {
    compile_inner(source, format, Evaluator::new())
}

/// Like [`compile`], resolving `@include` references through `locator`.
pub fn compile_with_locator(
    source: &str,
    format: Format,
    locator: Box<dyn ResourceLocator>,
) -> ParseResult<CompileResult> {
    compile_inner(source, format, Evaluator::with_locator(locator))
}

fn compile_inner(source: &str, format: Format, mut evaluator: Evaluator) -> ParseResult<CompileResult> {
    let document = parse(source)?;
    let output = evaluator.evaluate(&document);
    Ok(CompileResult {
        css: serialize(&output, format),
        diagnostics: evaluator.context.diagnostics,
    })
}
