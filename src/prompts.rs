//! Instruction prompt for the vision strategy.
//!
//! The wording is tuned empirically against real slips and has no fixed
//! evaluation set, so it is a versioned, replaceable artifact: callers can
//! swap it through [`crate::config::SlicerConfig::system_prompt`] and
//! [`PROMPT_VERSION`] is logged with every batch so results can be traced
//! back to the prompt that produced them.

use crate::candidate::Sentinel;

/// Bumped whenever [`DOC_NUMBER_PROMPT`] changes.
pub const PROMPT_VERSION: &str = "doc-number/3";

/// Default instruction for reading "Num. do Documento" off a slip image.
///
/// The reply contract (bare value, or the not-found wire value) is what
/// [`crate::pipeline::vision::clean_reply`] expects.
pub const DOC_NUMBER_PROMPT: &str = r#"You are an OCR engine specialised in Brazilian bank payment slips (boletos, Bradesco / FEBRABAN layout).

GOAL: read the value of the field labelled "Num. do Documento" (Número do Documento).

FIELD CHARACTERISTICS:
1. It usually sits immediately to the right of "Data do Documento".
2. On Bradesco slips it is in the upper-left part of the information grid.
3. Its shape is a short number, a hyphen and a single check digit (example: 24277-4).
4. Do NOT confuse it with "Nosso Número", which is much longer.
5. Do NOT confuse it with "Código do Beneficiário" or "Agência".

OUTPUT:
- Reply with the number ONLY (example: 24277-4).
- If the field cannot be found at all, reply exactly: NAO_ENCONTRADO
- No explanations, labels or extra text."#;

/// The not-found reply the prompt asks the model for.
pub fn not_found_reply() -> &'static str {
    Sentinel::NotFound.as_str()
}
