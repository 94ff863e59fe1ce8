use std::fmt::Write as _;

use crate::model::RuleType;

use super::SourceChunk;

/// The versioned RuleCandidate contract. Prompt construction and the
/// validator both depend on it; changing it is a breaking interface change.
pub const RULE_CANDIDATE_SCHEMA: &str = include_str!("../../schema/rule_candidate.v1.json");

/// Builds the extraction prompt: contract first, then the page-labeled
/// source chunks, then the grounding and ambiguity instructions.
pub fn build_extraction_prompt(chunks: &[SourceChunk], rule_type: RuleType) -> String {
    let mut prompt = String::new();

    let _ = writeln!(
        prompt,
        "You are extracting statutory tax rules of type \"{rule_type}\" from the source \
         excerpts below. Respond with ONLY a JSON array of rule candidate objects, each \
         conforming to this JSON Schema:"
    );
    prompt.push('\n');
    prompt.push_str(RULE_CANDIDATE_SCHEMA);
    prompt.push_str("\n\nRules:\n");
    prompt.push_str(
        "- Extract only rules of the requested rule_type; skip everything else.\n\
         - source_text must be copied verbatim from one excerpt. Do not paraphrase, do not \
           invent citations.\n\
         - source_pages lists the page numbers the quoted text came from.\n\
         - If the excerpts support two or more genuinely conflicting readings of the same \
           rule, emit one candidate with status \"unclear\", a non-null ambiguity_reason, \
           and every conflicting reading listed under conflicting_candidates. Never pick \
           one reading silently.\n\
         - If a rule depends on cross-referenced material that is not present in the \
           excerpts, emit status \"blocked\" with ambiguity_reason naming the gap.\n\
         - Otherwise use status \"candidate\".\n",
    );
    prompt.push_str("\nSource excerpts:\n");

    for chunk in chunks {
        let _ = writeln!(prompt, "\n[Page {}]\n{}", chunk.page, chunk.text);
    }

    prompt
}
