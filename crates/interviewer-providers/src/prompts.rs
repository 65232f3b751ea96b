//! Prompt templates for the interviewer operations and reply extraction helpers.

use interviewer_core::traits::{
    AggregateContext, FollowUpRequest, GapConfirmationRequest, QuestionRequest,
};

/// System prompt sent with every completion unless the request overrides it.
pub const SYSTEM_PROMPT: &str = "You are an experienced technical interviewer. \
Be concise and specific. When asked for JSON, reply with a single JSON object \
and nothing else.";

pub fn question_prompt(request: &QuestionRequest) -> String {
    format!(
        "Candidate context:\n{context}\n\n\
         Write one {kind} interview question of {difficulty} difficulty about \"{skill}\". \
         Reply with the question text only.",
        context = request.context,
        kind = request.question_type,
        difficulty = request.difficulty,
        skill = request.skill,
    )
}

pub fn reference_answer_prompt(question: &str, context: &str) -> String {
    format!(
        "Candidate context:\n{context}\n\nQuestion:\n{question}\n\n\
         Write the answer a strong candidate would give. Cover the key concepts \
         an interviewer would expect, in one or two paragraphs of plain prose."
    )
}

pub fn rationale_prompt(question: &str, reference_answer: &str) -> String {
    format!(
        "Question:\n{question}\n\nReference answer:\n{reference_answer}\n\n\
         In one sentence, explain what this question reveals about a candidate."
    )
}

pub fn gap_confirmation_prompt(request: &GapConfirmationRequest) -> String {
    format!(
        "Question:\n{question}\n\nReference answer:\n{reference}\n\n\
         Candidate answer:\n{answer}\n\n\
         These terms appear in the reference but not in the candidate answer: {gaps}.\n\
         Decide which of them are concepts the candidate actually failed to convey \
         (ignore synonyms and paraphrases). Reply with JSON:\n\
         {{\"concepts\": [\"...\"], \"confirmed\": true|false, \
         \"severity\": \"none\"|\"minor\"|\"moderate\"|\"major\"}}",
        question = request.question,
        reference = request.reference_answer,
        answer = request.answer,
        gaps = request.keyword_gaps.join(", "),
    )
}

pub fn follow_up_prompt(request: &FollowUpRequest) -> String {
    format!(
        "Original question:\n{question}\n\nCandidate answer:\n{answer}\n\n\
         The answer missed these concepts ({severity} gap): {concepts}.\n\
         Write follow-up question number {order} that gives the candidate a chance \
         to address them without naming them outright. Reply with the question text only.",
        question = request.parent_question,
        answer = request.answer,
        severity = request.severity,
        concepts = request.missing_concepts.join(", "),
        order = request.order,
    )
}

pub fn evaluation_prompt(question: &str, answer: &str) -> String {
    format!(
        "Question:\n{question}\n\nCandidate answer:\n{answer}\n\n\
         Grade the answer. Reply with JSON:\n\
         {{\"score\": 0-100, \"feedback\": \"...\", \"strengths\": [\"...\"], \
         \"weaknesses\": [\"...\"]}}"
    )
}

pub fn recommendations_prompt(context: &AggregateContext) -> String {
    let mut questions = String::new();
    for (i, q) in context.questions.iter().enumerate() {
        let score = q
            .final_score
            .map(|s| format!("{s:.0}"))
            .unwrap_or_else(|| "unanswered".to_string());
        questions.push_str(&format!(
            "{}. {} (final score {score}, {} follow-ups, {} gaps filled",
            i + 1,
            q.question,
            q.follow_up_count,
            q.gap_filled_count,
        ));
        if q.remaining_gaps.is_empty() {
            questions.push_str(")\n");
        } else {
            questions.push_str(&format!(", still missing: {})\n", q.remaining_gaps.join(", ")));
        }
    }

    format!(
        "Interview results for candidate {candidate}:\n\
         aggregate {aggregate:.1}, theoretical {theoretical:.1}, speaking {speaking:.1}\n\n\
         {questions}\n\
         Give interview-level advice. Reply with JSON:\n\
         {{\"strengths\": [\"...\"], \"weaknesses\": [\"...\"], \
         \"study_topics\": [\"...\"], \"technique_tips\": [\"...\"]}}",
        candidate = context.candidate_id,
        aggregate = context.aggregate_score,
        theoretical = context.theoretical_avg,
        speaking = context.speaking_avg,
    )
}

/// Extract the JSON object from a model reply.
///
/// Handles fenced blocks (```` ```json ````) and bare objects surrounded by prose.
/// Returns `None` when no `{...}` span is found.
pub fn extract_json(response: &str) -> Option<&str> {
    if let Some(start) = response.find("```") {
        let after = &response[start + 3..];
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        if let Some(end) = body.find("```") {
            let block = body[..end].trim();
            if block.starts_with('{') {
                return Some(block);
            }
        }
    }

    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}

/// Strip quoting, labels, and surrounding whitespace from a free-text reply.
pub fn clean_text(response: &str) -> String {
    let trimmed = response.trim();
    let trimmed = trimmed
        .strip_prefix("Question:")
        .or_else(|| trimmed.strip_prefix("Follow-up:"))
        .unwrap_or(trimmed)
        .trim();
    trimmed.trim_matches('"').trim().to_string()
}
