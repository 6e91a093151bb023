//! # Agent Instruction Template
//!
//! Renders the system instructions sent to the realtime agent at session
//! start. The template is personalized with the candidate's name, the role's
//! job description and question bank, and the candidate's resume.

/// Instruction template with `$placeholder` slots filled at session start.
const INSTRUCTIONS_TEMPLATE: &str = "\
You are a professional technical interviewer conducting a screening \
interview for a $skill_set position. Speak in a clear, friendly and \
professional tone.

The candidate's name is $candidate_name. Greet them by name, briefly \
introduce the role, then move into the interview.

Job description for the role:
$job_description

Candidate resume:
$candidate_resume

Work through the following questions one at a time. Ask follow-up \
questions when an answer is vague or incomplete, but keep the interview \
moving. Do not reveal the full question list to the candidate.
$important_questions

When every question has been covered, thank the candidate, tell them the \
team will follow up with next steps, and end the conversation.";

/// Everything needed to render the agent instructions for one session.
#[derive(Debug, Clone)]
pub struct InstructionContext {
    pub candidate_name: String,
    pub skill_set: String,
    pub job_description: String,
    pub candidate_resume: String,
    pub important_questions: String,
}

/// Render the instruction template for a session.
pub fn build_instructions(ctx: &InstructionContext) -> String {
    INSTRUCTIONS_TEMPLATE
        .replace("$candidate_name", &ctx.candidate_name)
        .replace("$skill_set", &ctx.skill_set)
        .replace("$job_description", &ctx.job_description)
        .replace("$candidate_resume", &ctx.candidate_resume)
        .replace("$important_questions", &ctx.important_questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_placeholders_filled() {
        let ctx = InstructionContext {
            candidate_name: "Jordan".to_string(),
            skill_set: "rust".to_string(),
            job_description: "Build services.".to_string(),
            candidate_resume: "Systems background.".to_string(),
            important_questions: "1. Explain ownership".to_string(),
        };
        let rendered = build_instructions(&ctx);
        assert!(rendered.contains("Jordan"));
        assert!(rendered.contains("rust position"));
        assert!(rendered.contains("Build services."));
        assert!(rendered.contains("1. Explain ownership"));
        assert!(!rendered.contains('$'));
    }
}
