//! Prompt assembly for the generation agent.

use std::path::Path;

/// Inputs for one candidate's agent prompt.
#[derive(Debug, Clone)]
pub struct PromptInput<'a> {
    pub intent: &'a str,
    pub clarification: Option<&'a str>,
    pub output_dir: &'a Path,
    pub candidate_id: &'a str,
}

/// Build the instruction prompt handed to the agent subprocess.
///
/// The agent is told exactly which three files to produce and where; the
/// artifact locator tolerates agents that ignore the location anyway.
pub fn build_agent_prompt(input: &PromptInput<'_>) -> String {
    let clarification = input
        .clarification
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| format!("Clarification: {c}"))
        .unwrap_or_else(|| "Clarification: none".to_string());
    let output_dir = input.output_dir.display();

    [
        "You are implementing one candidate for Toolforge.".to_string(),
        format!("Candidate ID: {}", input.candidate_id),
        String::new(),
        "Build a small Python CLI tool based on this request.".to_string(),
        format!("User intent: {}", input.intent),
        clarification,
        String::new(),
        "You MUST create exactly these files:".to_string(),
        format!("1. {output_dir}/tool.py"),
        format!("2. {output_dir}/manifest.json"),
        format!("3. {output_dir}/smoke_test.py"),
        String::new(),
        "Requirements:".to_string(),
        "- tool.py must be runnable with python3 and use argparse.".to_string(),
        "- If external API access is required, use OPENAI_API_KEY from env.".to_string(),
        "- Keep dependencies standard-library only when possible.".to_string(),
        "- smoke_test.py must run fast and exit 0 when tool.py is healthy.".to_string(),
        "- manifest.json must be valid JSON with keys:".to_string(),
        "  name (kebab-case), description, version (\"1.0.0\"), runtime (\"python\"), entrypoint (\"tool.py\"), examples (array of strings), arguments (array).".to_string(),
        String::new(),
        "After writing files, print DONE.".to_string(),
        "Do not ask follow-up questions.".to_string(),
    ]
    .join("\n")
}
