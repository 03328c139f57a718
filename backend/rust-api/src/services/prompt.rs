use crate::models::hint::{HintLevel, SourcePassage};

pub const NO_CONTEXT_FOUND: &str = "No relevant documents found.";

/// System and user message for one hint request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintPrompt {
    pub system: String,
    pub user: String,
}

pub struct PromptInput<'a> {
    pub question: &'a str,
    pub context: &'a str,
    pub lab_context: Option<&'a str>,
    pub lab_id: Option<u32>,
    pub level: HintLevel,
}

/// Joins retrieved passages the way they are shown to the model.
pub fn join_context(passages: &[SourcePassage]) -> String {
    if passages.is_empty() {
        return NO_CONTEXT_FOUND.to_string();
    }
    passages
        .iter()
        .map(|p| p.content.trim())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_hint_prompt(input: &PromptInput<'_>) -> HintPrompt {
    let level = input.level;

    let system = format!(
        "You are a tutor for IT administration and cybersecurity.\n\
         You help students with lab exercises by giving progressive hints.\n\
         \n\
         CURRENT HINT LEVEL: {number} ({name})\n\
         INSTRUCTION: {instruction}\n\
         \n\
         IMPORTANT:\n\
         - Be precise and clear\n\
         - Give ONLY information that matches the current level\n\
         - If the context is not sufficient, say so honestly\n\
         - Use EXACTLY the IPs, subnets and gateways from the context\n\
         - Do NOT invent values that are not in the context or the course material\n\
         - If information is missing, say: \"This information is not in the course material\"\n\
         - KEEP variable notation such as 192.168.x.0 instead of concrete IPs\n\
         - Explain that x is the student's lab ID (student03 -> x=3)\n\
         - If the student states their lab context, replace x with their number",
        number = level.number(),
        name = level.name(),
        instruction = level.prompt_instruction(),
    );

    let lab_context = input
        .lab_context
        .map(str::trim)
        .filter(|ctx| !ctx.is_empty())
        .unwrap_or("No specific lab context provided");

    let mut user = format!(
        "STUDENT QUESTION:\n{question}\n\
         \n\
         CONTEXT FROM THE KNOWLEDGE BASE (clearly mark anything you use from elsewhere as -not from the knowledge base-):\n{context}\n\
         \n\
         LAB CONTEXT:\n{lab_context}\n",
        question = input.question.trim(),
        context = input.context,
        lab_context = lab_context,
    );

    if let Some(lab_id) = input.lab_id {
        user.push_str(&format!("\nSTUDENT LAB ID: x = {}\n", lab_id));
    }

    user.push_str(&format!(
        "\nGive a hint at level {} ({}).",
        level.number(),
        level.name()
    ));

    HintPrompt { system, user }
}
