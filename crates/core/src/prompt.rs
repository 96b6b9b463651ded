/// Merge the user instruction with the combined file context. With no
/// context the instruction goes out verbatim, which is what makes pure-text
/// Q&A (no uploads) work. No sanitization, no scrubbing.
pub fn assemble(instruction: &str, context: &str) -> String {
    if context.is_empty() {
        return instruction.to_string();
    }
    format!(
        "{instruction}\n\nContext from files:\n{}",
        context.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::assemble;

    #[test]
    fn empty_context_sends_the_instruction_verbatim() {
        assert_eq!(assemble("Summarize", ""), "Summarize");
    }

    #[test]
    fn context_is_embedded_in_the_fixed_template() {
        let prompt = assemble("Quiz me", "  page one text  ");
        assert_eq!(prompt, "Quiz me\n\nContext from files:\npage one text");
    }
}
