//! Prompt rendering for explanation requests

use super::types::Language;
use minijinja::{Environment, context};

/// Instruction template; the model is asked to answer under three fixed headers
const PROMPT_TEMPLATE: &str = r#"You are an assistant that explains code for learners. Given the user code and language below, return three clearly separated sections delimited by the headers exactly as shown:

### Explanation
A short plain-language explanation (2-6 sentences) of what the code does, aimed at a beginner.

### Errors
A short bullet list of likely bugs, runtime errors, or edge cases. If none, write "None".

### Improved Code
A cleaned and (if needed) fixed version of the code. Keep it concise and idiomatic for the language. Include minimal inline comments if helpful.

User language: {{ language }}
User code:

{{ code }}

Example format:
### Explanation
This code calculates the factorial of a number using recursion.

### Errors
- No input validation; will crash on negative numbers
- Stack overflow risk for large numbers

### Improved Code
def factorial(n):
    if n < 0:
        raise ValueError("Factorial not defined for negative numbers")
    return 1 if n <= 1 else n * factorial(n - 1)
"#;

/// Renders the instruction prompt
///
/// Wraps minijinja with strict undefined handling. No auto-escaping is
/// configured, so the snippet is substituted verbatim.
pub struct PromptBuilder {
    env: Environment<'static>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| minijinja::AutoEscape::None);
        Self { env }
    }

    /// Render the prompt for `code` written in `language`
    pub fn build(&self, language: Language, code: &str) -> Result<String, minijinja::Error> {
        self.env.render_str(
            PROMPT_TEMPLATE,
            context! {
                language => language.as_str(),
                code => code,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_includes_language() {
        let prompt = PromptBuilder::new()
            .build(Language::Python, "print(\"hello\")")
            .unwrap();
        assert!(prompt.contains("User language: python"));
        assert!(prompt.contains("print(\"hello\")"));

        let prompt = PromptBuilder::new().build(Language::Cpp, "int x;").unwrap();
        assert!(prompt.contains("User language: cpp"));
    }

    #[test]
    fn test_prompt_includes_markers() {
        let prompt = PromptBuilder::new().build(Language::Python, "x = 1").unwrap();
        assert!(prompt.contains("### Explanation"));
        assert!(prompt.contains("### Errors"));
        assert!(prompt.contains("### Improved Code"));
    }

    #[test]
    fn test_code_is_substituted_verbatim() {
        let builder = PromptBuilder::new();
        let samples = [
            "def factorial(n):\n    return 1 if n <= 1 else n * factorial(n-1)",
            "template <typename T> bool lt(T a, T b) { return a < b && \"x\" != \"y\"; }",
            "print('{{ not_a_variable }}') # {% raw %}",
            "s = '<script>alert(1)</script> & \"quotes\"'",
        ];
        for code in samples {
            let prompt = builder.build(Language::Python, code).unwrap();
            assert!(prompt.contains(code), "code was altered: {}", code);
        }
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let builder = PromptBuilder::new();
        let a = builder.build(Language::Cpp, "int main() {}").unwrap();
        let b = builder.build(Language::Cpp, "int main() {}").unwrap();
        assert_eq!(a, b);
    }
}
