//! Prompt templates for drafting, fusing, correcting and enriching letters

use crate::config::LetterSettings;

/// Rules every letter prompt repeats
const LETTER_FORMAT_RULES: &str = "\
- Do NOT include recipient details or a header with name, address or phone number.\n\
- Do NOT include a signature or a closing formula.\n\
- Return ONLY the body of the letter, without any extra formatting.";

/// Builds prompts for one target length and output language
#[derive(Debug, Clone)]
pub struct LetterPrompts {
    target_length: usize,
    language: String,
}

impl LetterPrompts {
    pub fn new(target_length: usize, language: impl Into<String>) -> Self {
        Self {
            target_length,
            language: language.into(),
        }
    }

    pub fn from_settings(settings: &LetterSettings) -> Self {
        Self::new(settings.target_length, settings.language.clone())
    }

    pub fn target_length(&self) -> usize {
        self.target_length
    }

    fn length_rule(&self) -> String {
        format!(
            "- Use EXACTLY {} characters including spaces, no more and no less.\n\
            - Write the letter in {}.",
            self.target_length, self.language
        )
    }

    pub fn formal(&self, program_context: &str, institution_context: &str, student_profile: &str) -> String {
        format!(
            "Write a formal, well-structured admission motivation letter for the student, \
            based on all the information collected.\n\
            \n\
            Program information:\n{}\n\
            \n\
            Institution information:\n{}\n\
            \n\
            Student profile:\n{}\n\
            \n\
            The letter must:\n\
            1. Follow a traditional professional format\n\
            2. Show clearly how the student meets the program requirements\n\
            3. Highlight academic, professional and volunteer achievements\n\
            4. Connect the student's background to the goals of the program\n\
            5. Have an introduction, body paragraphs and a conclusion\n\
            6. Use formal yet personal language\n\
            \n\
            IMPORTANT:\n{}\n{}\n\
            - Reuse specific terms from the program and institution descriptions.\n\
            \n\
            Focus on a convincing argument for why this student is qualified and will succeed in this program.",
            program_context,
            institution_context,
            student_profile,
            self.length_rule(),
            LETTER_FORMAT_RULES
        )
    }

    pub fn creative(&self, program_context: &str, institution_context: &str, student_profile: &str) -> String {
        format!(
            "Write an engaging, narrative admission motivation letter for the student, \
            based on all the information collected.\n\
            \n\
            Program information:\n{}\n\
            \n\
            Institution information:\n{}\n\
            \n\
            Student profile:\n{}\n\
            \n\
            The letter must:\n\
            1. Open with a captivating introduction\n\
            2. Tell a convincing story of the student's academic, professional and volunteer path\n\
            3. Use vivid examples and specific anecdotes\n\
            4. Show the student's passion and unique qualities\n\
            5. Demonstrate knowledge of the program while keeping a personal tone\n\
            6. End with a memorable conclusion\n\
            \n\
            IMPORTANT:\n{}\n{}\n\
            - Refer to the learning environment, values or reputation of the institution.\n\
            \n\
            Focus on an authentic, memorable letter that reveals the person behind the application.",
            program_context,
            institution_context,
            student_profile,
            self.length_rule(),
            LETTER_FORMAT_RULES
        )
    }

    pub fn fusion(&self, formal_letter: &str, creative_letter: &str) -> String {
        format!(
            "Analyze the two versions of the motivation letter below and write an optimized final version.\n\
            \n\
            Version 1 (formal):\n{}\n\
            \n\
            Version 2 (creative):\n{}\n\
            \n\
            Your task:\n\
            1. Identify the strengths of each letter\n\
            2. Pick the most effective structure, tone and approach\n\
            3. Combine the best elements of both letters\n\
            4. Make sure the final letter is coherent, convincing and authentic\n\
            \n\
            IMPORTANT:\n{}\n{}\n\
            \n\
            The letter must read as one coherent whole, not as disparate pieces.",
            formal_letter,
            creative_letter,
            self.length_rule(),
            LETTER_FORMAT_RULES
        )
    }

    /// Rewrite request for a letter that is too long
    pub fn shorten(&self, letter: &str, current_length: usize) -> String {
        format!(
            "Here is a motivation letter that is too long ({} characters).\n\
            Shorten it to EXACTLY {} characters (including spaces) \
            while keeping its key points and quality.\n\
            Return only the rewritten letter, in {}.\n\
            \n\
            Letter to shorten:\n{}",
            current_length, self.target_length, self.language, letter
        )
    }

    /// Rewrite request for a letter that is too short
    pub fn expand(&self, letter: &str, current_length: usize) -> String {
        format!(
            "Here is a motivation letter that is too short ({} characters).\n\
            Expand it to EXACTLY {} characters (including spaces) by adding relevant details, \
            concrete examples or specific references to the program or institution. \
            Keep the same tone and style.\n\
            Return only the rewritten letter, in {}.\n\
            \n\
            Letter to expand:\n{}",
            current_length, self.target_length, self.language, letter
        )
    }
}

pub fn program_enrichment(basic_info: &str) -> String {
    format!(
        "Here is information extracted from a Parcoursup program page:\n{}\n\
        \n\
        Analyze it and enrich it by:\n\
        1. Identifying the keywords of the field of study\n\
        2. Extracting the specific skills sought\n\
        3. Noting the distinctive elements of the program\n\
        4. Spotting which aspects of the curriculum are emphasized\n\
        5. Identifying the values and philosophy of the program\n\
        \n\
        Stay factual and rely only on what is provided. \
        Structure the result so it is easy to use in a motivation letter.",
        basic_info
    )
}

pub fn institution_enrichment(basic_info: &str) -> String {
    format!(
        "Here is information extracted from the website of a higher education institution:\n{}\n\
        \n\
        Analyze it and enrich it by:\n\
        1. Identifying the reputation and strengths of the institution\n\
        2. Extracting its values and culture\n\
        3. Noting partnerships, projects or notable achievements\n\
        4. Spotting unique opportunities offered to students\n\
        5. Identifying characteristic wording the institution uses\n\
        \n\
        Stay factual and rely only on what is provided. \
        Structure the result so it is easy to use in a motivation letter.",
        basic_info
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_prompts_embed_context_and_length() {
        let prompts = LetterPrompts::new(1490, "French");
        let formal = prompts.formal("BUT Informatique", "IUT de Lyon", "Question: Why?\nAnswer: Because");

        assert!(formal.contains("BUT Informatique"));
        assert!(formal.contains("IUT de Lyon"));
        assert!(formal.contains("Answer: Because"));
        assert!(formal.contains("EXACTLY 1490 characters"));
        assert!(formal.contains("in French"));

        let creative = prompts.creative("p", "i", "s");
        assert!(creative.contains("narrative"));
        assert!(creative.contains("EXACTLY 1490 characters"));
    }

    #[test]
    fn test_fusion_prompt_contains_both_drafts() {
        let prompts = LetterPrompts::new(1490, "French");
        let prompt = prompts.fusion("FORMAL-BODY", "CREATIVE-BODY");
        assert!(prompt.contains("FORMAL-BODY"));
        assert!(prompt.contains("CREATIVE-BODY"));
    }

    #[test]
    fn test_correction_prompts_embed_original_text() {
        let prompts = LetterPrompts::new(100, "English");

        let shorten = prompts.shorten("long letter", 180);
        assert!(shorten.contains("too long (180 characters)"));
        assert!(shorten.contains("EXACTLY 100 characters"));
        assert!(shorten.ends_with("long letter"));

        let expand = prompts.expand("short letter", 40);
        assert!(expand.contains("too short (40 characters)"));
        assert!(expand.ends_with("short letter"));
    }

    #[test]
    fn test_enrichment_prompts_embed_basic_info() {
        assert!(program_enrichment("Program: Licence Droit").contains("Program: Licence Droit"));
        assert!(institution_enrichment("Institution: Sorbonne").contains("Institution: Sorbonne"));
    }
}
