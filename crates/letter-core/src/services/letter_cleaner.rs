//! Removal of letter furniture (placeholders, recipient block, formulas)
//! before a letter is shown or exported

use once_cell::sync::Lazy;
use regex::Regex;

static REMOVAL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Header placeholders such as "[Votre Nom et Prénom]" or "[Date]"
        r"(?im)^[ \t]*\[(votre|your|date|signature)[^\]\n]*\].*$\n?",
        r"(?im)^.*\b(objet|subject)\s*:.*$\n?",
        r"(?im)^.*à l'attention de.*$\n?",
        r"(?im)^.*service des admissions.*$\n?",
        r"(?im)^[ \t]*(madame,?\s*monsieur|dear sir or madam|to whom it may concern)[ \t]*,?[ \t]*$\n?",
        r"(?im)^.*\b(cordialement|sincerely|best regards|yours faithfully)\s*,.*$\n?",
        r"(?ims)^[^\n]*veuillez agréer.*?distinguées\.",
        r"(?ims)^[^\n]*dans l'attente de.*?distinguées\.",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Failed to compile letter cleaning regex"))
    .collect()
});

static BLANK_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("Failed to compile blank line regex"));

/// Letter body without header, recipient lines, salutation or closing formula
pub fn clean_letter_text(letter: &str) -> String {
    let mut cleaned = letter.replace("\r\n", "\n");
    for pattern in REMOVAL_PATTERNS.iter() {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }
    BLANK_RUN_RE.replace_all(&cleaned, "\n\n").trim().to_string()
}
