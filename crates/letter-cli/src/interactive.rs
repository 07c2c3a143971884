//! Interactive generation flow

use anyhow::Context;
use letter_core::services::interview::{self, AnswerSource, Respondent};
use letter_core::{
    paths, ContextEnricher, GeminiClient, JsonUsageStore, LetterConfig, LetterPipeline,
    LetterRequest, QuotaGuardedGenerator, QuotaManager, SessionStore, WebScraper,
};
use letter_core::services::clean_letter_text;
use letter_types::{InterviewResponse, PersonalInfo, SessionData};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::report;

pub struct GenerateOptions {
    pub program_url: Option<String>,
    pub institution_url: Option<String>,
    pub use_defaults: bool,
}

/// Line-based prompts over any reader and writer
pub struct Terminal<R, W> {
    input: R,
    output: W,
}

impl Terminal<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Terminal<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, text: &str) {
        let _ = writeln!(self.output, "{}", text);
    }

    /// Trimmed answer, `None` at end of input or on a read error
    pub fn prompt(&mut self, prompt: &str) -> Option<String> {
        let _ = write!(self.output, "{}", prompt);
        let _ = self.output.flush();

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim().to_string()),
            Err(e) => {
                log::warn!("Failed to read input: {}", e);
                None
            }
        }
    }

    pub fn confirm(&mut self, prompt: &str) -> bool {
        self.prompt(prompt)
            .map(|answer| matches!(answer.to_lowercase().as_str(), "y" | "yes" | "o" | "oui"))
            .unwrap_or(false)
    }
}

impl<R: BufRead, W: Write> Respondent for Terminal<R, W> {
    fn ask(&mut self, question: &str) -> Option<String> {
        self.say(&format!("\nInterviewer: {}", question));
        self.prompt("You: ")
    }

    fn answered_for(&mut self, question: &str, answer: &str, source: AnswerSource) {
        let label = match source {
            AnswerSource::Previous => "previous answer",
            _ => "predefined answer",
        };
        self.say(&format!("\nInterviewer: {}\nYou ({}): {}", question, label, answer));
    }
}

pub fn confirm(prompt: &str) -> bool {
    Terminal::stdio().confirm(prompt)
}

/// Let the applicant pick a saved session; `None` starts a new one
pub fn choose_session<R: BufRead, W: Write>(
    terminal: &mut Terminal<R, W>,
    store: &SessionStore,
) -> Option<SessionData> {
    let sessions = match store.list() {
        Ok(sessions) => sessions,
        Err(e) => {
            log::warn!("Could not list sessions: {}", e);
            return None;
        }
    };
    if sessions.is_empty() {
        terminal.say("No previous session found.");
        return None;
    }

    terminal.say("\n--- PREVIOUS SESSIONS ---\n0. Start a new session");
    terminal.say(report::session_list(&sessions).trim_end());

    let choice = terminal.prompt(&format!("\nChoose an option (0-{}): ", sessions.len()))?;
    match choice.parse::<usize>() {
        Ok(0) => None,
        Ok(n) if n <= sessions.len() => {
            let summary = &sessions[n - 1];
            let data = store.load(&summary.session_id);
            match &data {
                Some(_) => terminal.say(&format!("Session '{}' loaded.", summary.username)),
                None => terminal.say("Could not load the session, starting a new one."),
            }
            data
        }
        _ => {
            terminal.say("Invalid choice, starting a new session.");
            None
        }
    }
}

pub fn ask_personal_info<R: BufRead, W: Write>(terminal: &mut Terminal<R, W>) -> PersonalInfo {
    terminal.say("\n--- PERSONAL INFORMATION ---");
    PersonalInfo {
        name: terminal.prompt("Full name: ").unwrap_or_default(),
        email: terminal.prompt("Email: ").unwrap_or_default(),
        phone: terminal.prompt("Phone number: ").unwrap_or_default(),
        address: terminal.prompt("Address: ").unwrap_or_default(),
    }
}

/// Write the letter to `<name>.txt` in `dir`
pub fn save_letter(dir: &Path, requested_name: &str, letter: &str) -> io::Result<PathBuf> {
    let path = dir.join(paths::letter_file_name(requested_name));
    std::fs::write(&path, letter)?;
    Ok(path)
}

fn offer_letter_export<R: BufRead, W: Write>(terminal: &mut Terminal<R, W>, letter: &str) {
    if !terminal.confirm("\nSave this letter to a file? (y/n): ") {
        return;
    }
    let name = terminal.prompt("File name: ").unwrap_or_default();
    match save_letter(Path::new("."), &name, letter) {
        Ok(path) => terminal.say(&format!("Letter saved to {}", path.display())),
        Err(e) => terminal.say(&format!("The letter could not be saved: {}", e)),
    }
}

/// Run the interview, reusing `previous` answers unless the applicant wants to
/// update them. A fresh interview offers the predefined answers first.
pub fn interview_answers<R: BufRead, W: Write>(
    terminal: &mut Terminal<R, W>,
    previous: Option<&[InterviewResponse]>,
    use_defaults: bool,
) -> Vec<InterviewResponse> {
    if let Some(previous) = previous {
        if !terminal.confirm("\nUpdate your previous answers? (y/n): ") {
            return interview::conduct(previous, use_defaults, terminal);
        }
    }

    let use_defaults =
        use_defaults || terminal.confirm("\nUse predefined answers for the interview? (y/n): ");
    interview::conduct(&[], use_defaults, terminal)
}

pub async fn generate(config: &LetterConfig, options: GenerateOptions) -> anyhow::Result<()> {
    let mut terminal = Terminal::stdio();

    let store = Arc::new(JsonUsageStore::new(config.storage.usage_file_path()));
    let quota = Arc::new(QuotaManager::new(store, config.quota.clone()));
    if let Some(warning) = report::recent_quota_warning(&quota) {
        terminal.say(&format!("\n{}", warning));
    }

    let sessions = SessionStore::new(config.storage.sessions_dir_path());
    let previous = choose_session(&mut terminal, &sessions);

    terminal.say("\nTo generate a motivation letter, provide the following information:");
    let program_url = match options.program_url {
        Some(url) => url,
        None => terminal.prompt("Parcoursup program URL: ").unwrap_or_default(),
    };
    let institution_url = match options.institution_url {
        Some(url) => url,
        None => terminal.prompt("Institution website URL: ").unwrap_or_default(),
    };

    let gemini = Arc::new(GeminiClient::new(&config.gemini)?);
    let scraper = WebScraper::new(&config.scraper)?;
    let enricher = ContextEnricher::new(scraper, QuotaGuardedGenerator::new(gemini.clone(), quota.clone()));

    terminal.say("\nLooking up the program and the institution...");
    let context = enricher.gather(&program_url, &institution_url).await;

    let (personal_info, responses, session_id) = match previous {
        Some(data) => {
            let session_id = data.session_id().map(str::to_string);
            let responses =
                interview_answers(&mut terminal, Some(&data.interview_responses), options.use_defaults);
            (data.personal_info, responses, session_id)
        }
        None => {
            let personal_info = ask_personal_info(&mut terminal);
            let responses = interview_answers(&mut terminal, None, options.use_defaults);
            (personal_info, responses, None)
        }
    };
    let student_profile = interview::student_profile(&responses);

    terminal.say("\nGenerating the formal, creative and final letters...");
    let pipeline = LetterPipeline::new(gemini, quota.clone(), &config.letter);
    let letters = pipeline
        .run(&LetterRequest {
            program_context: context.program_context.clone(),
            institution_context: context.institution_context.clone(),
            student_profile: student_profile.clone(),
        })
        .await?;

    let mut session = SessionData {
        personal_info,
        program_context: context.program_context,
        institution_context: context.institution_context,
        student_info: student_profile,
        interview_responses: responses,
        letters,
        program_info: context.program_info,
        institution_info: context.institution_info,
        metadata: None,
    };
    let session_id = sessions
        .save(&mut session, session_id.as_deref())
        .context("Failed to save the session")?;
    terminal.say(&format!("\nYour information was saved in session {}", session_id));

    let cleaned = clean_letter_text(&session.letters.final_letter);
    terminal.say("\n########################\n## Your motivation letter\n########################\n");
    terminal.say(&cleaned);
    terminal.say(&format!(
        "\n({} characters before cleaning)",
        session.letters.final_letter.chars().count()
    ));

    offer_letter_export(&mut terminal, &cleaned);
    Ok(())
}
