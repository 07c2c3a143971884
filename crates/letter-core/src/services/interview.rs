//! Student interview: fixed questions, reusable and default answers

use letter_types::InterviewResponse;

pub const INTERVIEW_QUESTIONS: [&str; 8] = [
    "Could you tell me about your academic background so far?",
    "Which of your skills or experiences do you think match this program?",
    "Why are you interested in this specific program?",
    "How does this program fit into your career plans?",
    "Which personal qualities do you think you would bring to this program?",
    "Are there achievements or projects you are particularly proud of?",
    "Have you had to overcome significant challenges along the way?",
    "Can you tell me about professional, associative or volunteer experiences relevant to this application?",
];

pub const DEFAULT_ANSWERS: [&str; 8] = [
    "I obtained a scientific baccalaureate with honours. I am currently in a scientific preparatory class studying mathematics, physics and computer science.",
    "I have developed solid analytical skills and the ability to solve complex problems. I also took part in several software projects that strengthened my programming and teamwork skills.",
    "This program appeals to me for its multidisciplinary approach and its reputation for excellence. Combining theory and practice matches the way I learn best.",
    "This program fits my plan to become a data engineer. The skills I will develop here will open a career in a constantly evolving field.",
    "I am rigorous, persevering and highly adaptable. I am also curious and always eager to learn new things.",
    "I built a mobile application that won a prize in a student competition. The project let me apply theory in practice and develop my project management skills.",
    "I had to balance my studies with a part-time job to fund my education. It taught me to manage my time efficiently and to stay determined when facing difficulties.",
    "I was an active member of my school's computer club, where I ran programming workshops. I also completed a three-month internship at a software company, helping build a web application.",
];

/// Where an interview answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    /// Typed by the student
    Student,
    /// Reused from a resumed session
    Previous,
    /// Predefined answer
    Default,
}

/// The person being interviewed
pub trait Respondent {
    /// Answer to `question`, or `None` if input could not be read
    fn ask(&mut self, question: &str) -> Option<String>;

    /// Called for answers that were not typed by the student
    fn answered_for(&mut self, _question: &str, _answer: &str, _source: AnswerSource) {}
}

/// Ask every question in order.
///
/// Answers from `previous` are reused by position; remaining questions get the
/// default answer when `use_defaults` is set, or when the student's answer is
/// empty or unreadable.
pub fn conduct<R: Respondent>(
    previous: &[InterviewResponse],
    use_defaults: bool,
    respondent: &mut R,
) -> Vec<InterviewResponse> {
    INTERVIEW_QUESTIONS
        .iter()
        .zip(DEFAULT_ANSWERS.iter())
        .enumerate()
        .map(|(i, (question, default))| {
            let (answer, source) = match previous.get(i) {
                Some(response) => (response.answer.clone(), AnswerSource::Previous),
                None if use_defaults => (default.to_string(), AnswerSource::Default),
                None => match respondent.ask(question) {
                    Some(answer) if !answer.trim().is_empty() => {
                        (answer.trim().to_string(), AnswerSource::Student)
                    }
                    _ => (default.to_string(), AnswerSource::Default),
                },
            };

            if source != AnswerSource::Student {
                respondent.answered_for(question, &answer, source);
            }

            InterviewResponse {
                question: question.to_string(),
                answer,
            }
        })
        .collect()
}

/// `Question: …\nAnswer: …` blocks separated by a blank line
pub fn student_profile(responses: &[InterviewResponse]) -> String {
    responses
        .iter()
        .map(|r| format!("Question: {}\nAnswer: {}", r.question, r.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}
