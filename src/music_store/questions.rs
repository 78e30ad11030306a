//! The onboarding questionnaire a fresh database starts with.

use super::models::NewQuestion;

fn question(question_order: u32, text: &str, kind: &str, options: &[&str]) -> NewQuestion {
    NewQuestion {
        question_order,
        text: text.to_string(),
        kind: kind.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
    }
}

pub fn default_questions() -> Vec<NewQuestion> {
    vec![
        question(
            1,
            "What are you usually doing while listening to music?",
            "select",
            &[
                "Studying 📚",
                "Working out 🏃",
                "Driving 🚗",
                "Walking 🚶",
                "Relaxing ☕",
                "Gaming 🎮",
                "Cooking 🍳",
                "Before sleep 🌙",
            ],
        ),
        question(
            2,
            "Which genres do you like? (pick as many as you want)",
            "multi-select",
            &[
                "Classic Rock",
                "Blues",
                "Metalcore",
                "Punk",
                "J-Pop",
                "Anime",
                "Indie Folk",
                "Vocal Jazz",
                "Art Pop",
                "Avant-Garde",
                "Baroque Pop",
            ],
        ),
        question(
            3,
            "Which mood are the songs you usually listen to in?",
            "select",
            &[
                "Happiness 😃",
                "Sadness 😔",
                "Battle ⚔️",
                "Fear 😨",
                "Calm 😌",
                "Energy ⚡",
                "Love ❤️",
            ],
        ),
    ]
}
