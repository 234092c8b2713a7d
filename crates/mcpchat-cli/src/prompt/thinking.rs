use rand::seq::SliceRandom;

const THINKING_MESSAGES: &[&str] = &[
    "Thinking",
    "Pondering",
    "Consulting the model",
    "Weighing the options",
    "Gathering thoughts",
    "Reading between the lines",
    "Connecting the dots",
    "Working it out",
];

pub fn get_random_thinking_message() -> &'static str {
    THINKING_MESSAGES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("Thinking")
}
