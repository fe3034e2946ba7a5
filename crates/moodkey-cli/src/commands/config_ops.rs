use std::fs;
use std::process;

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

pub fn settings_export() {
    print!("{}", moodkey_core::settings::default_toml());
}

pub fn settings_validate(file: &str) {
    let content = die!(fs::read_to_string(file), "Error reading {file}: {}");
    let s = die!(
        moodkey_core::settings::parse_settings_toml(&content),
        "Error: {}"
    );
    println!(
        "OK: suggestions.word_limit={}, suggestions.emoji_debounce_ms={}, generation.max_tokens={}, features.llm_replies={}",
        s.suggestions.word_limit,
        s.suggestions.emoji_debounce_ms,
        s.generation.max_tokens,
        s.features.llm_replies
    );
}
