use clap::{Parser, Subcommand};

use moodkey_cli::commands::{config_ops, dict_ops, replay_ops, text_ops};

#[derive(Parser)]
#[command(name = "moodtool", about = "Moodkey keyboard developer tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile the bigram JSON asset into the binary snapshot format
    Compile {
        /// Input JSON file ({"bigrams": {prev: {next: count}}})
        input_json: String,
        /// Output file
        output_file: String,
    },
    /// Show dictionary info (JSON or compiled, auto-detected by magic bytes)
    Info {
        /// Dictionary file
        file: String,
    },
    /// List follow-up words for a previous word
    Suggest {
        /// Dictionary file
        dict_file: String,
        /// Previous word
        word: String,
        /// Maximum number of suggestions
        #[arg(short, long, default_value = "3")]
        n: usize,
    },
    /// Strip Markdown code fences from model output
    Clean {
        /// Input file (default: stdin)
        file: Option<String>,
    },
    /// Render a generation prompt
    Prompt {
        #[command(subcommand)]
        kind: PromptKind,
    },
    /// Run a scripted key sequence through a session and print JSONL frames
    Replay {
        /// Script file (one command per line)
        script: String,
        /// Dictionary file for word suggestions (optional)
        #[arg(long)]
        dict: Option<String>,
        /// Settings TOML overriding the defaults (optional)
        #[arg(long)]
        settings: Option<String>,
    },
    /// Export default settings as TOML
    SettingsExport,
    /// Validate a custom settings TOML file
    SettingsValidate {
        /// Path to the TOML file
        file: String,
    },
}

#[derive(Subcommand)]
enum PromptKind {
    /// Tone rewrite prompt
    Rewrite {
        /// soften, friendlier, formal or energetic
        #[arg(long)]
        tone: String,
        /// Emotion tag (HAPPY, SAD, SURPRISED, ANGRY, NEUTRAL)
        #[arg(long, default_value = "NEUTRAL")]
        emotion: String,
        /// Forbid emojis in the rewrite
        #[arg(long)]
        no_emojis: bool,
        /// Text to rewrite
        text: String,
    },
    /// Reply suggestion prompt
    Reply {
        /// Emotion tag detected on the other side
        #[arg(long, default_value = "NEUTRAL")]
        emotion: String,
        /// Conversation lines, oldest first
        #[arg(required = true)]
        messages: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Compile {
            input_json,
            output_file,
        } => dict_ops::compile(&input_json, &output_file),
        Command::Info { file } => dict_ops::info(&file),
        Command::Suggest { dict_file, word, n } => dict_ops::suggest(&dict_file, &word, n),
        Command::Clean { file } => text_ops::clean(file.as_deref()),
        Command::Prompt { kind } => match kind {
            PromptKind::Rewrite {
                tone,
                emotion,
                no_emojis,
                text,
            } => text_ops::prompt_rewrite(&tone, &emotion, !no_emojis, &text),
            PromptKind::Reply { emotion, messages } => text_ops::prompt_reply(&emotion, messages),
        },
        Command::Replay {
            script,
            dict,
            settings,
        } => replay_ops::replay(&script, dict.as_deref(), settings.as_deref()),
        Command::SettingsExport => config_ops::settings_export(),
        Command::SettingsValidate { file } => config_ops::settings_validate(&file),
    }
}
