use std::fs;
use std::path::Path;
use std::process;

use moodkey_core::dict::{BigramIndex, DictError};

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

/// Read the JSON asset and write the compiled `MKBG` snapshot.
pub fn compile_index(input: &Path, output: &Path) -> Result<BigramIndex, DictError> {
    let json = fs::read_to_string(input)?;
    let index = BigramIndex::from_json(&json)?;
    index.save(output)?;
    Ok(index)
}

pub fn compile(input_json: &str, output_file: &str) {
    eprintln!("Parsing {input_json}...");
    let index = die!(
        compile_index(Path::new(input_json), Path::new(output_file)),
        "Error compiling dictionary: {}"
    );
    let file_size = fs::metadata(output_file).map(|m| m.len()).unwrap_or(0);
    eprintln!(
        "Wrote {output_file}: {} words, {} pairs ({:.1} KB)",
        index.len(),
        index.pair_count(),
        file_size as f64 / 1024.0
    );
}

pub fn info(file: &str) {
    let compiled = fs::read(file)
        .ok()
        .is_some_and(|b| b.starts_with(b"MKBG"));
    let index = die!(BigramIndex::open(Path::new(file)), "Error reading {file}: {}");
    let format = if compiled { "compiled" } else { "json" };
    println!("Format: {format}");
    println!("Previous words: {}", index.len());
    println!("Pairs: {}", index.pair_count());
}

pub fn suggest(file: &str, word: &str, limit: usize) {
    let index = die!(BigramIndex::open(Path::new(file)), "Error reading {file}: {}");
    let words = index.suggest(word, limit);
    if words.is_empty() {
        println!("(no suggestions for '{word}')");
        return;
    }
    for (i, w) in words.iter().enumerate() {
        println!("{:>2}. {w}", i + 1);
    }
}
