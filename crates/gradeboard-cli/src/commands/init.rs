//! The `gradeboard init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("gradeboard.toml").exists() {
        println!("gradeboard.toml already exists, skipping.");
    } else {
        std::fs::write("gradeboard.toml", SAMPLE_CONFIG)?;
        println!("Created gradeboard.toml");
    }

    std::fs::create_dir_all("data")?;
    let corpus_path = Path::new("data/corpus.json");
    if corpus_path.exists() {
        println!("data/corpus.json already exists, skipping.");
    } else {
        std::fs::write(corpus_path, SAMPLE_CORPUS)?;
        println!("Created data/corpus.json");
    }

    println!("\nNext steps:");
    println!("  1. Replace data/corpus.json with your questions and model answers");
    println!("  2. Run: gradeboard login --name <your name>");
    println!("  3. Run: gradeboard grade --batch 1 --question 0 --model ModelA --grade correct");
    println!("  4. Run: gradeboard metrics");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# gradeboard configuration

corpus = "data/corpus.json"
# reviewer = "Your Name"
admin_pin = "${GRADEBOARD_ADMIN_PIN}"

[store]
type = "file"
path = "global_grades.json"

# Shared REST key-value store instead of a local file:
# [store]
# type = "rest_kv"
# url = "https://your-kv.example.com"
# token = "${GRADEBOARD_KV_TOKEN}"
# key = "bns_eval_data_v2"

[sync]
poll_interval_ms = 5000
debounce_ms = 1000
edit_grace_ms = 5000
"#;

const SAMPLE_CORPUS: &str = r#"[
  {
    "batchId": 1,
    "questions": [
      "What is the punishment for theft?",
      "Which section defines criminal conspiracy?"
    ],
    "modelAnswers": {
      "ModelA": [
        "Imprisonment of up to three years, or fine, or both.",
        "Section 61."
      ],
      "ModelB": [
        "Theft is punishable with a fine only.",
        ""
      ]
    }
  }
]
"#;
