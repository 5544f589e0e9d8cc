#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use gemi_archive::config::{parse_config, Config};
use tempfile::TempDir;

pub const CORPUS: &str = r#"[
  {
    "identifier": "babbage_1864",
    "title": "Passages from the Life of a Philosopher",
    "year": 1864,
    "creator": "Babbage, Charles, 1791-1871",
    "topic": "calculating_machines",
    "language_code": "en",
    "char_count": 5000,
    "filename": "babbage_1864.txt",
    "added_at": "2024-01-02T00:00:00Z"
  },
  {
    "identifier": "vaucanson_1738",
    "title": "Le mécanisme du flûteur automate",
    "year": 1738,
    "topic": "automata",
    "language_code": "fr",
    "char_count": 12000,
    "filename": "vaucanson_1738.txt",
    "has_translation": true,
    "translation_filename": "vaucanson_1738_en.txt",
    "added_at": "2024-03-01T00:00:00Z"
  },
  {
    "identifier": "turing_1950",
    "title": "Computing Machinery and Intelligence",
    "year": 1950,
    "topic": "computing",
    "language_code": "en",
    "char_count": 30000,
    "filename": "turing_1950.txt"
  },
  {
    "identifier": "wiener_1948",
    "title": "Cybernetics",
    "year": 1948,
    "description": ["Control and communication in the animal and the machine", "Second edition"],
    "topic": "cybernetics",
    "language_code": "en",
    "char_count": 25000,
    "filename": "wiener_1948.txt"
  },
  {
    "identifier": "rechenmaschinen_1892",
    "title": "Über Rechenmaschinen",
    "year": 1892,
    "topic": "calculating_machines",
    "language_code": "de",
    "char_count": 8000,
    "filename": "rechenmaschinen_1892.txt"
  }
]"#;

pub const QUOTES: &str = r#"[
  {"id": "q1", "doc_id": "babbage_1864", "text": "The **Analytical Engine** weaves algebraical patterns",
   "tags": ["engine", "weaving"], "year": 1864, "language_code": "en"},
  {"id": "q2", "doc_id": "vaucanson_1738", "text": "un **automate** qui joue de la flûte",
   "tags": ["automaton"], "year": 1738, "language_code": "fr"},
  {"id": "q3", "doc_id": "turing_1950", "text": "Can machines **think**?",
   "tags": ["mind", "machine"], "year": 1950, "language_code": "en"},
  {"id": "q4", "doc_id": "lost_pamphlet", "text": "An orphan <quote>",
   "tags": ["machine"], "year": 1900, "language_code": "de", "source_title": "Lost Pamphlet"}
]"#;

pub const DRIFT: &str = r#"{
  "model": "test-embeddings",
  "timeline": ["1850s", "1900s", "1950s"],
  "terms": {
    "machine": {
      "variants": ["machine", "machines"],
      "total_contexts": 30,
      "decades_covered": 3,
      "drift": [
        {"decade": "1850s", "similarity_to_origin": 1.0, "num_contexts": 10,
         "examples": [{"text": "the machine weaves", "year": 1851, "title": "Passages", "doc_id": "babbage_1864"}]},
        {"decade": "1900s", "similarity_to_origin": 0.85, "similarity_to_previous": 0.85, "num_contexts": 10,
         "examples": []},
        {"decade": "1950s", "similarity_to_origin": 0.6, "similarity_to_previous": 0.7, "num_contexts": 10,
         "examples": [{"text": "can a machine think", "year": 1950, "title": "Computing Machinery", "doc_id": "turing_1950"}]}
      ]
    },
    "automaton": {
      "variants": ["automaton"],
      "total_contexts": 4,
      "decades_covered": 1,
      "drift": [
        {"decade": "1730s", "similarity_to_origin": 1.0, "num_contexts": 4, "examples": []}
      ]
    }
  }
}"#;

pub const TEXTS: [(&str, &str); 5] = [
    (
        "babbage_1864.txt",
        "The Analytical Engine weaves algebraical patterns just as the Jacquard loom weaves flowers and leaves.",
    ),
    (
        "vaucanson_1738.txt",
        "Le flûteur automate joue de la flûte traversière.",
    ),
    (
        "turing_1950.txt",
        "I propose to consider the question, Can machines think? The engine of thought.",
    ),
    (
        "wiener_1948.txt",
        "Cybernetics is the science of control and communication in the animal and the machine.",
    ),
    (
        "rechenmaschinen_1892.txt",
        "Die Rechenmaschine von Thomas addiert und multipliziert.",
    ),
];

pub struct Fixture {
    pub tmp: TempDir,
    pub config_path: PathBuf,
    pub config: Config,
}

impl Fixture {
    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    pub fn search_index_path(&self) -> PathBuf {
        self.root().join("data/search-index.json")
    }
}

/// Write a complete archive layout into a temp dir plus a config file
/// pointing at it. The search index is not built.
pub fn setup_archive() -> Fixture {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();

    let data = root.join("data");
    let texts = root.join("raw_texts");
    let translations = root.join("translations");
    fs::create_dir_all(&data).unwrap();
    fs::create_dir_all(&texts).unwrap();
    fs::create_dir_all(&translations).unwrap();

    fs::write(data.join("corpus-index.json"), CORPUS).unwrap();
    fs::write(data.join("quotes.json"), QUOTES).unwrap();
    fs::write(data.join("semantic-drift.json"), DRIFT).unwrap();
    for (name, body) in TEXTS {
        fs::write(texts.join(name), body).unwrap();
    }
    fs::write(
        translations.join("vaucanson_1738_en.txt"),
        "The automaton flute player plays the transverse flute.",
    )
    .unwrap();

    let config_content = format!(
        r#"
[data]
corpus_index = "{root}/data/corpus-index.json"
quotes = "{root}/data/quotes.json"
drift = "{root}/data/semantic-drift.json"
texts_dir = "{root}/raw_texts"
translations_dir = "{root}/translations"

[search]
index = "{root}/data/search-index.json"
timeout_secs = 5

[biography]
endpoint = "http://127.0.0.1:9/summary"
timeout_secs = 1

[server]
bind = "127.0.0.1:0"
"#,
        root = root.display()
    );
    let config_path = root.join("gemi.toml");
    fs::write(&config_path, &config_content).unwrap();
    let config = parse_config(&config_content).unwrap();

    Fixture {
        tmp,
        config_path,
        config,
    }
}
