mod app;

use std::process;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use app::VocabApp;
use vocab_trainer::database::{SqliteWordStore, WordStore, add_word};
use vocab_trainer::models::{Article, Category, ExampleSentence, NounDetails, VerbDetails, WordDetails};
use vocab_trainer::{AppConfig, LocalReasoningService, SessionController};

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn noun(text: &str, translation: &str, article: Article, plural: &str) -> WordDetails {
    let mut details = WordDetails::new(text, translation);
    details.noun = Some(NounDetails {
        article,
        plural: plural.to_string(),
    });
    details
}

fn seed_sample_words(store: &SqliteWordStore) -> vocab_trainer::database::Result<()> {
    let mut haus = noun("Haus", "дом", Article::Das, "Häuser");
    haus.examples.push(ExampleSentence {
        text: "Das Haus ist alt.".to_string(),
        translation: "Дом старый.".to_string(),
    });
    add_word(store, haus, Category::Noun)?;
    add_word(store, noun("Katze", "кошка", Article::Die, "Katzen"), Category::Noun)?;
    add_word(store, noun("Tisch", "стол", Article::Der, "Tische"), Category::Noun)?;

    let mut gehen = WordDetails::new("gehen", "идти");
    gehen.verb = Some(VerbDetails {
        present_tense: "geht".to_string(),
        perfect: "ist gegangen".to_string(),
        government: None,
        reflexive: false,
    });
    gehen.examples.push(ExampleSentence {
        text: "Wir gehen nach Hause.".to_string(),
        translation: "Мы идём домой.".to_string(),
    });
    add_word(store, gehen, Category::Verb)?;

    add_word(store, WordDetails::new("schnell", "быстрый"), Category::Adjective)?;
    add_word(store, WordDetails::new("oft", "часто"), Category::Adverb)?;
    Ok(())
}

fn main() -> eframe::Result<()> {
    init_logging();

    let config = AppConfig::load().unwrap_or_else(|err| {
        warn!("Using default configuration: {err}");
        AppConfig::default()
    });

    let db_path = config.storage.resolve_database_path();
    let store = match SqliteWordStore::open(&db_path) {
        Ok(store) => store,
        Err(err) => {
            error!("Failed to open database at {}: {err}", db_path.display());
            process::exit(1);
        }
    };

    if store.get_all().map(|words| words.is_empty()).unwrap_or(false) {
        match seed_sample_words(&store) {
            Ok(()) => info!("Sample words created"),
            Err(err) => warn!("Failed to create sample words: {err}"),
        }
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to start async runtime: {err}");
            process::exit(1);
        }
    };

    info!(
        words = store.get_all().map(|words| words.len()).unwrap_or_default(),
        path = %db_path.display(),
        "Word store ready"
    );
    let controller = SessionController::new(store, LocalReasoningService::new(), &config);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([560.0, 760.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Vocabulary Trainer",
        options,
        Box::new(move |_cc| Ok(Box::new(VocabApp::new(controller, runtime)))),
    )
}
