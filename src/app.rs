//! Main application UI.
//! Word list management on the main screen, and a review screen that drives
//! the session controller one exercise at a time.

use chrono::{DateTime, Local, Utc};
use eframe::egui;
use strum::IntoEnumIterator;
use tokio::runtime::Runtime;
use tracing::{error, warn};

use vocab_trainer::database::{SqliteWordStore, WordStore, add_word};
use vocab_trainer::export::{WordSet, export_json_to_path, import_into, import_json};
use vocab_trainer::models::sm2::preview_intervals;
use vocab_trainer::models::{
    Answer, Article, Category, ExampleSentence, ExerciseContent, ExercisePresentation,
    NounDetails, Recall, SessionState, SessionSummary, VerbDetails, WordDetails,
};
use vocab_trainer::{
    Advance, LocalReasoningService, SessionController, SessionError, SessionId, WordFilter,
};

type Controller = SessionController<SqliteWordStore, LocalReasoningService>;

#[derive(Default)]
enum AppScreen {
    #[default]
    Main,
    Review(SessionId),
    Summary(SessionSummary),
}

/// Fields of the "add word" form.
struct WordForm {
    text: String,
    translation: String,
    category: Category,
    article: Article,
    perfect: String,
    example: String,
    example_translation: String,
}

impl Default for WordForm {
    fn default() -> Self {
        Self {
            text: String::new(),
            translation: String::new(),
            category: Category::Noun,
            article: Article::Der,
            perfect: String::new(),
            example: String::new(),
            example_translation: String::new(),
        }
    }
}

impl WordForm {
    fn to_details(&self) -> WordDetails {
        let mut details = WordDetails::new(&self.text, &self.translation);
        match self.category {
            Category::Noun => {
                details.noun = Some(NounDetails {
                    article: self.article,
                    plural: String::new(),
                })
            }
            Category::Verb if !self.perfect.trim().is_empty() => {
                details.verb = Some(VerbDetails {
                    present_tense: String::new(),
                    perfect: self.perfect.trim().to_string(),
                    government: None,
                    reflexive: false,
                })
            }
            _ => {}
        }
        if !self.example.trim().is_empty() {
            details.examples.push(ExampleSentence {
                text: self.example.trim().to_string(),
                translation: self.example_translation.trim().to_string(),
            });
        }
        details
    }
}

pub struct VocabApp {
    controller: Controller,
    runtime: Runtime,
    current_screen: AppScreen,
    show_confirmation_dialog: bool,
    allowed_to_close: bool,

    form: WordForm,
    category_filter: Option<Category>,
    current_date_display: String,

    answer_text: String,
    revealed: bool,
    /// Kept so a failed grading can be retried with the same answer.
    last_answer: Option<Answer>,

    review_anyway_candidates: Option<usize>,
    show_message_dialog: bool,
    message: String,
}

fn format_date(time: DateTime<Utc>) -> String {
    let local: DateTime<Local> = time.into();
    local.format("%Y-%m-%d").to_string()
}

impl eframe::App for VocabApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        match self.current_screen {
            AppScreen::Main => self.render_main_screen(ctx),
            AppScreen::Review(id) => self.render_review_screen(ctx, id),
            AppScreen::Summary(_) => self.render_summary_screen(ctx),
        }

        if ctx.input(|i| i.viewport().close_requested()) && !self.allowed_to_close {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.show_confirmation_dialog = true;
        }

        if self.show_confirmation_dialog {
            egui::Window::new("Do you want to quit?")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        if ui.button("No").clicked() {
                            self.show_confirmation_dialog = false;
                        }
                        if ui.button("Yes").clicked() {
                            self.show_confirmation_dialog = false;
                            self.allowed_to_close = true;
                            ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
                        }
                    });
                });
        }

        if let Some(candidates) = self.review_anyway_candidates {
            let mut start = false;
            let mut cancel = false;
            egui::Window::new("Nothing due")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label(format!(
                        "No words are due today. Review all {candidates} matching words anyway?"
                    ));
                    ui.horizontal(|ui| {
                        start = ui.button("Review anyway").clicked();
                        cancel = ui.button("Cancel").clicked();
                    });
                });
            if start {
                self.review_anyway_candidates = None;
                self.start_review(true);
            }
            if cancel {
                self.review_anyway_candidates = None;
            }
        }

        if self.show_message_dialog {
            egui::Window::new("Vocabulary Trainer")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label(&self.message);
                    ui.add_space(10.0);
                    if ui.button("OK").clicked() {
                        self.show_message_dialog = false;
                    }
                });
        }
    }
}

impl VocabApp {
    pub fn new(controller: Controller, runtime: Runtime) -> Self {
        Self {
            controller,
            runtime,
            current_screen: AppScreen::Main,
            show_confirmation_dialog: false,
            allowed_to_close: false,
            form: WordForm::default(),
            category_filter: None,
            current_date_display: String::new(),
            answer_text: String::new(),
            revealed: false,
            last_answer: None,
            review_anyway_candidates: None,
            show_message_dialog: false,
            message: String::new(),
        }
    }

    fn show_message(&mut self, message: String) {
        self.message = message;
        self.show_message_dialog = true;
    }

    fn filter(&self) -> WordFilter {
        WordFilter {
            categories: self.category_filter.map(|category| vec![category]),
            ..Default::default()
        }
    }

    fn render_main_screen(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let now = self.controller.store().current_date().unwrap_or_else(|err| {
                warn!("Falling back to system clock: {err}");
                Utc::now()
            });
            self.current_date_display = format_date(now);

            ui.horizontal(|ui| {
                ui.label(&self.current_date_display);
                if ui.button("Next Day").clicked() {
                    if let Err(err) = self.controller.store().advance_day() {
                        error!("Failed to advance day: {err}");
                    }
                }
                if ui.button("Today").clicked() {
                    if let Err(err) = self.controller.store().reset_day_offset() {
                        error!("Failed to reset day offset: {err}");
                    }
                }
            });
            ui.separator();

            ui.horizontal(|ui| {
                if ui.button("Export Words").clicked() {
                    self.handle_export();
                }
                if ui.button("Import Words").clicked() {
                    self.handle_import();
                }
            });
            ui.separator();

            self.render_word_form(ui);
            ui.separator();

            ui.horizontal(|ui| {
                egui::ComboBox::from_label("Category")
                    .selected_text(
                        self.category_filter
                            .map_or("all".to_string(), |category| category.to_string()),
                    )
                    .show_ui(ui, |ui| {
                        ui.selectable_value(&mut self.category_filter, None, "all");
                        for category in Category::iter() {
                            ui.selectable_value(
                                &mut self.category_filter,
                                Some(category),
                                category.to_string(),
                            );
                        }
                    });
                if ui.button("Start Review").clicked() {
                    self.start_review(false);
                }
            });
            ui.separator();

            let entries = match self.controller.store().get_all() {
                Ok(entries) => entries,
                Err(err) => {
                    ui.label(format!("Could not load words: {err}"));
                    return;
                }
            };
            let filter = self.filter();
            let due = entries
                .iter()
                .filter(|entry| filter.matches(&entry.record) && entry.record.is_due(now))
                .count();
            ui.heading(format!("Words ({}, {} due)", entries.len(), due));

            let mut action_remove: Option<String> = None;
            egui::ScrollArea::vertical()
                .id_salt("words_list")
                .show(ui, |ui| {
                    for entry in entries.iter().filter(|e| filter.matches(&e.record)) {
                        let record = &entry.record;
                        ui.group(|ui| {
                            ui.horizontal(|ui| {
                                let marker = if record.is_due(now) { "●" } else { "○" };
                                ui.label(format!(
                                    "{marker} {} - {}",
                                    entry.details.citation_form(),
                                    entry.details.translation
                                ));
                                if ui.small_button("Remove").clicked() {
                                    action_remove = Some(record.word_key.clone());
                                }
                            });
                            let [again, hard, good, easy] = preview_intervals(record, now);
                            ui.label(format!(
                                "{} | {} | ease {:.2} | due {} | next: {again}d / {hard}d / {good}d / {easy}d",
                                record.category,
                                record.mastery_hint,
                                record.ease_factor,
                                format_date(record.next_review_at),
                            ));
                        });
                    }
                });

            if let Some(key) = action_remove {
                if let Err(err) = self.controller.store().delete(&key) {
                    self.show_message(format!("Failed to remove '{key}': {err}"));
                }
            }
        });
    }

    fn render_word_form(&mut self, ui: &mut egui::Ui) {
        ui.heading("Add Word");
        ui.horizontal(|ui| {
            ui.label("Word:");
            ui.text_edit_singleline(&mut self.form.text);
        });
        ui.horizontal(|ui| {
            ui.label("Translation:");
            ui.text_edit_singleline(&mut self.form.translation);
        });
        ui.horizontal(|ui| {
            egui::ComboBox::from_id_salt("form_category")
                .selected_text(self.form.category.to_string())
                .show_ui(ui, |ui| {
                    for category in Category::iter() {
                        ui.selectable_value(&mut self.form.category, category, category.to_string());
                    }
                });
            match self.form.category {
                Category::Noun => {
                    for article in [Article::Der, Article::Die, Article::Das] {
                        ui.radio_value(&mut self.form.article, article, article.to_string());
                    }
                }
                Category::Verb => {
                    ui.label("Perfect:");
                    ui.text_edit_singleline(&mut self.form.perfect);
                }
                _ => {}
            }
        });
        ui.horizontal(|ui| {
            ui.label("Example:");
            ui.text_edit_singleline(&mut self.form.example);
        });
        ui.horizontal(|ui| {
            ui.label("Example translation:");
            ui.text_edit_singleline(&mut self.form.example_translation);
        });

        if ui.button("Add Word").clicked() {
            if self.form.text.trim().is_empty() || self.form.translation.trim().is_empty() {
                self.show_message("A word needs both text and a translation.".to_string());
                return;
            }
            let details = self.form.to_details();
            match add_word(self.controller.store(), details, self.form.category) {
                Ok(_) => self.form = WordForm::default(),
                Err(err) => self.show_message(format!("Failed to add word: {err}")),
            }
        }
    }

    fn start_review(&mut self, anyway: bool) {
        let filter = self.filter();
        let started = if anyway {
            self.runtime
                .block_on(self.controller.start_review_anyway(&filter))
        } else {
            self.runtime.block_on(self.controller.start_session(&filter))
        };
        match started {
            Ok(id) => {
                self.reset_answer();
                self.current_screen = AppScreen::Review(id);
            }
            Err(SessionError::NothingDue { candidates }) => {
                self.review_anyway_candidates = Some(candidates);
            }
            Err(SessionError::NoWords) => {
                self.show_message("There are no words to review yet. Add some first.".to_string())
            }
            Err(err) => self.show_message(format!("Could not start review: {err}")),
        }
    }

    fn reset_answer(&mut self) {
        self.answer_text.clear();
        self.revealed = false;
        self.last_answer = None;
    }

    fn render_review_screen(&mut self, ctx: &egui::Context, id: SessionId) {
        let presentation = self.controller.current_exercise(id);
        let state = self.controller.state(id).unwrap_or(SessionState::Complete);
        let last_error = self
            .controller
            .last_error(id)
            .ok()
            .flatten()
            .map(str::to_string);
        let progress = self
            .controller
            .session(id)
            .map(|session| session.progress_message())
            .unwrap_or_default();

        let can_go_back = self.controller.can_go_back(id);

        let mut action_submit: Option<Answer> = None;
        let mut action_next = false;
        let mut action_back = false;
        let mut action_skip = false;
        let mut action_close = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(progress);

            if let Some(message) = &last_error {
                ui.colored_label(egui::Color32::LIGHT_RED, message);
                if state == SessionState::Checking {
                    if let Some(answer) = &self.last_answer {
                        if ui.button("Retry").clicked() {
                            action_submit = Some(answer.clone());
                        }
                    }
                }
            }
            ui.add_space(10.0);

            match &presentation {
                Ok(exercise) => {
                    action_submit = action_submit
                        .take()
                        .or_else(|| self.render_exercise(ui, exercise, state));

                    ui.add_space(20.0);
                    ui.horizontal(|ui| {
                        if state == SessionState::Feedback && ui.button("Next").clicked() {
                            action_next = true;
                        }
                        if can_go_back && ui.button("Back").clicked()
                        {
                            action_back = true;
                        }
                        if matches!(state, SessionState::Presenting | SessionState::Checking)
                            && ui.button("Skip").clicked()
                        {
                            action_skip = true;
                        }
                    });
                }
                Err(err) => {
                    ui.label(format!("No exercise available: {err}"));
                }
            }

            ui.add_space(20.0);
            if ui.button("Back to Main Screen").clicked() {
                action_close = true;
            }
        });

        if let Some(answer) = action_submit {
            self.last_answer = Some(answer.clone());
            if let Err(err) = self.runtime.block_on(self.controller.submit_answer(id, answer)) {
                if !err.is_retryable() {
                    self.show_message(err.to_string());
                }
            }
        }
        if action_next {
            let advanced = self.runtime.block_on(self.controller.advance(id));
            self.after_move(id, advanced);
        }
        if action_skip {
            let skipped = self.runtime.block_on(self.controller.skip(id));
            self.after_move(id, skipped);
        }
        if action_back {
            match self.runtime.block_on(self.controller.go_back(id)) {
                Ok(()) => self.reset_answer(),
                Err(err) => self.show_message(err.to_string()),
            }
        }
        if action_close {
            self.controller.close_session(id);
            self.current_screen = AppScreen::Main;
        }
    }

    /// Draws the exercise body; returns an answer when the learner gave one.
    fn render_exercise(
        &mut self,
        ui: &mut egui::Ui,
        exercise: &ExercisePresentation,
        state: SessionState,
    ) -> Option<Answer> {
        let mut answer = None;
        let accepting = state == SessionState::Presenting;

        if let Some(requested) = exercise.fallback_from {
            ui.small(format!("Showing a flashcard; the {requested} exercise is unavailable."));
        }

        ui.group(|ui| {
            ui.set_min_height(160.0);
            ui.vertical_centered(|ui| match &exercise.content {
                ExerciseContent::Flashcard => {
                    ui.heading(exercise.details.citation_form());
                    if self.revealed || exercise.outcome.is_some() {
                        ui.label(&exercise.details.translation);
                        for example in &exercise.details.examples {
                            ui.small(format!("{} ({})", example.text, example.translation));
                        }
                    } else if ui.button("Show Translation").clicked() {
                        self.revealed = true;
                    }
                    if accepting && self.revealed {
                        ui.horizontal(|ui| {
                            for (label, recall) in [
                                ("Forgot", Recall::Forgot),
                                ("Remembered", Recall::Remembered),
                                ("Easy", Recall::Easy),
                            ] {
                                if ui.button(label).clicked() {
                                    answer = Some(Answer::SelfReport(recall));
                                }
                            }
                        });
                    }
                }
                ExerciseContent::MultipleChoice(question) => {
                    ui.heading(&question.question);
                    for option in &question.options {
                        if ui.add_enabled(accepting, egui::Button::new(option)).clicked() {
                            answer = Some(Answer::Text(option.clone()));
                        }
                    }
                }
                ExerciseContent::ArticleDrill(drill) => {
                    ui.heading(&drill.prompt);
                    ui.horizontal(|ui| {
                        for option in &drill.options {
                            if ui.add_enabled(accepting, egui::Button::new(option)).clicked() {
                                answer = Some(Answer::Text(option.clone()));
                            }
                        }
                    });
                }
                ExerciseContent::VerbFormDrill(drill) => {
                    ui.heading(&drill.prompt);
                    answer = self.render_text_answer(ui, accepting);
                }
                ExerciseContent::ClozeSentence(cloze) => {
                    ui.heading(&cloze.sentence_with_blank);
                    ui.label(&cloze.translation);
                    answer = self.render_text_answer(ui, accepting);
                }
                ExerciseContent::FreeRecall(prompt) => {
                    ui.heading(&prompt.prompt);
                    answer = self.render_text_answer(ui, accepting);
                }
            });
        });

        if let Some(outcome) = &exercise.outcome {
            ui.add_space(10.0);
            if let Some(explanation) = &outcome.explanation {
                ui.label(explanation);
            }
            if let Some(correct) = &outcome.correct_answer {
                ui.label(format!("Answer: {correct}"));
            }
            if let Some(hint) = &outcome.hint {
                ui.small(hint);
            }
        }
        answer
    }

    fn render_text_answer(&mut self, ui: &mut egui::Ui, accepting: bool) -> Option<Answer> {
        let mut answer = None;
        ui.horizontal(|ui| {
            ui.add_enabled(accepting, egui::TextEdit::singleline(&mut self.answer_text));
            if ui.add_enabled(accepting, egui::Button::new("Check")).clicked()
                && !self.answer_text.trim().is_empty()
            {
                answer = Some(Answer::Text(self.answer_text.clone()));
            }
        });
        answer
    }

    fn after_move(&mut self, id: SessionId, result: Result<Advance, SessionError>) {
        match result {
            Ok(Advance::Next { .. }) => self.reset_answer(),
            Ok(Advance::Complete { .. }) => {
                let summary = self.controller.close_session(id).unwrap_or_default();
                self.current_screen = AppScreen::Summary(summary);
            }
            Err(err) => self.show_message(err.to_string()),
        }
    }

    fn render_summary_screen(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            if let AppScreen::Summary(summary) = &self.current_screen {
                ui.heading("Review complete!");
                ui.label(format!("Words: {}", summary.total));
                ui.label(format!("Correct: {}", summary.correct));
                ui.label(format!("Accepted as synonym: {}", summary.synonyms));
                ui.label(format!("Incorrect: {}", summary.incorrect));
                ui.label(format!("Skipped: {}", summary.skipped));
                if summary.unsaved > 0 {
                    ui.colored_label(
                        egui::Color32::LIGHT_RED,
                        format!("{} updates could not be saved.", summary.unsaved),
                    );
                }
            }
            ui.add_space(20.0);
            if ui.button("Back to Main Screen").clicked() {
                self.current_screen = AppScreen::Main;
            }
        });
    }

    fn handle_export(&mut self) {
        let words = match self.controller.store().get_all() {
            Ok(words) => words,
            Err(err) => return self.show_message(format!("Export failed: {err}")),
        };
        let set = WordSet {
            name: "My words".to_string(),
            words,
        };
        if let Some(path) = rfd::FileDialog::new()
            .set_file_name("words.json")
            .add_filter("JSON files", &["json"])
            .save_file()
        {
            match export_json_to_path(&set, &path) {
                Ok(()) => self.show_message(format!("Exported {} words.", set.words.len())),
                Err(err) => self.show_message(format!("Export failed: {err}")),
            }
        }
    }

    fn handle_import(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON files", &["json"])
            .pick_file()
        else {
            return;
        };
        let imported = import_json(&path).and_then(|set| import_into(self.controller.store(), &set));
        match imported {
            Ok(report) if report.skipped.is_empty() => {
                self.show_message(format!("Imported {} words.", report.added))
            }
            Ok(report) => self.show_message(format!(
                "Imported {} words. Already known, left unchanged: {}",
                report.added,
                report.skipped.join(", ")
            )),
            Err(err) => self.show_message(format!(
                "Import failed: {err}\n\nExpected structure:\n{{\n  \"name\": \"...\",\n  \"words\": [...]\n}}"
            )),
        }
    }
}
