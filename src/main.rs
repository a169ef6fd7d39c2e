use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval_at, Instant, Interval};

use unimate_lib::auth::{AuthService, LoginForm, RegistrationForm};
use unimate_lib::catalog::{Level, SubjectBrowser};
use unimate_lib::chat::ChatSession;
use unimate_lib::config::AppConfig;
use unimate_lib::database::{DatabaseManager, ProgressStatus, UserUpdate};
use unimate_lib::lectures::{display_name, format_size, LectureLibrary};
use unimate_lib::quiz::{AnswerValue, Difficulty, QuestionType, QuizEngine, QuizPhase, TickOutcome, TICK_PERIOD};
use unimate_lib::session::{FileSessionStore, Page, Shell};
use unimate_lib::storage::StorageClient;
use unimate_lib::webhook::WebhookClient;

const HELP: &str = r#"
Account:   login <email> <password> | register <first> <last> <email> <password> [year] [department]
           logout | profile | profile set <name|email|password|year|department> <value>
Pages:     goto <home|courses|dashboard|profile|learn-more>
Catalog:   year <n> | dept <name> | sem <n> | back <root|year|dept>
Lectures:  subject <name> | files | search <text> | sort <name|date-newest|date-oldest|size-largest|size-smallest>
           open <n> [pages] | page <next|prev|n> | zoom <in|out> | close | upload <path> | delete <n>
Quiz:      quiz [subject] | count <n> | difficulty <easy|medium|hard> | type <multiple-choice|true-false|short-answer> <on|off>
           generate | answer <question> <option-or-text> | submit | review | new
Chat:      chat <message> | chat-subject <subject>
Courses:   course-list | course-add <title> [| description] | lessons <course-id> | progress | progress set <lesson-id> <status> [score]
Other:     help | quit
"#;

struct App {
    config: AppConfig,
    auth: AuthService<DatabaseManager>,
    storage: StorageClient,
    webhook: WebhookClient,
    shell: Shell<FileSessionStore>,
    browser: SubjectBrowser,
    library: Option<LectureLibrary>,
    quiz: Option<QuizEngine<WebhookClient>>,
    chat: ChatSession,
}

#[tokio::main]
async fn main() -> Result<()> {
    unimate_lib::init_logging();

    let config = AppConfig::load().context("Failed to load configuration")?;
    unimate_lib::log_environment_status(&config);

    let db = DatabaseManager::new(&config.database)
        .await
        .context("Failed to connect to the database")?;
    let webhook = WebhookClient::new(&config.webhook).context("Failed to build the AI webhook client")?;

    let mut app = App {
        auth: AuthService::new(db),
        storage: StorageClient::new(&config.storage),
        webhook,
        shell: Shell::new(FileSessionStore::new(&config.session.path)),
        browser: SubjectBrowser::new(),
        library: None,
        quiz: None,
        chat: ChatSession::default(),
        config,
    };

    println!("\n=== UniMate ===");
    match app.shell.restore() {
        Some(user) => println!("👋 Welcome back, {}!", user.name),
        None => println!("🔐 Please log in or register. Type 'help' for commands."),
    }

    app.run().await
}

impl App {
    async fn run(&mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut ticker: Option<Interval> = None;

        loop {
            let tick = async {
                match ticker.as_mut() {
                    Some(interval) => {
                        interval.tick().await;
                    }
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("Failed to read input")? else { break };
                    match self.handle(line.trim()).await {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(e) => println!("❌ {}", e),
                    }
                }
                _ = tick => self.on_tick().await,
            }

            let counting = self
                .quiz
                .as_ref()
                .and_then(|q| q.timer())
                .map_or(false, |t| !t.is_expired());
            sync_ticker(&mut ticker, counting);
        }

        info!("👋 UniMate shutting down");
        Ok(())
    }

    async fn on_tick(&mut self) {
        let Some(quiz) = self.quiz.as_mut() else { return };
        match quiz.tick().await {
            Ok(TickOutcome::Running { remaining }) if remaining % 60 == 0 || remaining <= 10 => {
                if let Some(timer) = quiz.timer() {
                    println!("⏱️ {} left", timer.display());
                }
            }
            Ok(TickOutcome::Expired) => {
                println!("⏰ Time is up! Your quiz was submitted.");
                print_results(quiz);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Auto-submit failed: {}", e);
                println!("❌ {}", quiz.last_error().unwrap_or("Failed to submit quiz."));
            }
        }
    }

    async fn handle(&mut self, line: &str) -> Result<bool> {
        let mut parts = line.splitn(2, ' ');
        let command = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or_default().trim();

        match command {
            "" => return Ok(true),
            "help" => println!("{}", HELP),
            "quit" | "exit" => return Ok(false),
            "login" => self.login(rest).await?,
            "register" => self.register(rest).await?,
            _ if self.shell.user().is_none() => bail!("Please log in first"),
            "logout" => {
                self.shell.sign_out()?;
                self.library = None;
                self.quiz = None;
                self.chat = ChatSession::default();
                println!("👋 Logged out");
            }
            "profile" => self.profile(rest).await?,
            "goto" => self.goto(rest)?,
            "year" => {
                self.browser.select_year(rest.parse().context("Year must be a number")?)?;
                self.print_browser();
            }
            "dept" => {
                self.browser.select_department(rest)?;
                self.print_browser();
            }
            "sem" => {
                self.browser.select_semester(rest.parse().context("Semester must be a number")?)?;
                self.print_browser();
            }
            "back" => {
                let level = match rest {
                    "root" => Level::Root,
                    "year" => Level::Year,
                    "dept" => Level::Department,
                    other => bail!("Unknown breadcrumb '{}'", other),
                };
                self.browser.back_to(level);
                self.print_browser();
            }
            "subject" => self.open_subject(rest).await?,
            "files" => self.print_files()?,
            "search" => {
                self.library_mut()?.set_query(rest);
                self.print_files()?;
            }
            "sort" => {
                let key = rest.parse().map_err(|e: String| anyhow!(e))?;
                self.library_mut()?.set_sort(key);
                self.print_files()?;
            }
            "open" => self.open_file(rest)?,
            "page" => self.page(rest)?,
            "zoom" => {
                let viewer = self.library_mut()?.viewer_mut().ok_or_else(|| anyhow!("No document is open"))?;
                match rest {
                    "in" => viewer.zoom_in(),
                    "out" => viewer.zoom_out(),
                    other => bail!("Unknown zoom direction '{}'", other),
                };
                println!("🔍 {}%", viewer.zoom_percent());
            }
            "close" => {
                self.library_mut()?.close_viewer();
                println!("📕 Viewer closed");
            }
            "upload" => self.upload(rest).await?,
            "delete" => self.delete(rest).await?,
            "quiz" => self.start_quiz(rest),
            "count" => {
                let count = self.quiz_mut()?.set_question_count(rest.parse().context("Count must be a number")?)?;
                println!("📝 {} questions", count);
            }
            "difficulty" => {
                let difficulty: Difficulty = rest.parse().map_err(|e: String| anyhow!(e))?;
                self.quiz_mut()?.set_difficulty(difficulty)?;
                println!("📝 Difficulty: {}", difficulty);
            }
            "type" => self.set_question_type(rest)?,
            "generate" => self.generate().await?,
            "answer" => self.answer(rest)?,
            "submit" => {
                let quiz = self.quiz_mut()?;
                quiz.submit().await?;
                print_results(quiz);
            }
            "review" => print_review(self.quiz_mut()?),
            "new" => {
                self.quiz_mut()?.reset();
                println!("🔄 Ready for a new quiz");
            }
            "chat" => self.send_chat(rest).await?,
            "chat-subject" => {
                self.chat.set_subject(rest);
                println!("💬 Chat subject: {}", self.chat.subject());
            }
            "course-list" => {
                for course in self.auth.store().list_courses().await? {
                    println!("  [{}] {}", course.course_id, course.title);
                }
            }
            "course-add" => {
                let user_id = self.shell.user().map(|u| u.user_id).ok_or_else(|| anyhow!("Please log in first"))?;
                let (title, description) = parse_course_args(rest)?;
                let course = self.auth.store().create_course(&title, description.as_deref(), user_id).await?;
                println!("✅ Course [{}] {} created", course.course_id, course.title);
            }
            "lessons" => {
                let course_id = rest.parse().context("Course id must be a number")?;
                for lesson in self.auth.store().list_lessons(course_id).await? {
                    println!("  {}. [{}] {}", lesson.order_number.unwrap_or(0), lesson.lesson_id, lesson.title);
                }
            }
            "progress" => self.progress(rest).await?,
            other => bail!("Unknown command '{}'. Type 'help'.", other),
        }
        Ok(true)
    }

    async fn login(&mut self, rest: &str) -> Result<()> {
        let mut args = rest.split_whitespace();
        let form = LoginForm {
            email: args.next().unwrap_or_default().to_string(),
            password: args.next().unwrap_or_default().to_string(),
        };
        let user = self.auth.login(&form).await?;
        println!("✅ Welcome, {}!", user.name);
        self.shell.sign_in(user)?;
        Ok(())
    }

    async fn register(&mut self, rest: &str) -> Result<()> {
        let args = rest.split_whitespace().collect::<Vec<_>>();
        let arg = |i: usize| args.get(i).map(|s| s.to_string()).unwrap_or_default();
        let form = RegistrationForm {
            first_name: arg(0),
            last_name: arg(1),
            email: arg(2),
            password: arg(3),
            year: args.get(4).and_then(|y| y.parse().ok()),
            department: (args.len() > 5).then(|| args[5..].join(" ")),
        };
        let user = self.auth.register(form).await?;
        println!("🎉 Account created. Welcome, {}!", user.name);
        self.shell.sign_in(user)?;
        Ok(())
    }

    async fn profile(&mut self, rest: &str) -> Result<()> {
        let user = self.shell.user().cloned().ok_or_else(|| anyhow!("Please log in first"))?;
        if rest.is_empty() {
            self.shell.navigate(Page::Profile);
            println!("👤 {} <{}>", user.name, user.email);
            println!("   Year {} · {} · {}", user.year, user.department, user.role.as_str());
            return Ok(());
        }

        let mut args = rest.splitn(3, ' ');
        if args.next() != Some("set") {
            bail!("Usage: profile set <field> <value>");
        }
        let field = args.next().unwrap_or_default();
        let value = args.next().unwrap_or_default().trim().to_string();
        if value.is_empty() {
            bail!("Please provide a value");
        }

        let mut update = UserUpdate::default();
        match field {
            "name" => update.name = Some(value),
            "email" => update.email = Some(value),
            "password" => update.password = Some(value),
            "year" => update.year = Some(value.parse().context("Year must be a number")?),
            "department" => update.department = Some(value),
            other => bail!("Unknown profile field '{}'", other),
        }

        let updated = self.auth.update_profile(user.user_id, &update).await?;
        self.shell.refresh_user(updated)?;
        println!("✅ Profile updated");
        Ok(())
    }

    fn goto(&mut self, rest: &str) -> Result<()> {
        let page = match rest {
            "home" => Page::Home,
            "courses" => Page::Courses,
            "dashboard" => Page::Dashboard,
            "profile" => Page::Profile,
            "learn-more" => Page::LearnMore,
            other => bail!("Unknown page '{}'", other),
        };
        // Lecture view state never survives leaving the subject page.
        self.library = None;
        if page == Page::Courses {
            self.browser.reset();
        }
        println!("📄 {}", self.shell.navigate(page));
        match self.shell.page() {
            Page::Courses => self.print_browser(),
            Page::Dashboard => {
                if let Some(user) = self.shell.user() {
                    println!("   {} · Year {} · {}", user.name, user.year, user.department);
                }
            }
            Page::LearnMore => println!("   UniMate brings your lectures, quizzes and an AI study assistant together."),
            _ => {}
        }
        Ok(())
    }

    fn print_browser(&self) {
        println!("🧭 {}", self.browser);
        match self.browser.options() {
            Some(options) => options.iter().for_each(|o| println!("   - {}", o)),
            None => {
                let subjects = self.browser.subjects();
                if subjects.is_empty() {
                    println!("   No subjects listed for this semester");
                }
                for s in subjects {
                    println!("   - {} ({}%, {} chapters)", s.name, s.progress, s.chapters);
                }
            }
        }
    }

    async fn open_subject(&mut self, subject: &str) -> Result<()> {
        if subject.is_empty() {
            bail!("Usage: subject <name>");
        }
        self.shell.navigate(Page::SubjectDetails { subject: subject.to_string() });
        let files = self.storage.list(subject).await?;
        self.library = Some(LectureLibrary::new(subject, files));
        self.print_files()
    }

    fn library_mut(&mut self) -> Result<&mut LectureLibrary> {
        self.library.as_mut().ok_or_else(|| anyhow!("Open a subject first"))
    }

    fn print_files(&self) -> Result<()> {
        let library = self.library.as_ref().ok_or_else(|| anyhow!("Open a subject first"))?;
        let visible = library.visible();
        println!("📚 {} · sorted by {}", library.subject(), library.sort());
        if visible.is_empty() {
            if library.is_empty() {
                println!("   No lectures uploaded yet");
            } else {
                println!("   No lectures found matching \"{}\"", library.query());
            }
        }
        for (i, file) in visible.iter().enumerate() {
            let date = file.created_at.map(|d| d.format("%b %d, %Y").to_string()).unwrap_or_default();
            println!("  {}. {}  {}  {}", i + 1, display_name(&file.name), format_size(file.size), date);
        }
        Ok(())
    }

    fn open_file(&mut self, rest: &str) -> Result<()> {
        let mut args = rest.split_whitespace();
        let index: usize = args.next().unwrap_or_default().parse().context("Usage: open <n> [pages]")?;
        let pages = args.next().and_then(|p| p.parse().ok()).unwrap_or(1);
        let viewer = self
            .library_mut()?
            .open(index.saturating_sub(1), pages)
            .ok_or_else(|| anyhow!("No lecture number {}", index))?;
        println!("📖 {} · {}", display_name(&viewer.file().name), viewer.file().url);
        println!("   Page {}/{} · {}%", viewer.page(), viewer.total_pages(), viewer.zoom_percent());
        Ok(())
    }

    fn page(&mut self, rest: &str) -> Result<()> {
        let viewer = self.library_mut()?.viewer_mut().ok_or_else(|| anyhow!("No document is open"))?;
        match rest {
            "next" => viewer.next_page(),
            "prev" => viewer.prev_page(),
            n => viewer.go_to(n.parse().context("Page must be a number")?),
        };
        println!("   Page {}/{}", viewer.page(), viewer.total_pages());
        Ok(())
    }

    async fn upload(&mut self, path: &str) -> Result<()> {
        let subject = self.library_mut()?.subject().to_string();
        let data = tokio::fs::read(path).await.with_context(|| format!("Cannot read {}", path))?;
        let file_name = Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("Invalid file path"))?;
        let key = self.storage.upload(&subject, file_name, "application/pdf", data.into()).await?;
        println!("✅ Uploaded as {}", key);
        self.open_subject(&subject).await
    }

    async fn delete(&mut self, rest: &str) -> Result<()> {
        let index: usize = rest.parse().context("Usage: delete <n>")?;
        let library = self.library.as_ref().ok_or_else(|| anyhow!("Open a subject first"))?;
        let subject = library.subject().to_string();
        let key = library
            .visible()
            .get(index.saturating_sub(1))
            .map(|f| format!("{}/{}", subject, f.name))
            .ok_or_else(|| anyhow!("No lecture number {}", index))?;
        self.storage.delete(&key).await?;
        self.open_subject(&subject).await
    }

    fn start_quiz(&mut self, rest: &str) {
        let subject = if rest.is_empty() {
            match self.shell.page() {
                Page::SubjectDetails { subject } => subject.clone(),
                _ => self.config.quiz.subject.clone(),
            }
        } else {
            rest.to_string()
        };
        let quiz = QuizEngine::with_duration(self.webhook.clone(), subject, self.config.quiz.duration_secs);
        let settings = quiz.settings();
        println!(
            "📝 Quiz on {}: {} questions, {}, types: {}",
            quiz.subject(),
            settings.question_count,
            settings.difficulty,
            settings.types.enabled().iter().map(|t| t.label()).collect::<Vec<_>>().join(", ")
        );
        self.quiz = Some(quiz);
    }

    fn quiz_mut(&mut self) -> Result<&mut QuizEngine<WebhookClient>> {
        self.quiz.as_mut().ok_or_else(|| anyhow!("Start a quiz first with 'quiz'"))
    }

    fn set_question_type(&mut self, rest: &str) -> Result<()> {
        let mut args = rest.split_whitespace();
        let question_type: QuestionType = serde_json::from_value(serde_json::Value::String(
            args.next().unwrap_or_default().to_string(),
        ))
        .context("Unknown question type")?;
        let enabled = match args.next() {
            Some("on") => true,
            Some("off") => false,
            _ => bail!("Usage: type <kind> <on|off>"),
        };
        let quiz = self.quiz_mut()?;
        quiz.set_type(question_type, enabled)?;
        if !quiz.can_generate() {
            println!("⚠️ {}", unimate_lib::quiz::NO_TYPES_MESSAGE);
        }
        Ok(())
    }

    async fn generate(&mut self) -> Result<()> {
        let quiz = self.quiz_mut()?;
        println!("⏳ Generating quiz...");
        if let Err(e) = quiz.generate().await {
            warn!("Generation failed: {}", e);
            bail!("{}", quiz.last_error().unwrap_or("Failed to generate quiz."));
        }

        for (i, question) in quiz.questions().iter().enumerate() {
            println!("\nQ{} [{}] {}", i + 1, question.question_type.label(), question.question);
            for (j, option) in question.options.iter().enumerate() {
                println!("   {}) {}", j + 1, option);
            }
        }
        if let Some(timer) = quiz.timer() {
            println!("\n⏱️ You have {}", timer.display());
        }
        Ok(())
    }

    fn answer(&mut self, rest: &str) -> Result<()> {
        let mut args = rest.splitn(2, ' ');
        let number: usize = args.next().unwrap_or_default().parse().context("Usage: answer <question> <value>")?;
        let raw = args.next().unwrap_or_default().trim();
        let index = position(number, "Question")?;

        let quiz = self.quiz_mut()?;
        let question = quiz
            .questions()
            .get(index)
            .ok_or_else(|| anyhow!("No question number {}", number))?;

        let value = if question.has_options() {
            let option = match raw.parse::<usize>() {
                Ok(n) => position(n, "Option")?,
                Err(_) => question
                    .options
                    .iter()
                    .position(|o| o.eq_ignore_ascii_case(raw))
                    .ok_or_else(|| anyhow!("'{}' is not one of the options", raw))?,
            };
            AnswerValue::Choice(option)
        } else {
            AnswerValue::Text(raw.to_string())
        };

        quiz.record_answer(index, value)?;
        println!("✔️ Answer saved for Q{}", number);
        Ok(())
    }

    async fn send_chat(&mut self, text: &str) -> Result<()> {
        match self.chat.send(&self.webhook, text).await {
            Ok(Some(reply)) => println!("🤖 {}", reply.text),
            Ok(None) => {}
            Err(e) => bail!("{}", e.user_message()),
        }
        Ok(())
    }

    async fn progress(&mut self, rest: &str) -> Result<()> {
        let user_id = self.shell.user().map(|u| u.user_id).ok_or_else(|| anyhow!("Please log in first"))?;
        let db = self.auth.store();

        if rest.is_empty() {
            let rows = db.user_progress(user_id).await?;
            if rows.is_empty() {
                println!("   No progress recorded yet");
            }
            for row in rows {
                let score = row.score.map(|s| format!(" · score {}", s)).unwrap_or_default();
                println!("  lesson {}: {}{}", row.lesson_id, row.status, score);
            }
            return Ok(());
        }

        let args = rest.split_whitespace().collect::<Vec<_>>();
        let (lesson, status, score) = match args.as_slice() {
            ["set", lesson, status @ ..] if !status.is_empty() => {
                let (status, score) = match status.last().and_then(|s| s.parse::<i32>().ok()) {
                    Some(score) => (status[..status.len() - 1].join(" "), Some(score)),
                    None => (status.join(" "), None),
                };
                (lesson.parse::<i64>().context("Lesson id must be a number")?, status, score)
            }
            _ => bail!("Usage: progress set <lesson-id> <status> [score]"),
        };
        let status: ProgressStatus = status.parse()?;
        let row = db.upsert_progress(user_id, lesson, status, score).await?;
        println!("✅ Lesson {} marked {}", row.lesson_id, row.status);
        Ok(())
    }
}

/// Keeps at most one interval, alive only while a quiz is counting down.
fn sync_ticker(ticker: &mut Option<Interval>, counting: bool) {
    match (counting, ticker.is_some()) {
        (true, false) => *ticker = Some(interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD)),
        (false, true) => *ticker = None,
        _ => {}
    }
}

/// Converts a 1-based number typed by the user into an index.
fn position(number: usize, what: &str) -> Result<usize> {
    number
        .checked_sub(1)
        .ok_or_else(|| anyhow!("{} numbers start at 1", what))
}

/// `<title> [| description]`
fn parse_course_args(rest: &str) -> Result<(String, Option<String>)> {
    let (title, description) = match rest.split_once('|') {
        Some((title, description)) => (title.trim(), Some(description.trim())),
        None => (rest.trim(), None),
    };
    if title.is_empty() {
        bail!("Usage: course-add <title> [| description]");
    }
    let description = description.filter(|d| !d.is_empty()).map(str::to_string);
    Ok((title.to_string(), description))
}

fn print_results(quiz: &QuizEngine<WebhookClient>) {
    if quiz.phase() != QuizPhase::Results {
        return;
    }
    if let Some(result) = quiz.result() {
        println!(
            "\n🏁 {}/{} correct · {}% · grade {}",
            result.correct_answers, result.total_questions, result.score, result.grade
        );
        if !result.feedback.is_empty() {
            println!("   {}", result.feedback);
        }
        println!("   Type 'review' to see each answer or 'new' for another quiz.");
    }
}

fn print_review(quiz: &QuizEngine<WebhookClient>) {
    let items = quiz.review();
    if items.is_empty() {
        println!("   Nothing to review yet");
    }
    for (i, item) in items.iter().enumerate() {
        let mark = match item.is_correct {
            Some(true) => "✅",
            Some(false) => "❌",
            None => "•",
        };
        println!("\n{} Q{}: {}", mark, i + 1, item.question);
        println!("   Your answer: {}", item.your_answer);
        println!("   Correct answer: {}", item.correct_answer);
        if !item.feedback.is_empty() {
            println!("   {}", item.feedback);
        }
    }
}
